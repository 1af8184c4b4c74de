pub mod error;
pub mod orchestrator;
pub mod single;
pub mod stream;

pub use error::AnalysisError;
pub use orchestrator::{
    analyze_all, analyze_all_partial, AnalyzeOptions, BatchFailure, PartialAnalysis,
};
pub use single::analyze_one;
pub use stream::{analysis_stream, ProgressEvent, ProgressStreamer, StreamError, StreamState};

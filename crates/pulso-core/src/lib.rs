pub mod batch;
pub mod error;
pub mod normalize;
pub mod parse;
pub mod types;

pub use batch::batch;
pub use error::ParseError;
pub use normalize::normalize;
pub use parse::{parse, parse_batch};
pub use types::*;

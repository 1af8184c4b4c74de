pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod prompt;

pub use catalog::{KnownModel, DEFAULT_BATCH_SIZE, DEFAULT_MODEL, KNOWN_MODELS};
pub use client::{invoke, CompletionClient, CompletionRequest};
pub use config::ModelConfig;
pub use error::ModelError;
pub use http::ChatCompletionsClient;
pub use mock::MockClient;

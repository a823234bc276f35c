pub mod config;
pub mod error;
pub mod types;

pub use config::{AgentConfig, ExecutionConfig, LlmConfig, LlmProvider};
pub use error::{AgentError, Result};
pub use types::{ApplicationId, ControllerKind, FieldMap, RequestId};

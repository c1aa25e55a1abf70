pub mod config;
pub mod conversation;
pub mod error;
pub mod settings;
pub mod trace;

pub use config::{Config, ConfigError, ConfigSeverity};
pub use conversation::{validate_tool_pairing, ConversationMessage, ToolCall, ToolDefinition};
pub use error::{Error, Result};
pub use settings::{ChatProcessingMode, LlmFamilySettings, Settings};
pub use trace::TraceEvent;

//! SSH connection, execution, and transfer module
//!
//! Connection lifecycle, interactive command execution with elevation-prompt
//! handling, and SCP uploads.

pub mod exec;
pub mod handler;
pub mod host;
pub mod prompt;
pub mod scp;

// Re-exports
pub use handler::SshHandler;
pub use host::{Connection, Host};
pub use prompt::{PromptDetector, SudoPromptDetector};

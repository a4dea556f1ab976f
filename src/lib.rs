//! hostpush - a configuration-driven remote command runner
//!
//! Given YAML configuration files naming a list of SSH hosts and an ordered
//! list of commands (shell sequences or file uploads), hostpush connects to
//! each host with password authentication and executes the command sequence
//! against it, one host at a time or all hosts concurrently.
//!
//! # Features
//!
//! - Per-host sequential command execution, sequential or concurrent across
//!   hosts
//! - `{{name}}` variable substitution in command lines, upload paths, and
//!   (optionally) uploaded file contents
//! - Automatic password injection on detected `[sudo]` elevation prompts
//! - SCP uploads over the same authenticated connection
//!
//! # Example Usage (CLI)
//!
//! ```bash
//! hostpush --configs deploy.yaml cleanup.yaml
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod runner;
pub mod ssh;
pub mod template;

// Re-exports for convenience
pub use command::Command;
pub use config::{Args, Config, GlobalConfig, HostConfig};
pub use error::{PushError, Result};
pub use ssh::{Connection, Host, PromptDetector, SshHandler, SudoPromptDetector};

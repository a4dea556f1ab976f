//! Command variants and per-host execution
//!
//! A command is one entry of a Config's command list, decoded from the
//! `type`/`value` tagged shape in YAML. Commands execute against one host at
//! a time, in declared order, with every string passed through the template
//! engine first.

use std::path::Path;

use serde::Deserialize;

use crate::error::{PushError, Result};
use crate::ssh::host::{Connection, Host};
use crate::ssh::{exec, scp};
use crate::template;

/// One entry of the command list
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Command {
    /// An ordered sequence of shell command lines, run one at a time
    Bash {
        #[serde(default)]
        commands: Vec<String>,
    },

    /// Copy a local file to a remote path. With `template` set, the file
    /// contents are rewritten through the template engine first.
    Upload {
        #[serde(default)]
        template: bool,
        filename: String,
        destination: String,
    },

    /// Declared in the schema but reserved; executing one is an error.
    Download {
        #[serde(default)]
        filename: String,
        #[serde(default)]
        destination: String,
    },
}

impl Command {
    /// Execute this command against one connected host.
    ///
    /// Shell lines and upload paths are template-resolved against the
    /// host's merged variables before anything touches the wire.
    pub async fn run(&self, conn: &Connection, host: &Host) -> Result<()> {
        match self {
            Command::Bash { commands } => {
                for line in commands {
                    let line = template::render(line, &host.variables)?;
                    exec::run_shell_command(conn, host, &line).await?;
                }
                Ok(())
            }
            Command::Upload {
                template: rewrite,
                filename,
                destination,
            } => {
                let filename = template::render(filename, &host.variables)?;
                let destination = template::render(destination, &host.variables)?;
                if *rewrite {
                    let rendered = template::render_file(Path::new(&filename), &host.variables)?;
                    // The temp file is removed when `rendered` drops, on
                    // success and on failure alike.
                    scp::upload(conn, host, rendered.path(), &destination).await
                } else {
                    scp::upload(conn, host, Path::new(&filename), &destination).await
                }
            }
            Command::Download { .. } => Err(PushError::Unsupported(
                "download commands are declared in the schema but not implemented".to_string(),
            )),
        }
    }

    /// Short description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            Command::Bash { commands } => format!("bash ({} lines)", commands.len()),
            Command::Upload {
                filename,
                destination,
                ..
            } => format!("upload {filename} -> {destination}"),
            Command::Download { .. } => "download".to_string(),
        }
    }
}

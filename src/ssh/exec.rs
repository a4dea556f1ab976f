//! Shell command execution over an interactive session
//!
//! Each command line runs in its own PTY session. While the command runs,
//! the session's output is fed byte-by-byte to a [`PromptDetector`]; when an
//! elevation prompt is detected, the host's password is written to the
//! session input after a short settle delay. Stderr is drained to the
//! process's own stderr as it arrives so the remote process never blocks on
//! a full buffer.

use std::time::Duration;

use russh::{ChannelMsg, Pty};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::host::{Connection, Host};
use super::prompt::{PromptDetector, SudoPromptDetector};
use crate::error::{PushError, Result};

/// Delay between detecting a prompt and writing the password, letting the
/// remote side finish switching the terminal into no-echo mode
const INJECT_SETTLE: Duration = Duration::from_millis(100);

/// Execute one shell command line on the host.
///
/// The line must already be template-resolved. A non-zero exit status is an
/// error; so is the channel closing before any status arrives.
pub async fn run_shell_command(conn: &Connection, host: &Host, command: &str) -> Result<()> {
    info!(host = %host.addr, "#> {command}");

    let mut channel = conn.open_channel().await?;

    // Interactive PTY with echo off, matching what sudo expects.
    let modes = [
        (Pty::ECHO, 0),
        (Pty::TTY_OP_ISPEED, 14400),
        (Pty::TTY_OP_OSPEED, 14400),
    ];
    channel
        .request_pty(true, "xterm", 80, 40, 0, 0, &modes)
        .await
        .map_err(|e| PushError::connection(format!("failed to request PTY: {e}")))?;

    channel
        .exec(true, command)
        .await
        .map_err(|e| PushError::connection(format!("failed to exec command: {e}")))?;

    let mut detector = SudoPromptDetector::new();
    let mut stderr = tokio::io::stderr();
    let mut exit_status: Option<u32> = None;

    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { data } => {
                for &byte in data.iter() {
                    if detector.feed(byte) {
                        debug!(host = %host.addr, "elevation prompt detected, injecting password");
                        tokio::time::sleep(INJECT_SETTLE).await;
                        channel
                            .data(format!("{}\n", host.password).as_bytes())
                            .await
                            .map_err(|e| {
                                PushError::connection(format!("failed to inject password: {e}"))
                            })?;
                    }
                }
            }
            ChannelMsg::ExtendedData { data, ext } if ext == 1 => {
                // Drain stderr immediately; close errors here are not ours.
                let _ = stderr.write_all(&data).await;
                let _ = stderr.flush().await;
            }
            ChannelMsg::ExitStatus { exit_status: code } => {
                exit_status = Some(code);
            }
            // Keep draining past Eof: the exit status can still arrive
            // after the data stream ends.
            ChannelMsg::Eof => {}
            ChannelMsg::Close => break,
            _ => {}
        }
    }

    let transcript = String::from_utf8_lossy(detector.transcript());
    if !transcript.is_empty() {
        info!(host = %host.addr, "{transcript}");
    }

    finish_status(command, exit_status)
}

/// Map the channel's final state to a result.
///
/// A channel that ends without ever delivering an exit status means the
/// connection tore down mid-command; that aborts the sequence like any
/// other failure.
fn finish_status(command: &str, exit_status: Option<u32>) -> Result<()> {
    match exit_status {
        Some(0) => Ok(()),
        Some(code) => Err(PushError::CommandFailed {
            command: command.to_string(),
            exit_status: code,
        }),
        None => Err(PushError::connection(format!(
            "channel closed before `{command}` reported an exit status"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_status_zero_is_success() {
        finish_status("true", Some(0)).unwrap();
    }

    #[test]
    fn test_finish_status_nonzero_fails() {
        let err = finish_status("false", Some(1)).unwrap_err();
        match err {
            PushError::CommandFailed {
                command,
                exit_status,
            } => {
                assert_eq!(command, "false");
                assert_eq!(exit_status, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_finish_status_missing_is_connection_error() {
        // A mid-command teardown never delivers an exit status; the host's
        // sequence must abort rather than treat the command as succeeded.
        let err = finish_status("apt upgrade", None).unwrap_err();
        match err {
            PushError::Connection(msg) => assert!(msg.contains("apt upgrade")),
            other => panic!("unexpected error: {other}"),
        }
    }
}

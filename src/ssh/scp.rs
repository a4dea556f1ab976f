//! File upload over the SCP sink protocol
//!
//! The remote side runs `scp -t <dest>` in a fresh session; the client then
//! drives the classic handshake: wait for the zero ack byte, send the
//! `C<mode> <size> <name>` header, wait, stream the raw file bytes followed
//! by a zero terminator, wait again. A non-zero ack carries a one-line
//! diagnostic from the remote scp.

use std::path::Path;

use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tracing::info;

use super::host::{Connection, Host};
use crate::error::{PushError, Result};

/// Upload a local file to `destination` on the host.
///
/// Paths must already be template-resolved. The file's real permission bits
/// and size are sent in the header.
pub async fn upload(conn: &Connection, host: &Host, local: &Path, destination: &str) -> Result<()> {
    let contents = tokio::fs::read(local)
        .await
        .map_err(|e| PushError::transfer(format!("failed to read {}: {e}", local.display())))?;
    let metadata = tokio::fs::metadata(local)
        .await
        .map_err(|e| PushError::transfer(format!("failed to stat {}: {e}", local.display())))?;

    let name = local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PushError::transfer(format!("not a file: {}", local.display())))?;

    info!(
        host = %host.addr,
        "sending file: {} ({} bytes) -> {destination}",
        local.display(),
        contents.len()
    );

    let channel = conn.open_channel().await?;
    let sink_command = format!("scp -t {}", shell_quote(destination));
    channel
        .exec(true, sink_command.as_str())
        .await
        .map_err(|e| PushError::transfer(format!("failed to start remote scp: {e}")))?;

    let mut sink = ScpSink::new(channel);
    sink.read_ack().await?;

    let header = format!("C{:04o} {} {}\n", permission_bits(&metadata), contents.len(), name);
    sink.send(header.as_bytes()).await?;
    sink.read_ack().await?;

    sink.send(&contents).await?;
    sink.send(&[0]).await?;
    sink.read_ack().await?;

    sink.finish().await
}

/// Quote a destination path for the remote shell. Template-resolved paths
/// can carry spaces or quotes; unquoted they would split into extra scp
/// arguments and target the wrong path.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\"'\"'"))
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(_metadata: &std::fs::Metadata) -> u32 {
    0o644
}

/// Client end of an `scp -t` session, with buffered ack reads.
///
/// Ack bytes can arrive batched in one channel message, so leftover bytes
/// are kept between reads.
struct ScpSink {
    channel: Channel<Msg>,
    buf: Vec<u8>,
    pos: usize,
}

impl ScpSink {
    fn new(channel: Channel<Msg>) -> Self {
        Self {
            channel,
            buf: Vec::new(),
            pos: 0,
        }
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.channel
            .data(data)
            .await
            .map_err(|e| PushError::transfer(format!("failed to send data: {e}")))
    }

    /// Read one ack byte. Zero is success; 1 (warning) and 2 (fatal) are
    /// followed by a newline-terminated message, both treated as failure.
    async fn read_ack(&mut self) -> Result<()> {
        match self.next_byte().await? {
            0 => Ok(()),
            code @ (1 | 2) => {
                let mut message = Vec::new();
                loop {
                    let b = self.next_byte().await?;
                    if b == b'\n' {
                        break;
                    }
                    message.push(b);
                }
                Err(PushError::transfer(format!(
                    "remote scp error ({code}): {}",
                    String::from_utf8_lossy(&message)
                )))
            }
            other => Err(PushError::transfer(format!(
                "unexpected scp ack byte: {other:#04x}"
            ))),
        }
    }

    async fn next_byte(&mut self) -> Result<u8> {
        loop {
            if self.pos < self.buf.len() {
                let b = self.buf[self.pos];
                self.pos += 1;
                return Ok(b);
            }
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    self.buf.clear();
                    self.buf.extend_from_slice(&data);
                    self.pos = 0;
                }
                Some(ChannelMsg::ExtendedData { .. }) => {}
                Some(ChannelMsg::Close) | Some(ChannelMsg::Eof) | None => {
                    return Err(PushError::transfer(
                        "channel closed during transfer".to_string(),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    async fn finish(self) -> Result<()> {
        self.channel
            .eof()
            .await
            .map_err(|e| PushError::transfer(format!("failed to close transfer: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote_plain_path() {
        assert_eq!(shell_quote("/etc/app.conf"), "'/etc/app.conf'");
    }

    #[test]
    fn test_shell_quote_path_with_spaces() {
        assert_eq!(shell_quote("/srv/app data/a.conf"), "'/srv/app data/a.conf'");
    }

    #[test]
    fn test_shell_quote_embedded_single_quote() {
        assert_eq!(shell_quote("/tmp/it's"), "'/tmp/it'\"'\"'s'");
    }

    #[test]
    fn test_header_format() {
        let header = format!("C{:04o} {} {}\n", 0o644u32, 1234usize, "app.conf");
        assert_eq!(header, "C0644 1234 app.conf\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_bits_masks_to_777() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"x").unwrap();
        std::fs::set_permissions(f.path(), std::fs::Permissions::from_mode(0o750)).unwrap();

        let metadata = std::fs::metadata(f.path()).unwrap();
        assert_eq!(permission_bits(&metadata), 0o750);
    }
}

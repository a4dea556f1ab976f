//! Host identity and connection lifecycle
//!
//! A [`Host`] is the immutable result of resolving a configuration entry
//! against the global defaults: network address, credentials, and the merged
//! variable mapping. The live SSH connection is a separate [`Connection`]
//! value owned exclusively by the execution unit driving that host, so a
//! handle can never be aliased across hosts. It is opened once, used for the
//! host's full command sequence, and closed exactly once afterward.

use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Handle};
use russh::Channel;
use tokio::time::timeout;
use tracing::{debug, info};

use super::handler::SshHandler;
use crate::error::{PushError, Result};

/// Connection timeout in seconds
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// A remote machine with resolved credentials and variables
#[derive(Debug, Clone)]
pub struct Host {
    /// Network address as `address:port`
    pub addr: String,

    /// Username for password authentication
    pub username: String,

    /// Password, also injected on detected elevation prompts
    pub password: String,

    /// Merged variable mapping (host entries over global entries)
    pub variables: std::collections::HashMap<String, String>,
}

/// An authenticated SSH connection to one host
pub struct Connection {
    handle: Handle<SshHandler>,
}

impl Connection {
    /// Connect and authenticate with the host's password.
    ///
    /// Failure here aborts the entire current Config: no host in the batch
    /// runs if any host cannot be reached.
    pub async fn open(host: &Host) -> Result<Self> {
        info!(host = %host.addr, user = %host.username, "connecting");

        let config = Arc::new(client::Config::default());
        let connect_timeout = Duration::from_secs(CONNECT_TIMEOUT_SECS);

        let connect_result = timeout(
            connect_timeout,
            client::connect(config, host.addr.as_str(), SshHandler::new()),
        )
        .await;

        let mut handle = match connect_result {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                return Err(PushError::connection(format!("{}: {e}", host.addr)));
            }
            Err(_) => {
                return Err(PushError::connection(format!(
                    "{}: timeout after {CONNECT_TIMEOUT_SECS}s",
                    host.addr
                )));
            }
        };

        let auth_result = handle
            .authenticate_password(&host.username, &host.password)
            .await
            .map_err(|e| PushError::auth(format!("{}: {e}", host.addr)))?;

        if !auth_result.success() {
            return Err(PushError::auth(format!(
                "{}: password rejected for user '{}'",
                host.addr, host.username
            )));
        }

        debug!(host = %host.addr, "authenticated");
        Ok(Self { handle })
    }

    /// Open a new session channel on this connection
    pub async fn open_channel(&self) -> Result<Channel<client::Msg>> {
        self.handle
            .channel_open_session()
            .await
            .map_err(|e| PushError::connection(format!("failed to open channel: {e}")))
    }

    /// Close the connection. Consumes the handle so it cannot be reused.
    pub async fn close(self) -> Result<()> {
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
            .map_err(|e| PushError::connection(format!("disconnect failed: {e}")))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

//! FTP client plumbing for the `ftpscm` tools.
//!
//! # Overview
//!
//! [`connect`] opens a control connection, logs in and negotiates the transfer mode
//! (UTF-8 file names when the server agrees, binary `TYPE I`, passive data connections).
//! The resulting [`Session`] changes directories and retrieves files one at a time.
//!
//! # Modules
//!
//! - [`protocol`]: commands, replies and `PASV` address parsing
//! - [`streams`]: line-framed control channel over any `AsyncRead + AsyncWrite`
//! - [`session`]: authenticated session, `CWD` / `RETR` / `QUIT`
//! - [`error`]: [`ConnectionError`]
//!
//! # Deadlines
//!
//! Every network step is bounded by a [`ConnectConfig`] deadline: the TCP connect (control and
//! data), each command/reply exchange, and each whole file transfer. Expiry yields
//! [`ConnectionError::Timeout`].

pub mod error;
pub mod protocol;
pub mod session;
pub mod streams;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

pub use error::ConnectionError;
pub use session::{Session, TransferMode};

use tracing::instrument;

/// Deadlines applied to network operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectConfig {
    /// TCP connect of the control and data connections.
    pub connect_timeout: std::time::Duration,
    /// A command and its reply.
    pub command_timeout: std::time::Duration,
    /// One complete file transfer.
    pub transfer_timeout: std::time::Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            connect_timeout: std::time::Duration::from_secs(30),
            command_timeout: std::time::Duration::from_secs(60),
            transfer_timeout: std::time::Duration::from_secs(600),
        }
    }
}

pub(crate) async fn deadline<T, F>(
    operation: &str,
    timeout: std::time::Duration,
    future: F,
) -> Result<T, ConnectionError>
where
    F: std::future::Future<Output = Result<T, ConnectionError>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ConnectionError::Timeout {
            operation: operation.to_string(),
            timeout,
        }),
    }
}

/// Parses a port the way profiles store it: a decimal integer that must also fit a TCP port.
pub fn parse_port(port: &str) -> Result<u16, ConnectionError> {
    port.parse::<i32>()
        .ok()
        .and_then(|value| u16::try_from(value).ok())
        .filter(|value| *value != 0)
        .ok_or_else(|| ConnectionError::InvalidPort(port.to_string()))
}

/// Opens an authenticated session to `host:port`.
///
/// An empty `username` logs in as `anonymous`. If the handshake fails the socket is closed
/// before the error is returned.
#[instrument(skip(secret, config))]
pub async fn connect(
    host: &str,
    port: &str,
    username: &str,
    secret: &str,
    config: &ConnectConfig,
) -> Result<Session, ConnectionError> {
    let port = parse_port(port)?;
    let address = format!("{host}:{port}");
    let stream = deadline("connect", config.connect_timeout, async {
        tokio::net::TcpStream::connect((host, port))
            .await
            .map_err(|source| ConnectionError::Network {
                address: address.clone(),
                source,
            })
    })
    .await?;
    let peer = stream
        .peer_addr()
        .map_err(|source| ConnectionError::Network {
            address: address.clone(),
            source,
        })?;
    let mut session = Session::new(streams::ControlConnection::new(stream), peer, *config);
    if let Err(error) = session.handshake(username, secret).await {
        tracing::debug!("handshake with {} failed: {:#}", address, error);
        session.disconnect().await;
        return Err(error);
    }
    tracing::debug!(
        "connected to {} ({:?})",
        address,
        session.transfer_mode()
    );
    Ok(session)
}

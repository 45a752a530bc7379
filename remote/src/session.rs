use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::instrument;

use crate::error::ConnectionError;
use crate::protocol::{self, Command, Reply, codes};
use crate::streams::ControlConnection;
use crate::{ConnectConfig, deadline};

/// Transfer flags negotiated during the handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferMode {
    /// `TYPE I` accepted.
    pub binary: bool,
    /// Data transfers go through `PASV`.
    pub passive: bool,
    /// `OPTS UTF8 ON` accepted; a server that refuses it still gets a session.
    pub utf8: bool,
}

/// An authenticated FTP session.
///
/// Created by [`crate::connect`]. Call [`Session::close`] when done; dropping the session
/// closes the socket without saying goodbye.
#[derive(Debug)]
pub struct Session {
    control: Option<ControlConnection>,
    peer: std::net::SocketAddr,
    config: ConnectConfig,
    mode: TransferMode,
    last_reply: Option<Reply>,
}

impl Session {
    pub(crate) fn new(
        control: ControlConnection,
        peer: std::net::SocketAddr,
        config: ConnectConfig,
    ) -> Self {
        Self {
            control: Some(control),
            peer,
            config,
            mode: TransferMode::default(),
            last_reply: None,
        }
    }

    #[must_use]
    pub fn peer_addr(&self) -> std::net::SocketAddr {
        self.peer
    }

    #[must_use]
    pub fn transfer_mode(&self) -> TransferMode {
        self.mode
    }

    #[must_use]
    pub fn last_reply(&self) -> Option<&Reply> {
        self.last_reply.as_ref()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.control.is_none()
    }

    fn control(&mut self) -> Result<&mut ControlConnection, ConnectionError> {
        self.control.as_mut().ok_or(ConnectionError::Closed)
    }

    async fn read_reply(&mut self, operation: &str) -> Result<Reply, ConnectionError> {
        let timeout = self.config.command_timeout;
        let control = self.control()?;
        let reply = deadline(operation, timeout, control.read_reply()).await?;
        self.last_reply = Some(reply.clone());
        Ok(reply)
    }

    async fn command(&mut self, command: &Command<'_>) -> Result<Reply, ConnectionError> {
        tracing::debug!("-> {}", command);
        let timeout = self.config.command_timeout;
        let operation = command.to_string();
        let control = self.control()?;
        deadline(&operation, timeout, control.send(command)).await?;
        self.read_reply(&operation).await
    }

    /// Greeting, login and transfer-mode negotiation.
    pub(crate) async fn handshake(
        &mut self,
        username: &str,
        secret: &str,
    ) -> Result<(), ConnectionError> {
        let mut greeting = self.read_reply("greeting").await?;
        while greeting.code == codes::SERVICE_READY_IN_MINUTES {
            greeting = self.read_reply("greeting").await?;
        }
        if !greeting.is_positive_completion() {
            return Err(ConnectionError::Rejected {
                command: "connect".to_string(),
                reply: greeting,
            });
        }
        self.login(username, secret).await?;
        let utf8 = self.command(&Command::OptsUtf8On).await?;
        self.mode.utf8 = utf8.is_positive_completion();
        if !self.mode.utf8 {
            tracing::debug!("server declined UTF-8: {}", utf8);
        }
        let binary = self.command(&Command::TypeBinary).await?;
        self.mode.binary = binary.is_positive_completion();
        self.mode.passive = true;
        match &self.last_reply {
            Some(reply) if reply.is_positive_completion() => Ok(()),
            Some(reply) => Err(ConnectionError::Authentication {
                reply: reply.clone(),
            }),
            None => Err(ConnectionError::Protocol("no reply to session setup".to_string())),
        }
    }

    async fn login(&mut self, username: &str, secret: &str) -> Result<(), ConnectionError> {
        let username = if username.is_empty() {
            "anonymous"
        } else {
            username
        };
        let mut reply = self.command(&Command::User(username)).await?;
        if reply.is_positive_intermediate() {
            reply = self.command(&Command::Pass(secret)).await?;
        }
        if reply.is_positive_completion() {
            Ok(())
        } else {
            Err(ConnectionError::Authentication { reply })
        }
    }

    /// Changes the remote working directory. Any reply other than 2xx is an error.
    #[instrument(skip(self))]
    pub async fn cwd(&mut self, path: &str) -> Result<Reply, ConnectionError> {
        let command = Command::Cwd(path);
        let reply = self.command(&command).await?;
        if reply.is_positive_completion() {
            Ok(reply)
        } else {
            Err(ConnectionError::Rejected {
                command: command.to_string(),
                reply,
            })
        }
    }

    pub async fn noop(&mut self) -> Result<Reply, ConnectionError> {
        self.command(&Command::Noop).await
    }

    /// Downloads `name` from the current remote directory into `writer` through a passive
    /// data connection. Returns the number of bytes written.
    ///
    /// Bytes already written stay in `writer` when the transfer fails.
    #[instrument(skip(self, writer))]
    pub async fn retrieve<W: AsyncWrite + Unpin>(
        &mut self,
        name: &str,
        writer: &mut W,
    ) -> Result<u64, ConnectionError> {
        let mut data = self.open_data_connection().await?;
        let command = Command::Retr(name);
        let reply = self.command(&command).await?;
        if !reply.is_positive_preliminary() {
            return Err(ConnectionError::Rejected {
                command: command.to_string(),
                reply,
            });
        }
        let operation = format!("transfer of {name}");
        let copied = deadline(&operation, self.config.transfer_timeout, async {
            let copied = tokio::io::copy(&mut data, writer)
                .await
                .map_err(|error| ConnectionError::io(operation.as_str(), error))?;
            writer
                .flush()
                .await
                .map_err(|error| ConnectionError::io(operation.as_str(), error))?;
            Ok(copied)
        })
        .await?;
        drop(data);
        let done = self.read_reply(&command.to_string()).await?;
        if !done.is_positive_completion() {
            return Err(ConnectionError::Rejected {
                command: command.to_string(),
                reply: done,
            });
        }
        tracing::debug!("retrieved {} ({} bytes)", name, copied);
        Ok(copied)
    }

    async fn open_data_connection(&mut self) -> Result<TcpStream, ConnectionError> {
        let reply = self.command(&Command::Pasv).await?;
        if reply.code != codes::ENTERING_PASSIVE_MODE {
            return Err(ConnectionError::Rejected {
                command: Command::Pasv.to_string(),
                reply,
            });
        }
        let advertised = protocol::parse_pasv(&reply.text)
            .map_err(|error| ConnectionError::Protocol(error.to_string()))?;
        let address = self.data_address(advertised);
        tracing::trace!("data connection to {}", address);
        deadline(
            "data connection",
            self.config.connect_timeout,
            async move {
                TcpStream::connect(address)
                    .await
                    .map_err(|source| ConnectionError::Network {
                        address: address.to_string(),
                        source,
                    })
            },
        )
        .await
    }

    /// Servers behind NAT often advertise 0.0.0.0; fall back to the control peer then.
    fn data_address(&self, advertised: std::net::SocketAddrV4) -> std::net::SocketAddr {
        if advertised.ip().is_unspecified() {
            std::net::SocketAddr::new(self.peer.ip(), advertised.port())
        } else {
            std::net::SocketAddr::V4(advertised)
        }
    }

    /// Sends `QUIT` and shuts the socket down. Errors are logged and otherwise ignored;
    /// closing an already closed session does nothing.
    pub async fn close(&mut self) {
        if self.control.is_none() {
            return;
        }
        match self.command(&Command::Quit).await {
            Ok(reply) => tracing::debug!("quit: {}", reply),
            Err(error) => tracing::debug!("quit failed: {:#}", error),
        }
        self.disconnect().await;
    }

    /// Shuts the socket down without `QUIT`.
    pub async fn disconnect(&mut self) {
        let Some(mut control) = self.control.take() else {
            return;
        };
        if let Err(error) = control.shutdown().await {
            tracing::debug!(
                "shutdown of control connection to {} failed: {:#}",
                self.peer,
                error
            );
        }
    }
}

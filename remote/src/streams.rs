use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::instrument;

use crate::error::ConnectionError;
use crate::protocol::{self, Command, Reply};

/// Longest reply line accepted from a server.
pub const MAX_REPLY_LINE: usize = 8 * 1024;

/// Line-framed FTP control channel.
///
/// Generic over the underlying stream type - works with TCP or any AsyncRead + AsyncWrite.
/// Reply lines are framed as raw bytes; their text is decoded lossily.
#[derive(Debug)]
pub struct ControlConnection<S = TcpStream> {
    framed: tokio_util::codec::Framed<S, tokio_util::codec::AnyDelimiterCodec>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> ControlConnection<S> {
    pub fn new(stream: S) -> Self {
        let framed = tokio_util::codec::Framed::new(
            stream,
            tokio_util::codec::AnyDelimiterCodec::new_with_max_length(
                b"\n".to_vec(),
                b"\r\n".to_vec(),
                MAX_REPLY_LINE,
            ),
        );
        Self { framed }
    }

    #[instrument(level = "trace", skip(self, command), fields(command = %command))]
    pub async fn send(&mut self, command: &Command<'_>) -> Result<(), ConnectionError> {
        let line = command.to_line();
        if line.contains(['\r', '\n', '\0']) {
            return Err(ConnectionError::Protocol(format!(
                "refusing to send '{}': line breaks would split the command",
                line.escape_default()
            )));
        }
        self.framed.send(line).await?;
        Ok(())
    }

    /// Reads one complete (possibly multi-line) reply.
    pub async fn read_reply(&mut self) -> Result<Reply, ConnectionError> {
        let first = self.next_line().await?;
        let Some(head) = protocol::parse_reply_line(&first) else {
            return Err(ConnectionError::Protocol(format!(
                "expected a reply, got '{first}'"
            )));
        };
        let code = head.code;
        let mut text = head.text.to_string();
        if !head.last {
            loop {
                let line = self.next_line().await?;
                match protocol::parse_reply_line(&line) {
                    Some(tail) if tail.code == code && tail.last => {
                        text.push('\n');
                        text.push_str(tail.text);
                        break;
                    }
                    _ => {
                        text.push('\n');
                        text.push_str(line.trim_start());
                    }
                }
            }
        }
        let reply = Reply { code, text };
        tracing::trace!("<- {}", reply);
        Ok(reply)
    }

    async fn next_line(&mut self) -> Result<String, ConnectionError> {
        let Some(line) = self.framed.next().await else {
            return Err(ConnectionError::Disconnected);
        };
        let line = line?;
        let line = line.strip_suffix(b"\r").unwrap_or(&line[..]);
        Ok(String::from_utf8_lossy(line).into_owned())
    }

    pub async fn shutdown(&mut self) -> Result<(), ConnectionError> {
        tokio::io::AsyncWriteExt::shutdown(self.framed.get_mut())
            .await
            .map_err(|error| ConnectionError::io("control channel shutdown", error))
    }
}

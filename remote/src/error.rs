use crate::protocol::Reply;

/// Failures of the FTP control or data channel.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("invalid port: '{0}'")]
    InvalidPort(String),

    #[error("failed to connect to {address}")]
    Network {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Login was refused, or the server did not accept the session setup.
    #[error("wrong username or password")]
    Authentication { reply: Reply },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: std::time::Duration,
    },

    /// The server sent something that is not a valid reply to the command.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server rejected '{command}': {reply}")]
    Rejected { command: String, reply: Reply },

    /// A command was issued on a session that has already been closed.
    #[error("session is closed")]
    Closed,

    #[error("server closed the control connection")]
    Disconnected,

    #[error("{operation} failed")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConnectionError {
    pub(crate) fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Last reply the server sent, if the failure carries one.
    #[must_use]
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Self::Authentication { reply } | Self::Rejected { reply, .. } => Some(reply),
            _ => None,
        }
    }
}

impl From<tokio_util::codec::AnyDelimiterCodecError> for ConnectionError {
    fn from(error: tokio_util::codec::AnyDelimiterCodecError) -> Self {
        match error {
            tokio_util::codec::AnyDelimiterCodecError::MaxChunkLengthExceeded => {
                Self::Protocol("reply line too long".to_string())
            }
            tokio_util::codec::AnyDelimiterCodecError::Io(source) => {
                Self::io("control channel", source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_message_does_not_leak_reply() {
        let error = ConnectionError::Authentication {
            reply: Reply::new(530, "Login incorrect."),
        };
        assert_eq!(error.to_string(), "wrong username or password");
        assert_eq!(error.reply().map(|reply| reply.code), Some(530));
    }

    #[test]
    fn rejected_names_the_command() {
        let error = ConnectionError::Rejected {
            command: "CWD /missing".to_string(),
            reply: Reply::new(550, "No such directory."),
        };
        assert_eq!(
            error.to_string(),
            "server rejected 'CWD /missing': 550 No such directory."
        );
    }
}

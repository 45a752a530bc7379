/// Reasons a checkout fails.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid checkout request: {0}")]
    InvalidRequest(String),

    #[error("No available ftpServer: '{0}'")]
    ServerNotFound(String),

    #[error("Can't connect to the ftpServer: {address}")]
    Connection {
        address: String,
        #[source]
        source: remote::ConnectionError,
    },

    #[error("failed preparing workspace {path:?}")]
    Workspace {
        path: std::path::PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed changing remote directory to '{path}'")]
    ChangeDirectory {
        path: String,
        #[source]
        source: remote::ConnectionError,
    },

    #[error("Failed download file: {file}")]
    DownloadFailed {
        file: String,
        #[source]
        source: anyhow::Error,
    },
}

impl SyncError {
    /// The file whose download failed, if that is what went wrong.
    #[must_use]
    pub fn failed_file(&self) -> Option<&str> {
        match self {
            Self::DownloadFailed { file, .. } => Some(file),
            _ => None,
        }
    }
}

use anyhow::Context;
use std::sync::Arc;
use tracing::instrument;

use common::credentials::CredentialResolver;
use common::registry::ServerRegistry;
use common::workspace;
use remote::{ConnectConfig, Session};

use crate::error::SyncError;
use crate::progress::{ProgressSink, TracingSink};
use crate::request::SyncRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub files_downloaded: usize,
    pub bytes_downloaded: u64,
    /// Present when the workspace was cleaned first.
    pub cleaned: Option<workspace::Summary>,
}

impl std::fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "files downloaded: {}\n\
            bytes downloaded: {}\n",
            self.files_downloaded, self.bytes_downloaded
        )?;
        if let Some(cleaned) = &self.cleaned {
            write!(f, "{cleaned}")?;
        }
        Ok(())
    }
}

/// Checks out files from registered FTP servers into local workspaces.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    registry: Arc<ServerRegistry>,
    credentials: CredentialResolver,
    config: ConnectConfig,
    sink: Arc<dyn ProgressSink>,
}

impl Synchronizer {
    pub fn new(registry: Arc<ServerRegistry>, credentials: CredentialResolver) -> Self {
        Self {
            registry,
            credentials,
            config: ConnectConfig::default(),
            sink: Arc::new(TracingSink),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ConnectConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Downloads the requested files from the request's server into its workspace.
    ///
    /// Stops at the first file that cannot be downloaded; files retrieved before it stay in
    /// the workspace. Once connected, the session is closed before returning, whatever the
    /// outcome.
    #[instrument(skip(self, request), fields(server = %request.server_name, workspace = ?request.workspace))]
    pub async fn synchronize(&self, request: &SyncRequest) -> Result<SyncSummary, SyncError> {
        request.validate()?;
        if let Some(changelog) = &request.changelog {
            common::changelog::write_empty(changelog)
                .await
                .map_err(|source| SyncError::Workspace {
                    path: changelog.clone(),
                    source,
                })?;
        }
        self.report_workspace(&request.workspace).await?;
        let Some(profile) = self.registry.find_by_name(&request.server_name) else {
            return Err(SyncError::ServerNotFound(request.server_name.clone()));
        };
        let credentials = self.credentials.resolve_or_anonymous(&profile.credential_id);
        self.sink.line("Start connecting ftp server..");
        let mut session = match remote::connect(
            &profile.host,
            &profile.port,
            &credentials.username,
            &credentials.secret,
            &self.config,
        )
        .await
        {
            Ok(session) => session,
            Err(source) => {
                let address = profile.address();
                self.sink
                    .line(&format!("Can't connect to the ftpServer: {address}"));
                return Err(SyncError::Connection { address, source });
            }
        };
        let result = self.checkout(&mut session, request).await;
        session.close().await;
        if let Ok(summary) = &result {
            tracing::info!(
                "checked out {} files ({} bytes) from {}",
                summary.files_downloaded,
                summary.bytes_downloaded,
                profile.name
            );
        }
        result
    }

    async fn report_workspace(&self, path: &std::path::Path) -> Result<(), SyncError> {
        let entries = workspace::list_entries(path)
            .await
            .map_err(|source| SyncError::Workspace {
                path: path.to_path_buf(),
                source,
            })?;
        self.sink.line("File list of current workspace...");
        for entry in entries {
            self.sink.line(&entry);
        }
        Ok(())
    }

    async fn checkout(
        &self,
        session: &mut Session,
        request: &SyncRequest,
    ) -> Result<SyncSummary, SyncError> {
        let path = &request.workspace;
        let workspace_error = |source: anyhow::Error| SyncError::Workspace {
            path: path.clone(),
            source,
        };
        let mut summary = SyncSummary::default();
        if request.clean_workspace_first {
            self.sink.line("Start cleaning the workspace...");
            summary.cleaned = Some(workspace::clean(path).await.map_err(workspace_error)?);
        }
        workspace::ensure_dir(path).await.map_err(workspace_error)?;
        session
            .cwd(&request.remote_path)
            .await
            .map_err(|source| SyncError::ChangeDirectory {
                path: request.remote_path.clone(),
                source,
            })?;
        for name in request.requested_files() {
            self.sink.line(&format!("Start downloading file: {name}"));
            match download(session, path, name).await {
                Ok(bytes) => {
                    self.sink.line(&format!("Successfully download file: {name}"));
                    summary.files_downloaded += 1;
                    summary.bytes_downloaded += bytes;
                }
                Err(source) => {
                    self.sink.line(&format!("Failed download file: {name}"));
                    return Err(SyncError::DownloadFailed {
                        file: name.to_string(),
                        source,
                    });
                }
            }
        }
        Ok(summary)
    }
}

async fn download(
    session: &mut Session,
    workspace: &std::path::Path,
    name: &str,
) -> anyhow::Result<u64> {
    let path = workspace.join(name);
    let mut file = tokio::fs::File::create(&path)
        .await
        .with_context(|| format!("cannot create {path:?}"))?;
    let bytes = session
        .retrieve(name, &mut file)
        .await
        .with_context(|| format!("failed retrieving {name}"))?;
    Ok(bytes)
}

use crate::error::SyncError;

/// What to check out and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Name of a registered server profile.
    pub server_name: String,
    /// Remote directory the files are retrieved from.
    pub remote_path: String,
    /// File names as configured. They are trimmed before use and blank entries are skipped.
    pub file_names: Vec<String>,
    /// Delete everything in `workspace` before downloading.
    pub clean_workspace_first: bool,
    /// Local directory the files are written to; created when missing.
    pub workspace: std::path::PathBuf,
    /// Where to write the (always empty) changelog.
    pub changelog: Option<std::path::PathBuf>,
}

impl SyncRequest {
    pub fn new(
        server_name: impl Into<String>,
        remote_path: impl Into<String>,
        workspace: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            remote_path: remote_path.into(),
            file_names: vec![],
            clean_workspace_first: false,
            workspace: workspace.into(),
            changelog: None,
        }
    }

    #[must_use]
    pub fn files<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_names = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn clean_workspace_first(mut self, clean: bool) -> Self {
        self.clean_workspace_first = clean;
        self
    }

    #[must_use]
    pub fn changelog(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.changelog = Some(path.into());
        self
    }

    /// File names to download, trimmed, without blank entries, in request order.
    pub fn requested_files(&self) -> impl Iterator<Item = &str> {
        self.file_names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
    }

    /// Rejects requests that cannot be carried out before anything touches the network or disk.
    ///
    /// Every requested file must be a plain name: the local copy is written directly inside
    /// the workspace. Neither the remote path nor a file name may contain CR, LF or NUL, as
    /// both are sent verbatim on the FTP control channel.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.remote_path.trim().is_empty() {
            return Err(SyncError::InvalidRequest(
                "remote path required".to_string(),
            ));
        }
        if has_line_break(&self.remote_path) {
            return Err(SyncError::InvalidRequest(format!(
                "remote path '{}' contains a line break",
                self.remote_path.escape_default()
            )));
        }
        for name in self.requested_files() {
            if has_line_break(name) {
                return Err(SyncError::InvalidRequest(format!(
                    "file name '{}' contains a line break",
                    name.escape_default()
                )));
            }
            if !is_plain_file_name(name) {
                return Err(SyncError::InvalidRequest(format!(
                    "'{name}' is not a plain file name"
                )));
            }
        }
        Ok(())
    }
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n', '\0'])
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = std::path::Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Splits a comma separated list of file names. Entries are kept as written.
#[must_use]
pub fn parse_file_list(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_files_are_trimmed_and_blank_entries_skipped() {
        let request = SyncRequest::new("ftp", "/pub", "/tmp/ws").files(["a.txt", " b.txt ", "", "  "]);
        assert_eq!(
            request.requested_files().collect::<Vec<_>>(),
            vec!["a.txt", "b.txt"]
        );
    }

    #[test]
    fn file_list_splits_on_commas() {
        assert_eq!(parse_file_list("a.txt, b.txt,,c"), vec!["a.txt", " b.txt", "", "c"]);
        assert_eq!(parse_file_list(""), vec![""]);
    }

    #[test]
    fn validate_rejects_paths_and_blank_remote_path() {
        let base = SyncRequest::new("ftp", "/pub", "/tmp/ws");
        assert!(base.clone().files(["a.txt", " .hidden "]).validate().is_ok());
        for bad in ["../a.txt", "dir/a.txt", "/etc/passwd", "..", ".", "a\\b"] {
            assert!(
                matches!(
                    base.clone().files([bad]).validate(),
                    Err(SyncError::InvalidRequest(_))
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(matches!(
            SyncRequest::new("ftp", " ", "/tmp/ws").validate(),
            Err(SyncError::InvalidRequest(_))
        ));
    }

    #[test]
    fn validate_rejects_line_breaks() {
        for remote_path in ["/pub\r\nNOOP", "/pub\nNOOP", "/pub\0"] {
            assert!(matches!(
                SyncRequest::new("ftp", remote_path, "/tmp/ws").files(["a.txt"]).validate(),
                Err(SyncError::InvalidRequest(_))
            ));
        }
        let base = SyncRequest::new("ftp", "/pub", "/tmp/ws");
        for name in ["a.txt\r\nDELE a.txt", "a\nb", "a\rb", "a\0b"] {
            assert!(
                matches!(
                    base.clone().files([name]).validate(),
                    Err(SyncError::InvalidRequest(_))
                ),
                "{name:?} should be rejected"
            );
        }
        // surrounding line breaks are trimmed away like any other whitespace
        assert!(base.files(["a.txt\r\n"]).validate().is_ok());
    }
}

use anyhow::{Context, Result};
use tracing::instrument;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub files_removed: usize,
    pub symlinks_removed: usize,
    pub directories_removed: usize,
}

impl Summary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.files_removed + self.symlinks_removed + self.directories_removed
    }
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            files_removed: self.files_removed + other.files_removed,
            symlinks_removed: self.symlinks_removed + other.symlinks_removed,
            directories_removed: self.directories_removed + other.directories_removed,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "files removed: {}\n\
            symlinks removed: {}\n\
            directories removed: {}\n",
            self.files_removed, self.symlinks_removed, self.directories_removed
        )
    }
}

/// Creates the workspace directory (and its parents) if needed.
pub async fn ensure_dir(path: &std::path::Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("failed creating workspace directory {path:?}"))
}

/// Names of the entries directly inside `path`, sorted. A missing directory has no entries.
pub async fn list_entries(path: &std::path::Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(error) => {
            return Err(error)
                .with_context(|| format!("cannot open directory {path:?} for reading"));
        }
    };
    let mut names = vec![];
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed traversing directory {path:?}"))?
    {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Removes everything inside `path` but keeps the directory itself.
///
/// Symlinks are removed, never followed. A missing directory is treated as already clean.
#[instrument]
pub async fn clean(path: &std::path::Path) -> Result<Summary> {
    let mut entries = match tokio::fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("clean: {:?} does not exist, nothing to do", path);
            return Ok(Summary::default());
        }
        Err(error) => {
            return Err(error)
                .with_context(|| format!("cannot open directory {path:?} for reading"));
        }
    };
    let mut summary = Summary::default();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed traversing directory {path:?}"))?
    {
        summary = summary + remove_entry(&entry.path()).await?;
    }
    tracing::debug!("clean: {:?} succeeded, removed {} entries", path, summary.total());
    Ok(summary)
}

async fn remove_entry(path: &std::path::Path) -> Result<Summary> {
    tracing::debug!("remove: {:?}", path);
    let metadata = tokio::fs::symlink_metadata(path)
        .await
        .with_context(|| format!("failed reading metadata from {path:?}"))?;
    let file_type = metadata.file_type();
    if file_type.is_dir() {
        tokio::fs::remove_dir_all(path)
            .await
            .with_context(|| format!("failed removing directory {path:?}"))?;
        return Ok(Summary {
            directories_removed: 1,
            ..Default::default()
        });
    }
    tokio::fs::remove_file(path)
        .await
        .with_context(|| format!("failed removing {path:?}"))?;
    if file_type.is_symlink() {
        Ok(Summary {
            symlinks_removed: 1,
            ..Default::default()
        })
    } else {
        Ok(Summary {
            files_removed: 1,
            ..Default::default()
        })
    }
}

//! Changelog placeholder written on every checkout. FTP has no history to report.

use anyhow::Context;

pub const EMPTY_CHANGELOG: &str = "<log/>\n";

pub async fn write_empty(path: &std::path::Path) -> anyhow::Result<()> {
    tokio::fs::write(path, EMPTY_CHANGELOG)
        .await
        .with_context(|| format!("failed writing changelog {path:?}"))?;
    tracing::debug!("wrote empty changelog to {:?}", path);
    Ok(())
}

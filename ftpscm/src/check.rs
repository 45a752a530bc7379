use anyhow::Context;
use tracing::instrument;

use common::credentials::CredentialResolver;
use common::validate;

pub const CONNECTION_SUCCESS: &str = "Connection success";

/// Validates `host` and `port`, logs in and logs out again.
///
/// A blank or unknown `credential_id` logs in anonymously.
#[instrument(skip(resolver, config))]
pub async fn test_connection(
    host: &str,
    port: &str,
    credential_id: &str,
    resolver: &CredentialResolver,
    config: &remote::ConnectConfig,
) -> anyhow::Result<String> {
    validate::validate_host(host)?;
    validate::validate_port(port)?;
    let credentials = resolver.resolve_or_anonymous(credential_id);
    let mut session = remote::connect(
        host,
        port,
        &credentials.username,
        &credentials.secret,
        config,
    )
    .await
    .with_context(|| format!("Can't connect to the ftpServer: {host}:{port}"))?;
    session.close().await;
    Ok(CONNECTION_SUCCESS.to_string())
}

//! Credential lookup by opaque identifier.
//!
//! Stores are system-wide: there is no per-job scoping. Only username/password
//! records are ever returned; other kinds of secrets are invisible to the resolver.

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Username and secret used for the FTP login.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Empty username and secret.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty() && self.secret.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialKind {
    #[default]
    UsernamePassword,
    SecretText,
    SshPrivateKey,
}

/// One entry of a credentials file.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CredentialRecord {
    pub id: String,
    #[serde(default)]
    pub kind: CredentialKind,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl CredentialRecord {
    pub fn username_password(
        id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: CredentialKind::UsernamePassword,
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Backend holding the credentials.
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// Returns the username/password credential with exactly this id.
    fn lookup_by_id(&self, id: &str) -> Option<Credentials>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    records: Vec<CredentialRecord>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct CredentialsFile {
    #[serde(default)]
    credentials: Vec<CredentialRecord>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new(records: Vec<CredentialRecord>) -> Self {
        Self { records }
    }

    /// Loads a JSON file of the form `{ "credentials": [ { "id", "kind", "username", "password" } ] }`.
    pub fn from_json_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading credentials file {path:?}"))?;
        let file: CredentialsFile = serde_json::from_str(&contents)
            .with_context(|| format!("failed parsing credentials file {path:?}"))?;
        tracing::debug!(
            "loaded {} credential records from {:?}",
            file.credentials.len(),
            path
        );
        Ok(Self::new(file.credentials))
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn lookup_by_id(&self, id: &str) -> Option<Credentials> {
        self.records
            .iter()
            .filter(|record| record.kind == CredentialKind::UsernamePassword)
            .find(|record| record.id == id)
            .map(|record| Credentials::new(&record.username, &record.password))
    }
}

/// Resolves the credential id of a server profile.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    store: std::sync::Arc<dyn CredentialStore>,
}

impl CredentialResolver {
    pub fn new(store: std::sync::Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Resolver without any credentials; every lookup degrades to anonymous.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(std::sync::Arc::new(InMemoryCredentialStore::default()))
    }

    /// Returns `None` both for a blank id and for an unknown one.
    pub fn resolve(&self, credential_id: &str) -> Option<Credentials> {
        if credential_id.trim().is_empty() {
            return None;
        }
        self.store.lookup_by_id(credential_id)
    }

    pub fn resolve_or_anonymous(&self, credential_id: &str) -> Credentials {
        match self.resolve(credential_id) {
            Some(credentials) => credentials,
            None => {
                tracing::debug!(
                    "no credentials for id {:?}, using anonymous login",
                    credential_id
                );
                Credentials::anonymous()
            }
        }
    }

    /// True when the id is blank or refers to a known username/password credential.
    pub fn accepts(&self, credential_id: &str) -> bool {
        credential_id.trim().is_empty() || self.store.lookup_by_id(credential_id).is_some()
    }
}

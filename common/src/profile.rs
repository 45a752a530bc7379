//! Named FTP server profiles and their persistence.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::validate;

/// A named FTP server: address plus the id of the credential used to log in.
///
/// Host and port are kept as the strings they were configured with; the port is
/// only parsed when connecting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerProfile {
    pub name: String,
    #[serde(alias = "ip")]
    pub host: String,
    pub port: String,
    #[serde(rename = "credentialsId", default)]
    pub credential_id: String,
}

impl ServerProfile {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: impl Into<String>,
        credential_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: port.into(),
            credential_id: credential_id.into(),
        }
    }

    /// Profiles with a blank name are never stored.
    #[must_use]
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    pub fn validate(&self) -> Result<(), validate::ValidationError> {
        validate::validate_name(&self.name)?;
        validate::validate_host(&self.host)?;
        validate::validate_port(&self.port)?;
        Ok(())
    }

    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for ServerProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.address())?;
        if !self.credential_id.is_empty() {
            write!(f, " (credentials: {})", self.credential_id)?;
        }
        Ok(())
    }
}

/// Durable storage of the server registry.
pub trait ProfileStore: Send + Sync + std::fmt::Debug {
    fn load(&self) -> anyhow::Result<Vec<ServerProfile>>;
    fn save(&self, profiles: &[ServerProfile]) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RegistryFile {
    #[serde(default)]
    servers: Vec<ServerProfile>,
}

/// Stores the registry as `{ "servers": [ ... ] }` in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    path: std::path::PathBuf,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProfileStore for JsonProfileStore {
    /// A missing file is an empty registry.
    fn load(&self) -> anyhow::Result<Vec<ServerProfile>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("registry file {:?} does not exist yet", &self.path);
                return Ok(Vec::new());
            }
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed reading registry file {:?}", &self.path));
            }
        };
        let file: RegistryFile = serde_json::from_str(&contents)
            .with_context(|| format!("failed parsing registry file {:?}", &self.path))?;
        Ok(file.servers)
    }

    /// Writes a sibling temporary file and renames it over the registry file.
    fn save(&self, profiles: &[ServerProfile]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed creating directory {parent:?}"))?;
        }
        let file = RegistryFile {
            servers: profiles.to_vec(),
        };
        let contents = serde_json::to_string_pretty(&file)?;
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = std::path::PathBuf::from(tmp_name);
        std::fs::write(&tmp_path, contents)
            .with_context(|| format!("failed writing {tmp_path:?}"))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed replacing registry file {:?}", &self.path))?;
        tracing::debug!("saved {} profiles to {:?}", profiles.len(), &self.path);
        Ok(())
    }
}

/// Keeps the saved profiles in memory; each save replaces the previous contents.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: std::sync::Mutex<Vec<ServerProfile>>,
    saves: std::sync::atomic::AtomicUsize,
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new(profiles: Vec<ServerProfile>) -> Self {
        Self {
            profiles: std::sync::Mutex::new(profiles),
            saves: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn saved(&self) -> Vec<ServerProfile> {
        self.profiles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of `save` calls so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self) -> anyhow::Result<Vec<ServerProfile>> {
        Ok(self.saved())
    }

    fn save(&self, profiles: &[ServerProfile]) -> anyhow::Result<()> {
        *self
            .profiles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = profiles.to_vec();
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

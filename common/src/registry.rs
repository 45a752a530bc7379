//! In-memory registry of named server profiles.
//!
//! The registry contents are an immutable snapshot (`Arc<[ServerProfile]>`). Readers clone
//! the `Arc` and never observe a half-applied update; writers build a new snapshot and swap
//! the reference. Writers are serialized so that persisted state follows swap order.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::credentials::CredentialResolver;
use crate::profile::{ProfileStore, ServerProfile};
use crate::validate::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("credential id '{0}' does not exist")]
    UnknownCredential(String),
    #[error("failed persisting server registry")]
    Persist(#[source] anyhow::Error),
}

#[derive(Debug)]
pub struct ServerRegistry {
    snapshot: RwLock<Arc<[ServerProfile]>>,
    writer: Mutex<()>,
    store: Arc<dyn ProfileStore>,
}

impl ServerRegistry {
    /// Empty registry backed by `store`; nothing is read from it.
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::from(Vec::new())),
            writer: Mutex::new(()),
            store,
        }
    }

    /// Registry populated from `store`.
    pub fn load(store: Arc<dyn ProfileStore>) -> anyhow::Result<Self> {
        let profiles = store.load()?;
        let registry = Self::new(store);
        *registry
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = keep_named(profiles);
        Ok(registry)
    }

    /// Current contents, in registration order.
    pub fn list(&self) -> Arc<[ServerProfile]> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// First profile named exactly `name`.
    pub fn find_by_name(&self, name: &str) -> Option<ServerProfile> {
        self.list()
            .iter()
            .find(|profile| profile.name == name)
            .cloned()
    }

    /// Replaces the whole registry with the named `candidates` and persists the result.
    ///
    /// Blank-named candidates are dropped silently. The new contents are visible to readers
    /// even if persisting fails.
    pub fn replace_all(
        &self,
        candidates: impl IntoIterator<Item = ServerProfile>,
    ) -> Result<(), RegistryError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let profiles = keep_named(candidates);
        tracing::debug!("replacing server registry with {} profiles", profiles.len());
        self.swap(profiles.clone());
        self.store.save(&profiles).map_err(RegistryError::Persist)
    }

    /// Appends one validated profile whose credential id is blank or known to `credentials`.
    pub fn add(
        &self,
        profile: ServerProfile,
        credentials: &CredentialResolver,
    ) -> Result<(), RegistryError> {
        profile.validate()?;
        if !credentials.accepts(&profile.credential_id) {
            return Err(RegistryError::UnknownCredential(profile.credential_id));
        }
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut profiles = self.list().to_vec();
        tracing::info!("adding server profile '{}'", profile.name);
        profiles.push(profile);
        let profiles: Arc<[ServerProfile]> = Arc::from(profiles);
        self.swap(profiles.clone());
        self.store.save(&profiles).map_err(RegistryError::Persist)
    }

    fn swap(&self, profiles: Arc<[ServerProfile]>) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = profiles;
    }
}

fn keep_named(candidates: impl IntoIterator<Item = ServerProfile>) -> Arc<[ServerProfile]> {
    candidates
        .into_iter()
        .filter(ServerProfile::has_name)
        .collect()
}

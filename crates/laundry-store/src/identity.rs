//! Per-installation identity, persisted as a small JSON document

use laundry_api::Identity;
use laundry_util::UserId;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{StoreError, StoreResult};

/// Identity filename within the data directory
pub const IDENTITY_FILENAME: &str = "identity.json";

const USER_ID_KEY: &str = "laundry_user_id";
const USER_NAME_KEY: &str = "laundry_user_name";

/// Source of the stable `{id, name}` pair for this installation
pub trait IdentityProvider: Send + Sync {
    fn get_or_create_identity(&self) -> StoreResult<Identity>;
}

/// Asks the person at the keyboard for a display name
pub trait NamePrompt: Send + Sync {
    /// `None` when no name was given
    fn prompt_name(&self) -> Option<String>;
}

impl<F> NamePrompt for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn prompt_name(&self) -> Option<String> {
        self()
    }
}

/// Identity stored in `<data dir>/identity.json`.
///
/// The name is asked for once per file lifetime; later calls read it back.
pub struct FileIdentityProvider {
    path: PathBuf,
    name_override: Option<String>,
    prompt: Box<dyn NamePrompt>,
}

impl FileIdentityProvider {
    pub fn new(path: impl Into<PathBuf>, prompt: impl NamePrompt + 'static) -> Self {
        Self {
            path: path.into(),
            name_override: None,
            prompt: Box::new(prompt),
        }
    }

    /// Provider for the identity file inside `data_dir`
    pub fn in_data_dir(data_dir: impl AsRef<Path>, prompt: impl NamePrompt + 'static) -> Self {
        Self::new(data_dir.as_ref().join(IDENTITY_FILENAME), prompt)
    }

    /// Use this name on first run instead of prompting
    pub fn with_name_override(mut self, name: Option<String>) -> Self {
        self.name_override = name;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoreResult<Option<Identity>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&contents)?;

        let id = entries.get(USER_ID_KEY).filter(|s| !s.is_empty());
        let name = entries.get(USER_NAME_KEY).map(|s| s.trim()).filter(|s| !s.is_empty());

        match (id, name) {
            (Some(id), Some(name)) => Ok(Some(Identity::new(UserId::new(id.clone()), name))),
            _ => Err(StoreError::InvalidIdentity(format!(
                "{} is missing {} or {}",
                self.path.display(),
                USER_ID_KEY,
                USER_NAME_KEY
            ))),
        }
    }

    fn save(&self, identity: &Identity) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut entries = BTreeMap::new();
        entries.insert(USER_ID_KEY, identity.id.as_str().to_string());
        entries.insert(USER_NAME_KEY, identity.name.clone());

        std::fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }
}

impl IdentityProvider for FileIdentityProvider {
    fn get_or_create_identity(&self) -> StoreResult<Identity> {
        if let Some(identity) = self.load()? {
            debug!(user_id = %identity.id, "Loaded identity");
            return Ok(identity);
        }

        let name = self
            .name_override
            .clone()
            .or_else(|| self.prompt.prompt_name())
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| StoreError::InvalidIdentity("a display name is required".into()))?;

        let identity = Identity::new(UserId::generate(), name);
        self.save(&identity)?;

        info!(user_id = %identity.id, name = %identity.name, "Created identity");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_identity_created_once_and_reused() {
        let dir = tempdir().unwrap();
        let asked = Arc::new(AtomicUsize::new(0));

        let counter = asked.clone();
        let provider = FileIdentityProvider::in_data_dir(dir.path(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Some("Alice".to_string())
        });

        let first = provider.get_or_create_identity().unwrap();
        let second = provider.get_or_create_identity().unwrap();

        assert_eq!(first, second);
        assert_eq!(first.name, "Alice");
        assert_eq!(asked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_identity_file_layout() {
        let dir = tempdir().unwrap();
        let provider =
            FileIdentityProvider::in_data_dir(dir.path(), || Some("  Bob ".to_string()));
        let identity = provider.get_or_create_identity().unwrap();

        let contents = std::fs::read_to_string(dir.path().join(IDENTITY_FILENAME)).unwrap();
        let entries: BTreeMap<String, String> = serde_json::from_str(&contents).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[USER_ID_KEY], identity.id.as_str());
        assert_eq!(entries[USER_NAME_KEY], "Bob");
    }

    #[test]
    fn test_name_override_skips_prompt() {
        let dir = tempdir().unwrap();
        let provider = FileIdentityProvider::in_data_dir(dir.path(), || -> Option<String> {
            panic!("prompted despite override")
        })
        .with_name_override(Some("Carol".into()));

        assert_eq!(provider.get_or_create_identity().unwrap().name, "Carol");
    }

    #[test]
    fn test_empty_name_rejected() {
        let dir = tempdir().unwrap();
        let provider = FileIdentityProvider::in_data_dir(dir.path(), || Some("   ".to_string()));

        assert!(matches!(
            provider.get_or_create_identity(),
            Err(StoreError::InvalidIdentity(_))
        ));
        assert!(!provider.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(IDENTITY_FILENAME);
        std::fs::write(&path, r#"{"laundry_user_name": "Dana"}"#).unwrap();

        let provider = FileIdentityProvider::new(&path, || Some("Dana".to_string()));
        assert!(matches!(
            provider.get_or_create_identity(),
            Err(StoreError::InvalidIdentity(_))
        ));
    }
}

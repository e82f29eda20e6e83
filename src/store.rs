//! Per-user credential storage
//!
//! The service receives a [`UserStore`] at construction. Two backends exist:
//! an in-memory map for tests and ephemeral runs, and a JSON file that is
//! rewritten on every change.

use crate::config::StoreConfig;
use crate::error::{OctowattError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::types::UserCredentials;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Repository of user credentials keyed by user id
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Credentials of `user_id`, if set up
    async fn get(&self, user_id: &str) -> Result<Option<UserCredentials>>;

    /// Create or replace the credentials of `creds.user_id`
    async fn put(&self, creds: UserCredentials) -> Result<()>;
}

/// Build the backend named in the configuration
pub async fn open_store(cfg: &StoreConfig) -> Result<Arc<dyn UserStore>> {
    match cfg.backend.trim().to_lowercase().as_str() {
        "memory" => Ok(Arc::new(InMemoryUserStore::new())),
        "json" => Ok(Arc::new(JsonFileUserStore::open(&cfg.path).await?)),
        other => Err(OctowattError::config(format!(
            "Unknown store backend '{}'",
            other
        ))),
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<BTreeMap<String, UserCredentials>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserCredentials>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn put(&self, creds: UserCredentials) -> Result<()> {
        self.users
            .write()
            .await
            .insert(creds.user_id.clone(), creds);
        Ok(())
    }
}

/// On-disk record; the user id is the map key
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUser {
    api_key: String,
    account_number: String,
}

/// Credentials persisted as a pretty-printed JSON object
pub struct JsonFileUserStore {
    path: PathBuf,
    users: RwLock<BTreeMap<String, StoredUser>>,
    logger: StructuredLogger,
}

impl JsonFileUserStore {
    /// Load the file at `path`, starting empty when it does not exist yet
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let logger = get_logger("store");

        let users = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => {
                let users: BTreeMap<String, StoredUser> = serde_json::from_str(&contents)?;
                logger.info(&format!(
                    "Loaded {} user(s) from {}",
                    users.len(),
                    path.display()
                ));
                users
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                logger.info(&format!(
                    "No user store at {}, starting empty",
                    path.display()
                ));
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            users: RwLock::new(users),
            logger,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, users: &BTreeMap<String, StoredUser>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(users)?;
        // Write then rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        self.logger.debug("Saved user store to disk");
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserStore for JsonFileUserStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserCredentials>> {
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .map(|u| UserCredentials {
                user_id: user_id.to_string(),
                api_key: u.api_key.clone(),
                account_number: u.account_number.clone(),
            }))
    }

    async fn put(&self, creds: UserCredentials) -> Result<()> {
        let mut users = self.users.write().await;
        // Readers only see the new entry once it is on disk
        let mut updated = users.clone();
        updated.insert(
            creds.user_id,
            StoredUser {
                api_key: creds.api_key,
                account_number: creds.account_number,
            },
        );
        self.persist(&updated).await?;
        *users = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(user: &str, account: &str) -> UserCredentials {
        UserCredentials {
            user_id: user.to_string(),
            api_key: "sk_live_abc".to_string(),
            account_number: account.to_string(),
        }
    }

    #[tokio::test]
    async fn memory_store_put_replaces() {
        let store = InMemoryUserStore::new();
        assert!(store.get("u1").await.unwrap().is_none());
        store.put(creds("u1", "A-1")).await.unwrap();
        store.put(creds("u1", "A-2")).await.unwrap();
        assert_eq!(store.get("u1").await.unwrap().unwrap().account_number, "A-2");
    }

    #[tokio::test]
    async fn open_store_rejects_unknown_backend() {
        let cfg = StoreConfig {
            backend: "sqlite".to_string(),
            path: String::new(),
        };
        assert!(open_store(&cfg).await.is_err());
    }

    #[tokio::test]
    async fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("users.json");
        let store = JsonFileUserStore::open(&path).await.unwrap();
        store.put(creds("u1", "A-1")).await.unwrap();

        let reopened = JsonFileUserStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("u1").await.unwrap().unwrap().account_number, "A-1");
    }

    #[tokio::test]
    async fn failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        let store = JsonFileUserStore::open(blocker.join("users.json"))
            .await
            .unwrap();
        // A regular file where the parent directory should be
        std::fs::write(&blocker, "not a directory").unwrap();

        assert!(store.put(creds("u1", "A-1")).await.is_err());
        assert!(store.get("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_replace_keeps_previous_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("data");
        let store = JsonFileUserStore::open(parent.join("users.json"))
            .await
            .unwrap();
        store.put(creds("u1", "A-1")).await.unwrap();

        std::fs::remove_dir_all(&parent).unwrap();
        std::fs::write(&parent, "not a directory").unwrap();

        assert!(store.put(creds("u1", "A-2")).await.is_err());
        assert_eq!(store.get("u1").await.unwrap().unwrap().account_number, "A-1");
    }
}

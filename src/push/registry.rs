use crate::ports::KeyValueStore;
use crate::store::StoreError;

use serde::Deserialize;

use std::collections::BTreeSet;
use std::sync::Arc;

pub(crate) const MIN_ACCOUNT_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid account identifier")]
    InvalidAccount,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("device record is not valid json: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Account identifiers are the only thing standing between a request path and
/// somebody else's device list.
pub fn is_valid_account(account: &str) -> bool {
    account.len() >= MIN_ACCOUNT_LEN
        && account
            .bytes()
            .all(|byte| matches!(byte, b'0'..=b'9' | b'a'..=b'f' | b'_'))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDevices {
    List(BTreeSet<String>),
    Record {
        devices: BTreeSet<String>,
        #[serde(default = "entitled_by_default")]
        entitled: bool,
    },
}

fn entitled_by_default() -> bool {
    true
}

impl StoredDevices {
    /// Records switched off with `"entitled": false` receive nothing.
    fn into_devices(self) -> BTreeSet<String> {
        match self {
            Self::List(devices) => devices,
            Self::Record { devices, entitled } if entitled => devices,
            Self::Record { .. } => BTreeSet::new(),
        }
    }
}

/// Device tokens per account.
///
/// Writes within this process are serialized, so concurrent registrations for
/// one account both land. Processes sharing the same backing store still
/// race read-modify-write and the last writer wins.
#[derive(Clone)]
pub struct DeviceRegistry<S> {
    store: S,
    writes: Arc<tokio::sync::Mutex<()>>,
}

impl<S: KeyValueStore> DeviceRegistry<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            writes: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Adds `token` to the account's set. Returns whether it was new.
    pub async fn register(&self, account: &str, token: &str) -> Result<bool, RegistryError> {
        if !is_valid_account(account) {
            return Err(RegistryError::InvalidAccount);
        }

        let _guard = self.writes.lock().await;
        let mut devices = self.load(account).await?.unwrap_or_default();
        let added = devices.insert(token.to_string());
        self.save(account, &devices).await?;
        Ok(added)
    }

    /// Looks up the devices of a validated account. Invalid identifiers and
    /// unknown accounts both yield `None`.
    pub async fn devices_for(
        &self,
        account: &str,
    ) -> Result<Option<BTreeSet<String>>, RegistryError> {
        if !is_valid_account(account) {
            return Ok(None);
        }
        self.load(account).await
    }

    pub async fn unregister(&self, account: &str, token: &str) -> Result<bool, RegistryError> {
        if !is_valid_account(account) {
            return Ok(false);
        }

        let _guard = self.writes.lock().await;
        let Some(mut devices) = self.load(account).await? else {
            return Ok(false);
        };
        if !devices.remove(token) {
            return Ok(false);
        }
        if devices.is_empty() {
            self.store.delete(account).await?;
        } else {
            self.save(account, &devices).await?;
        }
        Ok(true)
    }

    async fn load(&self, account: &str) -> Result<Option<BTreeSet<String>>, RegistryError> {
        let Some(raw) = self.store.get(account).await? else {
            return Ok(None);
        };
        let stored: StoredDevices = serde_json::from_str(&raw)?;
        Ok(Some(stored.into_devices()))
    }

    async fn save(&self, account: &str, devices: &BTreeSet<String>) -> Result<(), RegistryError> {
        let raw = serde_json::to_string(devices)?;
        self.store.put(account, raw, None).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::{ACCOUNT, TestTime};

    fn registry() -> (DeviceRegistry<MemoryStore<TestTime>>, MemoryStore<TestTime>) {
        let store = MemoryStore::new(TestTime::new());
        (DeviceRegistry::new(store.clone()), store)
    }

    fn set(tokens: &[&str]) -> BTreeSet<String> {
        tokens.iter().map(|token| token.to_string()).collect()
    }

    #[test]
    fn is_valid_account__should_require_pattern_and_length() {
        assert!(is_valid_account(ACCOUNT));
        assert!(is_valid_account(&"_".repeat(32)));
        assert!(is_valid_account(&"a".repeat(40)));
        assert!(!is_valid_account(&"a".repeat(31)));
        assert!(!is_valid_account(&"A".repeat(32)));
        assert!(!is_valid_account(&"g".repeat(32)));
        assert!(!is_valid_account(&format!("{}-", "a".repeat(32))));
        assert!(!is_valid_account("$token"));
        assert!(!is_valid_account(""));
    }

    #[tokio::test]
    async fn register__should_be_idempotent() {
        // Given
        let (registry, _) = registry();

        // When
        let first = registry.register(ACCOUNT, "tok1").await.expect("register");
        let second = registry.register(ACCOUNT, "tok1").await.expect("register");

        // Then
        assert!(first);
        assert!(!second);
        let devices = registry.devices_for(ACCOUNT).await.expect("lookup");
        assert_eq!(devices, Some(set(&["tok1"])));
    }

    #[tokio::test]
    async fn register__should_union_tokens_for_an_account() {
        // Given
        let (registry, store) = registry();

        // When
        registry.register(ACCOUNT, "tok2").await.expect("register");
        registry.register(ACCOUNT, "tok1").await.expect("register");

        // Then
        let devices = registry.devices_for(ACCOUNT).await.expect("lookup");
        assert_eq!(devices, Some(set(&["tok1", "tok2"])));
        let raw = store.get(ACCOUNT).await.expect("get").expect("stored");
        assert_eq!(raw, r#"["tok1","tok2"]"#);
    }

    #[tokio::test]
    async fn register__should_survive_concurrent_writers() {
        // Given
        let (registry, _) = registry();

        // When
        let (first, second) = tokio::join!(
            registry.register(ACCOUNT, "tok1"),
            registry.register(ACCOUNT, "tok2")
        );

        // Then
        first.expect("first");
        second.expect("second");
        let devices = registry.devices_for(ACCOUNT).await.expect("lookup");
        assert_eq!(devices, Some(set(&["tok1", "tok2"])));
    }

    #[tokio::test]
    async fn register__should_reject_invalid_account() {
        // Given
        let (registry, store) = registry();

        // When
        let result = registry.register("$token", "tok1").await;

        // Then
        assert!(matches!(result, Err(RegistryError::InvalidAccount)));
        assert!(store.get("$token").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn devices_for__should_ignore_store_for_invalid_accounts() {
        // Given
        let (registry, store) = registry();
        let short = "abc";
        store
            .put(short, r#"["tok1"]"#.to_string(), None)
            .await
            .expect("seed");

        // When
        let devices = registry.devices_for(short).await.expect("lookup");

        // Then
        assert!(devices.is_none());
    }

    #[tokio::test]
    async fn devices_for__should_return_none_for_unknown_account() {
        // Given
        let (registry, _) = registry();

        // Then
        assert!(registry.devices_for(ACCOUNT).await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn devices_for__should_read_legacy_record() {
        // Given
        let (registry, store) = registry();
        let legacy = r#"{"devices":["tok1","tok2"],"seenAt":1700000000,"entitled":true}"#;
        store
            .put(ACCOUNT, legacy.to_string(), None)
            .await
            .expect("seed");

        // When
        let devices = registry.devices_for(ACCOUNT).await.expect("lookup");

        // Then
        assert_eq!(devices, Some(set(&["tok1", "tok2"])));
    }

    #[tokio::test]
    async fn devices_for__should_skip_unentitled_legacy_record() {
        // Given
        let (registry, store) = registry();
        store
            .put(ACCOUNT, r#"{"devices":["tok1"],"entitled":false}"#.to_string(), None)
            .await
            .expect("seed");

        // When
        let devices = registry.devices_for(ACCOUNT).await.expect("lookup");

        // Then
        assert_eq!(devices, Some(BTreeSet::new()));
    }

    #[tokio::test]
    async fn unregister__should_remove_token_and_drop_empty_sets() {
        // Given
        let (registry, store) = registry();
        registry.register(ACCOUNT, "tok1").await.expect("register");
        registry.register(ACCOUNT, "tok2").await.expect("register");

        // When
        let removed = registry.unregister(ACCOUNT, "tok1").await.expect("unregister");
        let missing = registry.unregister(ACCOUNT, "tok1").await.expect("unregister");
        registry.unregister(ACCOUNT, "tok2").await.expect("unregister");

        // Then
        assert!(removed);
        assert!(!missing);
        assert!(store.get(ACCOUNT).await.expect("get").is_none());
    }
}

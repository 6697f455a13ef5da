use crate::error::storage::StorageError;
use crate::source::{Source, SourceTag};
use crate::storage::KeyValueStore;
use slog::{debug, warn, Logger};
use std::sync::Arc;
use tokio::sync::watch;

pub const DEFAULT_SOURCE_STORAGE_KEY: &str = "canistergeek__key__source";

/// Process-wide record of which provider is selected.
///
/// Cloning yields another handle to the same selection.
#[derive(Clone)]
pub struct SourceStore {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    current: Arc<watch::Sender<Option<SourceTag>>>,
    logger: Logger,
}

impl SourceStore {
    /// Reads the persisted selection once. A storage failure is logged and
    /// treated as "no prior source".
    pub fn load(storage: Arc<dyn KeyValueStore>, key: &str, logger: &Logger) -> Self {
        let initial = match storage.get(key) {
            Ok(value) => value.as_deref().map(SourceTag::from_stored),
            Err(err) => {
                warn!(logger, "Unable to read the stored source: {}", err);
                None
            }
        };
        debug!(logger, "Loaded stored source"; "source" => format!("{:?}", initial));
        let (current, _) = watch::channel(initial);
        Self {
            storage,
            key: key.to_string(),
            current: Arc::new(current),
            logger: logger.clone(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> Option<SourceTag> {
        self.current.borrow().clone()
    }

    pub fn points_at(&self, source: Source) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|tag| tag.is(source))
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SourceTag>> {
        self.current.subscribe()
    }

    /// Persists the selection, then updates the in-memory value.
    ///
    /// The in-memory value changes even if persisting fails; the error is
    /// returned so the caller can report it.
    pub fn set_source(&self, source: Option<Source>) -> Result<(), StorageError> {
        let persisted = self.persist(source);
        self.current.send_if_modified(|current| {
            let next = source.map(SourceTag::Known);
            if *current != next {
                *current = next;
                true
            } else {
                false
            }
        });
        persisted
    }

    /// Selects `source`, logging a persistence failure.
    pub fn claim(&self, source: Source) {
        if let Err(err) = self.set_source(Some(source)) {
            warn!(self.logger, "Failed to persist source {}: {}", source, err);
        }
    }

    /// Clears the selection only if it currently names `source`.
    /// Returns whether it was cleared.
    pub fn release(&self, source: Source) -> bool {
        if !self.points_at(source) {
            return false;
        }
        if let Err(err) = self.persist(None) {
            warn!(self.logger, "Failed to remove persisted source {}: {}", source, err);
        }
        self.current.send_if_modified(|current| {
            if current.as_ref().is_some_and(|tag| tag.is(source)) {
                *current = None;
                true
            } else {
                false
            }
        })
    }

    fn persist(&self, source: Option<Source>) -> Result<(), StorageError> {
        match source {
            Some(source) => self.storage.set(&self.key, source.as_str()),
            None => self.storage.remove(&self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use crate::testing::test_logger;

    fn store_over(storage: &Arc<InMemoryStore>) -> SourceStore {
        SourceStore::load(storage.clone(), DEFAULT_SOURCE_STORAGE_KEY, &test_logger())
    }

    #[test]
    fn empty_storage_means_no_source() {
        let storage = Arc::new(InMemoryStore::new());
        assert_eq!(store_over(&storage).source(), None);
    }

    #[test]
    fn selection_survives_reload() {
        let storage = Arc::new(InMemoryStore::new());
        store_over(&storage)
            .set_source(Some(Source::PasskeyWallet))
            .unwrap();

        let reloaded = store_over(&storage);
        assert_eq!(reloaded.source(), Some(SourceTag::Known(Source::PasskeyWallet)));
    }

    #[test]
    fn clearing_removes_the_persisted_value() {
        let storage = Arc::new(InMemoryStore::new());
        let store = store_over(&storage);
        store.set_source(Some(Source::DeepLinkWallet)).unwrap();
        store.set_source(None).unwrap();

        assert_eq!(storage.get(DEFAULT_SOURCE_STORAGE_KEY).unwrap(), None);
        assert_eq!(store_over(&storage).source(), None);
    }

    #[test]
    fn unrecognized_value_is_surfaced_as_is() {
        let storage = Arc::new(InMemoryStore::with_entry(DEFAULT_SOURCE_STORAGE_KEY, "Stoic"));
        assert_eq!(
            store_over(&storage).source(),
            Some(SourceTag::Unrecognized("Stoic".to_string()))
        );
    }

    #[test]
    fn release_only_clears_own_selection() {
        let storage = Arc::new(InMemoryStore::new());
        let store = store_over(&storage);
        store.claim(Source::ExtensionWallet);

        assert!(!store.release(Source::DelegatedIdentityA));
        assert!(store.points_at(Source::ExtensionWallet));
        assert_eq!(
            storage.get(DEFAULT_SOURCE_STORAGE_KEY).unwrap(),
            Some("ExtensionWallet".to_string())
        );

        assert!(store.release(Source::ExtensionWallet));
        assert_eq!(store.source(), None);
        assert_eq!(storage.get(DEFAULT_SOURCE_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn subscribers_see_changes() {
        let storage = Arc::new(InMemoryStore::new());
        let store = store_over(&storage);
        let mut rx = store.subscribe();
        store.claim(Source::DelegatedIdentityB);
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            *rx.borrow_and_update(),
            Some(SourceTag::Known(Source::DelegatedIdentityB))
        );
    }
}

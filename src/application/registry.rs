//! Load-once cache of model bundles, keyed by artifact location.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::ports::{ModelBundle, ModelLoadError, ModelStore};

type Slot = Arc<OnceLock<Result<Arc<ModelBundle>, ModelLoadError>>>;

/// Cache key for a location: canonical when it exists, otherwise with `.`
/// segments dropped.
fn cache_key(location: &Path) -> PathBuf {
    std::fs::canonicalize(location).unwrap_or_else(|_| {
        location
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    })
}

/// Holds every bundle loaded in this process.
///
/// Concurrent first callers for the same location block on a single load;
/// everyone after that gets the same `Arc` (or the same error).
#[derive(Debug, Default)]
pub struct ModelRegistry {
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store's bundle, or return the cached outcome.
    ///
    /// # Errors
    /// Returns the (cached) `ModelLoadError` of the first attempt.
    pub fn load(&self, store: &dyn ModelStore) -> Result<Arc<ModelBundle>, ModelLoadError> {
        let location = store.location();
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(cache_key(&location)).or_default())
        };

        slot.get_or_init(|| {
            tracing::info!("Loading model bundle from {:?}", location);
            let outcome = store.load().map(Arc::new);
            if let Err(e) = &outcome {
                tracing::error!("Model bundle at {:?} failed to load: {}", location, e);
            }
            outcome
        })
        .clone()
    }

    /// Whether a load has been attempted for `location`.
    #[must_use]
    pub fn is_cached(&self, location: &Path) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(&cache_key(location)).is_some_and(|slot| slot.get().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::adapters::sklearn::{LogisticRegression, StandardScaler};
    use crate::ports::BundleParts;

    struct CountingStore {
        location: PathBuf,
        fail: bool,
        loads: AtomicUsize,
    }

    impl CountingStore {
        fn new(location: &str, fail: bool) -> Self {
            Self {
                location: PathBuf::from(location),
                fail,
                loads: AtomicUsize::new(0),
            }
        }
    }

    impl ModelStore for CountingStore {
        fn location(&self) -> PathBuf {
            self.location.clone()
        }

        fn load(&self) -> Result<ModelBundle, ModelLoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ModelLoadError::MissingArtifact("model.json".to_string()));
            }
            let classifier = LogisticRegression {
                classes: vec![0, 1],
                coefficients: vec![vec![1.0]],
                intercepts: vec![0.0],
            };
            ModelBundle::from_parts(BundleParts::new(
                vec!["IDA".to_string()],
                Box::new(StandardScaler::identity(1)),
                Box::new(classifier),
            ))
        }
    }

    #[test]
    fn test_load_once_returns_same_arc() {
        let registry = ModelRegistry::new();
        let store = CountingStore::new("mem/a", false);

        let first = registry.load(&store).expect("loads");
        let second = registry.load(&store).expect("loads");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
        assert!(registry.is_cached(Path::new("mem/a")));
        assert!(!registry.is_cached(Path::new("mem/b")));
    }

    #[test]
    fn test_equivalent_locations_share_one_load() {
        let registry = ModelRegistry::new();
        let plain = CountingStore::new("mem/same", false);
        let dotted = CountingStore::new("./mem/./same", false);

        let first = registry.load(&plain).expect("loads");
        let second = registry.load(&dotted).expect("loads");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(plain.loads.load(Ordering::SeqCst), 1);
        assert_eq!(dotted.loads.load(Ordering::SeqCst), 0);
        assert!(registry.is_cached(Path::new("./mem/same")));
    }

    #[test]
    fn test_failed_load_is_cached() {
        let registry = ModelRegistry::new();
        let store = CountingStore::new("mem/broken", true);

        let first = registry.load(&store).unwrap_err();
        let second = registry.load(&store).unwrap_err();
        assert_eq!(first, second);
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_callers_load_once() {
        let registry = Arc::new(ModelRegistry::new());
        let store = Arc::new(CountingStore::new("mem/shared", false));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let store = Arc::clone(&store);
                std::thread::spawn(move || registry.load(store.as_ref()).expect("loads"))
            })
            .collect();
        let bundles: Vec<Arc<ModelBundle>> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();

        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
        assert!(bundles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}

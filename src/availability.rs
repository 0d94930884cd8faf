// SPDX-License-Identifier: GPL-3.0-or-later

//! Tool availability driven by collection emptiness.
//!
//! Each collection is either [`CollectionState::Empty`] or
//! [`CollectionState::NonEmpty`]. Tools gated on a collection are enabled
//! exactly while it is non-empty; creation tools carry no gate and stay
//! enabled. [`AvailabilityController::evaluate`] re-reads the real count on
//! every call, so it stays correct when several sessions mutate at once.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::store::{Collection, Store};

/// Emptiness of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionState {
    /// No records.
    Empty,
    /// At least one record.
    NonEmpty,
}

impl CollectionState {
    /// State for a record count.
    #[must_use]
    pub const fn from_count(count: usize) -> Self {
        if count == 0 { Self::Empty } else { Self::NonEmpty }
    }
}

/// Source of collection sizes.
pub trait CollectionProbe: Send + Sync {
    /// Current number of records in `collection`.
    fn collection_size(&self, collection: Collection) -> impl Future<Output = Result<usize>> + Send;
}

impl CollectionProbe for Store {
    fn collection_size(
        &self,
        collection: Collection,
    ) -> impl Future<Output = Result<usize>> + Send {
        self.count(collection)
    }
}

impl<P: CollectionProbe + ?Sized> CollectionProbe for Arc<P> {
    fn collection_size(
        &self,
        collection: Collection,
    ) -> impl Future<Output = Result<usize>> + Send {
        (**self).collection_size(collection)
    }
}

#[derive(Debug, Clone, Copy)]
struct Operation {
    gate: Option<Collection>,
    enabled: bool,
}

/// Named operations and their enabled flags.
///
/// Handlers only read from the registry; flags change through
/// [`AvailabilityController`].
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: RwLock<BTreeMap<&'static str, Operation>>,
    toggles: AtomicUsize,
}

impl OperationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an operation, enabled, optionally gated on a collection.
    pub fn register(&self, name: &'static str, gate: Option<Collection>) {
        self.operations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Operation { gate, enabled: true });
    }

    /// `Some(enabled)` for a known operation, `None` otherwise.
    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|op| op.enabled)
    }

    /// Names of the currently enabled operations, sorted.
    pub fn enabled(&self) -> Vec<&'static str> {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, op)| op.enabled)
            .map(|(name, _)| *name)
            .collect()
    }

    /// Operations gated on `collection`, sorted.
    pub fn dependents(&self, collection: Collection) -> Vec<&'static str> {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, op)| op.gate == Some(collection))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Enables one operation. Returns whether the flag changed.
    pub fn enable(&self, name: &str) -> bool {
        self.set(name, true)
    }

    /// Disables one operation. Returns whether the flag changed.
    pub fn disable(&self, name: &str) -> bool {
        self.set(name, false)
    }

    fn set(&self, name: &str, enabled: bool) -> bool {
        let mut operations = self
            .operations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match operations.get_mut(name) {
            Some(op) if op.enabled != enabled => {
                op.enabled = enabled;
                self.toggles.fetch_add(1, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    /// Sets every operation gated on `collection` under one write lock, so
    /// readers never see the group half-applied. Returns how many flipped.
    fn set_group(&self, collection: Collection, enabled: bool) -> usize {
        let mut operations = self
            .operations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut flipped = 0;
        for op in operations.values_mut() {
            if op.gate == Some(collection) && op.enabled != enabled {
                op.enabled = enabled;
                flipped += 1;
            }
        }
        self.toggles.fetch_add(flipped, Ordering::Relaxed);
        flipped
    }

    /// Individual enable/disable flips so far.
    pub fn toggle_count(&self) -> usize {
        self.toggles.load(Ordering::Relaxed)
    }
}

/// Per-collection EMPTY/NON_EMPTY state machine.
pub struct AvailabilityController<P> {
    probe: P,
    operations: Arc<OperationRegistry>,
    states: Mutex<HashMap<Collection, CollectionState>>,
}

impl<P: CollectionProbe> AvailabilityController<P> {
    /// Reads every collection once and applies the initial flags.
    ///
    /// # Errors
    ///
    /// Returns an error if any count fails.
    pub async fn initialize(probe: P, operations: Arc<OperationRegistry>) -> Result<Self> {
        let mut states = HashMap::new();
        for collection in Collection::ALL {
            let state = CollectionState::from_count(probe.collection_size(collection).await?);
            operations.set_group(collection, state == CollectionState::NonEmpty);
            debug!(collection = %collection, ?state, "Initial availability");
            states.insert(collection, state);
        }
        Ok(Self {
            probe,
            operations,
            states: Mutex::new(states),
        })
    }

    /// Re-reads the size of `collection` and, on an emptiness transition,
    /// flips its dependent operations. Returns whether the state changed.
    ///
    /// # Errors
    ///
    /// Returns the probe's error; the last known state and flags are kept.
    pub async fn evaluate(&self, collection: Collection) -> Result<bool> {
        let mut states = self.states.lock().await;
        let next = CollectionState::from_count(self.probe.collection_size(collection).await?);
        if states.get(&collection) == Some(&next) {
            return Ok(false);
        }

        states.insert(collection, next);
        let flipped = self
            .operations
            .set_group(collection, next == CollectionState::NonEmpty);
        info!(collection = %collection, state = ?next, flipped, "Tool availability changed");
        Ok(true)
    }

    /// Last known state of a collection.
    pub async fn state(&self, collection: Collection) -> Option<CollectionState> {
        self.states.lock().await.get(&collection).copied()
    }

    /// The registry this controller drives.
    pub const fn operations(&self) -> &Arc<OperationRegistry> {
        &self.operations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicBool;

    #[derive(Default)]
    struct FakeProbe {
        counts: StdMutex<HashMap<Collection, usize>>,
        failing: AtomicBool,
    }

    impl FakeProbe {
        fn set(&self, collection: Collection, count: usize) {
            self.counts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(collection, count);
        }
    }

    impl CollectionProbe for FakeProbe {
        async fn collection_size(&self, collection: Collection) -> Result<usize> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::Store(rusqlite::Error::InvalidQuery));
            }
            Ok(self
                .counts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&collection)
                .copied()
                .unwrap_or(0))
        }
    }

    fn registry() -> Arc<OperationRegistry> {
        let ops = OperationRegistry::new();
        ops.register("create_tag", None);
        ops.register("list_tags", Some(Collection::Tags));
        ops.register("get_tag", Some(Collection::Tags));
        ops.register("delete_tag", Some(Collection::Tags));
        ops.register("list_tasks", Some(Collection::Tasks));
        Arc::new(ops)
    }

    async fn controller(
        tags: usize,
    ) -> anyhow::Result<(Arc<FakeProbe>, AvailabilityController<Arc<FakeProbe>>)> {
        let probe = Arc::new(FakeProbe::default());
        probe.set(Collection::Tags, tags);
        probe.set(Collection::Tasks, 3);
        let controller = AvailabilityController::initialize(Arc::clone(&probe), registry()).await?;
        Ok((probe, controller))
    }

    #[tokio::test]
    async fn test_initial_state_from_counts() -> anyhow::Result<()> {
        let (_, controller) = controller(0).await?;
        let ops = controller.operations();
        assert_eq!(
            controller.state(Collection::Tags).await,
            Some(CollectionState::Empty)
        );
        assert_eq!(ops.is_enabled("list_tags"), Some(false));
        assert_eq!(ops.is_enabled("create_tag"), Some(true));
        assert_eq!(ops.is_enabled("list_tasks"), Some(true));
        Ok(())
    }

    #[tokio::test]
    async fn test_emptying_disables_exactly_the_group() -> anyhow::Result<()> {
        let (probe, controller) = controller(1).await?;
        let ops = controller.operations();
        let before = ops.toggle_count();

        probe.set(Collection::Tags, 0);
        assert!(controller.evaluate(Collection::Tags).await?);

        assert_eq!(ops.toggle_count() - before, 3);
        assert_eq!(ops.enabled(), vec!["create_tag", "list_tasks"]);

        probe.set(Collection::Tags, 1);
        assert!(controller.evaluate(Collection::Tags).await?);
        assert_eq!(
            ops.enabled(),
            vec!["create_tag", "delete_tag", "get_tag", "list_tags", "list_tasks"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_redundant_evaluation_is_noop() -> anyhow::Result<()> {
        let (probe, controller) = controller(2).await?;
        let ops = controller.operations();

        probe.set(Collection::Tags, 0);
        assert!(controller.evaluate(Collection::Tags).await?);
        let after_first = ops.toggle_count();
        assert!(!controller.evaluate(Collection::Tags).await?);
        assert_eq!(ops.toggle_count(), after_first);

        // Size changes that keep the collection non-empty are not transitions.
        probe.set(Collection::Tasks, 9);
        assert!(!controller.evaluate(Collection::Tasks).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_probe_failure_keeps_state() -> anyhow::Result<()> {
        let (probe, controller) = controller(1).await?;
        probe.set(Collection::Tags, 0);
        probe.failing.store(true, Ordering::SeqCst);

        assert!(controller.evaluate(Collection::Tags).await.is_err());
        assert_eq!(
            controller.state(Collection::Tags).await,
            Some(CollectionState::NonEmpty)
        );
        assert_eq!(controller.operations().is_enabled("get_tag"), Some(true));
        Ok(())
    }

    #[test]
    fn test_enable_disable_idempotent() {
        let ops = registry();
        assert!(ops.disable("get_tag"));
        assert!(!ops.disable("get_tag"));
        assert!(ops.enable("get_tag"));
        assert!(!ops.enable("get_tag"));
        assert!(!ops.enable("no_such_tool"));
        assert_eq!(ops.toggle_count(), 2);
    }

    #[test]
    fn test_dependents() {
        let ops = registry();
        assert_eq!(
            ops.dependents(Collection::Tags),
            vec!["delete_tag", "get_tag", "list_tags"]
        );
        assert!(ops.dependents(Collection::Programs).is_empty());
    }

    #[tokio::test]
    async fn test_store_probe() -> anyhow::Result<()> {
        let store = Arc::new(Store::open_in_memory()?);
        assert_eq!(store.collection_size(Collection::Tags).await?, 0);
        store.seed().await?;
        assert_eq!(store.collection_size(Collection::Tags).await?, 8);
        Ok(())
    }
}

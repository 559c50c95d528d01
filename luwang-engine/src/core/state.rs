//! Engine state wiring

use std::sync::Arc;

use crate::core::EngineConfig;
use crate::duplicate::DuplicateDetector;
use crate::store::{DataStore, MemoryStore};
use crate::txn::WriteCoordinator;

/// Wired engine: store handle, coordinator and detector
///
/// The UI-facing handler layer holds one of these and calls
/// [`crate::dispatch::dispatch`] (or the typed [`crate::ops`]
/// functions) against it.
pub struct EngineState {
    pub store: Arc<dyn DataStore>,
    pub config: EngineConfig,
    pub coordinator: WriteCoordinator,
    pub detector: DuplicateDetector,
}

impl EngineState {
    pub fn new(store: Arc<dyn DataStore>, config: EngineConfig) -> Self {
        let coordinator = WriteCoordinator::new(store.clone(), config.clone());
        Self {
            store,
            config,
            coordinator,
            detector: DuplicateDetector::new(),
        }
    }

    /// Engine backed by the in-memory reference store
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Swap in a different duplicate-similarity strategy
    pub fn with_detector(mut self, detector: DuplicateDetector) -> Self {
        self.detector = detector;
        self
    }
}

// src/api/state.rs
use std::sync::Arc;

use crate::config::Catalog;
use crate::runner::Runner;
use crate::sandbox::{FiniteWorker, Sandbox};
use crate::storage::KeyValueStore;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub store: Arc<dyn KeyValueStore>,
    pub runner: Runner,
}

impl AppState {
    pub fn new(catalog: Catalog, store: Arc<dyn KeyValueStore>, sandbox: Arc<dyn Sandbox>) -> Self {
        Self::with_worker(catalog, store, FiniteWorker::new(sandbox))
    }

    pub fn with_worker(catalog: Catalog, store: Arc<dyn KeyValueStore>, worker: FiniteWorker) -> Self {
        Self {
            catalog: Arc::new(catalog),
            store,
            runner: Runner::new(worker),
        }
    }
}

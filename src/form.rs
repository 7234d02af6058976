//! Live form record shared by every wizard step.
//!
//! `FormStore` wraps a `FormState` in a watch channel: steps read the latest
//! snapshot, write partial updates, and subscribers are woken on every merge.

use order_types::{FormPatch, FormState};
use tokio::sync::watch;

pub struct FormStore {
    tx: watch::Sender<FormState>,
    revision: u64,
}

impl FormStore {
    pub fn new() -> Self {
        Self::with_state(FormState::default())
    }

    pub fn with_state(state: FormState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx, revision: 0 }
    }

    /// Snapshot of the current form
    pub fn get(&self) -> FormState {
        self.tx.borrow().clone()
    }

    /// Read a value without cloning the whole record
    pub fn read<R>(&self, f: impl FnOnce(&FormState) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Shallow merge, last write wins per key. Always notifies subscribers.
    pub fn merge(&mut self, patch: FormPatch) {
        self.tx.send_modify(|state| state.merge(patch));
        self.revision += 1;
    }

    pub fn reset(&mut self) {
        self.tx.send_replace(FormState::default());
        self.revision += 1;
    }

    /// Receiver that always observes the latest snapshot
    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.tx.subscribe()
    }

    /// Number of writes applied since creation
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl Default for FormStore {
    fn default() -> Self {
        Self::new()
    }
}

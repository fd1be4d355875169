//! In-memory investigation store.
//!
//! Investigations are ephemeral: the store is the plane's only state and
//! is rebuilt empty on restart (workers keep running in the orchestrator,
//! and clients re-attach through the log-replay endpoint). Terminal
//! records are immutable and evicted after a retention window.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use oats_domain::investigation::{Investigation, InvestigationState};

#[derive(Default)]
pub struct InvestigationStore {
    investigations: RwLock<HashMap<String, Investigation>>,
}

impl InvestigationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, investigation: Investigation) {
        self.investigations
            .write()
            .insert(investigation.id.clone(), investigation);
    }

    pub fn get(&self, id: &str) -> Option<Investigation> {
        self.investigations.read().get(id).cloned()
    }

    pub fn count(&self) -> usize {
        self.investigations.read().len()
    }

    /// Update a record in place. Returns false if the id is unknown.
    /// Callers must not use this to leave a terminal state; use
    /// [`Self::transition`] for lifecycle changes.
    pub fn update<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Investigation),
    {
        let mut investigations = self.investigations.write();
        match investigations.get_mut(id) {
            Some(investigation) => {
                f(investigation);
                true
            }
            None => false,
        }
    }

    /// Transition an investigation's lifecycle state. Terminal states are
    /// immutable: a transition from one is a no-op returning false.
    pub fn transition(&self, id: &str, state: InvestigationState) -> bool {
        let mut investigations = self.investigations.write();
        let investigation = match investigations.get_mut(id) {
            Some(investigation) => investigation,
            None => return false,
        };
        if investigation.state.is_terminal() {
            return false;
        }
        if state.is_terminal() {
            investigation.finish(state);
        } else {
            investigation.state = state;
        }
        tracing::info!(id, state = ?state, "investigation transition");
        true
    }

    /// Evict terminal investigations older than the retention window.
    /// Returns how many were removed.
    pub fn evict_terminal(&self, older_than: chrono::Duration) -> usize {
        let cutoff = Utc::now() - older_than;
        let mut investigations = self.investigations.write();
        let before = investigations.len();
        investigations.retain(|_, inv| {
            !inv.state.is_terminal() || inv.terminal_at.map_or(true, |t| t > cutoff)
        });
        before - investigations.len()
    }
}

use std::sync::Arc;

use oats_domain::config::Config;
use oats_orch::Orchestrator;

use crate::runtime::investigations::InvestigationStore;

/// Shared application state. Everything in here is either immutable or
/// internally synchronized; the plane itself holds no durable state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<dyn Orchestrator>,
    pub investigations: Arc<InvestigationStore>,
}

use std::sync::Arc;

use collector_domain::config::Config;
use collector_privacy::PrivacyGuard;
use collector_priority::PriorityProcessor;
use collector_store::Store;
use parking_lot::Mutex;

use crate::runtime::bus::EventBus;
use crate::runtime::observability::Observability;

/// Shared application state passed to all API handlers.
///
/// The priority processor lives behind a [`Mutex`] but is only ever
/// touched from the bus worker task, never concurrently from HTTP
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Store>,
    pub privacy: Arc<PrivacyGuard>,
    pub priority: Arc<Mutex<PriorityProcessor>>,
    pub bus: Arc<EventBus>,
    pub observability: Arc<Observability>,
    /// SHA-256 hash of the configured ingest token, if set.
    /// `None` disables token checking (dev mode).
    pub token_hash: Option<Vec<u8>>,
}

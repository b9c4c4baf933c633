use std::sync::Arc;

use crate::config::Config;
use crate::fsbid::suggestions::PositionCounter;
use crate::fsbid_client::FsbidClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub fsbid: FsbidClient,
    pub config: Config,
    /// Pluggable position counter used by client suggestions.
    pub position_counter: Arc<dyn PositionCounter>,
}

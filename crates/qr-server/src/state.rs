//! Shared application state.

use std::sync::Arc;

use qr_agents::{Depth, Researcher};

/// State handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub researcher: Arc<Researcher>,
    /// Depth used when a request omits one or names an unknown tier.
    pub default_depth: Depth,
}

impl AppState {
    pub fn new(researcher: Researcher, default_depth: Depth) -> Self {
        Self {
            researcher: Arc::new(researcher),
            default_depth,
        }
    }
}

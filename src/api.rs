//! HTTP transport adapter
//!
//! Maps JSON requests onto the conversation manager and outcomes back to JSON.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::ProductionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ProductionManager>,
    /// Default `limit` for the history endpoint
    pub history_window: usize,
}

impl AppState {
    pub fn new(manager: Arc<ProductionManager>, history_window: usize) -> Self {
        Self {
            manager,
            history_window,
        }
    }
}

//! Intellius Chat
//!
//! A single-page chat widget served over Axum + HTMX: the user types a
//! message, it is appended to the transcript, and a scripted echo follows
//! after a fixed delay.
//!
//! # Architecture
//!
//! - **Widget**: document model, transcript and delayed echo scheduling
//! - **Store**: page-lifetime registry of mounted widgets
//! - **Server**: Axum router rendering the page and mirroring appends via HTMX and SSE
//!
//! # Modules
//!
//! - [`widget`]: The chat widget component
//! - [`store`]: Widget registry with idle expiry
//! - [`config`]: Layered configuration
//! - [`server`]: HTTP surface

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod widget;

use crate::config::AppConfig;

use std::sync::Arc;
use store::WidgetStore;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Mounted widgets, one per page load.
    pub widgets: WidgetStore,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

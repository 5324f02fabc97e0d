//! Shared application state passed to all handlers.

use std::sync::Arc;

use masc_domain::clock::SharedClock;
use masc_domain::config::Config;
use masc_room::RoomStore;

use crate::auth::AuthVerifier;
use crate::cancel::CancelMap;
use crate::metrics::Metrics;
use crate::rate_limit::RateLimiter;
use crate::shutdown::DrainTracker;
use crate::tools::ToolRegistry;

/// Shared application state.
///
/// Fields are grouped by concern:
/// - **Core** — config, clock, the Room Store
/// - **Dispatch** — tool registry, cancellation, drain tracking
/// - **Protection** — auth, rate limiting
/// - **Observability** — metrics
#[derive(Clone)]
pub struct AppState {
    // ── Core ──────────────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub clock: SharedClock,
    pub store: Arc<RoomStore>,

    // ── Dispatch ──────────────────────────────────────────────────────
    pub registry: Arc<ToolRegistry>,
    pub cancels: Arc<CancelMap>,
    pub drain: DrainTracker,

    // ── Protection ────────────────────────────────────────────────────
    pub auth: Arc<AuthVerifier>,
    pub limiter: Arc<RateLimiter>,

    // ── Observability ─────────────────────────────────────────────────
    pub metrics: Arc<Metrics>,
    pub started_at: f64,
}

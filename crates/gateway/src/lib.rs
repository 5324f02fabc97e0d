//! The MASC gateway: HTTP transport, JSON-RPC tool dispatch, resumable
//! SSE notifications, the read-only REST surface, and the lifecycle
//! supervisor.

pub mod api;
pub mod auth;
pub mod cancel;
pub mod cli;
pub mod dispatch;
pub mod metrics;
pub mod rate_limit;
pub mod rpc;
pub mod shutdown;
pub mod state;
pub mod supervisor;
pub mod tools;

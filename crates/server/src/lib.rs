//! fitscan server: HTTP surface for streaming garment-measurement search.
//!
//! A client posts two target measurements and gets back a Server-Sent-Events
//! stream of listings whose descriptions match them, as they are found. A
//! second endpoint cancels a running search by id.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//! - `GET /api/metadata` - Version, uptime and running searches
//! - `POST /api/search/stream` - Start a search, answered as `text/event-stream`
//! - `POST /api/search/cancel` - Cancel a search by `searchId`
//!
//! # Configuration
//!
//! `server.{toml,yaml,json}` in the working directory, then
//! `FITSCAN_SERVER__*` environment variables (`.env` is read first). Nested
//! sections use a double underscore, e.g. `FITSCAN_SERVER__SEARCH__DEFAULT_MAX_ITEMS=10`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
pub use telemetry::install_match_metrics;

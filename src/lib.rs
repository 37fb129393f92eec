//! Client-side playback analytics reporter. Observes player and ad lifecycle
//! events, turns them into deduplicated bookmark actions (LOAD, FIRST_PLAY,
//! PLAY, PAUSE, STOP, HIT, FINISH, ERROR) and delivers them best-effort to a
//! remote collection endpoint. Delivery never blocks or alters playback; the
//! only response the host ever sees is the concurrency-restriction domain
//! event on the broadcast bus.

pub mod collector;
pub mod config;
pub mod events;
pub mod heartbeat;
pub mod model;
pub mod reporter;
pub mod session;

pub use collector::{ActionAddOutcome, CollectorClient, CollectorError};
pub use config::ReporterConfig;
pub use events::{MediaSelection, PlayerEvent, PlayerProbe};
pub use model::{OutboundReport, PositionOwner, ReportAction, ReporterEvent};
pub use reporter::Reporter;
pub use session::SessionState;

/// Installs the global tracing subscriber. For host binaries that do not set
/// one up themselves; honors `RUST_LOG`.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

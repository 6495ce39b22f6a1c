// Library surface shared by the terminal front end and the integration tests.
// Everything that decides how a test is scored lives here; main.rs only
// maps keys, draws and drives the tick loop.
pub mod achievements;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod ghost;
pub mod goals;
pub mod heatmap;
pub mod history;
pub mod input;
pub mod metrics;
pub mod race;
pub mod result;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod streak;
pub mod time_series;
pub mod tracker;
pub mod words;

pub use error::{StoreError, SyncError};
pub use result::TestResult;
pub use session::{Session, SessionConfig, TestMode};

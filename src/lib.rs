pub mod config;
pub mod store;
pub mod util;
pub mod web;

pub use config::Config;
pub use store::{AppendOutcome, RecordKind, RecordStore, StoreError, Submission, ValidationError};
pub use web::{build_router, run_server, AppState, ServerConfig, WebError};

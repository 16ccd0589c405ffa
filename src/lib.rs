// Emogo - Library Entry Point
// Mood-tagged clip diary: a durable record store and a single-archive export.

pub mod constants;
pub mod error;
pub mod config;
pub mod db;
pub mod fs;
pub mod assets;
pub mod capture;
pub mod export;

pub use config::{AppConfig, ConfigOverrides};
pub use db::schema::Record;
pub use db::RecordStore;
pub use error::{EmogoError, Result};
pub use export::{ExportOrchestrator, ExportOutcome, ExportSummary};

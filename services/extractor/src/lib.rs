//! Extraction service: one poller per model source turning NetCDF output
//! into CSV extracts on a fixed schedule.

pub mod config;
pub mod locate;
pub mod logging;
pub mod metrics;
pub mod poller;
pub mod schedule;
pub mod supervisor;

pub use config::{ExtractorConfig, LogFormat, SourceSettings};
pub use poller::{run_cycles_at, CycleSummary, JobOutcome, Poller, PollerState};
pub use supervisor::{Service, Supervisor};

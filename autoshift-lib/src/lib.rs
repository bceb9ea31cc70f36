//! Core pipeline for autoshift: record normalization, merging into the
//! persisted set, expiry sweeping, file storage, publishing and settings.

pub mod error;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod publish;
pub mod settings;
pub mod store;
pub mod sweep;

pub use error::{PublishError, StoreError};
pub use merge::{MergeStats, merge};
pub use normalize::{RecordNormalizer, Rejection, clean_code};
pub use pipeline::{
    MarkExpiredSummary, RunEvent, RunOptions, RunSummary, SourceReport, mark_expired, run_once,
};
pub use publish::{GithubClient, GithubRepo, PublishOutcome, RepositoryClient};
pub use settings::{Settings, SettingsOverrides};
pub use sweep::{SweepOptions, SweepReport, SweepStats, parse_target_codes, sweep};

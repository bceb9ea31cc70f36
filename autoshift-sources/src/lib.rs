//! Source adapters: declarative per-site configuration, HTML extraction into
//! raw candidates, and the fetch layer that retrieves pages.

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod hint;

pub use config::{
    Column, ColumnMap, HintStrategy, Layout, Locator, Section, SourceConfig, builtin_sources,
    load_sources_dir, resolve_sources,
};
pub use error::{FetchError, SourceError};
pub use extract::{RawCandidate, extract};
pub use fetch::{Fetcher, HttpFetcher};
pub use hint::expired_hint;

//! Sequence Search
//!
//! Query language and decision-graph builder for fighter state sequences
//! extracted from game replays.
//!
//! This library provides functionality for:
//! - Folding per-frame replay data into per-fighter state sequences
//! - Parsing and compiling a small pattern language over those states
//! - Finding matches, merging and normalizing them
//! - Building weighted transition graphs, islands and "what comes next" trees
//! - Exporting graphs in DOT format
//!
//! ```no_run
//! use sequence_search::config::SearchConfig;
//! use sequence_search::data_source::{ingest, mock};
//! use sequence_search::session::SequenceSearchModel;
//!
//! let mut model = SequenceSearchModel::new(mock::dictionary(), SearchConfig::default());
//! ingest(&mut model, &mock::MockReplaySource::new().replay()).unwrap();
//! let q = model.add_query("nair -> nair -> (utilt | grab)");
//! model.compile_query(q);
//! model.apply_query(q);
//! println!("{} matches", model.results(q).unwrap().matches.len());
//! ```

pub mod cli;
pub mod config;
pub mod data_source;
pub mod error;
pub mod graph;
pub mod labels;
pub mod query;
pub mod session;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize logging with the given log level
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

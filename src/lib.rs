//! logtidy - A streaming log file cleaner
//!
//! This library streams a text log through an ordered chain of regex filters
//! and writes the surviving lines to a new file. `Remove` filters drop the
//! lines they match, `Keep` filters drop the lines they don't, and the first
//! filter in the chain to veto a line decides its fate.
//!
//! # Examples
//!
//! ```no_run
//! use logtidy::{Filter, FilterChain, FilterKind};
//! use std::path::Path;
//!
//! let chain = FilterChain::new(vec![
//!     Filter::new("no-debug", "^DEBUG", FilterKind::Remove).unwrap(),
//! ]);
//! let stats = chain
//!     .clean(Path::new("app.log"), Path::new("app.log.cleaned"), None)
//!     .unwrap();
//! println!("kept {} of {} lines", stats.kept_lines(), stats.total_lines);
//! ```

pub mod cleaner;
pub mod cli;
pub mod config;
pub mod filter;
pub mod output;
pub mod storage;

pub use cleaner::{CleanError, CleanFailure, CleanStats, FilterChain, ProgressSink};
pub use config::{ConfigError, Settings};
pub use filter::{Filter, FilterError, FilterKind};
pub use storage::{FilterStore, StoreError};

pub use cli::{Cli, run_cli};

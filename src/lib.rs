//! refblame: refactoring-aware blame for git repositories.
//!
//! Ordinary blame stops at the first commit that touched a line's text. This
//! crate tracks code elements (classes, methods, attributes, local variables)
//! through renames, moves, extractions and reformatting, and attributes each
//! line to the commit that substantively wrote it.
//!
//! - `git`: repository backend and commit cache
//! - `models`: versions, elements, changes and result types
//! - `structure`: the structural source model the tracker consults
//! - `tracker`: history graph, builder and blame resolver; `Tracker` is the
//!   query API
//! - `routes`: HTTP surface over `Tracker`

pub mod config;
pub mod error;
pub mod git;
pub mod models;
pub mod routes;
pub mod structure;
pub mod tracker;

pub use config::TrackerConfig;
pub use error::{BlameError, MatcherError, RepositoryError};
pub use tracker::{QueryControl, Tracker};

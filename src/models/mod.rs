//! Data model and data transfer objects.
//!
//! - `version`: Version, the immutable commit identity
//! - `element`: CodeElement, ElementKind, ElementId (graph node identity)
//! - `change`: Change, ChangeType carried on history edges
//! - `blame`: BlameResult, BlameResponse, AmbiguityWarning
//! - `history`: HistoryView returned by element history queries

pub mod blame;
pub mod change;
pub mod element;
pub mod history;
pub mod version;

pub use blame::*;
pub use change::*;
pub use element::*;
pub use history::*;
pub use version::*;

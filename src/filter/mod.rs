//! Filters: what a user defines, how it is compiled and matched, and the
//! ordered list that gives each filter its name and priority.
//!
//! # Filter kinds
//!
//! - text: substring containment, case-insensitive unless asked otherwise
//! - regular expression: `is_regex`
//! - logic combination: `is_logic`, `a && b` (all terms) or `a || b` (any term)
//! - marker: matches lines carrying a marker 1-9, independent of text
//!
//! An excluding filter marks its matches as excluded instead of highlighting them.

pub mod definition;
pub mod file;
pub mod list;
pub mod matcher;
pub mod state;

pub use definition::{FilterDefinition, FilterKind, FilterRecord, MARKER_RANGE, Rgb};
pub use file::{FILTER_FILE_EXTENSION, from_json, load_filters, save_filters, to_json};
pub use list::{FilterEvent, FilterList, filter_name};
pub use matcher::CompiledFilter;
pub use state::{FilterId, FilterState};

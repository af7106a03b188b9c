pub mod case;
pub mod cycle;
pub mod instruction;
pub mod note;
pub mod questionnaire;
pub mod rubric;
pub mod transcript;

mod error;

pub use error::{Error, Result};

/// Stands in for values that differ on every run (uuids, command identifiers) so recorded audit
/// documents can be compared as fixtures.
pub const IGNORED_KEY_VALUE: &str = ">?<";

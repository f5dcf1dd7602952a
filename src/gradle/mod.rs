//! Gradle build configuration fixes

pub mod fixer;
pub mod report;
pub mod wrapper;

pub use fixer::{FixerError, GradleFixer};
pub use report::{FixEntry, FixOutcome, FixReport};
pub use wrapper::{parse_wrapper_version, GradleVersion};

//! Failure aggregation across independent batch units.
//!
//! A run covers many independent units — several images, nine gravities per
//! image — and one failing unit must never prevent the rest from being
//! attempted. Loops collect each unit's failure into a [`MultiError`] and
//! keep going; the composite is surfaced once, after everything has been
//! tried.
//!
//! The composite also drives the exit-code policy: a run whose failures are
//! exclusively soft (source image too small, see
//! [`SliceError::is_soft`](crate::slicer::SliceError::is_soft)) is reported
//! as a warning rather than a failure. That classification is structural —
//! it inspects error kinds, not rendered messages.

use std::error::Error;
use std::fmt;

use crate::slicer::SliceError;

/// An ordered collection of independent failures.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<SliceError>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect present errors, preserving input order.
    pub fn from_errors(errors: impl IntoIterator<Item = Option<SliceError>>) -> Self {
        Self {
            errors: errors.into_iter().flatten().collect(),
        }
    }

    pub fn push(&mut self, error: SliceError) {
        self.errors.push(error);
    }

    /// Append all of `other`'s failures after this one's.
    pub fn merge(&mut self, other: MultiError) {
        self.errors.extend(other.errors);
    }

    /// Whether at least one real failure was collected.
    pub fn exists(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether every collected failure is soft. Empty composites are not
    /// "all soft" — there is nothing to be lenient about.
    pub fn is_all_soft(&self) -> bool {
        self.exists() && self.errors.iter().all(SliceError::is_soft)
    }

    /// `Err(self)` if anything was collected, `Ok(())` otherwise.
    pub fn into_result(self) -> Result<(), MultiError> {
        if self.exists() { Err(self) } else { Ok(()) }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl Error for MultiError {}

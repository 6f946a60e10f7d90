//! Demonstration flows exercised against a file store.
//!
//! Each sample is one lifecycle run: provision a resource, work it through a
//! fixed sequence of steps, and release it whatever the steps did. The basic
//! group covers share, directory, file, range and copy operations; the
//! advanced group covers enumeration, service properties and metadata.

use std::fmt::Debug;
use std::io::Write;

use thiserror::Error;

use crate::lifecycle::{CleanupFailure, LifecycleError, RunOutcome};
use crate::store::StoreError;

mod advanced;
mod basic;


pub use advanced::AdvancedSamples;
pub use basic::BasicSamples;

/// Errors raised inside a sample's setup, step or teardown closures.
#[derive(Debug, Error)]
pub enum StepError {
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// An operation succeeded but returned something other than expected.
    #[error("verification failed: {0}")]
    Verification(String),
    /// Staging a local file for upload or download failed.
    #[error("local staging failed: {0}")]
    Staging(String),
}

impl CleanupFailure for StepError {
    fn is_already_gone(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_not_found())
    }
}

/// Errors surfaced for a whole sample.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The sample's lifecycle run failed.
    #[error("sample '{name}' failed: {source}")]
    Lifecycle {
        /// Name of the failed sample.
        name: String,
        /// Stage-tagged failure from the run.
        #[source]
        source: LifecycleError<StepError>,
    },
    /// Writing the sample report failed.
    #[error("failed to write sample report: {0}")]
    Report(#[from] std::io::Error),
}

/// Compares an observed value against the expected one.
fn verify<T>(what: &str, expected: &T, actual: &T) -> Result<(), StepError>
where
    T: Debug + PartialEq,
{
    if expected == actual {
        Ok(())
    } else {
        Err(StepError::Verification(format!(
            "{what}: expected {expected:?}, got {actual:?}"
        )))
    }
}

/// Maps a delete result so a missing resource counts as already released.
fn ignore_missing(result: Result<(), StoreError>) -> Result<(), StepError> {
    match result {
        Ok(()) | Err(StoreError::NotFound { .. }) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Writes one run's step records and any benign teardown note.
fn write_outcome(report: &mut dyn Write, outcome: &RunOutcome) -> Result<(), SampleError> {
    for record in &outcome.records {
        writeln!(report, "  {}", record.name)?;
        for note in &record.notes {
            writeln!(report, "    {note}")?;
        }
    }
    if let Some(message) = &outcome.benign_teardown {
        writeln!(report, "  note: teardown reported: {message}")?;
    }
    Ok(())
}

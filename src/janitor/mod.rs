//! Sample-share janitor.
//!
//! The janitor backstops the samples' own teardown: it deletes every share
//! whose name carries the sample prefix and fails when anything survives the
//! sweep. The driver runs it after all sample groups; tests use it to assert
//! cleanup completeness.

use thiserror::Error;

use crate::store::{FileStore, ShareRef, StoreError};


/// Configuration for a janitor sweep.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JanitorConfig {
    /// Share name prefix to scope the sweep to.
    pub prefix: String,
}

impl JanitorConfig {
    /// Constructs a config, trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`JanitorError::InvalidConfig`] when the prefix is blank.
    pub fn new(prefix: impl Into<String>) -> Result<Self, JanitorError> {
        let trimmed = prefix.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(JanitorError::InvalidConfig {
                field: String::from("prefix"),
            });
        }
        Ok(Self { prefix: trimmed })
    }
}

/// Summary of janitor work.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SweepSummary {
    /// Names of the shares deleted during the sweep.
    pub deleted_shares: Vec<String>,
}

/// Errors returned by the janitor.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum JanitorError {
    /// Raised when configuration is missing required values.
    #[error("missing {field}")]
    InvalidConfig {
        /// Name of the missing or invalid field.
        field: String,
    },
    /// Raised when a listing or deletion fails.
    #[error("sweep failed: {0}")]
    Store(#[source] StoreError),
    /// Raised when shares remain after the sweep.
    #[error("shares remain after janitor sweep: {}", .names.join(", "))]
    NotClean {
        /// Names of the surviving shares.
        names: Vec<String>,
    },
}

/// Deletes leftover sample shares from a file store.
#[derive(Clone, Debug)]
pub struct Janitor<S> {
    store: S,
    config: JanitorConfig,
}

impl<S> Janitor<S>
where
    S: FileStore,
{
    /// Creates a janitor sweeping `store` under `config`'s prefix.
    #[must_use]
    pub const fn new(store: S, config: JanitorConfig) -> Self {
        Self { store, config }
    }

    /// Deletes every share matching the prefix, then verifies none remain.
    ///
    /// A share that disappears between the listing and its deletion counts
    /// as already cleaned.
    ///
    /// # Errors
    ///
    /// Returns [`JanitorError::Store`] when a listing or deletion fails and
    /// [`JanitorError::NotClean`] when shares survive the sweep.
    pub async fn sweep(&self) -> Result<SweepSummary, JanitorError> {
        let matching: Vec<String> = self
            .store
            .list_shares(Some(&self.config.prefix))
            .await
            .map_err(JanitorError::Store)?
            .collect();

        let mut deleted_shares = Vec::with_capacity(matching.len());
        for name in matching {
            match self.store.delete_share(&ShareRef::new(&name)).await {
                Ok(()) => deleted_shares.push(name),
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(JanitorError::Store(err)),
            }
        }

        let survivors: Vec<String> = self
            .store
            .list_shares(Some(&self.config.prefix))
            .await
            .map_err(JanitorError::Store)?
            .collect();
        if !survivors.is_empty() {
            return Err(JanitorError::NotClean { names: survivors });
        }

        Ok(SweepSummary { deleted_shares })
    }
}

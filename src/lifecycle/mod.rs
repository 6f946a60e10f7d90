//! Setup, steps and teardown runner with guaranteed cleanup.
//!
//! A run provisions a resource through its setup closure, executes a sequence
//! of named steps against it, and releases it through the teardown closure.
//! Teardown runs exactly once whenever setup succeeded, whether the steps
//! passed or not. The earliest failure decides the run's error; a teardown
//! failure after a failed step is appended to the message instead of masking
//! it. A teardown failure that only says the resource was already gone is
//! reported on the outcome rather than raised.

use std::fmt::{self, Display};
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::store::StoreError;


/// Future returned by lifecycle phases.
pub type PhaseFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// Boxed setup closure. Receives a clone of the runner's store client and
/// returns the handle the steps and teardown operate on.
pub type SetupFn<S, H, E> = Box<dyn FnOnce(S) -> PhaseFuture<H, E> + Send>;

/// Boxed step action. Receives clones of the store client and the handle and
/// returns the notes to report for the step.
pub type StepFn<S, H, E> = Box<dyn FnOnce(S, H) -> PhaseFuture<Vec<String>, E> + Send>;

/// Boxed teardown closure. Receives clones of the store client and the
/// handle.
pub type TeardownFn<S, H, E> = Box<dyn FnOnce(S, H) -> PhaseFuture<(), E> + Send>;

/// Classification hook for teardown failures.
///
/// Implemented by phase error types so the runner can tell a release that
/// failed because the resource no longer exists from a real failure.
pub trait CleanupFailure {
    /// True when the failure means the resource was already gone.
    fn is_already_gone(&self) -> bool;
}

impl CleanupFailure for StoreError {
    fn is_already_gone(&self) -> bool {
        self.is_not_found()
    }
}

/// Phase of a run an error belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    /// Resource provisioning.
    Setup,
    /// One of the named steps.
    Step,
    /// Resource release.
    Teardown,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Setup => "setup",
            Self::Step => "step",
            Self::Teardown => "teardown",
        };
        f.write_str(label)
    }
}

/// Errors surfaced while executing a run.
#[derive(Debug, Error)]
pub enum LifecycleError<E>
where
    E: std::error::Error + 'static,
{
    /// Raised when provisioning fails; no steps ran and nothing to release.
    #[error("setup failed: {0}")]
    Setup(#[source] E),
    /// Raised when a step fails. The message carries a note when the
    /// following teardown failed too.
    #[error("step '{name}' failed: {message}")]
    Step {
        /// Name of the failed step.
        name: String,
        /// Human-readable description of the failure.
        message: String,
        /// Error returned by the step.
        #[source]
        source: E,
    },
    /// Raised when teardown fails after every step passed.
    #[error("teardown failed: {0}")]
    Teardown(#[source] E),
}

impl<E> LifecycleError<E>
where
    E: std::error::Error + 'static,
{
    /// Phase the error was raised in.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Setup(_) => Stage::Setup,
            Self::Step { .. } => Stage::Step,
            Self::Teardown(_) => Stage::Teardown,
        }
    }
}

/// One named action executed against the provisioned resource.
pub struct Step<S, H, E> {
    name: String,
    action: StepFn<S, H, E>,
}

impl<S, H, E> Step<S, H, E> {
    /// Wraps an action under a report-friendly name.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce(S, H) -> PhaseFuture<Vec<String>, E> + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Box::new(action),
        }
    }

    /// Name the step reports under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Report line produced by one completed step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StepRecord {
    /// Step name.
    pub name: String,
    /// Notes the step produced, in order.
    pub notes: Vec<String>,
}

/// Result of a run whose steps all passed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunOutcome {
    /// One record per executed step, in execution order.
    pub records: Vec<StepRecord>,
    /// Message of a swallowed already-gone teardown failure, when one
    /// occurred.
    pub benign_teardown: Option<String>,
}

/// Executes setup, steps and teardown against a shared store client.
#[derive(Clone, Debug)]
pub struct Lifecycle<S> {
    store: S,
}

impl<S> Lifecycle<S>
where
    S: Clone,
{
    /// Creates a runner handing clones of `store` to every phase.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Store client the runner clones into phases.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Runs setup, then each step in order, then teardown.
    ///
    /// Steps execute strictly in sequence and the first failing step skips
    /// the rest. Teardown runs exactly once whenever setup succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Setup`] when provisioning fails,
    /// [`LifecycleError::Step`] for the earliest step failure (annotated when
    /// teardown failed as well), and [`LifecycleError::Teardown`] when all
    /// steps passed but the release failed for a reason other than the
    /// resource already being gone.
    pub async fn run<H, E>(
        &self,
        setup: SetupFn<S, H, E>,
        steps: Vec<Step<S, H, E>>,
        teardown: TeardownFn<S, H, E>,
    ) -> Result<RunOutcome, LifecycleError<E>>
    where
        H: Clone,
        E: std::error::Error + CleanupFailure + 'static,
    {
        let handle = setup(self.store.clone())
            .await
            .map_err(LifecycleError::Setup)?;

        let mut records = Vec::with_capacity(steps.len());
        let mut failed: Option<(String, E)> = None;
        for step in steps {
            let Step { name, action } = step;
            match action(self.store.clone(), handle.clone()).await {
                Ok(notes) => records.push(StepRecord { name, notes }),
                Err(source) => {
                    failed = Some((name, source));
                    break;
                }
            }
        }

        let cleanup = teardown(self.store.clone(), handle).await;
        match failed {
            Some((name, source)) => {
                let residual = cleanup
                    .err()
                    .filter(|cleanup_err| !cleanup_err.is_already_gone());
                let message = append_cleanup_note(source.to_string(), residual.as_ref());
                Err(LifecycleError::Step {
                    name,
                    message,
                    source,
                })
            }
            None => match cleanup {
                Ok(()) => Ok(RunOutcome {
                    records,
                    benign_teardown: None,
                }),
                Err(cleanup_err) if cleanup_err.is_already_gone() => Ok(RunOutcome {
                    records,
                    benign_teardown: Some(cleanup_err.to_string()),
                }),
                Err(cleanup_err) => Err(LifecycleError::Teardown(cleanup_err)),
            },
        }
    }
}

fn append_cleanup_note<E: Display>(message: String, cleanup_error: Option<&E>) -> String {
    if let Some(cleanup) = cleanup_error {
        format!("{message} (cleanup also failed: {cleanup})")
    } else {
        message
    }
}

//! Wait helper for server-side copies.

use std::time::{Duration, Instant};

use tokio::time::sleep;

use crate::store::error::StoreError;
use crate::store::types::{CopyStatus, FileRef};
use crate::store::FileStore;

/// Polls `file` until its copy reaches a terminal status or the deadline
/// passes.
///
/// Returns the terminal status; the caller decides whether anything other
/// than [`CopyStatus::Success`] is a failure.
///
/// # Errors
///
/// Returns [`StoreError::Timeout`] when no terminal status is observed within
/// `wait_timeout`, or any error from polling the file's properties.
pub async fn wait_for_copy<S>(
    store: &S,
    file: &FileRef,
    poll_interval: Duration,
    wait_timeout: Duration,
) -> Result<CopyStatus, StoreError>
where
    S: FileStore + ?Sized,
{
    let deadline = Instant::now() + wait_timeout;
    while Instant::now() <= deadline {
        let properties = store.file_properties(file).await?;
        if let Some(copy) = properties.copy
            && copy.status.is_terminal()
        {
            return Ok(copy.status);
        }
        sleep(poll_interval).await;
    }

    Err(StoreError::Timeout {
        action: String::from("copy completion"),
        path: file.full_path(),
    })
}

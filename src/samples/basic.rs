//! Basic file operations sample: share, directory, file, range and copy.

use std::io::Write;
use std::time::Duration;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use tempfile::TempDir;

use crate::lifecycle::{Lifecycle, SetupFn, Step, TeardownFn};
use crate::samples::{ignore_missing, verify, write_outcome, SampleError, StepError};
use crate::store::{
    CopyStatus, DirectoryRef, FileRef, FileStore, Metadata, ShareOptions, ShareRef, StoreError,
    unique_name, wait_for_copy,
};

const SAMPLE_NAME: &str = "basic file operations";
const DIRECTORY_NAME: &str = "mydirectory";
const TEXT_CONTENT: &[u8] = b"Hello World! - from text sample";
const PATH_CONTENT: &[u8] = b"Hello world!";
const RANGE_CONTENT: &[u8] = b"abcdefghijkl";
const COPY_DESTINATION: &str = "file1copy";
const WAITED_COPY_DESTINATION: &str = "file2copy";
const COPY_POLL_INTERVAL: Duration = Duration::from_millis(50);
const COPY_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the basic sample provisions, resolved from the share created
/// in setup.
#[derive(Clone, Debug)]
struct BasicHandle {
    share: ShareRef,
    directory: DirectoryRef,
    text_file: FileRef,
    path_file: FileRef,
    copy_file: FileRef,
}

type BasicStep<S> = Step<S, BasicHandle, StepError>;

/// Runs the basic file operations flow as one lifecycle run.
pub struct BasicSamples<S> {
    lifecycle: Lifecycle<S>,
    prefix: String,
}

impl<S> BasicSamples<S>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    /// Creates the sample group against `store`, naming its share with
    /// `prefix`.
    #[must_use]
    pub fn new(store: S, prefix: impl Into<String>) -> Self {
        Self {
            lifecycle: Lifecycle::new(store),
            prefix: prefix.into(),
        }
    }

    /// Runs the sample, writing progress notes to `report`.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::Lifecycle`] when any stage of the run fails
    /// and [`SampleError::Report`] when the report sink rejects a write.
    pub async fn run(&self, report: &mut dyn Write) -> Result<(), SampleError> {
        let share_name = unique_name(&self.prefix);
        let file_name = unique_name("filesample");
        writeln!(report, "{SAMPLE_NAME}: share '{share_name}'")?;

        let outcome = self
            .lifecycle
            .run(setup(share_name, file_name), steps(), teardown())
            .await
            .map_err(|source| SampleError::Lifecycle {
                name: String::from(SAMPLE_NAME),
                source,
            })?;
        write_outcome(report, &outcome)?;
        writeln!(report, "{SAMPLE_NAME}: completed")?;
        Ok(())
    }
}

fn setup<S>(share_name: String, file_name: String) -> SetupFn<S, BasicHandle, StepError>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    Box::new(move |store: S| {
        Box::pin(async move {
            let share = store
                .create_share(&share_name, &ShareOptions::default())
                .await?;
            let directory = DirectoryRef::new(&share, DIRECTORY_NAME);
            let text_file = FileRef::in_directory(&directory, &file_name);
            let path_file = FileRef::in_share_root(&share, &file_name);
            let copy_file = FileRef::in_share_root(&share, COPY_DESTINATION);
            Ok(BasicHandle {
                share,
                directory,
                text_file,
                path_file,
                copy_file,
            })
        })
    })
}

fn steps<S>() -> Vec<BasicStep<S>>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    vec![
        create_directory_step(),
        upload_text_step(),
        copy_and_maybe_abort_step(),
        upload_from_path_step(),
        rewrite_first_range_step(),
        copy_and_wait_step(),
        download_to_path_step(),
        list_children_step(),
    ]
}

fn create_directory_step<S>() -> BasicStep<S>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    Step::new("create directory", |store: S, handle: BasicHandle| {
        Box::pin(async move {
            store
                .create_directory(&handle.share, &handle.directory.path, &Metadata::new())
                .await?;
            Ok(vec![format!(
                "created directory '{}'",
                handle.directory.full_path()
            )])
        })
    })
}

fn upload_text_step<S>() -> BasicStep<S>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    Step::new("upload file from text", |store: S, handle: BasicHandle| {
        Box::pin(async move {
            store
                .upload_file(&handle.text_file, TEXT_CONTENT, &Metadata::new())
                .await?;
            Ok(vec![format!(
                "uploaded '{}' ({} bytes)",
                handle.text_file.full_path(),
                TEXT_CONTENT.len()
            )])
        })
    })
}

fn copy_and_maybe_abort_step<S>() -> BasicStep<S>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    Step::new("server-side copy", |store: S, handle: BasicHandle| {
        Box::pin(async move {
            let source_url = store.file_url(&handle.text_file);
            let copy = store
                .copy_file_from_url(&handle.copy_file, &source_url)
                .await?;
            let mut notes = vec![format!("started copy '{}'", copy.id)];
            if copy.status == CopyStatus::Pending {
                match store.abort_copy(&handle.copy_file, &copy.id).await {
                    Ok(()) => notes.push(String::from("aborted the pending copy")),
                    Err(StoreError::NoPendingCopy { .. }) => {
                        notes.push(String::from("copy completed before the abort reached it"));
                    }
                    Err(err) => return Err(err.into()),
                }
            } else {
                notes.push(format!("copy finished with status {}", copy.status));
            }
            Ok(notes)
        })
    })
}

fn upload_from_path_step<S>() -> BasicStep<S>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    Step::new("upload file from path", |store: S, handle: BasicHandle| {
        Box::pin(async move {
            let staging = tempfile::tempdir().map_err(stage_failure)?;
            let dir = open_staging_dir(&staging)?;
            dir.write("upload.tmp", PATH_CONTENT).map_err(stage_failure)?;
            let content = dir.read("upload.tmp").map_err(stage_failure)?;
            store
                .upload_file(&handle.path_file, &content, &Metadata::new())
                .await?;
            Ok(vec![format!(
                "uploaded '{}' from a staged local file",
                handle.path_file.full_path()
            )])
        })
    })
}

fn rewrite_first_range_step<S>() -> BasicStep<S>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    Step::new("rewrite first range", |store: S, handle: BasicHandle| {
        Box::pin(async move {
            let ranges = store.list_ranges(&handle.path_file).await?;
            let Some(first) = ranges.first().copied() else {
                return Err(StepError::Verification(format!(
                    "'{}' reports no written ranges",
                    handle.path_file.full_path()
                )));
            };
            store
                .write_range(&handle.path_file, first.start, RANGE_CONTENT)
                .await?;
            let content = store.download_file(&handle.path_file).await?;
            verify("rewritten content", &RANGE_CONTENT.to_vec(), &content)?;
            Ok(vec![format!("rewrote range {first} with fresh content")])
        })
    })
}

fn copy_and_wait_step<S>() -> BasicStep<S>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    Step::new("copy and wait for completion", |store: S, handle: BasicHandle| {
        Box::pin(async move {
            let destination = FileRef::in_share_root(&handle.share, WAITED_COPY_DESTINATION);
            let source_url = store.file_url(&handle.text_file);
            store.copy_file_from_url(&destination, &source_url).await?;
            let status =
                wait_for_copy(&store, &destination, COPY_POLL_INTERVAL, COPY_WAIT_TIMEOUT).await?;
            verify("settled copy status", &CopyStatus::Success, &status)?;
            let content = store.download_file(&destination).await?;
            verify("copied content", &TEXT_CONTENT.to_vec(), &content)?;
            Ok(vec![format!(
                "copy to '{}' settled as {status}",
                destination.full_path()
            )])
        })
    })
}

fn download_to_path_step<S>() -> BasicStep<S>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    Step::new("download file to path", |store: S, handle: BasicHandle| {
        Box::pin(async move {
            let content = store.download_file(&handle.text_file).await?;
            let staging = tempfile::tempdir().map_err(stage_failure)?;
            let dir = open_staging_dir(&staging)?;
            dir.write("mypathfile.txt", &content).map_err(stage_failure)?;
            let read_back = dir.read("mypathfile.txt").map_err(stage_failure)?;
            verify("downloaded content", &TEXT_CONTENT.to_vec(), &read_back)?;
            Ok(vec![format!(
                "downloaded '{}' to a local path byte-identically",
                handle.text_file.full_path()
            )])
        })
    })
}

fn list_children_step<S>() -> BasicStep<S>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    Step::new("list share children", |store: S, handle: BasicHandle| {
        Box::pin(async move {
            let names: Vec<String> = store.list_children(&handle.share, None).await?.collect();
            for required in [DIRECTORY_NAME, handle.path_file.name.as_str()] {
                if !names.iter().any(|name| name == required) {
                    return Err(StepError::Verification(format!(
                        "share listing is missing '{required}'"
                    )));
                }
            }
            let mut notes = vec![format!(
                "share '{}' holds {} entries",
                handle.share.name,
                names.len()
            )];
            notes.extend(names);
            Ok(notes)
        })
    })
}

/// Deletes in reverse creation order. The file and directory deletions are
/// redundant once the share goes, so a missing one is treated as released;
/// a share that is already gone surfaces as the run's benign teardown note.
fn teardown<S>() -> TeardownFn<S, BasicHandle, StepError>
where
    S: FileStore + Clone + Send + Sync + 'static,
{
    Box::new(move |store: S, handle: BasicHandle| {
        Box::pin(async move {
            ignore_missing(store.delete_file(&handle.text_file).await)?;
            ignore_missing(store.delete_directory(&handle.directory).await)?;
            store.delete_share(&handle.share).await?;
            Ok(())
        })
    })
}

fn open_staging_dir(staging: &TempDir) -> Result<Dir, StepError> {
    let path = Utf8Path::from_path(staging.path()).ok_or_else(|| {
        StepError::Staging(String::from("staging directory path is not valid UTF-8"))
    })?;
    Dir::open_ambient_dir(path, ambient_authority()).map_err(stage_failure)
}

fn stage_failure(err: std::io::Error) -> StepError {
    StepError::Staging(err.to_string())
}

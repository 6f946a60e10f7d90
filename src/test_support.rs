//! Test support utilities shared across unit and integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::StorageConfig;
use crate::memory::MemoryStore;
use crate::store::{
    ByteRange, CopyState, DirectoryProperties, DirectoryRef, FileProperties, FileRef, FileStore,
    Metadata, NameList, ServiceProperties, ServicePropertiesUpdate, ShareOptions, ShareProperties,
    ShareRef, StoreError, StoreFuture,
};

/// Configuration shaped like the defaults, for tests that build stores
/// directly.
#[must_use]
pub fn test_config() -> StorageConfig {
    StorageConfig {
        account_name: String::from("devstoreaccount1"),
        endpoint_suffix: String::from("core.windows.net"),
        connection_string: None,
        sample_prefix: String::from("sharesample"),
    }
}

/// Builds an empty in-memory store from the test configuration.
///
/// # Panics
///
/// Panics when the test configuration fails to validate, which would mean
/// the defaults themselves are broken.
#[must_use]
pub fn memory_store() -> MemoryStore {
    match MemoryStore::new(&test_config()) {
        Ok(store) => store,
        Err(err) => panic!("test configuration should build a store: {err}"),
    }
}

/// Planned outcome for one intercepted store call.
#[derive(Clone, Debug)]
enum Planned {
    /// Let the call through to the wrapped store.
    Pass,
    /// Fail the call with this error instead of delegating.
    Fail(StoreError),
}

/// Fault-injecting wrapper over any [`FileStore`].
///
/// Failures are planned per operation name in FIFO order: each call consumes
/// the next planned outcome for its operation, and calls with no plan
/// delegate untouched. Clones share the plan, so a store handed to a sample
/// keeps honouring outcomes planned through the original.
#[derive(Clone)]
pub struct FaultStore<S> {
    inner: S,
    plan: Arc<Mutex<HashMap<&'static str, VecDeque<Planned>>>>,
    drop_share_deletes: Arc<AtomicBool>,
}

impl<S> FaultStore<S> {
    /// Wraps `inner` with an empty fault plan.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            plan: Arc::default(),
            drop_share_deletes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Plans a failure for the next unplanned call to `operation`.
    pub fn fail_next(&self, operation: &'static str, error: StoreError) {
        self.lock_plan()
            .entry(operation)
            .or_default()
            .push_back(Planned::Fail(error));
    }

    /// Plans a pass-through for the next call to `operation`, pushing any
    /// later planned failure one call further out.
    pub fn pass_next(&self, operation: &'static str) {
        self.lock_plan()
            .entry(operation)
            .or_default()
            .push_back(Planned::Pass);
    }

    /// Makes share deletions report success without deleting anything, so
    /// sweeps can be driven into their not-clean branch.
    pub fn drop_share_deletes(&self) {
        self.drop_share_deletes.store(true, Ordering::SeqCst);
    }

    fn lock_plan(&self) -> MutexGuard<'_, HashMap<&'static str, VecDeque<Planned>>> {
        self.plan.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn planned_failure(&self, operation: &'static str) -> Option<StoreError> {
        let mut plan = self.lock_plan();
        let queue = plan.get_mut(operation)?;
        match queue.pop_front()? {
            Planned::Pass => None,
            Planned::Fail(error) => Some(error),
        }
    }
}

macro_rules! intercept {
    ($self:ident, $operation:literal) => {
        if let Some(error) = $self.planned_failure($operation) {
            return Box::pin(async move { Err(error) });
        }
    };
}

impl<S: FileStore> FileStore for FaultStore<S> {
    fn create_share<'a>(
        &'a self,
        name: &'a str,
        options: &'a ShareOptions,
    ) -> StoreFuture<'a, ShareRef> {
        intercept!(self, "create_share");
        self.inner.create_share(name, options)
    }

    fn delete_share<'a>(&'a self, share: &'a ShareRef) -> StoreFuture<'a, ()> {
        intercept!(self, "delete_share");
        if self.drop_share_deletes.load(Ordering::SeqCst) {
            return Box::pin(async { Ok(()) });
        }
        self.inner.delete_share(share)
    }

    fn share_exists<'a>(&'a self, name: &'a str) -> StoreFuture<'a, bool> {
        intercept!(self, "share_exists");
        self.inner.share_exists(name)
    }

    fn share_properties<'a>(&'a self, share: &'a ShareRef) -> StoreFuture<'a, ShareProperties> {
        intercept!(self, "share_properties");
        self.inner.share_properties(share)
    }

    fn list_shares<'a>(&'a self, prefix: Option<&'a str>) -> StoreFuture<'a, NameList> {
        intercept!(self, "list_shares");
        self.inner.list_shares(prefix)
    }

    fn create_directory<'a>(
        &'a self,
        share: &'a ShareRef,
        path: &'a str,
        metadata: &'a Metadata,
    ) -> StoreFuture<'a, DirectoryRef> {
        intercept!(self, "create_directory");
        self.inner.create_directory(share, path, metadata)
    }

    fn delete_directory<'a>(&'a self, directory: &'a DirectoryRef) -> StoreFuture<'a, ()> {
        intercept!(self, "delete_directory");
        self.inner.delete_directory(directory)
    }

    fn directory_properties<'a>(
        &'a self,
        directory: &'a DirectoryRef,
    ) -> StoreFuture<'a, DirectoryProperties> {
        intercept!(self, "directory_properties");
        self.inner.directory_properties(directory)
    }

    fn list_children<'a>(
        &'a self,
        share: &'a ShareRef,
        directory: Option<&'a str>,
    ) -> StoreFuture<'a, NameList> {
        intercept!(self, "list_children");
        self.inner.list_children(share, directory)
    }

    fn create_file<'a>(
        &'a self,
        file: &'a FileRef,
        size: u64,
        metadata: &'a Metadata,
    ) -> StoreFuture<'a, ()> {
        intercept!(self, "create_file");
        self.inner.create_file(file, size, metadata)
    }

    fn upload_file<'a>(
        &'a self,
        file: &'a FileRef,
        content: &'a [u8],
        metadata: &'a Metadata,
    ) -> StoreFuture<'a, ()> {
        intercept!(self, "upload_file");
        self.inner.upload_file(file, content, metadata)
    }

    fn download_file<'a>(&'a self, file: &'a FileRef) -> StoreFuture<'a, Vec<u8>> {
        intercept!(self, "download_file");
        self.inner.download_file(file)
    }

    fn delete_file<'a>(&'a self, file: &'a FileRef) -> StoreFuture<'a, ()> {
        intercept!(self, "delete_file");
        self.inner.delete_file(file)
    }

    fn file_properties<'a>(&'a self, file: &'a FileRef) -> StoreFuture<'a, FileProperties> {
        intercept!(self, "file_properties");
        self.inner.file_properties(file)
    }

    fn write_range<'a>(
        &'a self,
        file: &'a FileRef,
        offset: u64,
        data: &'a [u8],
    ) -> StoreFuture<'a, ()> {
        intercept!(self, "write_range");
        self.inner.write_range(file, offset, data)
    }

    fn list_ranges<'a>(&'a self, file: &'a FileRef) -> StoreFuture<'a, Vec<ByteRange>> {
        intercept!(self, "list_ranges");
        self.inner.list_ranges(file)
    }

    fn file_url(&self, file: &FileRef) -> String {
        self.inner.file_url(file)
    }

    fn copy_file_from_url<'a>(
        &'a self,
        destination: &'a FileRef,
        source_url: &'a str,
    ) -> StoreFuture<'a, CopyState> {
        intercept!(self, "copy_file_from_url");
        self.inner.copy_file_from_url(destination, source_url)
    }

    fn abort_copy<'a>(&'a self, file: &'a FileRef, copy_id: &'a str) -> StoreFuture<'a, ()> {
        intercept!(self, "abort_copy");
        self.inner.abort_copy(file, copy_id)
    }

    fn service_properties<'a>(&'a self) -> StoreFuture<'a, ServiceProperties> {
        intercept!(self, "service_properties");
        self.inner.service_properties()
    }

    fn set_service_properties<'a>(
        &'a self,
        update: &'a ServicePropertiesUpdate,
    ) -> StoreFuture<'a, ()> {
        intercept!(self, "set_service_properties");
        self.inner.set_service_properties(update)
    }
}

//! Client-side interface to a remote file share service.
//!
//! The [`FileStore`] trait covers the share, directory, file, range, copy and
//! service-properties operations the samples exercise. Implementations wrap a
//! concrete service; the in-memory one in [`crate::memory`] backs tests and
//! offline runs.

use std::future::Future;
use std::pin::Pin;

mod error;
mod naming;
mod poll;
mod types;

#[cfg(test)]
mod tests;

pub use error::{ResourceKind, StoreError};
pub use naming::{unique_name, validate_component_name, validate_share_name};
pub use poll::wait_for_copy;
pub use types::{
    ByteRange, CopyState, CopyStatus, CorsRule, DirectoryProperties, DirectoryRef, FileProperties,
    FileRef, MAX_SHARE_QUOTA_GB, METADATA_MAX_BYTES, Metadata, MetricsPolicy, NameList,
    RetentionPolicy, ServiceProperties, ServicePropertiesUpdate, ShareOptions,
    ShareOptionsBuilder, ShareProperties, ShareRef,
};

/// Future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Interface to a file share account.
///
/// All mutating calls are addressed through the handle types in this module;
/// handles are plain names and creating one does not touch the service.
pub trait FileStore: Send + Sync {
    /// Creates a share and returns a handle used for subsequent calls.
    fn create_share<'a>(
        &'a self,
        name: &'a str,
        options: &'a ShareOptions,
    ) -> StoreFuture<'a, ShareRef>;

    /// Deletes a share and everything inside it.
    fn delete_share<'a>(&'a self, share: &'a ShareRef) -> StoreFuture<'a, ()>;

    /// Reports whether the named share exists.
    fn share_exists<'a>(&'a self, name: &'a str) -> StoreFuture<'a, bool>;

    /// Fetches metadata and quota for a share.
    fn share_properties<'a>(&'a self, share: &'a ShareRef) -> StoreFuture<'a, ShareProperties>;

    /// Lists share names, optionally restricted to a name prefix.
    ///
    /// The returned sequence is single-pass; collect it to keep the names.
    fn list_shares<'a>(&'a self, prefix: Option<&'a str>) -> StoreFuture<'a, NameList>;

    /// Creates a directory in the root of a share.
    fn create_directory<'a>(
        &'a self,
        share: &'a ShareRef,
        path: &'a str,
        metadata: &'a Metadata,
    ) -> StoreFuture<'a, DirectoryRef>;

    /// Deletes a directory and the files inside it.
    fn delete_directory<'a>(&'a self, directory: &'a DirectoryRef) -> StoreFuture<'a, ()>;

    /// Fetches metadata for a directory.
    fn directory_properties<'a>(
        &'a self,
        directory: &'a DirectoryRef,
    ) -> StoreFuture<'a, DirectoryProperties>;

    /// Lists the names directly under a share root, or under one directory.
    ///
    /// With `directory` set to `None` the listing covers the share root and
    /// includes directory names. The returned sequence is single-pass.
    fn list_children<'a>(
        &'a self,
        share: &'a ShareRef,
        directory: Option<&'a str>,
    ) -> StoreFuture<'a, NameList>;

    /// Allocates a zero-filled file of `size` bytes.
    fn create_file<'a>(
        &'a self,
        file: &'a FileRef,
        size: u64,
        metadata: &'a Metadata,
    ) -> StoreFuture<'a, ()>;

    /// Creates or replaces a file with the given content in one call.
    fn upload_file<'a>(
        &'a self,
        file: &'a FileRef,
        content: &'a [u8],
        metadata: &'a Metadata,
    ) -> StoreFuture<'a, ()>;

    /// Downloads the full content of a file.
    fn download_file<'a>(&'a self, file: &'a FileRef) -> StoreFuture<'a, Vec<u8>>;

    /// Deletes a file.
    fn delete_file<'a>(&'a self, file: &'a FileRef) -> StoreFuture<'a, ()>;

    /// Fetches length, metadata and copy state for a file.
    fn file_properties<'a>(&'a self, file: &'a FileRef) -> StoreFuture<'a, FileProperties>;

    /// Writes `data` at `offset` without changing the file length.
    fn write_range<'a>(
        &'a self,
        file: &'a FileRef,
        offset: u64,
        data: &'a [u8],
    ) -> StoreFuture<'a, ()>;

    /// Lists the ranges of a file that have been written to, in order.
    fn list_ranges<'a>(&'a self, file: &'a FileRef) -> StoreFuture<'a, Vec<ByteRange>>;

    /// Renders the service URL for a file, usable as a copy source.
    fn file_url(&self, file: &FileRef) -> String;

    /// Starts a server-side copy from `source_url` into `destination`.
    ///
    /// The returned state may already be terminal when the service finished
    /// the copy synchronously; otherwise it is pending and the caller polls
    /// [`FileStore::file_properties`] or aborts with the returned id.
    fn copy_file_from_url<'a>(
        &'a self,
        destination: &'a FileRef,
        source_url: &'a str,
    ) -> StoreFuture<'a, CopyState>;

    /// Aborts a pending copy previously started on `file`.
    fn abort_copy<'a>(&'a self, file: &'a FileRef, copy_id: &'a str) -> StoreFuture<'a, ()>;

    /// Fetches the account-level service settings.
    fn service_properties<'a>(&'a self) -> StoreFuture<'a, ServiceProperties>;

    /// Applies a partial update to the account-level service settings.
    fn set_service_properties<'a>(
        &'a self,
        update: &'a ServicePropertiesUpdate,
    ) -> StoreFuture<'a, ()>;
}

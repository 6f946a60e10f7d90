//! In-memory implementation of the file store.
//!
//! Holds a whole account behind a mutex shared by clones, so a store can be
//! handed to concurrent tasks the same way a real client would be. Backs the
//! sample driver and the test suite without touching a live service.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::config::{ConfigError, StorageConfig};
use crate::store::{
    ByteRange, CopyState, CopyStatus, DirectoryProperties, DirectoryRef, FileProperties, FileRef,
    FileStore, MAX_SHARE_QUOTA_GB, Metadata, NameList, ResourceKind, ServiceProperties,
    ServicePropertiesUpdate, ShareOptions, ShareProperties, ShareRef, StoreError, StoreFuture,
    validate_component_name, validate_share_name,
};

mod ranges;
mod state;

#[cfg(test)]
mod tests;

use state::{Account, DirectoryRecord, FileRecord, ShareRecord, byte_len};

/// Bytes in one GiB of share quota.
const BYTES_PER_GIB: u64 = 1 << 30;

/// File store keeping a whole account in process memory.
///
/// Server-side copies normally finish synchronously; switch a store into
/// deferred mode with [`MemoryStore::with_deferred_copies`] to observe the
/// pending state and the abort path.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<Account>>,
    endpoint: String,
}

impl MemoryStore {
    /// Creates an empty account served at the endpoint named by `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration is incomplete or its
    /// connection string cannot be parsed.
    pub fn new(config: &StorageConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: Arc::default(),
            endpoint: config.endpoint()?,
        })
    }

    /// Makes server-side copies sit in the pending state until
    /// [`MemoryStore::complete_pending_copies`] runs, instead of finishing
    /// synchronously.
    #[must_use]
    pub fn with_deferred_copies(self) -> Self {
        self.lock_state().defer_copies = true;
        self
    }

    /// Finishes every pending copy and returns how many completed.
    #[must_use = "the count says whether any copy was actually pending"]
    pub fn complete_pending_copies(&self) -> usize {
        let mut account = self.lock_state();
        let mut completed = 0;
        for share in account.shares.values_mut() {
            let files = share.root_files.values_mut().chain(
                share
                    .directories
                    .values_mut()
                    .flat_map(|directory| directory.files.values_mut()),
            );
            for record in files {
                if let Some(copy) = &mut record.copy
                    && copy.status == CopyStatus::Pending
                {
                    if let Some(content) = record.pending_content.take() {
                        record.content = content;
                        if let Some(last) = byte_len(&record.content).checked_sub(1) {
                            record.written.insert(0, last);
                        }
                    }
                    copy.status = CopyStatus::Success;
                    completed += 1;
                }
            }
        }
        completed
    }

    fn lock_state(&self) -> MutexGuard<'_, Account> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn strip_endpoint<'u>(&self, url: &'u str) -> Option<&'u str> {
        url.strip_prefix(&self.endpoint)?.strip_prefix('/')
    }

    fn create_share_sync(
        &self,
        name: &str,
        options: &ShareOptions,
    ) -> Result<ShareRef, StoreError> {
        validate_share_name(name)?;
        options.metadata.validate()?;
        if let Some(quota_gb) = options.quota_gb
            && !(1..=MAX_SHARE_QUOTA_GB).contains(&quota_gb)
        {
            return Err(StoreError::Validation(format!(
                "quota_gb must be between 1 and {MAX_SHARE_QUOTA_GB}, got {quota_gb}"
            )));
        }
        let mut account = self.lock_state();
        if account.shares.contains_key(name) {
            return Err(StoreError::already_exists(ResourceKind::Share, name));
        }
        account.shares.insert(
            name.to_owned(),
            ShareRecord::new(options.metadata.clone(), options.quota_gb),
        );
        Ok(ShareRef::new(name))
    }

    fn delete_share_sync(&self, share: &ShareRef) -> Result<(), StoreError> {
        self.lock_state()
            .shares
            .remove(&share.name)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(ResourceKind::Share, &share.name))
    }

    fn share_properties_sync(&self, share: &ShareRef) -> Result<ShareProperties, StoreError> {
        let account = self.lock_state();
        let record = account.share(&share.name)?;
        Ok(ShareProperties {
            metadata: record.metadata.clone(),
            quota_gb: record.quota_gb,
        })
    }

    fn list_shares_sync(&self, prefix: Option<&str>) -> NameList {
        let account = self.lock_state();
        let names: Vec<String> = account
            .shares
            .keys()
            .filter(|name| prefix.is_none_or(|wanted| name.starts_with(wanted)))
            .cloned()
            .collect();
        NameList::from_names(names)
    }

    fn create_directory_sync(
        &self,
        share: &ShareRef,
        path: &str,
        metadata: &Metadata,
    ) -> Result<DirectoryRef, StoreError> {
        validate_component_name(path)?;
        metadata.validate()?;
        let mut account = self.lock_state();
        let record = account.share_mut(&share.name)?;
        if record.directories.contains_key(path) {
            return Err(StoreError::already_exists(
                ResourceKind::Directory,
                format!("{}/{path}", share.name),
            ));
        }
        record
            .directories
            .insert(path.to_owned(), DirectoryRecord::new(metadata.clone()));
        Ok(DirectoryRef::new(share, path))
    }

    fn delete_directory_sync(&self, directory: &DirectoryRef) -> Result<(), StoreError> {
        let mut account = self.lock_state();
        let record = account.share_mut(&directory.share)?;
        record
            .directories
            .remove(&directory.path)
            .map(|_| ())
            .ok_or_else(|| {
                StoreError::not_found(ResourceKind::Directory, directory.full_path())
            })
    }

    fn directory_properties_sync(
        &self,
        directory: &DirectoryRef,
    ) -> Result<DirectoryProperties, StoreError> {
        let account = self.lock_state();
        let record = account
            .share(&directory.share)?
            .directory(&directory.share, &directory.path)?;
        Ok(DirectoryProperties {
            metadata: record.metadata.clone(),
        })
    }

    fn list_children_sync(
        &self,
        share: &ShareRef,
        directory: Option<&str>,
    ) -> Result<NameList, StoreError> {
        let account = self.lock_state();
        let record = account.share(&share.name)?;
        let names = match directory {
            Some(path) => record
                .directory(&share.name, path)?
                .files
                .keys()
                .cloned()
                .collect(),
            None => {
                let mut mixed: Vec<String> = record
                    .root_files
                    .keys()
                    .chain(record.directories.keys())
                    .cloned()
                    .collect();
                mixed.sort();
                mixed
            }
        };
        Ok(NameList::from_names(names))
    }

    fn create_file_sync(
        &self,
        file: &FileRef,
        size: u64,
        metadata: &Metadata,
    ) -> Result<(), StoreError> {
        validate_component_name(&file.name)?;
        metadata.validate()?;
        let mut account = self.lock_state();
        let record = account.share_mut(&file.share)?;
        if let Some(directory) = &file.directory {
            record.directory(&file.share, directory)?;
        }
        let replacing = record.existing_len(file);
        record.ensure_quota(&file.share, size, replacing)?;
        let capacity = usize::try_from(size).map_err(|_| {
            StoreError::Validation(format!("file size {size} exceeds addressable memory"))
        })?;
        record.insert_file(file, FileRecord::allocated(metadata.clone(), capacity))
    }

    fn upload_file_sync(
        &self,
        file: &FileRef,
        content: &[u8],
        metadata: &Metadata,
    ) -> Result<(), StoreError> {
        validate_component_name(&file.name)?;
        metadata.validate()?;
        let mut account = self.lock_state();
        let record = account.share_mut(&file.share)?;
        if let Some(directory) = &file.directory {
            record.directory(&file.share, directory)?;
        }
        let replacing = record.existing_len(file);
        record.ensure_quota(&file.share, byte_len(content), replacing)?;
        record.insert_file(
            file,
            FileRecord::with_content(metadata.clone(), content.to_vec()),
        )
    }

    fn download_file_sync(&self, file: &FileRef) -> Result<Vec<u8>, StoreError> {
        let account = self.lock_state();
        let record = account.share(&file.share)?.file(file)?;
        Ok(record.content.clone())
    }

    fn delete_file_sync(&self, file: &FileRef) -> Result<(), StoreError> {
        self.lock_state().share_mut(&file.share)?.remove_file(file)
    }

    fn file_properties_sync(&self, file: &FileRef) -> Result<FileProperties, StoreError> {
        let account = self.lock_state();
        let record = account.share(&file.share)?.file(file)?;
        Ok(FileProperties {
            length: byte_len(&record.content),
            metadata: record.metadata.clone(),
            copy: record.copy.clone(),
        })
    }

    fn write_range_sync(
        &self,
        file: &FileRef,
        offset: u64,
        data: &[u8],
    ) -> Result<(), StoreError> {
        if data.is_empty() {
            return Err(StoreError::Validation(String::from(
                "range writes cover at least one byte",
            )));
        }
        let data_len = byte_len(data);
        let mut account = self.lock_state();
        let record = account.share_mut(&file.share)?.file_mut(file)?;
        let length = byte_len(&record.content);
        let end = offset
            .checked_add(data_len - 1)
            .filter(|last| *last < length)
            .ok_or_else(|| StoreError::RangeOutOfBounds {
                path: file.full_path(),
                start: offset,
                end: offset.saturating_add(data_len - 1),
                length,
            })?;
        let start_index = usize::try_from(offset).map_err(|_| oversized_offset(file))?;
        let end_index = usize::try_from(end).map_err(|_| oversized_offset(file))?;
        let Some(slot) = record.content.get_mut(start_index..=end_index) else {
            return Err(oversized_offset(file));
        };
        slot.copy_from_slice(data);
        record.written.insert(offset, end);
        Ok(())
    }

    fn list_ranges_sync(&self, file: &FileRef) -> Result<Vec<ByteRange>, StoreError> {
        let account = self.lock_state();
        let record = account.share(&file.share)?.file(file)?;
        Ok(record.written.as_ranges())
    }

    fn copy_from_url_sync(
        &self,
        destination: &FileRef,
        source_url: &str,
    ) -> Result<CopyState, StoreError> {
        let source = self
            .strip_endpoint(source_url)
            .and_then(parse_file_path)
            .ok_or_else(|| StoreError::BadCopySource {
                url: source_url.to_owned(),
            })?;
        validate_component_name(&destination.name)?;
        let mut account = self.lock_state();
        let source_content = account.share(&source.share)?.file(&source)?.content.clone();
        let defer = account.defer_copies;
        let dest_share = account.share_mut(&destination.share)?;
        if let Some(directory) = &destination.directory {
            dest_share.directory(&destination.share, directory)?;
        }
        let replacing = dest_share.existing_len(destination);
        dest_share.ensure_quota(&destination.share, byte_len(&source_content), replacing)?;
        let copy_id = Uuid::new_v4().to_string();
        let (record, status) = if defer {
            let mut pending = FileRecord::allocated(Metadata::new(), 0);
            pending.copy = Some(CopyState {
                id: copy_id.clone(),
                status: CopyStatus::Pending,
            });
            pending.pending_content = Some(source_content);
            (pending, CopyStatus::Pending)
        } else {
            let mut finished = FileRecord::with_content(Metadata::new(), source_content);
            finished.copy = Some(CopyState {
                id: copy_id.clone(),
                status: CopyStatus::Success,
            });
            (finished, CopyStatus::Success)
        };
        dest_share.insert_file(destination, record)?;
        Ok(CopyState {
            id: copy_id,
            status,
        })
    }

    fn abort_copy_sync(&self, file: &FileRef, copy_id: &str) -> Result<(), StoreError> {
        let mut account = self.lock_state();
        let record = account.share_mut(&file.share)?.file_mut(file)?;
        match &mut record.copy {
            Some(copy) if copy.id == copy_id && copy.status == CopyStatus::Pending => {
                copy.status = CopyStatus::Aborted;
                record.pending_content = None;
                Ok(())
            }
            _ => Err(StoreError::NoPendingCopy {
                path: file.full_path(),
                copy_id: copy_id.to_owned(),
            }),
        }
    }

    fn set_service_properties_sync(&self, update: &ServicePropertiesUpdate) {
        let mut account = self.lock_state();
        if let Some(cors) = &update.cors {
            account.service.cors = cors.clone();
        }
        if let Some(policy) = update.hour_metrics {
            account.service.hour_metrics = policy;
        }
        if let Some(policy) = update.minute_metrics {
            account.service.minute_metrics = policy;
        }
    }
}

impl FileStore for MemoryStore {
    fn create_share<'a>(
        &'a self,
        name: &'a str,
        options: &'a ShareOptions,
    ) -> StoreFuture<'a, ShareRef> {
        Box::pin(async move { self.create_share_sync(name, options) })
    }

    fn delete_share<'a>(&'a self, share: &'a ShareRef) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.delete_share_sync(share) })
    }

    fn share_exists<'a>(&'a self, name: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move { Ok(self.lock_state().shares.contains_key(name)) })
    }

    fn share_properties<'a>(&'a self, share: &'a ShareRef) -> StoreFuture<'a, ShareProperties> {
        Box::pin(async move { self.share_properties_sync(share) })
    }

    fn list_shares<'a>(&'a self, prefix: Option<&'a str>) -> StoreFuture<'a, NameList> {
        Box::pin(async move { Ok(self.list_shares_sync(prefix)) })
    }

    fn create_directory<'a>(
        &'a self,
        share: &'a ShareRef,
        path: &'a str,
        metadata: &'a Metadata,
    ) -> StoreFuture<'a, DirectoryRef> {
        Box::pin(async move { self.create_directory_sync(share, path, metadata) })
    }

    fn delete_directory<'a>(&'a self, directory: &'a DirectoryRef) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.delete_directory_sync(directory) })
    }

    fn directory_properties<'a>(
        &'a self,
        directory: &'a DirectoryRef,
    ) -> StoreFuture<'a, DirectoryProperties> {
        Box::pin(async move { self.directory_properties_sync(directory) })
    }

    fn list_children<'a>(
        &'a self,
        share: &'a ShareRef,
        directory: Option<&'a str>,
    ) -> StoreFuture<'a, NameList> {
        Box::pin(async move { self.list_children_sync(share, directory) })
    }

    fn create_file<'a>(
        &'a self,
        file: &'a FileRef,
        size: u64,
        metadata: &'a Metadata,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.create_file_sync(file, size, metadata) })
    }

    fn upload_file<'a>(
        &'a self,
        file: &'a FileRef,
        content: &'a [u8],
        metadata: &'a Metadata,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.upload_file_sync(file, content, metadata) })
    }

    fn download_file<'a>(&'a self, file: &'a FileRef) -> StoreFuture<'a, Vec<u8>> {
        Box::pin(async move { self.download_file_sync(file) })
    }

    fn delete_file<'a>(&'a self, file: &'a FileRef) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.delete_file_sync(file) })
    }

    fn file_properties<'a>(&'a self, file: &'a FileRef) -> StoreFuture<'a, FileProperties> {
        Box::pin(async move { self.file_properties_sync(file) })
    }

    fn write_range<'a>(
        &'a self,
        file: &'a FileRef,
        offset: u64,
        data: &'a [u8],
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.write_range_sync(file, offset, data) })
    }

    fn list_ranges<'a>(&'a self, file: &'a FileRef) -> StoreFuture<'a, Vec<ByteRange>> {
        Box::pin(async move { self.list_ranges_sync(file) })
    }

    fn file_url(&self, file: &FileRef) -> String {
        format!("{}/{}", self.endpoint, file.full_path())
    }

    fn copy_file_from_url<'a>(
        &'a self,
        destination: &'a FileRef,
        source_url: &'a str,
    ) -> StoreFuture<'a, CopyState> {
        Box::pin(async move { self.copy_from_url_sync(destination, source_url) })
    }

    fn abort_copy<'a>(&'a self, file: &'a FileRef, copy_id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.abort_copy_sync(file, copy_id) })
    }

    fn service_properties<'a>(&'a self) -> StoreFuture<'a, ServiceProperties> {
        Box::pin(async move { Ok(self.lock_state().service.clone()) })
    }

    fn set_service_properties<'a>(
        &'a self,
        update: &'a ServicePropertiesUpdate,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.set_service_properties_sync(update);
            Ok(())
        })
    }
}

fn parse_file_path(relative: &str) -> Option<FileRef> {
    let parts: Vec<&str> = relative.split('/').collect();
    match parts.as_slice() {
        [share, name] if !share.is_empty() && !name.is_empty() => Some(FileRef {
            share: (*share).to_owned(),
            directory: None,
            name: (*name).to_owned(),
        }),
        [share, directory, name]
            if !share.is_empty() && !directory.is_empty() && !name.is_empty() =>
        {
            Some(FileRef {
                share: (*share).to_owned(),
                directory: Some((*directory).to_owned()),
                name: (*name).to_owned(),
            })
        }
        _ => None,
    }
}

fn oversized_offset(file: &FileRef) -> StoreError {
    StoreError::Service {
        message: format!(
            "offset beyond addressable memory for '{}'",
            file.full_path()
        ),
    }
}

//! Account state held by the in-memory store.

use std::collections::BTreeMap;

use crate::memory::ranges::RangeSet;
use crate::store::{
    CopyState, FileRef, Metadata, ResourceKind, ServiceProperties, StoreError,
};

/// Whole-account state guarded by the store's mutex.
#[derive(Default)]
pub(super) struct Account {
    pub(super) shares: BTreeMap<String, ShareRecord>,
    pub(super) service: ServiceProperties,
    pub(super) defer_copies: bool,
}

impl Account {
    pub(super) fn share(&self, name: &str) -> Result<&ShareRecord, StoreError> {
        self.shares
            .get(name)
            .ok_or_else(|| StoreError::not_found(ResourceKind::Share, name))
    }

    pub(super) fn share_mut(&mut self, name: &str) -> Result<&mut ShareRecord, StoreError> {
        self.shares
            .get_mut(name)
            .ok_or_else(|| StoreError::not_found(ResourceKind::Share, name))
    }
}

/// One share with its metadata, quota and contents.
pub(super) struct ShareRecord {
    pub(super) metadata: Metadata,
    pub(super) quota_gb: Option<u32>,
    pub(super) root_files: BTreeMap<String, FileRecord>,
    pub(super) directories: BTreeMap<String, DirectoryRecord>,
}

impl ShareRecord {
    pub(super) const fn new(metadata: Metadata, quota_gb: Option<u32>) -> Self {
        Self {
            metadata,
            quota_gb,
            root_files: BTreeMap::new(),
            directories: BTreeMap::new(),
        }
    }

    pub(super) fn directory(
        &self,
        share_name: &str,
        path: &str,
    ) -> Result<&DirectoryRecord, StoreError> {
        self.directories.get(path).ok_or_else(|| {
            StoreError::not_found(ResourceKind::Directory, format!("{share_name}/{path}"))
        })
    }

    pub(super) fn directory_mut(
        &mut self,
        share_name: &str,
        path: &str,
    ) -> Result<&mut DirectoryRecord, StoreError> {
        self.directories.get_mut(path).ok_or_else(|| {
            StoreError::not_found(ResourceKind::Directory, format!("{share_name}/{path}"))
        })
    }

    pub(super) fn file(&self, file: &FileRef) -> Result<&FileRecord, StoreError> {
        let slot = match &file.directory {
            None => self.root_files.get(&file.name),
            Some(directory) => self
                .directory(&file.share, directory)?
                .files
                .get(&file.name),
        };
        slot.ok_or_else(|| StoreError::not_found(ResourceKind::File, file.full_path()))
    }

    pub(super) fn file_mut(&mut self, file: &FileRef) -> Result<&mut FileRecord, StoreError> {
        let slot = match &file.directory {
            None => self.root_files.get_mut(&file.name),
            Some(directory) => self
                .directory_mut(&file.share, directory)?
                .files
                .get_mut(&file.name),
        };
        slot.ok_or_else(|| StoreError::not_found(ResourceKind::File, file.full_path()))
    }

    /// Removes a file, reporting which level of the path was missing.
    pub(super) fn remove_file(&mut self, file: &FileRef) -> Result<(), StoreError> {
        let removed = match &file.directory {
            None => self.root_files.remove(&file.name),
            Some(directory) => self
                .directory_mut(&file.share, directory)?
                .files
                .remove(&file.name),
        };
        removed
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(ResourceKind::File, file.full_path()))
    }

    /// Places a file record under its parent, replacing any existing entry.
    /// The parent directory must already exist.
    pub(super) fn insert_file(&mut self, file: &FileRef, record: FileRecord) -> Result<(), StoreError> {
        match &file.directory {
            None => {
                self.root_files.insert(file.name.clone(), record);
            }
            Some(directory) => {
                self.directory_mut(&file.share, directory)?
                    .files
                    .insert(file.name.clone(), record);
            }
        }
        Ok(())
    }

    /// Length of the existing file at `file`, or zero when absent.
    pub(super) fn existing_len(&self, file: &FileRef) -> u64 {
        self.file(file).map_or(0, |record| byte_len(&record.content))
    }

    pub(super) fn used_bytes(&self) -> u64 {
        let root: u64 = self
            .root_files
            .values()
            .map(|record| byte_len(&record.content))
            .sum();
        let nested: u64 = self
            .directories
            .values()
            .flat_map(|directory| directory.files.values())
            .map(|record| byte_len(&record.content))
            .sum();
        root.saturating_add(nested)
    }

    /// Checks that adding `new_bytes` (after freeing `replacing` bytes) stays
    /// within the share quota, when one is set.
    pub(super) fn ensure_quota(
        &self,
        share_name: &str,
        new_bytes: u64,
        replacing: u64,
    ) -> Result<(), StoreError> {
        let Some(quota_gb) = self.quota_gb else {
            return Ok(());
        };
        let limit = u64::from(quota_gb).saturating_mul(super::BYTES_PER_GIB);
        let used = self.used_bytes().saturating_sub(replacing);
        if used.saturating_add(new_bytes) > limit {
            return Err(StoreError::QuotaExceeded {
                share: share_name.to_owned(),
                quota_gb,
                requested: new_bytes,
            });
        }
        Ok(())
    }
}

/// One directory with its metadata and files.
pub(super) struct DirectoryRecord {
    pub(super) metadata: Metadata,
    pub(super) files: BTreeMap<String, FileRecord>,
}

impl DirectoryRecord {
    pub(super) const fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            files: BTreeMap::new(),
        }
    }
}

/// One file with its content, written ranges and copy state.
pub(super) struct FileRecord {
    pub(super) metadata: Metadata,
    pub(super) content: Vec<u8>,
    pub(super) written: RangeSet,
    pub(super) copy: Option<CopyState>,
    /// Content a deferred copy will install once it completes.
    pub(super) pending_content: Option<Vec<u8>>,
}

impl FileRecord {
    /// File holding `content`, with its full extent marked written.
    pub(super) fn with_content(metadata: Metadata, content: Vec<u8>) -> Self {
        let mut written = RangeSet::default();
        if let Some(last) = byte_len(&content).checked_sub(1) {
            written.insert(0, last);
        }
        Self {
            metadata,
            content,
            written,
            copy: None,
            pending_content: None,
        }
    }

    /// Zero-filled file of `size` bytes with no written ranges.
    pub(super) fn allocated(metadata: Metadata, size: usize) -> Self {
        Self {
            metadata,
            content: vec![0; size],
            written: RangeSet::default(),
            copy: None,
            pending_content: None,
        }
    }
}

/// Length of a byte buffer as the wire-level `u64`.
pub(super) fn byte_len(content: &[u8]) -> u64 {
    u64::try_from(content.len()).unwrap_or(u64::MAX)
}

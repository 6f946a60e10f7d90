//! Data model shared by file-store implementations and their callers.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::error::StoreError;

/// Maximum quota a share can be created with, in GiB.
pub const MAX_SHARE_QUOTA_GB: u32 = 5120;

/// Maximum serialized size of a metadata map, in bytes.
pub const METADATA_MAX_BYTES: usize = 8192;

/// Handle for a share owned by the caller until explicitly released.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct ShareRef {
    /// Share name, unique within the account.
    pub name: String,
}

impl ShareRef {
    /// Creates a handle for the named share.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Handle for a directory inside a share.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirectoryRef {
    /// Name of the share holding the directory.
    pub share: String,
    /// Directory name within the share.
    pub path: String,
}

impl DirectoryRef {
    /// Creates a handle for the named directory inside `share`.
    #[must_use]
    pub fn new(share: &ShareRef, path: impl Into<String>) -> Self {
        Self {
            share: share.name.clone(),
            path: path.into(),
        }
    }

    /// Renders the account-relative path, for example `myshare/mydirectory`.
    #[must_use]
    pub fn full_path(&self) -> String {
        format!("{}/{}", self.share, self.path)
    }
}

/// Handle for a file in a share root or inside a directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileRef {
    /// Name of the share holding the file.
    pub share: String,
    /// Directory holding the file, or `None` for the share root.
    pub directory: Option<String>,
    /// File name within its parent.
    pub name: String,
}

impl FileRef {
    /// Creates a handle for a file in the root of `share`.
    #[must_use]
    pub fn in_share_root(share: &ShareRef, name: impl Into<String>) -> Self {
        Self {
            share: share.name.clone(),
            directory: None,
            name: name.into(),
        }
    }

    /// Creates a handle for a file inside `directory`.
    #[must_use]
    pub fn in_directory(directory: &DirectoryRef, name: impl Into<String>) -> Self {
        Self {
            share: directory.share.clone(),
            directory: Some(directory.path.clone()),
            name: name.into(),
        }
    }

    /// Renders the account-relative path, for example `myshare/dir/file.txt`.
    #[must_use]
    pub fn full_path(&self) -> String {
        self.directory.as_ref().map_or_else(
            || format!("{}/{}", self.share, self.name),
            |directory| format!("{}/{}/{}", self.share, directory, self.name),
        )
    }
}

/// String key-value annotations attached to shares, directories and files.
///
/// Keys are kept in sorted order so listings and comparisons are stable.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata {
    entries: BTreeMap<String, String>,
}

impl Metadata {
    /// Creates an empty metadata map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Creates a metadata map from key-value pairs.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Inserts or replaces one entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Looks up the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Checks the documented limits: identifier-like keys and a total
    /// serialized size of at most [`METADATA_MAX_BYTES`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidName`] for a malformed key and
    /// [`StoreError::Validation`] when the map is too large.
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut total = 0usize;
        for (key, value) in &self.entries {
            if !is_identifier_like(key) {
                return Err(StoreError::InvalidName {
                    name: key.clone(),
                    rule: "metadata keys must start with a letter or underscore \
                           and contain only letters, digits and underscores",
                });
            }
            total = total.saturating_add(key.len()).saturating_add(value.len());
        }
        if total > METADATA_MAX_BYTES {
            return Err(StoreError::Validation(format!(
                "metadata exceeds the {METADATA_MAX_BYTES} byte limit"
            )));
        }
        Ok(())
    }
}

fn is_identifier_like(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Inclusive byte range inside a file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ByteRange {
    /// Offset of the first byte.
    pub start: u64,
    /// Offset of the last byte.
    pub end: u64,
}

impl ByteRange {
    /// Creates a range covering `start..=end`.
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered by the range.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.start).saturating_add(1)
    }

    /// True when the range covers no bytes; never the case for well-formed
    /// ranges, which are inclusive on both ends.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Progress of a server-side copy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CopyStatus {
    /// The service accepted the copy and is still transferring bytes.
    Pending,
    /// The copy finished and the destination holds the source content.
    Success,
    /// The copy failed on the service side.
    Failed,
    /// The copy was aborted before it completed.
    Aborted,
}

impl CopyStatus {
    /// True when the status can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Identifier and status of the most recent copy targeting a file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CopyState {
    /// Service-assigned identifier, required to abort the copy.
    pub id: String,
    /// Current status.
    pub status: CopyStatus,
}

/// Properties reported for a share.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShareProperties {
    /// Metadata attached at creation or by a later update.
    pub metadata: Metadata,
    /// Configured quota in GiB, when one was set.
    pub quota_gb: Option<u32>,
}

/// Properties reported for a directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirectoryProperties {
    /// Metadata attached at creation.
    pub metadata: Metadata,
}

/// Properties reported for a file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileProperties {
    /// Allocated length in bytes.
    pub length: u64,
    /// Metadata attached to the file.
    pub metadata: Metadata,
    /// State of the most recent copy targeting this file, if any.
    pub copy: Option<CopyState>,
}

/// Creation-time options for a share.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ShareOptions {
    /// Metadata to attach to the share.
    pub metadata: Metadata,
    /// Quota in GiB. `None` leaves the share unbounded.
    pub quota_gb: Option<u32>,
}

impl ShareOptions {
    /// Starts a builder for [`ShareOptions`].
    #[must_use]
    pub fn builder() -> ShareOptionsBuilder {
        ShareOptionsBuilder::default()
    }
}

/// Builder for [`ShareOptions`] that defers validation to construction.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ShareOptionsBuilder {
    metadata: Metadata,
    quota_gb: Option<u32>,
}

impl ShareOptionsBuilder {
    /// Sets the metadata to attach to the share.
    #[must_use]
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the share quota in GiB.
    #[must_use]
    pub fn quota_gb(mut self, quota_gb: u32) -> Self {
        self.quota_gb = Some(quota_gb);
        self
    }

    /// Builds the options, checking the quota range and metadata limits.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when the quota falls outside
    /// `1..=`[`MAX_SHARE_QUOTA_GB`], or a metadata error from
    /// [`Metadata::validate`].
    pub fn build(self) -> Result<ShareOptions, StoreError> {
        if let Some(quota_gb) = self.quota_gb
            && !(1..=MAX_SHARE_QUOTA_GB).contains(&quota_gb)
        {
            return Err(StoreError::Validation(format!(
                "quota_gb must be between 1 and {MAX_SHARE_QUOTA_GB}, got {quota_gb}"
            )));
        }
        self.metadata.validate()?;
        Ok(ShareOptions {
            metadata: self.metadata,
            quota_gb: self.quota_gb,
        })
    }
}

/// Single-pass sequence of names returned by list operations.
///
/// The sequence is finite and is consumed as it is traversed; there is no way
/// to rewind it. Callers that need the names more than once collect them
/// first.
#[derive(Debug)]
pub struct NameList {
    names: VecDeque<String>,
}

impl NameList {
    /// Wraps an already-materialised batch of names.
    #[must_use]
    pub fn from_names(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }
}

impl Iterator for NameList {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.names.pop_front()
    }
}

/// One CORS rule exposed through the service properties.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CorsRule {
    /// Origins allowed to issue cross-origin requests; `*` allows any.
    pub allowed_origins: Vec<String>,
    /// HTTP methods the rule applies to.
    pub allowed_methods: Vec<String>,
    /// Request headers allowed in preflight checks; `*` allows any.
    pub allowed_headers: Vec<String>,
    /// Response headers exposed to the browser; `*` exposes any.
    pub exposed_headers: Vec<String>,
    /// How long a preflight response may be cached, in seconds.
    pub max_age_secs: u32,
}

/// How long metric records are retained.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RetentionPolicy {
    /// Whether retention is applied at all.
    pub enabled: bool,
    /// Number of days records are kept for.
    pub days: u32,
}

/// One metrics aggregation level (hourly or per-minute).
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MetricsPolicy {
    /// Whether the service records metrics at this level.
    pub enabled: bool,
    /// Whether API call statistics are included.
    pub include_apis: bool,
    /// Retention applied to recorded metrics.
    pub retention: RetentionPolicy,
}

/// Account-level service settings.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServiceProperties {
    /// Configured CORS rules, in evaluation order.
    pub cors: Vec<CorsRule>,
    /// Hourly metrics settings.
    pub hour_metrics: MetricsPolicy,
    /// Per-minute metrics settings.
    pub minute_metrics: MetricsPolicy,
}

/// Partial update of [`ServiceProperties`]; `None` fields keep their value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ServicePropertiesUpdate {
    /// Replacement CORS rule list.
    pub cors: Option<Vec<CorsRule>>,
    /// Replacement hourly metrics settings.
    pub hour_metrics: Option<MetricsPolicy>,
    /// Replacement per-minute metrics settings.
    pub minute_metrics: Option<MetricsPolicy>,
}

impl ServicePropertiesUpdate {
    /// Creates an update that touches nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cors: None,
            hour_metrics: None,
            minute_metrics: None,
        }
    }

    /// Replaces the CORS rule list.
    #[must_use]
    pub fn with_cors(mut self, rules: Vec<CorsRule>) -> Self {
        self.cors = Some(rules);
        self
    }

    /// Replaces the hourly metrics settings.
    #[must_use]
    pub fn with_hour_metrics(mut self, policy: MetricsPolicy) -> Self {
        self.hour_metrics = Some(policy);
        self
    }

    /// Replaces the per-minute metrics settings.
    #[must_use]
    pub fn with_minute_metrics(mut self, policy: MetricsPolicy) -> Self {
        self.minute_metrics = Some(policy);
        self
    }
}

//! Records returned by the aptly API and the parameter structs used to
//! create or change them.
//!
//! # Design
//! Records mirror the server's PascalCase JSON and are decoded with serde.
//! Optional wire fields are `Option`s, except the mirror flags, which the
//! domain wants as plain booleans defaulting to `false`. A `null` list or flag
//! reads like a missing one. Parameter structs implement `Default` so callers
//! spell out only what they want to set; every unset field is left out of the
//! request body.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Read `null` as the type's empty value.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A local package repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Repo {
    pub name: String,
    pub comment: Option<String>,
    pub default_distribution: Option<String>,
    pub default_component: Option<String>,
}

/// Optional repository attributes for `create` and `edit`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepoFields {
    pub comment: Option<String>,
    pub default_distribution: Option<String>,
    pub default_component: Option<String>,
}

/// Outcome of importing uploaded files into a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileReport {
    #[serde(deserialize_with = "nullable")]
    pub failed_files: Vec<String>,
    #[serde(default, deserialize_with = "report_categories")]
    pub report: BTreeMap<String, Vec<String>>,
}

fn report_categories<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let categories = Option::<BTreeMap<String, Option<Vec<String>>>>::deserialize(deserializer)?;
    Ok(categories
        .unwrap_or_default()
        .into_iter()
        .map(|(category, entries)| (category, entries.unwrap_or_default()))
        .collect())
}

/// A snapshot of a repository, mirror or package list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Snapshot {
    pub name: String,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Parse a snapshot timestamp. Timestamps without an offset are UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(stamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid CreatedAt timestamp {raw}: {e}"))
}

fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_timestamp(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

/// Server-side ordering for `SnapshotsApi::list`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSort {
    #[default]
    Name,
    Time,
}

impl SnapshotSort {
    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotSort::Name => "name",
            SnapshotSort::Time => "time",
        }
    }
}

impl FromStr for SnapshotSort {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SnapshotSort::Name),
            "time" => Ok(SnapshotSort::Time),
            other => Err(ApiError::Usage(format!(
                "snapshot list only supports two sort modes: 'name' and 'time'. {other} is not supported"
            ))),
        }
    }
}

/// One row of a snapshot diff. A side is `None` when the package only
/// exists in the other snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageDiff {
    pub left: Option<String>,
    pub right: Option<String>,
}

/// A package. Only `key` is known when the server answered with bare keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "PackageListing")]
pub struct Package {
    pub key: String,
    pub short_key: Option<String>,
    pub files_hash: Option<String>,
    pub fields: Option<BTreeMap<String, String>>,
}

impl Package {
    pub fn from_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            short_key: None,
            files_hash: None,
            fields: None,
        }
    }
}

/// aptly lists bare keys by default and full objects for `format=details`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PackageListing {
    Key(String),
    Detailed(Map<String, Value>),
}

impl TryFrom<PackageListing> for Package {
    type Error = String;

    fn try_from(listing: PackageListing) -> Result<Self, Self::Error> {
        let obj = match listing {
            PackageListing::Key(key) => return Ok(Package::from_key(key)),
            PackageListing::Detailed(obj) => obj,
        };
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        let key = text("Key").ok_or_else(|| format!("package without a Key: {}", Value::Object(obj.clone())))?;
        let short_key = text("ShortKey");
        let files_hash = text("FilesHash");
        // non-string scalars keep their JSON text
        let fields = obj
            .into_iter()
            .map(|(name, value)| match value {
                Value::String(s) => (name, s),
                other => (name, other.to_string()),
            })
            .collect();
        Ok(Package {
            key,
            short_key,
            files_hash,
            fields: Some(fields),
        })
    }
}

/// What a publish endpoint is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Local,
    Snapshot,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Local => "local",
            SourceKind::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(SourceKind::Local),
            "snapshot" => Ok(SourceKind::Snapshot),
            other => Err(ApiError::Usage(format!(
                "source kind must be 'local' or 'snapshot', not {other}"
            ))),
        }
    }
}

/// One repository or snapshot published under an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishSource {
    pub name: String,
    pub component: Option<String>,
}

/// A source descriptor as supplied by callers: `Name` (or `name`) is
/// required, `Component` (or `component`) optional.
pub type SourceDescriptor = BTreeMap<String, String>;

/// A published repository or snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishEndpoint {
    pub storage: String,
    pub prefix: String,
    pub distribution: String,
    pub source_kind: SourceKind,
    pub sources: Vec<PublishSource>,
    #[serde(deserialize_with = "nullable")]
    pub architectures: Vec<String>,
    pub label: String,
    pub origin: String,
    #[serde(default, deserialize_with = "nullable")]
    pub acquire_by_hash: bool,
}

/// GPG signing parameters shared by publish and update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SigningOptions {
    pub skip: bool,
    pub batch: bool,
    pub gpg_key: Option<String>,
    pub keyring: Option<String>,
    pub secret_keyring: Option<String>,
    pub passphrase: Option<String>,
    pub passphrase_file: Option<String>,
}

impl Default for SigningOptions {
    fn default() -> Self {
        Self {
            skip: false,
            batch: true,
            gpg_key: None,
            keyring: None,
            secret_keyring: None,
            passphrase: None,
            passphrase_file: None,
        }
    }
}

impl SigningOptions {
    /// Publish without signing.
    pub fn skip() -> Self {
        Self {
            skip: true,
            ..Self::default()
        }
    }

    /// Sign with `gpg_key` in batch mode.
    pub fn with_key(gpg_key: impl Into<String>) -> Self {
        Self {
            gpg_key: Some(gpg_key.into()),
            ..Self::default()
        }
    }
}

/// Parameters of a new publish endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PublishOptions {
    pub source_kind: SourceKind,
    pub sources: Vec<SourceDescriptor>,
    pub architectures: Vec<String>,
    pub prefix: Option<String>,
    pub distribution: Option<String>,
    pub label: Option<String>,
    pub origin: Option<String>,
    pub force_overwrite: bool,
    pub acquire_by_hash: bool,
    pub signing: SigningOptions,
}

/// Parameters for re-publishing an existing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PublishUpdate {
    pub snapshots: Vec<SourceDescriptor>,
    pub force_overwrite: bool,
    pub acquire_by_hash: bool,
    pub signing: SigningOptions,
}

/// A mirror of a remote Debian archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Mirror {
    #[serde(rename = "UUID")]
    pub uuid: Option<String>,
    pub name: String,
    #[serde(rename = "ArchiveRoot")]
    pub archive_url: String,
    pub distribution: Option<String>,
    pub components: Option<Vec<String>>,
    pub architectures: Option<Vec<String>>,
    pub meta: Option<BTreeMap<String, String>>,
    #[serde(rename = "LastDownloadDate")]
    pub download_date: Option<String>,
    pub filter: Option<String>,
    pub status: Option<i64>,
    #[serde(rename = "WorkerPID")]
    pub worker_pid: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub filter_with_deps: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub skip_component_check: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub skip_architecture_check: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub download_sources: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub download_udebs: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub download_installer: bool,
}

/// Parameters of a new mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MirrorCreate {
    pub name: String,
    pub archive_url: String,
    pub distribution: Option<String>,
    pub filter: Option<String>,
    pub components: Vec<String>,
    pub architectures: Vec<String>,
    pub keyrings: Vec<String>,
    pub download_sources: bool,
    pub download_udebs: bool,
    pub download_installer: bool,
    pub filter_with_deps: bool,
    pub skip_component_check: bool,
    pub skip_architecture_check: bool,
    pub ignore_signatures: bool,
}

impl MirrorCreate {
    pub fn new(name: impl Into<String>, archive_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            archive_url: archive_url.into(),
            ..Self::default()
        }
    }
}

/// Changes to an existing mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MirrorEdit {
    pub new_name: Option<String>,
    pub archive_url: Option<String>,
    pub filter: Option<String>,
    pub architectures: Vec<String>,
    pub components: Vec<String>,
    pub keyrings: Vec<String>,
    pub filter_with_deps: bool,
    pub skip_existing_packages: bool,
    pub download_sources: bool,
    pub download_udebs: bool,
    pub skip_component_check: bool,
    pub ignore_checksums: bool,
    pub ignore_signatures: bool,
    pub force_update: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_sort_parses_known_modes() {
        assert_eq!("name".parse::<SnapshotSort>().unwrap(), SnapshotSort::Name);
        assert_eq!("time".parse::<SnapshotSort>().unwrap(), SnapshotSort::Time);
    }

    #[test]
    fn snapshot_sort_rejects_unknown_mode() {
        let err = "snoepsort".parse::<SnapshotSort>().unwrap_err();
        assert!(matches!(err, ApiError::Usage(_)));
        assert_eq!(err.status_code(), 0);
    }

    #[test]
    fn signing_defaults_to_batch() {
        let signing = SigningOptions::default();
        assert!(signing.batch);
        assert!(!signing.skip);
        assert!(SigningOptions::skip().skip);
    }

    #[test]
    fn package_from_key_leaves_details_empty() {
        let pkg = Package::from_key("Pamd64 foo 1.0 abcd1234");
        assert_eq!(pkg.key, "Pamd64 foo 1.0 abcd1234");
        assert_eq!(pkg.short_key, None);
        assert_eq!(pkg.files_hash, None);
        assert_eq!(pkg.fields, None);
    }
}

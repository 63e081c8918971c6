//! Synchronous client for the aptly package repository HTTP API.
//!
//! # Overview
//! Typed calls for repositories, snapshots, publish endpoints, mirrors,
//! packages, file uploads and the server meta endpoints. Each call builds a
//! plain-data `HttpRequest`, hands it to a `Transport` and parses the
//! `HttpResponse` into a typed record.
//!
//! ```no_run
//! use aptly_client::{AptlyClient, RepoFields};
//!
//! # fn main() -> Result<(), aptly_client::ApiError> {
//! let client = AptlyClient::new("http://localhost:8080")?;
//! let repo = client.repos().create("nightly", &RepoFields::default())?;
//! println!("created {}", repo.name);
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - Requests and responses are data; `Transport` is the only I/O seam.
//!   `UreqTransport` is the default, tests substitute their own.
//! - Optional parameters travel only when supplied (`body::BodyBuilder`).
//! - Validation that needs no server runs before any I/O and fails with
//!   `ApiError::Usage`.
//! - Records are defined independently from the mock-server crate;
//!   integration tests catch schema drift.

pub mod auth;
pub mod body;
pub mod client;
pub mod config;
pub mod error;
pub mod escape;
pub mod files;
pub mod http;
pub mod mirrors;
pub mod misc;
mod multipart;
pub mod packages;
pub mod publish;
pub mod repos;
pub mod snapshots;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use auth::{AuthConfig, Authenticator, BasicAuth, BearerToken};
pub use client::AptlyClient;
pub use config::{ClientCertPaths, ClientConfig, TlsVerify};
pub use error::ApiError;
pub use files::UploadSource;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{
    FileReport, Mirror, MirrorCreate, MirrorEdit, Package, PackageDiff, PublishEndpoint,
    PublishOptions, PublishSource, PublishUpdate, Repo, RepoFields, SigningOptions, Snapshot,
    SnapshotSort, SourceDescriptor, SourceKind,
};

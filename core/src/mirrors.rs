//! Mirrors of remote archives: `api/mirrors`.

use serde_json::Value;

use crate::body::BodyBuilder;
use crate::client::{decode, json_body, AptlyClient};
use crate::error::ApiError;
use crate::escape;
use crate::packages::package_query;
use crate::types::{Mirror, MirrorCreate, MirrorEdit, Package};

fn create_body(mirror: &MirrorCreate) -> Value {
    BodyBuilder::new()
        .field("Name", mirror.name.as_str())
        .field("ArchiveURL", mirror.archive_url.as_str())
        .optional("Distribution", mirror.distribution.as_deref())
        .optional("Filter", mirror.filter.as_deref())
        .optional("Components", mirror.components.as_slice())
        .optional("Architectures", mirror.architectures.as_slice())
        .optional("Keyrings", mirror.keyrings.as_slice())
        .optional("DownloadSources", mirror.download_sources)
        .optional("DownloadUdebs", mirror.download_udebs)
        .optional("DownloadInstaller", mirror.download_installer)
        .optional("FilterWithDeps", mirror.filter_with_deps)
        .optional("SkipComponentCheck", mirror.skip_component_check)
        .optional("SkipArchitectureCheck", mirror.skip_architecture_check)
        .optional("IgnoreSignatures", mirror.ignore_signatures)
        .build()
}

fn edit_body(edit: &MirrorEdit) -> BodyBuilder {
    BodyBuilder::new()
        .optional("Name", edit.new_name.as_deref())
        .optional("ArchiveURL", edit.archive_url.as_deref())
        .optional("Filter", edit.filter.as_deref())
        .optional("Architectures", edit.architectures.as_slice())
        .optional("Components", edit.components.as_slice())
        .optional("Keyrings", edit.keyrings.as_slice())
        .optional("FilterWithDeps", edit.filter_with_deps)
        .optional("SkipExistingPackages", edit.skip_existing_packages)
        .optional("DownloadSources", edit.download_sources)
        .optional("DownloadUdebs", edit.download_udebs)
        .optional("SkipComponentCheck", edit.skip_component_check)
        .optional("IgnoreChecksums", edit.ignore_checksums)
        .optional("IgnoreSignatures", edit.ignore_signatures)
        .optional("ForceUpdate", edit.force_update)
}

/// `api/mirrors`
pub struct MirrorsApi<'a> {
    client: &'a AptlyClient,
}

impl<'a> MirrorsApi<'a> {
    pub(crate) fn new(client: &'a AptlyClient) -> Self {
        Self { client }
    }

    fn path(name: &str) -> String {
        format!("api/mirrors/{}", escape::segment(name))
    }

    pub fn list(&self) -> Result<Vec<Mirror>, ApiError> {
        let response = self.client.get("api/mirrors", &[])?;
        decode(&response)
    }

    pub fn show(&self, name: &str) -> Result<Mirror, ApiError> {
        let response = self.client.get(&Self::path(name), &[])?;
        decode(&response)
    }

    pub fn list_packages(
        &self,
        name: &str,
        query: Option<&str>,
        with_deps: bool,
        detailed: bool,
    ) -> Result<Vec<Package>, ApiError> {
        let params = package_query(query, with_deps, detailed)?;
        let response = self
            .client
            .get(&format!("{}/packages", Self::path(name)), &params)?;
        decode(&response)
    }

    pub fn delete(&self, name: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(name), &[], None)?;
        Ok(())
    }

    pub fn create(&self, mirror: &MirrorCreate) -> Result<Mirror, ApiError> {
        let response = self
            .client
            .post("api/mirrors", &[], json_body(create_body(mirror)), Vec::new())?;
        decode(&response)
    }

    /// Change mirror settings; at least one must be given.
    pub fn edit(&self, name: &str, edit: &MirrorEdit) -> Result<(), ApiError> {
        let body = edit_body(edit);
        if body.is_empty() {
            return Err(ApiError::Usage(
                "editing a mirror requires at least one setting to change".to_string(),
            ));
        }
        self.client
            .put(&Self::path(name), &[], json_body(body.build()), Vec::new())?;
        Ok(())
    }

    /// Start downloading the mirror's remote archive.
    pub fn update(&self, name: &str, ignore_signatures: bool) -> Result<(), ApiError> {
        let body = BodyBuilder::new()
            .optional("IgnoreSignatures", ignore_signatures)
            .build();
        self.client
            .put(&Self::path(name), &[], json_body(body), Vec::new())?;
        Ok(())
    }
}

//! Snapshots: `api/snapshots`, plus snapshot creation from repositories and
//! mirrors.

use crate::body::{BodyBuilder, Params, Present};
use crate::client::{decode, json_body, AptlyClient};
use crate::error::ApiError;
use crate::escape;
use crate::packages::package_query;
use crate::types::{Package, PackageDiff, Snapshot, SnapshotSort};

/// `api/snapshots`
pub struct SnapshotsApi<'a> {
    client: &'a AptlyClient,
}

impl<'a> SnapshotsApi<'a> {
    pub(crate) fn new(client: &'a AptlyClient) -> Self {
        Self { client }
    }

    pub fn list(&self, sort: SnapshotSort) -> Result<Vec<Snapshot>, ApiError> {
        let params = Params::new().optional("sort", Some(sort.as_str())).build();
        let response = self.client.get("api/snapshots", &params)?;
        decode(&response)
    }

    pub fn create_from_repo(
        &self,
        repo: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Snapshot, ApiError> {
        self.create_from(&format!("api/repos/{}/snapshots", escape::segment(repo)), name, description)
    }

    pub fn create_from_mirror(
        &self,
        mirror: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Snapshot, ApiError> {
        self.create_from(
            &format!("api/mirrors/{}/snapshots", escape::segment(mirror)),
            name,
            description,
        )
    }

    fn create_from(&self, path: &str, name: &str, description: Option<&str>) -> Result<Snapshot, ApiError> {
        let body = BodyBuilder::new()
            .field("Name", name)
            .optional("Description", description)
            .build();
        let response = self.client.post(path, &[], json_body(body), Vec::new())?;
        decode(&response)
    }

    /// Snapshot built from other snapshots and explicit package keys.
    pub fn create_from_packages(
        &self,
        name: &str,
        description: Option<&str>,
        source_snapshots: &[&str],
        package_refs: &[&str],
    ) -> Result<Snapshot, ApiError> {
        let body = BodyBuilder::new()
            .field("Name", name)
            .optional("Description", description)
            .optional("SourceSnapshots", source_snapshots)
            .optional("PackageRefs", package_refs)
            .build();
        let response = self
            .client
            .post("api/snapshots", &[], json_body(body), Vec::new())?;
        decode(&response)
    }

    /// Rename a snapshot or change its description.
    pub fn update(
        &self,
        name: &str,
        new_name: Option<&str>,
        new_description: Option<&str>,
    ) -> Result<Snapshot, ApiError> {
        if !new_name.is_present() && !new_description.is_present() {
            return Err(ApiError::Usage(
                "updating a snapshot requires a new name or a new description".to_string(),
            ));
        }
        let body = BodyBuilder::new()
            .optional("Name", new_name)
            .optional("Description", new_description)
            .build();
        let response = self.client.put(
            &format!("api/snapshots/{}", escape::segment(name)),
            &[],
            json_body(body),
            Vec::new(),
        )?;
        decode(&response)
    }

    pub fn show(&self, name: &str) -> Result<Snapshot, ApiError> {
        let response = self
            .client
            .get(&format!("api/snapshots/{}", escape::segment(name)), &[])?;
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
        let response = self.client.get(
            &format!("api/snapshots/{}/packages", escape::segment(name)),
            &params,
        )?;
        decode(&response)
    }

    pub fn delete(&self, name: &str, force: bool) -> Result<(), ApiError> {
        let params = Params::new().flag("force", force).build();
        self.client
            .delete(&format!("api/snapshots/{}", escape::segment(name)), &params, None)?;
        Ok(())
    }

    /// Packages that differ between `left` and `right`.
    pub fn diff(&self, left: &str, right: &str) -> Result<Vec<PackageDiff>, ApiError> {
        let response = self.client.get(
            &format!(
                "api/snapshots/{}/diff/{}",
                escape::segment(left),
                escape::segment(right)
            ),
            &[],
        )?;
        decode(&response)
    }
}

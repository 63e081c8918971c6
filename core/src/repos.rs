//! Local repositories: `api/repos`.

use serde_json::Value;

use crate::body::{BodyBuilder, Params};
use crate::client::{decode, json_body, AptlyClient};
use crate::error::ApiError;
use crate::escape;
use crate::packages::package_query;
use crate::types::{FileReport, Package, Repo, RepoFields};

fn repo_body(fields: &RepoFields) -> BodyBuilder {
    BodyBuilder::new()
        .optional("Comment", fields.comment.as_deref())
        .optional("DefaultDistribution", fields.default_distribution.as_deref())
        .optional("DefaultComponent", fields.default_component.as_deref())
}

fn package_refs(keys: &[&str]) -> Value {
    BodyBuilder::new().field("PackageRefs", keys).build()
}

/// `api/repos`
pub struct ReposApi<'a> {
    client: &'a AptlyClient,
}

impl<'a> ReposApi<'a> {
    pub(crate) fn new(client: &'a AptlyClient) -> Self {
        Self { client }
    }

    pub fn create(&self, name: &str, fields: &RepoFields) -> Result<Repo, ApiError> {
        let body = repo_body(fields).field("Name", name).build();
        let response = self.client.post("api/repos", &[], json_body(body), Vec::new())?;
        decode(&response)
    }

    pub fn show(&self, name: &str) -> Result<Repo, ApiError> {
        let response = self
            .client
            .get(&format!("api/repos/{}", escape::segment(name)), &[])?;
        decode(&response)
    }

    pub fn search_packages(
        &self,
        name: &str,
        query: Option<&str>,
        with_deps: bool,
        detailed: bool,
    ) -> Result<Vec<Package>, ApiError> {
        let params = package_query(query, with_deps, detailed)?;
        let response = self.client.get(
            &format!("api/repos/{}/packages", escape::segment(name)),
            &params,
        )?;
        decode(&response)
    }

    /// Change repository attributes; at least one must be given.
    pub fn edit(&self, name: &str, fields: &RepoFields) -> Result<Repo, ApiError> {
        let body = repo_body(fields);
        if body.is_empty() {
            return Err(ApiError::Usage(
                "editing a repository requires at least one of comment, default distribution or default component"
                    .to_string(),
            ));
        }
        let response = self.client.put(
            &format!("api/repos/{}", escape::segment(name)),
            &[],
            json_body(body.build()),
            Vec::new(),
        )?;
        decode(&response)
    }

    pub fn list(&self) -> Result<Vec<Repo>, ApiError> {
        let response = self.client.get("api/repos", &[])?;
        decode(&response)
    }

    pub fn delete(&self, name: &str, force: bool) -> Result<(), ApiError> {
        let params = Params::new().flag("force", force).build();
        self.client
            .delete(&format!("api/repos/{}", escape::segment(name)), &params, None)?;
        Ok(())
    }

    /// Import files previously uploaded to `directory` (or just `file` in
    /// it) into the repository.
    pub fn add_uploaded_file(
        &self,
        name: &str,
        directory: &str,
        file: Option<&str>,
        remove_processed_files: bool,
        force_replace: bool,
    ) -> Result<FileReport, ApiError> {
        let mut path = format!(
            "api/repos/{}/file/{}",
            escape::segment(name),
            escape::segment(directory)
        );
        if let Some(file) = file {
            path.push('/');
            path.push_str(&escape::segment(file));
        }
        let params = Params::new()
            .flag("noRemove", !remove_processed_files)
            .flag("forceReplace", force_replace)
            .build();
        let response = self.client.post(&path, &params, None, Vec::new())?;
        decode(&response)
    }

    pub fn add_packages_by_key(&self, name: &str, keys: &[&str]) -> Result<Repo, ApiError> {
        let response = self.client.post(
            &format!("api/repos/{}/packages", escape::segment(name)),
            &[],
            json_body(package_refs(keys)),
            Vec::new(),
        )?;
        decode(&response)
    }

    pub fn delete_packages_by_key(&self, name: &str, keys: &[&str]) -> Result<Repo, ApiError> {
        let response = self.client.delete(
            &format!("api/repos/{}/packages", escape::segment(name)),
            &[],
            json_body(package_refs(keys)),
        )?;
        decode(&response)
    }
}

//! Package lookups and the listing query shared by every section that
//! lists packages.

use crate::body::{Params, Present};
use crate::client::{decode, AptlyClient};
use crate::error::ApiError;
use crate::escape;
use crate::types::Package;

/// Query parameters for package listings.
///
/// Dependency expansion needs a query to expand, so `with_deps` without one
/// is rejected before anything is sent.
pub fn package_query(
    query: Option<&str>,
    with_deps: bool,
    detailed: bool,
) -> Result<Vec<(String, String)>, ApiError> {
    if with_deps && !query.is_present() {
        return Err(ApiError::Usage(
            "with_deps has no effect without a package query".to_string(),
        ));
    }
    Ok(Params::new()
        .optional("q", query)
        .flag("withDeps", with_deps)
        .flag_value("format", detailed, "details")
        .build())
}

/// `api/packages`
pub struct PackagesApi<'a> {
    client: &'a AptlyClient,
}

impl<'a> PackagesApi<'a> {
    pub(crate) fn new(client: &'a AptlyClient) -> Self {
        Self { client }
    }

    pub fn show(&self, key: &str) -> Result<Package, ApiError> {
        let response = self
            .client
            .get(&format!("api/packages/{}", escape::segment(key)), &[])?;
        decode(&response)
    }

    /// Search the whole package pool.
    pub fn search(
        &self,
        query: Option<&str>,
        with_deps: bool,
        detailed: bool,
    ) -> Result<Vec<Package>, ApiError> {
        let params = package_query(query, with_deps, detailed)?;
        let response = self.client.get("api/packages", &params)?;
        decode(&response)
    }
}

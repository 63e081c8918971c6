//! Publish endpoints: `api/publish`.

use serde_json::Value;

use crate::body::{BodyBuilder, Params, Present};
use crate::client::{decode, json_body, AptlyClient};
use crate::error::ApiError;
use crate::escape::{escape_prefix, segment};
use crate::types::{PublishEndpoint, PublishOptions, PublishUpdate, SigningOptions, SourceDescriptor};

fn lookup<'a>(source: &'a SourceDescriptor, key: &str) -> Option<&'a String> {
    source
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// Rewrite caller-supplied descriptors into `{"Name", "Component"}` objects.
pub fn normalize_sources(sources: &[SourceDescriptor]) -> Result<Vec<Value>, ApiError> {
    sources
        .iter()
        .map(|source| -> Result<Value, ApiError> {
            let name = lookup(source, "Name").ok_or_else(|| {
                ApiError::Usage(format!("source descriptor without a Name: {source:?}"))
            })?;
            Ok(BodyBuilder::new()
                .field("Name", name.as_str())
                .optional("Component", lookup(source, "Component").map(String::as_str))
                .build())
        })
        .collect()
}

/// The `Signing` object of a publish or update body.
pub fn signing_body(signing: &SigningOptions) -> Result<Value, ApiError> {
    if signing.skip {
        return Ok(BodyBuilder::new().field("Skip", true).build());
    }
    if !signing.gpg_key.is_present() {
        return Err(ApiError::Usage(
            "publishing needs a gpg key to sign with unless signing is skipped".to_string(),
        ));
    }
    if signing.passphrase.is_present() && signing.passphrase_file.is_present() {
        return Err(ApiError::Usage(
            "a passphrase and a passphrase file can't be used together".to_string(),
        ));
    }
    Ok(BodyBuilder::new()
        .optional("Batch", signing.batch)
        .optional("GpgKey", signing.gpg_key.as_deref())
        .optional("Keyring", signing.keyring.as_deref())
        .optional("SecretKeyring", signing.secret_keyring.as_deref())
        .optional("Passphrase", signing.passphrase.as_deref())
        .optional("PassphraseFile", signing.passphrase_file.as_deref())
        .build())
}

fn endpoint_path(prefix: &str, distribution: &str) -> String {
    format!(
        "api/publish/{}/{}",
        segment(&escape_prefix(prefix)),
        segment(distribution)
    )
}

/// `api/publish`
pub struct PublishApi<'a> {
    client: &'a AptlyClient,
}

impl<'a> PublishApi<'a> {
    pub(crate) fn new(client: &'a AptlyClient) -> Self {
        Self { client }
    }

    pub fn list(&self) -> Result<Vec<PublishEndpoint>, ApiError> {
        let response = self.client.get("api/publish", &[])?;
        decode(&response)
    }

    /// Publish local repositories or snapshots under `options.prefix`.
    pub fn publish(&self, options: &PublishOptions) -> Result<PublishEndpoint, ApiError> {
        let sources = normalize_sources(&options.sources)?;
        let signing = signing_body(&options.signing)?;
        let body = BodyBuilder::new()
            .field("SourceKind", options.source_kind.as_str())
            .field("Sources", sources)
            .optional("Architectures", options.architectures.as_slice())
            .optional("Distribution", options.distribution.as_deref())
            .optional("Label", options.label.as_deref())
            .optional("Origin", options.origin.as_deref())
            .optional("ForceOverwrite", options.force_overwrite)
            .optional("AcquireByHash", options.acquire_by_hash)
            .field("Signing", signing)
            .build();

        let path = match options.prefix.as_deref().filter(|prefix| !prefix.is_empty()) {
            Some(prefix) => format!("api/publish/{}", segment(&escape_prefix(prefix))),
            None => "api/publish".to_string(),
        };
        let response = self.client.post(&path, &[], json_body(body), Vec::new())?;
        decode(&response)
    }

    /// Re-publish an endpoint, switching snapshots when given.
    pub fn update(
        &self,
        prefix: &str,
        distribution: &str,
        update: &PublishUpdate,
    ) -> Result<PublishEndpoint, ApiError> {
        let snapshots = normalize_sources(&update.snapshots)?;
        let signing = signing_body(&update.signing)?;
        let body = BodyBuilder::new()
            .optional("Snapshots", snapshots)
            .optional("ForceOverwrite", update.force_overwrite)
            .optional("AcquireByHash", update.acquire_by_hash)
            .field("Signing", signing)
            .build();
        let response = self.client.put(
            &endpoint_path(prefix, distribution),
            &[],
            json_body(body),
            Vec::new(),
        )?;
        decode(&response)
    }

    pub fn drop(&self, prefix: &str, distribution: &str, force_delete: bool) -> Result<(), ApiError> {
        let params = Params::new().flag("force", force_delete).build();
        self.client
            .delete(&endpoint_path(prefix, distribution), &params, None)?;
        Ok(())
    }
}

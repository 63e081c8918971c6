//! In-memory stand-in for a subset of the aptly REST API.
//!
//! Covers local repositories, the upload area, snapshots, publishing and the
//! meta endpoints, with aptly's JSON shapes and error bodies. Package keys
//! are derived from uploaded `name_version_arch.deb` file names; file
//! contents are not inspected.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const VERSION: &str = "1.5.0";

/// Behaviour switches for a mock instance.
#[derive(Clone, Copy, Debug)]
pub struct MockConfig {
    /// Answer `api/ready` with 200 rather than 503.
    pub ready: bool,
    /// Behave like a server that predates `api/healthy` and `api/ready`.
    pub legacy: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            ready: true,
            legacy: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Repo {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub default_distribution: String,
    #[serde(default)]
    pub default_component: String,
    #[serde(skip)]
    packages: BTreeSet<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Snapshot {
    pub name: String,
    pub created_at: String,
    pub description: String,
    #[serde(skip)]
    packages: BTreeSet<String>,
    #[serde(skip)]
    sequence: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishedSource {
    pub component: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Published {
    pub storage: String,
    pub prefix: String,
    pub distribution: String,
    pub source_kind: String,
    pub sources: Vec<PublishedSource>,
    pub architectures: Vec<String>,
    pub label: String,
    pub origin: String,
    pub acquire_by_hash: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PackageRecord {
    key: String,
    short_key: String,
    files_hash: String,
    package: String,
    version: String,
    architecture: String,
}

impl PackageRecord {
    /// Build a record from `name_version_arch.deb`.
    fn from_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name
            .strip_suffix(".deb")
            .or_else(|| file_name.strip_suffix(".udeb"))?;
        let mut parts = stem.splitn(3, '_');
        let (package, version, architecture) = (parts.next()?, parts.next()?, parts.next()?);
        if package.is_empty() || version.is_empty() || architecture.is_empty() {
            return None;
        }
        let files_hash = Uuid::new_v4().simple().to_string()[..16].to_string();
        let short_key = format!("P{architecture} {package} {version}");
        Some(Self {
            key: format!("{short_key} {files_hash}"),
            short_key,
            files_hash,
            package: package.to_string(),
            version: version.to_string(),
            architecture: architecture.to_string(),
        })
    }

    fn matches(&self, query: &str) -> bool {
        match query.strip_prefix("Name (").and_then(|rest| rest.strip_suffix(')')) {
            Some(name) => self.package == name.trim(),
            None => self.key.contains(query),
        }
    }
}

#[derive(Debug, Default)]
struct Store {
    repos: BTreeMap<String, Repo>,
    snapshots: BTreeMap<String, Snapshot>,
    uploads: BTreeMap<String, BTreeSet<String>>,
    published: Vec<Published>,
    pool: BTreeMap<String, PackageRecord>,
    sequence: u64,
}

impl Store {
    fn repo(&self, name: &str) -> Result<&Repo, Failure> {
        self.repos
            .get(name)
            .ok_or_else(|| Failure::not_found(format!("local repo with name {name} not found")))
    }

    fn repo_mut(&mut self, name: &str) -> Result<&mut Repo, Failure> {
        self.repos
            .get_mut(name)
            .ok_or_else(|| Failure::not_found(format!("local repo with name {name} not found")))
    }

    fn snapshot(&self, name: &str) -> Result<&Snapshot, Failure> {
        self.snapshots
            .get(name)
            .ok_or_else(|| Failure::not_found(format!("snapshot with name {name} not found")))
    }

    fn add_snapshot(
        &mut self,
        name: String,
        description: String,
        packages: BTreeSet<String>,
    ) -> Result<Snapshot, Failure> {
        if self.snapshots.contains_key(&name) {
            return Err(Failure::aborted(
                StatusCode::BAD_REQUEST,
                format!("snapshot with name {name} already exists"),
            ));
        }
        self.sequence += 1;
        let snapshot = Snapshot {
            name: name.clone(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            description,
            packages,
            sequence: self.sequence,
        };
        self.snapshots.insert(name, snapshot.clone());
        Ok(snapshot)
    }

    fn is_published(&self, kind: &str, name: &str) -> bool {
        self.published
            .iter()
            .any(|p| p.source_kind == kind && p.sources.iter().any(|s| s.name == name))
    }

    fn package_list(&self, keys: &BTreeSet<String>, query: &PackageQuery) -> Value {
        let records = keys
            .iter()
            .filter_map(|key| self.pool.get(key))
            .filter(|record| query.q.as_deref().map_or(true, |q| record.matches(q)));
        if query.format.as_deref() == Some("details") {
            json!(records.collect::<Vec<_>>())
        } else {
            json!(records.map(|record| record.key.as_str()).collect::<Vec<_>>())
        }
    }
}

#[derive(Clone)]
struct AppState {
    store: Arc<RwLock<Store>>,
    config: MockConfig,
}

/// An aptly error answer.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    body: Value,
}

impl Failure {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: json!({ "error": message.into() }),
        }
    }

    fn aborted(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!([{ "error": message.into(), "meta": "Operation aborted" }]),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type Reply<T> = Result<Json<T>, Failure>;

pub fn app(config: MockConfig) -> Router {
    let state = AppState {
        store: Arc::new(RwLock::new(Store::default())),
        config,
    };
    let mut router: Router<AppState> = Router::new().route("/api/version", get(version));
    if !config.legacy {
        router = router
            .route("/api/healthy", get(healthy))
            .route("/api/ready", get(ready));
    }
    router
        .route("/api/repos", get(list_repos).post(create_repo))
        .route(
            "/api/repos/{name}",
            get(show_repo).put(edit_repo).delete(delete_repo),
        )
        .route(
            "/api/repos/{name}/packages",
            get(repo_packages)
                .post(add_repo_packages)
                .delete(remove_repo_packages),
        )
        .route("/api/repos/{name}/file/{dir}", post(import_directory))
        .route("/api/repos/{name}/file/{dir}/{file}", post(import_file))
        .route("/api/repos/{name}/snapshots", post(snapshot_repo))
        .route("/api/files", get(list_upload_dirs))
        .route(
            "/api/files/{dir}",
            get(list_uploads).post(upload).delete(delete_upload_dir),
        )
        .route("/api/files/{dir}/{file}", axum::routing::delete(delete_upload))
        .route("/api/snapshots", get(list_snapshots).post(create_snapshot))
        .route(
            "/api/snapshots/{name}",
            get(show_snapshot).put(update_snapshot).delete(delete_snapshot),
        )
        .route("/api/snapshots/{name}/packages", get(snapshot_packages))
        .route("/api/snapshots/{name}/diff/{other}", get(diff_snapshots))
        .route("/api/publish", get(list_published).post(publish_root))
        .route("/api/publish/{prefix}", post(publish_prefixed))
        .route(
            "/api/publish/{prefix}/{distribution}",
            axum::routing::put(update_published).delete(drop_published),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app(config)).await
}

/// Reverse the client's prefix escaping.
pub fn unescape_prefix(escaped: &str) -> String {
    if escaped == ":." {
        return ".".to_string();
    }
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_' {
            if chars.peek() == Some(&'_') {
                chars.next();
                out.push('_');
            } else {
                out.push('/');
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Split `storage:prefix` at the last colon.
fn split_storage(raw: &str) -> (String, String) {
    match raw.rsplit_once(':') {
        Some((storage, prefix)) => (storage.to_string(), prefix.to_string()),
        None => (String::new(), raw.to_string()),
    }
}

// --- meta ---

async fn version() -> Json<Value> {
    Json(json!({ "Version": VERSION }))
}

async fn healthy() -> Json<Value> {
    Json(json!({ "Status": "Aptly is healthy" }))
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.config.ready {
        (StatusCode::OK, Json(json!({ "Status": "Aptly is ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "Status": "Aptly is unavailable" })),
        )
    }
}

// --- repos ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRepo {
    pub name: String,
    pub comment: Option<String>,
    pub default_distribution: Option<String>,
    pub default_component: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EditRepo {
    pub comment: Option<String>,
    pub default_distribution: Option<String>,
    pub default_component: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PackageQuery {
    pub q: Option<String>,
    #[serde(rename = "withDeps")]
    pub with_deps: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Flags {
    pub force: Option<String>,
    #[serde(rename = "noRemove")]
    pub no_remove: Option<String>,
    #[serde(rename = "forceReplace")]
    pub force_replace: Option<String>,
}

fn is_set(flag: &Option<String>) -> bool {
    flag.as_deref() == Some("1")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageRefs {
    pub package_refs: Vec<String>,
}

async fn list_repos(State(state): State<AppState>) -> Json<Vec<Repo>> {
    let store = state.store.read().await;
    Json(store.repos.values().cloned().collect())
}

async fn create_repo(State(state): State<AppState>, Json(input): Json<CreateRepo>) -> Reply<Repo> {
    let mut store = state.store.write().await;
    if store.repos.contains_key(&input.name) {
        return Err(Failure::aborted(
            StatusCode::BAD_REQUEST,
            format!("local repo with name {} already exists", input.name),
        ));
    }
    let repo = Repo {
        name: input.name.clone(),
        comment: input.comment.unwrap_or_default(),
        default_distribution: input.default_distribution.unwrap_or_default(),
        default_component: input.default_component.unwrap_or_default(),
        packages: BTreeSet::new(),
    };
    store.repos.insert(input.name, repo.clone());
    Ok(Json(repo))
}

async fn show_repo(State(state): State<AppState>, Path(name): Path<String>) -> Reply<Repo> {
    let store = state.store.read().await;
    store.repo(&name).cloned().map(Json)
}

async fn edit_repo(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<EditRepo>,
) -> Reply<Repo> {
    let mut store = state.store.write().await;
    let repo = store.repo_mut(&name)?;
    if let Some(comment) = input.comment {
        repo.comment = comment;
    }
    if let Some(distribution) = input.default_distribution {
        repo.default_distribution = distribution;
    }
    if let Some(component) = input.default_component {
        repo.default_component = component;
    }
    Ok(Json(repo.clone()))
}

async fn delete_repo(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(flags): Query<Flags>,
) -> Reply<Value> {
    let mut store = state.store.write().await;
    store.repo(&name)?;
    if store.is_published("local", &name) && !is_set(&flags.force) {
        return Err(Failure::aborted(
            StatusCode::CONFLICT,
            "unable to drop, local repo is published",
        ));
    }
    store.repos.remove(&name);
    Ok(Json(json!({})))
}

async fn repo_packages(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<PackageQuery>,
) -> Reply<Value> {
    let store = state.store.read().await;
    let repo = store.repo(&name)?;
    Ok(Json(store.package_list(&repo.packages, &query)))
}

async fn add_repo_packages(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<PackageRefs>,
) -> Reply<Repo> {
    let mut store = state.store.write().await;
    if let Some(unknown) = input.package_refs.iter().find(|key| !store.pool.contains_key(*key)) {
        return Err(Failure::aborted(
            StatusCode::NOT_FOUND,
            format!("package {unknown}: not found"),
        ));
    }
    let repo = store.repo_mut(&name)?;
    repo.packages.extend(input.package_refs);
    Ok(Json(repo.clone()))
}

async fn remove_repo_packages(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<PackageRefs>,
) -> Reply<Repo> {
    let mut store = state.store.write().await;
    let repo = store.repo_mut(&name)?;
    for key in &input.package_refs {
        repo.packages.remove(key);
    }
    Ok(Json(repo.clone()))
}

async fn import_directory(
    State(state): State<AppState>,
    Path((name, dir)): Path<(String, String)>,
    Query(flags): Query<Flags>,
) -> Reply<Value> {
    import(state, name, dir, None, flags).await
}

async fn import_file(
    State(state): State<AppState>,
    Path((name, dir, file)): Path<(String, String, String)>,
    Query(flags): Query<Flags>,
) -> Reply<Value> {
    import(state, name, dir, Some(file), flags).await
}

async fn import(
    state: AppState,
    name: String,
    dir: String,
    file: Option<String>,
    flags: Flags,
) -> Reply<Value> {
    let mut store = state.store.write().await;
    store.repo(&name)?;
    let available = store.uploads.get(&dir).cloned().ok_or_else(|| {
        Failure::aborted(
            StatusCode::BAD_REQUEST,
            format!("unable to import: directory {dir} doesn't exist"),
        )
    })?;
    let candidates: Vec<String> = match file {
        Some(file) if available.contains(&file) => vec![file],
        Some(file) => {
            return Err(Failure::aborted(
                StatusCode::BAD_REQUEST,
                format!("unable to import: file {dir}/{file} doesn't exist"),
            ))
        }
        None => available.into_iter().collect(),
    };

    let mut failed = Vec::new();
    let mut added = Vec::new();
    let mut warnings = Vec::new();
    let mut imported = Vec::new();
    for candidate in candidates {
        let Some(record) = PackageRecord::from_file_name(&candidate) else {
            warnings.push(format!("Unable to process {dir}/{candidate}: not a package"));
            failed.push(format!("{dir}/{candidate}"));
            continue;
        };
        let already = store
            .repo(&name)?
            .packages
            .iter()
            .filter_map(|key| store.pool.get(key))
            .find(|p| p.short_key == record.short_key)
            .map(|p| p.key.clone());
        if let Some(existing) = already {
            if !is_set(&flags.force_replace) {
                warnings.push(format!("{} already exists in the repository", record.short_key));
                failed.push(format!("{dir}/{candidate}"));
                continue;
            }
            store.repo_mut(&name)?.packages.remove(&existing);
        }
        added.push(format!(
            "{}_{}_{} added",
            record.package, record.version, record.architecture
        ));
        store.repo_mut(&name)?.packages.insert(record.key.clone());
        store.pool.insert(record.key.clone(), record);
        imported.push(candidate);
    }

    if !is_set(&flags.no_remove) {
        if let Some(files) = store.uploads.get_mut(&dir) {
            for done in &imported {
                files.remove(done);
            }
            if files.is_empty() {
                store.uploads.remove(&dir);
            }
        }
    }

    Ok(Json(json!({
        "FailedFiles": failed,
        "Report": { "Warnings": warnings, "Added": added, "Removed": [] }
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateSnapshot {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub source_snapshots: Vec<String>,
    #[serde(default)]
    pub package_refs: Vec<String>,
}

async fn snapshot_repo(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<CreateSnapshot>,
) -> Reply<Snapshot> {
    let mut store = state.store.write().await;
    let packages = store.repo(&name)?.packages.clone();
    let description = input
        .description
        .unwrap_or_else(|| format!("Snapshot from local repo [{name}]"));
    store.add_snapshot(input.name, description, packages).map(Json)
}

// --- files ---

async fn list_upload_dirs(State(state): State<AppState>) -> Json<Vec<String>> {
    let store = state.store.read().await;
    Json(store.uploads.keys().cloned().collect())
}

async fn list_uploads(State(state): State<AppState>, Path(dir): Path<String>) -> Reply<Vec<String>> {
    let store = state.store.read().await;
    store
        .uploads
        .get(&dir)
        .map(|files| Json(files.iter().cloned().collect()))
        .ok_or_else(|| Failure::not_found(format!("directory {dir} doesn't exist")))
}

async fn upload(
    State(state): State<AppState>,
    Path(dir): Path<String>,
    mut multipart: Multipart,
) -> Reply<Vec<String>> {
    let mut received = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Failure::aborted(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        field
            .bytes()
            .await
            .map_err(|e| Failure::aborted(StatusCode::BAD_REQUEST, e.to_string()))?;
        received.push(file_name);
    }

    let mut store = state.store.write().await;
    let files = store.uploads.entry(dir.clone()).or_default();
    files.extend(received.iter().cloned());
    Ok(Json(
        received
            .into_iter()
            .map(|file| format!("{dir}/{file}"))
            .collect(),
    ))
}

async fn delete_upload_dir(State(state): State<AppState>, Path(dir): Path<String>) -> Json<Value> {
    state.store.write().await.uploads.remove(&dir);
    Json(json!({}))
}

async fn delete_upload(
    State(state): State<AppState>,
    Path((dir, file)): Path<(String, String)>,
) -> Json<Value> {
    let mut store = state.store.write().await;
    if let Some(files) = store.uploads.get_mut(&dir) {
        files.remove(&file);
    }
    Json(json!({}))
}

// --- snapshots ---

#[derive(Debug, Default, Deserialize)]
pub struct SortQuery {
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateSnapshot {
    pub name: Option<String>,
    pub description: Option<String>,
}

async fn list_snapshots(
    State(state): State<AppState>,
    Query(query): Query<SortQuery>,
) -> Reply<Vec<Snapshot>> {
    let store = state.store.read().await;
    let mut snapshots: Vec<Snapshot> = store.snapshots.values().cloned().collect();
    match query.sort.as_deref() {
        None | Some("name") => {}
        Some("time") => snapshots.sort_by_key(|s| s.sequence),
        Some(other) => {
            return Err(Failure::aborted(
                StatusCode::BAD_REQUEST,
                format!("sorting method {other} is not supported"),
            ))
        }
    }
    Ok(Json(snapshots))
}

async fn create_snapshot(
    State(state): State<AppState>,
    Json(input): Json<CreateSnapshot>,
) -> Reply<Snapshot> {
    let mut store = state.store.write().await;
    let mut packages = BTreeSet::new();
    for source in &input.source_snapshots {
        packages.extend(store.snapshot(source)?.packages.iter().cloned());
    }
    for key in &input.package_refs {
        if !store.pool.contains_key(key) {
            return Err(Failure::aborted(
                StatusCode::NOT_FOUND,
                format!("package {key}: not found"),
            ));
        }
        packages.insert(key.clone());
    }
    store
        .add_snapshot(input.name, input.description.unwrap_or_default(), packages)
        .map(Json)
}

async fn show_snapshot(State(state): State<AppState>, Path(name): Path<String>) -> Reply<Snapshot> {
    let store = state.store.read().await;
    store.snapshot(&name).cloned().map(Json)
}

async fn update_snapshot(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<UpdateSnapshot>,
) -> Reply<Snapshot> {
    let mut store = state.store.write().await;
    let mut snapshot = store.snapshot(&name)?.clone();
    if let Some(description) = input.description {
        snapshot.description = description;
    }
    if let Some(new_name) = input.name.filter(|n| *n != name) {
        if store.snapshots.contains_key(&new_name) {
            return Err(Failure::aborted(
                StatusCode::CONFLICT,
                format!("unable to rename: snapshot {new_name} already exists"),
            ));
        }
        store.snapshots.remove(&name);
        snapshot.name = new_name;
    }
    store.snapshots.insert(snapshot.name.clone(), snapshot.clone());
    Ok(Json(snapshot))
}

async fn delete_snapshot(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(flags): Query<Flags>,
) -> Reply<Value> {
    let mut store = state.store.write().await;
    store.snapshot(&name)?;
    if store.is_published("snapshot", &name) && !is_set(&flags.force) {
        return Err(Failure::aborted(
            StatusCode::CONFLICT,
            "unable to drop: snapshot is published",
        ));
    }
    store.snapshots.remove(&name);
    Ok(Json(json!({})))
}

async fn snapshot_packages(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<PackageQuery>,
) -> Reply<Value> {
    let store = state.store.read().await;
    let snapshot = store.snapshot(&name)?;
    Ok(Json(store.package_list(&snapshot.packages, &query)))
}

async fn diff_snapshots(
    State(state): State<AppState>,
    Path((left, right)): Path<(String, String)>,
) -> Reply<Value> {
    let store = state.store.read().await;
    let left = &store.snapshot(&left)?.packages;
    let right = &store.snapshot(&right)?.packages;
    let rows: Vec<Value> = left
        .difference(right)
        .map(|key| json!({ "Left": key, "Right": null }))
        .chain(
            right
                .difference(left)
                .map(|key| json!({ "Left": null, "Right": key })),
        )
        .collect();
    Ok(Json(json!(rows)))
}

// --- publish ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceRef {
    pub name: String,
    pub component: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishRequest {
    pub source_kind: String,
    pub sources: Vec<SourceRef>,
    #[serde(default)]
    pub architectures: Vec<String>,
    pub distribution: Option<String>,
    pub label: Option<String>,
    pub origin: Option<String>,
    #[serde(default)]
    pub force_overwrite: bool,
    #[serde(default)]
    pub acquire_by_hash: bool,
    pub signing: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishUpdateRequest {
    #[serde(default)]
    pub snapshots: Vec<SourceRef>,
    #[serde(default)]
    pub force_overwrite: bool,
    #[serde(default)]
    pub acquire_by_hash: bool,
    pub signing: Option<Value>,
}

async fn list_published(State(state): State<AppState>) -> Json<Vec<Published>> {
    Json(state.store.read().await.published.clone())
}

async fn publish_root(
    State(state): State<AppState>,
    Json(input): Json<PublishRequest>,
) -> Reply<Published> {
    publish(state, ".".to_string(), input).await
}

async fn publish_prefixed(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
    Json(input): Json<PublishRequest>,
) -> Reply<Published> {
    publish(state, unescape_prefix(&prefix), input).await
}

async fn publish(state: AppState, raw_prefix: String, input: PublishRequest) -> Reply<Published> {
    let mut store = state.store.write().await;
    let mut packages = BTreeSet::new();
    let mut sources = Vec::new();
    let mut guessed_distribution = None;
    for source in &input.sources {
        let (keys, default_component) = match input.source_kind.as_str() {
            "local" => {
                let repo = store.repo(&source.name)?;
                if guessed_distribution.is_none() && !repo.default_distribution.is_empty() {
                    guessed_distribution = Some(repo.default_distribution.clone());
                }
                (repo.packages.clone(), repo.default_component.clone())
            }
            "snapshot" => (store.snapshot(&source.name)?.packages.clone(), String::new()),
            other => {
                return Err(Failure::aborted(
                    StatusCode::BAD_REQUEST,
                    format!("unknown SourceKind {other}"),
                ))
            }
        };
        packages.extend(keys);
        let component = source
            .component
            .clone()
            .filter(|c| !c.is_empty())
            .or(Some(default_component).filter(|c| !c.is_empty()))
            .unwrap_or_else(|| "main".to_string());
        sources.push(PublishedSource {
            component,
            name: source.name.clone(),
        });
    }

    let distribution = input
        .distribution
        .clone()
        .or(guessed_distribution)
        .ok_or_else(|| {
            Failure::aborted(
                StatusCode::BAD_REQUEST,
                "unable to guess distribution name, please specify explicitly",
            )
        })?;

    let architectures = if input.architectures.is_empty() {
        packages
            .iter()
            .filter_map(|key| store.pool.get(key))
            .map(|record| record.architecture.clone())
            .filter(|arch| arch != "all")
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    } else {
        input.architectures.clone()
    };
    if architectures.is_empty() {
        return Err(Failure::aborted(
            StatusCode::BAD_REQUEST,
            "unable to figure out list of architectures, please supply explicit list",
        ));
    }

    let (storage, prefix) = split_storage(&raw_prefix);
    if store
        .published
        .iter()
        .any(|p| p.storage == storage && p.prefix == prefix && p.distribution == distribution)
    {
        return Err(Failure::aborted(
            StatusCode::BAD_REQUEST,
            format!("prefix/distribution already used by another published repo: {prefix}/{distribution}"),
        ));
    }

    let published = Published {
        storage,
        prefix,
        distribution,
        source_kind: input.source_kind,
        sources,
        architectures,
        label: input.label.unwrap_or_default(),
        origin: input.origin.unwrap_or_default(),
        acquire_by_hash: input.acquire_by_hash,
    };
    store.published.push(published.clone());
    Ok(Json(published))
}

fn find_published<'a>(
    store: &'a mut Store,
    prefix: &str,
    distribution: &str,
) -> Result<&'a mut Published, Failure> {
    let (storage, prefix) = split_storage(&unescape_prefix(prefix));
    store
        .published
        .iter_mut()
        .find(|p| p.storage == storage && p.prefix == prefix && p.distribution == distribution)
        .ok_or_else(|| {
            Failure::not_found(format!(
                "published repo with storage:prefix/distribution {storage}:{prefix}/{distribution} not found"
            ))
        })
}

async fn update_published(
    State(state): State<AppState>,
    Path((prefix, distribution)): Path<(String, String)>,
    Json(input): Json<PublishUpdateRequest>,
) -> Reply<Published> {
    let mut guard = state.store.write().await;
    let store = &mut *guard;
    for snapshot in &input.snapshots {
        store.snapshot(&snapshot.name)?;
    }
    let published = find_published(store, &prefix, &distribution)?;
    if !input.snapshots.is_empty() {
        if published.source_kind != "snapshot" {
            return Err(Failure::aborted(
                StatusCode::BAD_REQUEST,
                "snapshots shouldn't be given when updating local repo",
            ));
        }
        published.sources = input
            .snapshots
            .iter()
            .map(|s| PublishedSource {
                component: s.component.clone().unwrap_or_else(|| "main".to_string()),
                name: s.name.clone(),
            })
            .collect();
    }
    published.acquire_by_hash = input.acquire_by_hash;
    Ok(Json(published.clone()))
}

async fn drop_published(
    State(state): State<AppState>,
    Path((prefix, distribution)): Path<(String, String)>,
) -> Reply<Value> {
    let mut store = state.store.write().await;
    find_published(&mut store, &prefix, &distribution)?;
    let (storage, prefix) = split_storage(&unescape_prefix(&prefix));
    store
        .published
        .retain(|p| !(p.storage == storage && p.prefix == prefix && p.distribution == distribution));
    Ok(Json(json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_serializes_with_aptly_names() {
        let repo = Repo {
            name: "aptly-repo".to_string(),
            default_component: "main".to_string(),
            ..Repo::default()
        };
        let json = serde_json::to_value(&repo).unwrap();
        assert_eq!(
            json,
            json!({"Name": "aptly-repo", "Comment": "", "DefaultDistribution": "", "DefaultComponent": "main"})
        );
    }

    #[test]
    fn package_record_from_deb_name() {
        let record = PackageRecord::from_file_name("dirmngr_2.1.18-6_amd64.deb").unwrap();
        assert_eq!(record.package, "dirmngr");
        assert_eq!(record.version, "2.1.18-6");
        assert_eq!(record.architecture, "amd64");
        assert_eq!(record.short_key, "Pamd64 dirmngr 2.1.18-6");
        assert_eq!(record.files_hash.len(), 16);
        assert!(record.key.starts_with("Pamd64 dirmngr 2.1.18-6 "));
    }

    #[test]
    fn non_package_names_are_rejected() {
        assert!(PackageRecord::from_file_name("notes.txt").is_none());
        assert!(PackageRecord::from_file_name("broken_1.0.deb").is_none());
    }

    #[test]
    fn name_query_matches_package() {
        let record = PackageRecord::from_file_name("authserver_0.1.14~dev0-1_amd64.deb").unwrap();
        assert!(record.matches("Name (authserver)"));
        assert!(!record.matches("Name (dirmngr)"));
        assert!(record.matches("authserver"));
    }

    #[test]
    fn prefix_unescaping() {
        assert_eq!(unescape_prefix(":."), ".");
        assert_eq!(unescape_prefix("a_b"), "a/b");
        assert_eq!(unescape_prefix("a__b_c"), "a_b/c");
        assert_eq!(unescape_prefix("s3:aptly-repo:test_xyz__1"), "s3:aptly-repo:test/xyz_1");
    }

    #[test]
    fn storage_splits_at_last_colon() {
        assert_eq!(
            split_storage("s3:aptly-repo:test/xyz_1"),
            ("s3:aptly-repo".to_string(), "test/xyz_1".to_string())
        );
        assert_eq!(split_storage("."), (String::new(), ".".to_string()));
    }

    #[test]
    fn create_repo_requires_name() {
        let result: Result<CreateRepo, _> = serde_json::from_str(r#"{"Comment":"x"}"#);
        assert!(result.is_err());
    }
}

use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, MockConfig, Published, Repo};
use serde_json::{json, Value};
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

fn upload_request(uri: &str, files: &[&str]) -> Request<String> {
    let boundary = "mock-boundary";
    let mut body = String::new();
    for file in files {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file}\"\r\nContent-Type: application/octet-stream\r\n\r\ncontent\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(body)
        .unwrap()
}

async fn call(app: &mut axum::routing::RouterIntoService<String>, request: Request<String>) -> axum::response::Response {
    ServiceExt::<Request<String>>::ready(app)
        .await
        .unwrap()
        .call(request)
        .await
        .unwrap()
}

fn service(config: MockConfig) -> axum::routing::RouterIntoService<String> {
    let router: Router = app(config);
    router.into_service()
}

// --- meta ---

#[tokio::test]
async fn version_is_reported() {
    let resp = app(MockConfig::default())
        .oneshot(empty_request("GET", "/api/version"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"Version": mock_server::VERSION}));
}

#[tokio::test]
async fn ready_answers_503_when_not_ready() {
    let config = MockConfig {
        ready: false,
        ..MockConfig::default()
    };
    let resp = app(config)
        .oneshot(empty_request("GET", "/api/ready"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = body_json(resp).await;
    assert_eq!(body["Status"], "Aptly is unavailable");
}

#[tokio::test]
async fn legacy_server_lacks_health_endpoints() {
    let config = MockConfig {
        legacy: true,
        ..MockConfig::default()
    };
    let resp = app(config)
        .oneshot(empty_request("GET", "/api/healthy"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- repos ---

#[tokio::test]
async fn list_repos_empty() {
    let resp = app(MockConfig::default())
        .oneshot(empty_request("GET", "/api/repos"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let repos: Vec<Repo> = body_json(resp).await;
    assert!(repos.is_empty());
}

#[tokio::test]
async fn show_missing_repo_returns_aptly_error() {
    let resp = app(MockConfig::default())
        .oneshot(empty_request("GET", "/api/repos/nope"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": "local repo with name nope not found"}));
}

#[tokio::test]
async fn duplicate_repo_is_aborted() {
    let mut app = service(MockConfig::default());
    let resp = call(&mut app, json_request("POST", "/api/repos", r#"{"Name":"aptly-repo"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&mut app, json_request("POST", "/api/repos", r#"{"Name":"aptly-repo"}"#)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body[0]["meta"], "Operation aborted");
}

#[tokio::test]
async fn create_repo_without_name_is_rejected() {
    let resp = app(MockConfig::default())
        .oneshot(json_request("POST", "/api/repos", r#"{"Comment":"x"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn repo_lifecycle() {
    let mut app = service(MockConfig::default());

    let resp = call(
        &mut app,
        json_request("POST", "/api/repos", r#"{"Name":"aptly-repo","DefaultComponent":"main"}"#),
    )
    .await;
    let created: Repo = body_json(resp).await;
    assert_eq!(created.default_component, "main");
    assert_eq!(created.comment, "");

    let resp = call(
        &mut app,
        json_request("PUT", "/api/repos/aptly-repo", r#"{"Comment":"nightly"}"#),
    )
    .await;
    let edited: Repo = body_json(resp).await;
    assert_eq!(edited.comment, "nightly");
    assert_eq!(edited.default_component, "main");

    let resp = call(&mut app, empty_request("DELETE", "/api/repos/aptly-repo")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&mut app, empty_request("GET", "/api/repos/aptly-repo")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- files and import ---

#[tokio::test]
async fn upload_and_import() {
    let mut app = service(MockConfig::default());
    call(&mut app, json_request("POST", "/api/repos", r#"{"Name":"aptly-repo"}"#)).await;

    let resp = call(
        &mut app,
        upload_request("/api/files/test", &["dirmngr_2.1.18-6_amd64.deb", "notes.txt"]),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let uploaded: Vec<String> = body_json(resp).await;
    assert_eq!(uploaded, vec!["test/dirmngr_2.1.18-6_amd64.deb", "test/notes.txt"]);

    let resp = call(&mut app, empty_request("GET", "/api/files")).await;
    let dirs: Vec<String> = body_json(resp).await;
    assert_eq!(dirs, vec!["test"]);

    let resp = call(&mut app, empty_request("POST", "/api/repos/aptly-repo/file/test")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let report: Value = body_json(resp).await;
    assert_eq!(report["FailedFiles"], json!(["test/notes.txt"]));
    assert_eq!(report["Report"]["Added"], json!(["dirmngr_2.1.18-6_amd64 added"]));

    // imported files leave the upload area, failed ones stay
    let resp = call(&mut app, empty_request("GET", "/api/files/test")).await;
    let left: Vec<String> = body_json(resp).await;
    assert_eq!(left, vec!["notes.txt"]);

    let resp = call(&mut app, empty_request("GET", "/api/repos/aptly-repo/packages?q=Name%20(dirmngr)&format=details")).await;
    let packages: Vec<Value> = body_json(resp).await;
    assert_eq!(packages.len(), 1);
    assert_eq!(packages[0]["Package"], "dirmngr");
    assert_eq!(packages[0]["ShortKey"], "Pamd64 dirmngr 2.1.18-6");

    let resp = call(&mut app, empty_request("DELETE", "/api/files/test")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = call(&mut app, empty_request("GET", "/api/files/test")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- snapshots and publish ---

#[tokio::test]
async fn snapshot_and_publish() {
    let mut app = service(MockConfig::default());
    call(
        &mut app,
        json_request("POST", "/api/repos", r#"{"Name":"aptly-repo","DefaultDistribution":"stretch"}"#),
    )
    .await;
    call(&mut app, upload_request("/api/files/incoming", &["authserver_0.1.14_amd64.deb"])).await;
    call(&mut app, empty_request("POST", "/api/repos/aptly-repo/file/incoming")).await;

    let resp = call(
        &mut app,
        json_request("POST", "/api/repos/aptly-repo/snapshots", r#"{"Name":"aptly-repo-1"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let snapshot: Value = body_json(resp).await;
    assert_eq!(snapshot["Description"], "Snapshot from local repo [aptly-repo]");
    assert!(snapshot["CreatedAt"].as_str().unwrap().ends_with('Z'));

    let resp = call(&mut app, json_request("POST", "/api/snapshots", r#"{"Name":"empty"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&mut app, empty_request("GET", "/api/snapshots/empty/diff/aptly-repo-1")).await;
    let diff: Vec<Value> = body_json(resp).await;
    assert_eq!(diff.len(), 1);
    assert!(diff[0]["Left"].is_null());

    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/api/publish/s3%3Aaptly-repo%3Atest_xyz__1",
            r#"{"SourceKind":"local","Sources":[{"Name":"aptly-repo"}],"Signing":{"Skip":true}}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let published: Published = body_json(resp).await;
    assert_eq!(published.storage, "s3:aptly-repo");
    assert_eq!(published.prefix, "test/xyz_1");
    assert_eq!(published.distribution, "stretch");
    assert_eq!(published.architectures, vec!["amd64"]);
    assert_eq!(published.sources[0].component, "main");

    let resp = call(&mut app, empty_request("DELETE", "/api/repos/aptly-repo")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = call(
        &mut app,
        empty_request("DELETE", "/api/publish/s3%3Aaptly-repo%3Atest_xyz__1/stretch"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&mut app, empty_request("GET", "/api/publish")).await;
    let endpoints: Vec<Published> = body_json(resp).await;
    assert!(endpoints.is_empty());
}

#[tokio::test]
async fn publish_without_architectures_is_aborted() {
    let mut app = service(MockConfig::default());
    call(&mut app, json_request("POST", "/api/repos", r#"{"Name":"empty"}"#)).await;
    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/api/publish",
            r#"{"SourceKind":"local","Sources":[{"Name":"empty"}],"Distribution":"test"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_bytes(resp).await;
    assert!(String::from_utf8_lossy(&body).contains("architectures"));
}

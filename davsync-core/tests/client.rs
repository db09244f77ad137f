use davsync_core::{AuthHeader, CreateOutcome, DavClient, DavError, Reconciled, RemoteDir};
use reqwest::StatusCode;
use url::Url;
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUTH: &str = "Basic dXNlcjpwYXNz";

fn client() -> DavClient {
    DavClient::new(AuthHeader::basic("user", "pass"))
}

fn remote_dir(server: &MockServer, sub_path: Option<&str>) -> RemoteDir {
    RemoteDir::new(&server.uri(), "/webdav", sub_path).unwrap()
}

async fn mkcol_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.method.as_str() == "MKCOL")
        .map(|request| request.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn exists_sends_auth_and_depth_headers() {
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/webdav/docs"))
        .and(header("authorization", AUTH))
        .and(header("depth", "1"))
        .respond_with(ResponseTemplate::new(207))
        .expect(1)
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/webdav/docs", server.uri())).unwrap();
    assert!(client().exists(&url).await.unwrap());
}

#[tokio::test]
async fn exists_treats_forbidden_as_absent() {
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/webdav/docs", server.uri())).unwrap();
    assert!(!client().exists(&url).await.unwrap());
}

#[tokio::test]
async fn create_returns_true_only_for_success() {
    let server = MockServer::start().await;

    Mock::given(method("MKCOL"))
        .and(path("/webdav/new"))
        .and(header("authorization", AUTH))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    Mock::given(method("MKCOL"))
        .and(path("/webdav/old"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;

    let client = client();
    let new = Url::parse(&format!("{}/webdav/new", server.uri())).unwrap();
    let old = Url::parse(&format!("{}/webdav/old", server.uri())).unwrap();
    assert!(client.create(&new).await.unwrap());
    assert!(!client.create(&old).await.unwrap());
}

#[tokio::test]
async fn create_recursive_creates_each_segment_in_order() {
    let server = MockServer::start().await;

    for segment_path in ["/webdav/a", "/webdav/a/b", "/webdav/a/b/c"] {
        Mock::given(method("MKCOL"))
            .and(path(segment_path))
            .and(header("authorization", AUTH))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
    }

    let outcome = client()
        .create_recursive(&remote_dir(&server, Some("a/b/c")))
        .await
        .unwrap();

    assert_eq!(outcome, CreateOutcome::Complete);
    assert_eq!(
        mkcol_paths(&server).await,
        ["/webdav/a", "/webdav/a/b", "/webdav/a/b/c"]
    );
}

#[tokio::test]
async fn create_recursive_is_idempotent() {
    let server = MockServer::start().await;

    Mock::given(method("MKCOL"))
        .respond_with(ResponseTemplate::new(201))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("MKCOL"))
        .respond_with(ResponseTemplate::new(405))
        .expect(3)
        .mount(&server)
        .await;

    let client = client();
    let dir = remote_dir(&server, Some("x/y/z"));
    assert!(client.create_recursive(&dir).await.unwrap().is_complete());
    assert!(client.create_recursive(&dir).await.unwrap().is_complete());
}

#[tokio::test]
async fn create_recursive_aborts_on_conflict() {
    let server = MockServer::start().await;

    Mock::given(method("MKCOL"))
        .and(path("/webdav/a"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("MKCOL"))
        .and(path("/webdav/a/b"))
        .respond_with(ResponseTemplate::new(409))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("MKCOL"))
        .and(path("/webdav/a/b/c"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = client()
        .create_recursive(&remote_dir(&server, Some("a/b/c")))
        .await
        .unwrap();

    match outcome {
        CreateOutcome::Aborted { url, status } => {
            assert_eq!(url.path(), "/webdav/a/b");
            assert_eq!(status, StatusCode::CONFLICT);
        }
        CreateOutcome::Complete => panic!("expected aborted walk"),
    }
}

#[tokio::test]
async fn create_recursive_aborts_on_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("MKCOL"))
        .and(path("/webdav/a"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client()
        .create_recursive(&remote_dir(&server, Some("a/b")))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        CreateOutcome::Aborted { status: StatusCode::FORBIDDEN, .. }
    ));
    assert_eq!(mkcol_paths(&server).await, ["/webdav/a"]);
}

#[tokio::test]
async fn create_recursive_without_segments_creates_mount() {
    let server = MockServer::start().await;

    Mock::given(method("MKCOL"))
        .and(path("/webdav"))
        .respond_with(ResponseTemplate::new(405))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client()
        .create_recursive(&remote_dir(&server, None))
        .await
        .unwrap();

    assert!(outcome.is_complete());
}

#[tokio::test]
async fn ensure_directory_exists_checks_once_when_present() {
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/webdav/docs"))
        .respond_with(ResponseTemplate::new(207))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("MKCOL"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let reconciled = client()
        .ensure_directory_exists(&remote_dir(&server, Some("docs")))
        .await
        .unwrap();

    assert_eq!(reconciled, Reconciled::AlreadyPresent);
}

#[tokio::test]
async fn ensure_directory_exists_creates_missing_chain() {
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("MKCOL"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;

    let reconciled = client()
        .ensure_directory_exists(&remote_dir(&server, Some("team/reports")))
        .await
        .unwrap();

    assert_eq!(reconciled, Reconciled::Created);
}

#[tokio::test]
async fn ensure_directory_exists_fails_when_creation_fails() {
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("MKCOL"))
        .respond_with(ResponseTemplate::new(409))
        .expect(1)
        .mount(&server)
        .await;

    let err = client()
        .ensure_directory_exists(&remote_dir(&server, Some("team/reports")))
        .await
        .expect_err("expected directory creation failure");

    match err {
        DavError::DirectoryCreation { url, status } => {
            assert_eq!(url.path(), "/webdav/team");
            assert_eq!(status, StatusCode::CONFLICT);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn upload_puts_raw_bytes() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/webdav/docs/notes.txt"))
        .and(header("authorization", AUTH))
        .and(header("content-type", "application/octet-stream"))
        .and(body_bytes(b"payload"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let dir = remote_dir(&server, Some("docs"));
    let response = client()
        .upload(&dir.file_url("notes.txt"), b"payload".to_vec())
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn upload_returns_failure_status() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = remote_dir(&server, None);
    let response = client()
        .upload(&dir.file_url("notes.txt"), Vec::new())
        .await
        .unwrap();

    assert!(!response.is_success());
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.status_text(), "Forbidden");
}

#[tokio::test]
async fn transport_failures_propagate() {
    let dir = RemoteDir::new("http://127.0.0.1:9", "/webdav", Some("docs")).unwrap();
    let err = client()
        .ensure_directory_exists(&dir)
        .await
        .expect_err("expected connection failure");

    assert!(matches!(err, DavError::Request(_)));
}

//! End-to-end tests for link issuance and retrieval.
//!
//! These tests drive the HTTP router in-process and check status codes,
//! response bodies, and the persisted side effects of every outcome.

mod common;

use std::io::Read;
use std::net::{IpAddr, Ipv4Addr};

use axum::http::{header, Method, StatusCode};

use keylink_core::store::{EntryFilter, Lookup};
use keylink_core::unix_now;

use common::{path_of, secs, Harness, CLIENT};

/// A freshly issued link serves the exact file bytes.
#[tokio::test]
async fn test_issue_then_retrieve_is_byte_identical() {
    let h = Harness::new();
    let content = common::random_bytes(256 * 1024);
    let link = h.share("data.bin", &content);

    let response = h.get(&path_of(&link)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, content);
    assert_eq!(response.headers[header::CONTENT_LENGTH], "262144");
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"data.bin\""
    );
    assert_eq!(h.failures(), 0);
}

#[tokio::test]
async fn test_content_type_is_guessed() {
    let h = Harness::new();

    let text = h.share("notes.txt", b"hello");
    let response = h.get(&path_of(&text)).await;
    assert!(response.headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let unknown = h.share("blob.keylinkunknown", b"\x00\x01");
    let response = h.get(&path_of(&unknown)).await;
    assert_eq!(
        response.headers[header::CONTENT_TYPE],
        "application/octet-stream"
    );
}

#[tokio::test]
async fn test_issued_url_ends_with_token() {
    let h = Harness::new();
    let link = h.share("a.txt", b"a");

    assert_eq!(link.url, format!("http://localhost:8080/{}", link.token));
}

#[tokio::test]
async fn test_expired_link_is_gone_and_counts() {
    let h = Harness::new();
    let path = common::create_test_file(h.dir.path(), "old.txt", b"old");
    let token = "e".repeat(64);
    h.db.links().upsert(&token, unix_now() - 1, &path).unwrap();

    let response = h.get(&format!("/{token}")).await;

    assert_eq!(response.status, StatusCode::GONE);
    assert_eq!(response.error_code().as_deref(), Some("E005"));
    assert_eq!(h.failures(), 1);
    assert!(
        matches!(
            h.db.links().lookup(&token).unwrap(),
            Lookup::Found { active: false, .. }
        ),
        "Expired entries are not removed on access"
    );
}

#[tokio::test]
async fn test_unknown_token_is_not_found_and_counts() {
    let h = Harness::new();

    let response = h.get(&format!("/{}", "0".repeat(64))).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error_code().as_deref(), Some("E004"));

    let response = h.get("/").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    assert_eq!(h.failures(), 2);
}

#[tokio::test]
async fn test_lockout_until_unban() {
    let h = Harness::with_config(|c| c.security.failed_attempt_limit = 3);
    let link = h.share("a.txt", b"a");

    for _ in 0..3 {
        assert_eq!(h.get("/nope").await.status, StatusCode::NOT_FOUND);
    }

    let response = h.get(&path_of(&link)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code().as_deref(), Some("E003"));
    assert_eq!(h.failures(), 3);

    let other = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 44));
    let response = h.request(Method::GET, &path_of(&link), other).await;
    assert_eq!(response.status, StatusCode::OK, "Other clients are unaffected");

    assert!(h.db.attempts().reset(&CLIENT.to_string()).unwrap());
    let response = h.get(&path_of(&link)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_file_self_heals() {
    let h = Harness::new();
    let link = h.share("gone.txt", b"soon gone");
    std::fs::remove_file(&link.path).unwrap();

    let response = h.get(&path_of(&link)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error_code().as_deref(), Some("E006"));
    assert_eq!(h.failures(), 1);
    assert_eq!(h.db.links().lookup(&link.token).unwrap(), Lookup::NotFound);
    assert!(!h.db.links().delete(&link.token).unwrap());

    let body = String::from_utf8(response.body).unwrap();
    assert!(!body.contains("gone.txt"), "Path must not leak: {body}");
}

#[tokio::test]
async fn test_non_get_is_rejected_without_side_effects() {
    let h = Harness::new();
    let link = h.share("a.txt", b"a");

    for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH, Method::HEAD] {
        let response = h.request(method.clone(), &path_of(&link), CLIENT).await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(response.headers[header::ALLOW], "GET");
    }

    assert_eq!(h.failures(), 0);
    assert_eq!(h.limiter.admitted(), 0);
    assert_eq!(h.get(&path_of(&link)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_window_resets() {
    let h = Harness::with_config(|c| {
        c.security.rate_limit = 2;
        c.security.rate_window = secs(1);
    });
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let reset_task = h.limiter.spawn_reset_task(shutdown_rx);
    let link = h.share("a.txt", b"a");

    assert_eq!(h.get(&path_of(&link)).await.status, StatusCode::OK);
    assert_eq!(h.get(&path_of(&link)).await.status, StatusCode::OK);

    let response = h.get(&path_of(&link)).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.error_code().as_deref(), Some("E002"));
    assert_eq!(h.failures(), 0);

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    assert_eq!(h.get(&path_of(&link)).await.status, StatusCode::OK);

    shutdown_tx.send(()).unwrap();
    reset_task.await.unwrap();
}

#[tokio::test]
async fn test_directory_link_serves_zip() {
    let h = Harness::new();
    let project = h.dir.path().join("project");
    common::create_test_file(&project, "README.md", b"# project");
    common::create_test_file(&project, "src/lib.rs", b"pub fn f() {}");
    common::create_test_file(&project, "src/deep/skip/me.txt", b"too deep");

    let link = h.issuer().issue(&project).unwrap();
    assert!(link.archived);

    let response = h.get(&path_of(&link)).await;
    assert_eq!(response.status, StatusCode::OK);
    let disposition = response.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"project-"));
    assert!(disposition.ends_with(".zip\""));

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(response.body)).unwrap();
    let mut readme = String::new();
    archive
        .by_name("README.md")
        .unwrap()
        .read_to_string(&mut readme)
        .unwrap();
    assert_eq!(readme, "# project");
    assert!(archive.by_name("src/lib.rs").is_ok());
    assert!(archive.by_name("src/deep/skip/me.txt").is_err());
}

#[tokio::test]
async fn test_revoked_link_is_not_found() {
    let h = Harness::new();
    let link = h.share("a.txt", b"a");

    assert!(h.db.links().delete(&link.token).unwrap());

    assert_eq!(h.get(&path_of(&link)).await.status, StatusCode::NOT_FOUND);
    assert!(h.db.links().enumerate(EntryFilter::All).unwrap().is_empty());
}

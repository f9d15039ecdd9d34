//! HTTP-level tests for the GitHub pull request source.
//!
//! Each test stands up a mock GitHub API and drives `GitHubSource`
//! against it, asserting both the engine-visible results and the exact
//! requests the provider saw.

use std::path::PathBuf;

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clabot::{Config, EngineError, GitHubSource, PullRequest, PullRequestSource};

const OWNER: &str = "acme";
const REPO: &str = "widgets";

fn config_for(server: &MockServer) -> Config {
    Config {
        owner: OWNER.to_string(),
        repo: REPO.to_string(),
        token: "t0ken".to_string(),
        roster_path: PathBuf::from("/dev/null"),
        label_signed: "cla-signed".to_string(),
        label_unsigned: "cla-missing".to_string(),
        comment_missing: "Please sign the CLA.".to_string(),
        comment_thanks: "Thanks for signing!".to_string(),
        api_base: server.uri(),
        dry_run: false,
    }
}

fn pr(server: &MockServer, number: u64) -> PullRequest {
    PullRequest {
        number,
        title: format!("PR {number}"),
        patch_url: format!("{}/patches/{number}.patch", server.uri()),
    }
}

fn pr_json(server: &MockServer, number: u64) -> serde_json::Value {
    json!({
        "number": number,
        "title": format!("PR {number}"),
        "patch_url": format!("{}/patches/{number}.patch", server.uri()),
    })
}

#[tokio::test]
async fn listing_concatenates_all_pages_in_order() {
    let server = MockServer::start().await;
    let pulls_path = format!("/repos/{OWNER}/{REPO}/pulls");
    let link = format!(
        "<{uri}{pulls_path}?state=open&per_page=100&page=2>; rel=\"next\", \
         <{uri}{pulls_path}?state=open&per_page=100&page=3>; rel=\"last\"",
        uri = server.uri()
    );

    Mock::given(method("GET"))
        .and(path(&pulls_path))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", link.as_str())
                .set_body_json(json!([pr_json(&server, 1), pr_json(&server, 2)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(&pulls_path))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([pr_json(&server, 3), pr_json(&server, 4)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(&pulls_path))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([pr_json(&server, 5)])))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let mut source = GitHubSource::new(&config).unwrap();
    let prs = source.list_open_pull_requests().await.unwrap();

    let numbers: Vec<u64> = prs.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn listing_without_link_header_is_a_single_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/pulls")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([pr_json(&server, 9)])))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let mut source = GitHubSource::new(&config).unwrap();
    let prs = source.list_open_pull_requests().await.unwrap();

    assert_eq!(prs.len(), 1);
    assert_eq!(prs[0].number, 9);
}

#[tokio::test]
async fn listing_failure_is_source_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/pulls")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let mut source = GitHubSource::new(&config).unwrap();
    let err = source.list_open_pull_requests().await.unwrap_err();

    match err {
        EngineError::SourceUnavailable { context } => {
            assert!(context.contains("boom"), "context was: {context}");
        }
        other => panic!("expected SourceUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn second_label_read_is_served_from_the_cache() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/issues/7/labels")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "name": "cla-missing" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let mut source = GitHubSource::new(&config).unwrap();
    let pr = pr(&server, 7);

    let first = source.get_labels(&pr).await.unwrap();
    let second = source.get_labels(&pr).await.unwrap();

    assert_eq!(first, vec!["cla-missing".to_string()]);
    assert_eq!(first, second);
    assert!(source.has_label(&pr, "cla-missing").await.unwrap());
}

#[tokio::test]
async fn apply_label_posts_a_label_array() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/repos/{OWNER}/{REPO}/issues/7/labels")))
        .and(body_json(json!({ "labels": ["cla-signed"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "name": "cla-signed" }])))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let mut source = GitHubSource::new(&config).unwrap();

    source
        .apply_label(&pr(&server, 7), "cla-signed")
        .await
        .unwrap();
}

#[tokio::test]
async fn removing_an_absent_label_is_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!(
            "/repos/{OWNER}/{REPO}/issues/7/labels/cla-missing"
        )))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let mut source = GitHubSource::new(&config).unwrap();

    source
        .remove_label(&pr(&server, 7), "cla-missing")
        .await
        .unwrap();
}

#[tokio::test]
async fn post_comment_sends_the_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/repos/{OWNER}/{REPO}/issues/7/comments")))
        .and(body_json(json!({ "body": "Please sign the CLA." })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let mut source = GitHubSource::new(&config).unwrap();

    source
        .post_comment(&pr(&server, 7), "Please sign the CLA.")
        .await
        .unwrap();
}

#[tokio::test]
async fn author_email_is_read_from_the_patch() {
    let server = MockServer::start().await;
    let patch = "From 1a2b3c Mon Sep 17 00:00:00 2001\n\
                 From: Ada Lovelace <ada@example.com>\n\
                 Date: Tue, 1 Jan 2024 00:00:00 +0000\n\
                 Subject: [PATCH] engine\n\n---\n";

    Mock::given(method("GET"))
        .and(path("/patches/7.patch"))
        .respond_with(ResponseTemplate::new(200).set_body_string(patch))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let mut source = GitHubSource::new(&config).unwrap();

    let email = source.get_author_email(&pr(&server, 7)).await.unwrap();
    assert_eq!(email, "ada@example.com");
}

#[tokio::test]
async fn patch_without_author_line_is_email_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/patches/7.patch"))
        .respond_with(ResponseTemplate::new(200).set_body_string("diff --git a/x b/x\n"))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let mut source = GitHubSource::new(&config).unwrap();

    let err = source.get_author_email(&pr(&server, 7)).await.unwrap_err();
    assert!(matches!(err, EngineError::EmailNotFound { number: 7 }));
}

//! Integration tests for the GitHub GraphQL forge.
//!
//! The HTTP transport runs against a wiremock server.

use std::collections::BTreeSet;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clreq_tools::core::types::CitationKey;
use clreq_tools::forge::github::{GitHubForge, HttpTransport};
use clreq_tools::forge::{CitationTargets, Forge, ForgeError, WatchTarget};

fn key(repo: &str, number: u64) -> CitationKey {
    CitationKey::new(repo, &number.to_string()).unwrap()
}

fn targets() -> CitationTargets {
    CitationTargets {
        issues: BTreeSet::from([key("typst/typst", 193)]),
        pulls: BTreeSet::from([key("typst/typst", 5000)]),
    }
}

async fn forge(server: &MockServer) -> GitHubForge {
    GitHubForge::new(HttpTransport::new(
        format!("{}/graphql", server.uri()),
        "test-token",
    ))
}

mod states {
    use super::*;

    #[tokio::test]
    async fn decodes_issue_and_pull_states() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_string_contains("issue_193"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "typst_typst": {
                        "issue_193": {
                            "title": "CJK line breaking",
                            "state": "CLOSED",
                            "stateReason": "COMPLETED",
                            "closed": true,
                            "closedAt": "2024-05-01T00:00:00Z"
                        },
                        "pull_5000": {
                            "title": "Fix it",
                            "state": "MERGED",
                            "merged": true,
                            "closed": true,
                            "closedAt": "2024-05-01T00:00:00Z"
                        }
                    }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let states = forge(&server).await.fetch_states(&targets()).await.unwrap();

        let issue = &states.issues[&key("typst/typst", 193)];
        assert!(issue.closed);
        assert_eq!(issue.state_reason.as_deref(), Some("COMPLETED"));
        let pull = &states.pulls[&key("typst/typst", 5000)];
        assert!(pull.merged);
        assert!(!pull.rejected());
    }

    #[tokio::test]
    async fn partial_errors_keep_the_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "typst_typst": { "issue_193": null, "pull_5000": null }
                },
                "errors": [{ "message": "Could not resolve to an Issue with the number of 193." }]
            })))
            .mount(&server)
            .await;

        let states = forge(&server).await.fetch_states(&targets()).await.unwrap();

        assert!(states.issues.is_empty());
        assert!(states.pulls.is_empty());
    }

    #[tokio::test]
    async fn errors_without_data_fail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{ "message": "Parse error" }]
            })))
            .mount(&server)
            .await;

        let result = forge(&server).await.fetch_states(&targets()).await;

        assert!(matches!(result, Err(ForgeError::ApiError { .. })));
    }

    #[tokio::test]
    async fn nothing_cited_sends_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let states = forge(&server)
            .await
            .fetch_states(&CitationTargets::default())
            .await
            .unwrap();

        assert!(states.issues.is_empty());
    }
}

mod latest_issues {
    use super::*;

    #[tokio::test]
    async fn decodes_nodes_per_repository() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("states: [OPEN]"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "typst_typst": {
                        "issues": {
                            "nodes": [
                                { "number": 7, "title": "Ruby", "stateReason": null },
                                { "number": 8, "title": "Kinsoku", "stateReason": "REOPENED" }
                            ]
                        }
                    }
                }
            })))
            .mount(&server)
            .await;

        let watches = [WatchTarget::new("typst/typst", ["cjk".to_string()])];
        let latest = forge(&server)
            .await
            .latest_open_issues(&watches)
            .await
            .unwrap();

        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].key, key("typst/typst", 7));
        assert_eq!(latest[1].state_reason.as_deref(), Some("REOPENED"));
    }
}

mod errors {
    use super::*;

    async fn respond(template: ResponseTemplate) -> Result<(), ForgeError> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(template)
            .mount(&server)
            .await;
        forge(&server).await.fetch_states(&targets()).await.map(|_| ())
    }

    #[tokio::test]
    async fn unauthorized_is_auth_failed() {
        let result = respond(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
        )
        .await;
        assert!(matches!(result, Err(ForgeError::AuthFailed(_))));
    }

    #[tokio::test]
    async fn exhausted_quota_is_rate_limited() {
        let result = respond(
            ResponseTemplate::new(403)
                .insert_header("X-RateLimit-Remaining", "0")
                .set_body_json(json!({ "message": "API rate limit exceeded" })),
        )
        .await;
        assert!(matches!(result, Err(ForgeError::RateLimited)));
    }

    #[tokio::test]
    async fn forbidden_with_quota_is_auth_failed() {
        let result = respond(
            ResponseTemplate::new(403)
                .insert_header("X-RateLimit-Remaining", "42")
                .set_body_json(json!({ "message": "Resource not accessible" })),
        )
        .await;
        assert!(matches!(result, Err(ForgeError::AuthFailed(m)) if m.contains("Resource not accessible")));
    }

    #[tokio::test]
    async fn server_errors_keep_the_status() {
        let result = respond(ResponseTemplate::new(502)).await;
        assert!(matches!(result, Err(ForgeError::ApiError { status: 502, .. })));
    }
}

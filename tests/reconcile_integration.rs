//! Integration tests for reconciliation against a mock forge.

use clreq_tools::core::types::CitationKey;
use clreq_tools::document::{IssueMeta, PullMeta};
use clreq_tools::forge::mock::{FailOn, MockForge, MockOperation};
use clreq_tools::forge::{ForgeError, WatchTarget};
use clreq_tools::reconcile::{reconcile, Check, Citations, Finding};

// =============================================================================
// Fixtures
// =============================================================================

fn issue(repo: &str, num: &str, note: &str, closed: bool) -> IssueMeta {
    IssueMeta {
        repo: repo.to_string(),
        num: num.to_string(),
        note: note.to_string(),
        closed,
    }
}

fn pull(repo: &str, num: &str, merged: bool, rejected: bool) -> PullMeta {
    PullMeta {
        repo: repo.to_string(),
        num: num.to_string(),
        merged,
        rejected,
    }
}

fn key(repo: &str, number: u64) -> CitationKey {
    CitationKey::new(repo, &number.to_string()).unwrap()
}

fn watches() -> Vec<WatchTarget> {
    vec![WatchTarget::new("typst/typst", ["cjk".to_string()])]
}

// =============================================================================
// Freshness
// =============================================================================

mod freshness {
    use super::*;

    #[tokio::test]
    async fn closed_upstream_is_reported_once() {
        let forge = MockForge::new().with_closed_issue("x/y", 1, "Fixed", "COMPLETED");
        let citations = Citations {
            issues: vec![issue("x/y", "1", "auto", false)],
            pulls: vec![],
        };

        let report = reconcile(&forge, &citations, None).await.unwrap();

        assert!(!report.succeeded());
        let findings: Vec<&Finding> = report.findings().collect();
        assert_eq!(findings.len(), 1);
        match findings[0] {
            Finding::OutdatedIssue { key: k, state, .. } => {
                assert_eq!(k, &key("x/y", 1));
                assert!(state.closed);
            }
            other => panic!("unexpected finding {:?}", other),
        }
    }

    #[tokio::test]
    async fn matching_states_pass() {
        let forge = MockForge::new()
            .with_closed_issue("x/y", 1, "Fixed", "COMPLETED")
            .with_open_issue("x/y", 2, "Still open", &[])
            .with_pull("x/y", 3, "Merged", true, true)
            .with_pull("x/y", 4, "Rejected", false, true);
        let citations = Citations {
            issues: vec![
                issue("x/y", "1", "auto", true),
                issue("x/y", "2", "auto", false),
            ],
            pulls: vec![pull("x/y", "3", true, false), pull("x/y", "4", false, true)],
        };

        let report = reconcile(&forge, &citations, None).await.unwrap();

        assert!(report.succeeded(), "{}", report);
        assert_eq!(report.outcomes.len(), 2);
    }

    #[tokio::test]
    async fn merged_pull_recorded_as_open() {
        let forge = MockForge::new().with_pull("typst/typst", 5000, "Add it", true, true);
        let citations = Citations {
            issues: vec![],
            pulls: vec![pull("typst/typst", "5000", false, false)],
        };

        let report = reconcile(&forge, &citations, None).await.unwrap();

        let findings: Vec<&Finding> = report.findings().collect();
        assert!(matches!(
            findings.as_slice(),
            [Finding::OutdatedPull { state, .. }] if state.merged
        ));
    }

    #[tokio::test]
    async fn unknown_upstream_entries_are_missing() {
        let forge = MockForge::new();
        let citations = Citations {
            issues: vec![issue("x/y", "9", "auto", false)],
            pulls: vec![],
        };

        let report = reconcile(&forge, &citations, None).await.unwrap();

        assert!(matches!(
            report.findings().collect::<Vec<_>>().as_slice(),
            [Finding::Missing { .. }]
        ));
    }

    #[tokio::test]
    async fn invalid_citations_are_reported_not_fetched() {
        let forge = MockForge::new();
        let citations = Citations {
            issues: vec![issue("not-a-repo", "1", "auto", false)],
            pulls: vec![],
        };

        let report = reconcile(&forge, &citations, None).await.unwrap();

        assert!(matches!(
            report.findings().collect::<Vec<_>>().as_slice(),
            [Finding::Invalid { .. }]
        ));
        assert_eq!(
            forge.operations(),
            vec![MockOperation::FetchStates {
                issues: 0,
                pulls: 0
            }]
        );
    }
}

// =============================================================================
// Uniqueness
// =============================================================================

mod uniqueness {
    use super::*;

    #[tokio::test]
    async fn duplicate_with_default_note_is_reported() {
        let forge = MockForge::new().with_open_issue("x/y", 1, "Open", &[]);
        let citations = Citations {
            issues: vec![
                issue("x/y", "1", "auto", false),
                issue("x/y", "1", "auto", false),
            ],
            pulls: vec![],
        };

        let report = reconcile(&forge, &citations, None).await.unwrap();

        let unique = &report.outcomes[0];
        assert_eq!(unique.check, Check::Unique);
        assert_eq!(
            unique.findings,
            vec![Finding::Duplicated {
                citation: "x/y#1".to_string(),
                count: 2
            }]
        );
        // Freshness still ran.
        assert!(report.outcomes[1].passed());
    }

    #[tokio::test]
    async fn repeated_citation_with_note_is_not_a_duplicate() {
        let forge = MockForge::new().with_open_issue("x/y", 1, "Open", &[]);
        let citations = Citations {
            issues: vec![
                issue("x/y", "1", "auto", false),
                issue("x/y", "1", "mentioned", false),
            ],
            pulls: vec![],
        };

        let report = reconcile(&forge, &citations, None).await.unwrap();

        assert!(report.succeeded(), "{}", report);
    }
}

// =============================================================================
// Coverage
// =============================================================================

mod coverage {
    use super::*;

    #[tokio::test]
    async fn skipped_without_watches() {
        let forge = MockForge::new();
        let report = reconcile(&forge, &Citations::default(), None)
            .await
            .unwrap();

        assert!(report.outcomes.iter().all(|o| o.check != Check::Covered));
        assert!(!forge
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::LatestOpenIssues { .. })));
    }

    #[tokio::test]
    async fn uncited_labelled_issues_are_reported() {
        let forge = MockForge::new()
            .with_open_issue("typst/typst", 10, "Cited", &["cjk"])
            .with_open_issue("typst/typst", 11, "Not cited", &["cjk", "bug"])
            .with_open_issue("typst/typst", 12, "Other label", &["bug"]);
        let citations = Citations {
            issues: vec![issue("typst/typst", "10", "auto", false)],
            pulls: vec![],
        };

        let watches = watches();
        let report = reconcile(&forge, &citations, Some(watches.as_slice()))
            .await
            .unwrap();

        let covered = report
            .outcomes
            .iter()
            .find(|o| o.check == Check::Covered)
            .unwrap();
        assert_eq!(covered.findings.len(), 1);
        match &covered.findings[0] {
            Finding::Uncovered(latest) => {
                assert_eq!(latest.key, key("typst/typst", 11));
                assert_eq!(latest.title, "Not cited");
            }
            other => panic!("unexpected finding {:?}", other),
        }
    }

    #[tokio::test]
    async fn all_checks_run_together() {
        let forge = MockForge::new()
            .with_closed_issue("typst/typst", 1, "Closed", "NOT_PLANNED")
            .with_open_issue("typst/typst", 2, "New", &["cjk"]);
        let citations = Citations {
            issues: vec![
                issue("typst/typst", "1", "auto", false),
                issue("typst/typst", "1", "auto", false),
            ],
            pulls: vec![],
        };

        let watches = watches();
        let report = reconcile(&forge, &citations, Some(watches.as_slice()))
            .await
            .unwrap();

        let checks: Vec<Check> = report.outcomes.iter().map(|o| o.check).collect();
        assert_eq!(checks, vec![Check::Unique, Check::Fresh, Check::Covered]);
        assert!(report.outcomes.iter().all(|o| !o.passed()));
    }
}

// =============================================================================
// Forge failures
// =============================================================================

mod failures {
    use super::*;

    #[tokio::test]
    async fn forge_errors_abort() {
        let forge = MockForge::new().fail_on(FailOn::FetchStates(ForgeError::RateLimited));
        let citations = Citations {
            issues: vec![issue("x/y", "1", "auto", false)],
            pulls: vec![],
        };

        let result = reconcile(&forge, &citations, None).await;

        assert!(matches!(result, Err(ForgeError::RateLimited)));
    }

    #[tokio::test]
    async fn coverage_errors_abort() {
        let forge = MockForge::new().fail_on(FailOn::LatestOpenIssues(ForgeError::NotFound(
            "repository".into(),
        )));
        let watches = watches();

        let result = reconcile(&forge, &Citations::default(), Some(watches.as_slice())).await;

        assert!(matches!(result, Err(ForgeError::NotFound(_))));
    }
}

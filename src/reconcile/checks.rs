//! reconcile::checks
//!
//! The individual consistency checks. Each one is a pure function from
//! citations (and upstream state, where needed) to a [`CheckOutcome`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::core::types::{CitationKey, TypeError};
use crate::document::{IssueMeta, PullMeta};
use crate::forge::{CitationTargets, IssueState, LatestIssue, PullState, UpstreamStates};

/// Which check produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Citations with the default note are unique.
    Unique,
    /// Recorded states match upstream.
    Fresh,
    /// Recently updated upstream issues are cited.
    Covered,
}

impl Check {
    fn failure_header(&self) -> &'static str {
        match self {
            Check::Unique => "Duplicated issues found:",
            Check::Fresh => "Outdated issues found:",
            Check::Covered => "Uncovered latest issues found:",
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            Check::Unique => "All issues are unique.",
            Check::Fresh => "All issues’ states are up to date.",
            Check::Covered => "All latest issues are covered.",
        }
    }
}

/// Whether a citation names an issue or a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationKind {
    Issue,
    Pull,
}

impl fmt::Display for CitationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CitationKind::Issue => write!(f, "issue"),
            CitationKind::Pull => write!(f, "pull request"),
        }
    }
}

/// One inconsistency between the document and upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// Cited more than once with the default note, as `repo#num`.
    Duplicated { citation: String, count: usize },
    /// Recorded `closed` differs from upstream.
    OutdatedIssue {
        key: CitationKey,
        state: IssueState,
        recorded: Vec<IssueMeta>,
    },
    /// Recorded `merged`/`rejected` differ from upstream.
    OutdatedPull {
        key: CitationKey,
        state: PullState,
        recorded: Vec<PullMeta>,
    },
    /// Upstream returned nothing for this citation.
    Missing { kind: CitationKind, key: CitationKey },
    /// The citation does not name a valid `owner/name#number`.
    Invalid { kind: CitationKind, citation: String },
    /// An open upstream issue the document does not cite.
    Uncovered(LatestIssue),
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Duplicated { citation, count } => {
                write!(f, "- {} (cited {} times)", citation, count)
            }
            Finding::OutdatedIssue {
                key,
                state,
                recorded,
            } => {
                let recorded: Vec<String> = recorded
                    .iter()
                    .map(|m| format!("(note: {}, closed: {})", m.note, m.closed))
                    .collect();
                write!(
                    f,
                    "- {} {} ({})\n  {}",
                    key,
                    state.title,
                    state.human(),
                    recorded.join(" ")
                )
            }
            Finding::OutdatedPull {
                key,
                state,
                recorded,
            } => {
                let recorded: Vec<String> = recorded
                    .iter()
                    .map(|m| format!("(merged: {}, rejected: {})", m.merged, m.rejected))
                    .collect();
                write!(
                    f,
                    "- {} {} ({})\n  {}",
                    key,
                    state.title,
                    state.human(),
                    recorded.join(" ")
                )
            }
            Finding::Missing { kind, key } => write!(f, "- {} ({} not found upstream)", key, kind),
            Finding::Invalid { kind, citation } => {
                write!(f, "- {} (invalid {} citation)", citation, kind)
            }
            Finding::Uncovered(issue) => match &issue.state_reason {
                Some(reason) => write!(f, "- {} ({}) {}", issue.key, reason, issue.title),
                None => write!(f, "- {} {}", issue.key, issue.title),
            },
        }
    }
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub check: Check,
    pub findings: Vec<Finding>,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(f, "{}", self.check.success_message());
        }
        write!(f, "\x1b[31m{}\x1b[0m", self.check.failure_header())?;
        for finding in &self.findings {
            write!(f, "\n{}", finding)?;
        }
        Ok(())
    }
}

/// Citations grouped by repository, then number.
///
/// Entries that do not parse as a [`CitationKey`] are kept aside.
#[derive(Debug)]
pub struct Grouped<'a, T> {
    pub by_key: BTreeMap<CitationKey, Vec<&'a T>>,
    pub invalid: Vec<&'a T>,
}

pub fn group<'a, T>(
    items: &'a [T],
    key: impl Fn(&T) -> Result<CitationKey, TypeError>,
) -> Grouped<'a, T> {
    let mut by_key: BTreeMap<CitationKey, Vec<&T>> = BTreeMap::new();
    let mut invalid = Vec::new();
    for item in items {
        match key(item) {
            Ok(k) => by_key.entry(k).or_default().push(item),
            Err(_) => invalid.push(item),
        }
    }
    Grouped { by_key, invalid }
}

/// Every valid citation, deduplicated.
pub fn citation_targets(issues: &[IssueMeta], pulls: &[PullMeta]) -> CitationTargets {
    CitationTargets {
        issues: group(issues, IssueMeta::key).by_key.into_keys().collect(),
        pulls: group(pulls, PullMeta::key).by_key.into_keys().collect(),
    }
}

/// Issues cited more than once with the default note.
pub fn check_unique(issues: &[IssueMeta]) -> CheckOutcome {
    let suspicious: Vec<IssueMeta> = issues
        .iter()
        .filter(|m| m.has_default_note())
        .cloned()
        .collect();

    let grouped = group(&suspicious, IssueMeta::key);

    let mut invalid: BTreeMap<String, usize> = BTreeMap::new();
    for m in grouped.invalid {
        *invalid.entry(format!("{}#{}", m.repo, m.num)).or_default() += 1;
    }

    let findings = grouped
        .by_key
        .into_iter()
        .map(|(key, metas)| (key.to_string(), metas.len()))
        .chain(invalid)
        .filter(|(_, count)| *count > 1)
        .map(|(citation, count)| Finding::Duplicated { citation, count })
        .collect();

    CheckOutcome {
        check: Check::Unique,
        findings,
    }
}

/// Recorded states that disagree with upstream.
pub fn check_fresh(issues: &[IssueMeta], pulls: &[PullMeta], live: &UpstreamStates) -> CheckOutcome {
    let mut findings = Vec::new();

    let grouped = group(issues, IssueMeta::key);
    for (key, metas) in grouped.by_key {
        match live.issues.get(&key) {
            None => findings.push(Finding::Missing {
                kind: CitationKind::Issue,
                key,
            }),
            Some(state) if metas.iter().any(|m| m.closed != state.closed) => {
                findings.push(Finding::OutdatedIssue {
                    key,
                    state: state.clone(),
                    recorded: metas.into_iter().cloned().collect(),
                })
            }
            Some(_) => {}
        }
    }
    findings.extend(grouped.invalid.into_iter().map(|m| Finding::Invalid {
        kind: CitationKind::Issue,
        citation: format!("{}#{}", m.repo, m.num),
    }));

    let grouped = group(pulls, PullMeta::key);
    for (key, metas) in grouped.by_key {
        match live.pulls.get(&key) {
            None => findings.push(Finding::Missing {
                kind: CitationKind::Pull,
                key,
            }),
            Some(state)
                if metas
                    .iter()
                    .any(|m| m.merged != state.merged || m.rejected != state.rejected()) =>
            {
                findings.push(Finding::OutdatedPull {
                    key,
                    state: state.clone(),
                    recorded: metas.into_iter().cloned().collect(),
                })
            }
            Some(_) => {}
        }
    }
    findings.extend(grouped.invalid.into_iter().map(|m| Finding::Invalid {
        kind: CitationKind::Pull,
        citation: format!("{}#{}", m.repo, m.num),
    }));

    CheckOutcome {
        check: Check::Fresh,
        findings,
    }
}

/// Latest upstream issues the document does not cite.
pub fn check_covered(issues: &[IssueMeta], latest: &[LatestIssue]) -> CheckOutcome {
    let cited: BTreeSet<CitationKey> = issues.iter().filter_map(|m| m.key().ok()).collect();

    CheckOutcome {
        check: Check::Covered,
        findings: latest
            .iter()
            .filter(|issue| !cited.contains(&issue.key))
            .cloned()
            .map(Finding::Uncovered)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(repo: &str, num: &str, note: &str, closed: bool) -> IssueMeta {
        IssueMeta {
            repo: repo.into(),
            num: num.into(),
            note: note.into(),
            closed,
        }
    }

    fn key(repo: &str, number: u64) -> CitationKey {
        CitationKey {
            repo: repo.into(),
            number,
        }
    }

    fn open_state(title: &str) -> IssueState {
        IssueState {
            title: title.into(),
            state: "OPEN".into(),
            state_reason: None,
            closed: false,
            closed_at: None,
        }
    }

    mod unique {
        use super::*;

        #[test]
        fn reports_each_duplicate_once() {
            let issues = [
                issue("x/y", "1", "auto", false),
                issue("x/y", "1", "auto", false),
                issue("x/y", "1", "auto", false),
                issue("x/y", "2", "auto", false),
            ];
            let outcome = check_unique(&issues);
            assert_eq!(
                outcome.findings,
                [Finding::Duplicated {
                    citation: "x/y#1".into(),
                    count: 3
                }]
            );
        }

        #[test]
        fn unparsable_citations_are_compared_as_written() {
            let issues = [
                issue("x/y", "abc", "auto", false),
                issue("x/y", "abc", "auto", false),
                issue("x/y", "def", "auto", false),
            ];
            let outcome = check_unique(&issues);
            assert_eq!(
                outcome.findings,
                [Finding::Duplicated {
                    citation: "x/y#abc".into(),
                    count: 2
                }]
            );
            assert_eq!(outcome.findings[0].to_string(), "- x/y#abc (cited 2 times)");
        }

        #[test]
        fn annotated_citations_are_exempt() {
            let issues = [
                issue("x/y", "1", "auto", false),
                issue("x/y", "1", "mentioned", false),
            ];
            assert!(check_unique(&issues).passed());
        }

        #[test]
        fn success_message() {
            assert_eq!(check_unique(&[]).to_string(), "All issues are unique.");
        }
    }

    mod fresh {
        use super::*;

        #[test]
        fn matching_states_pass() {
            let issues = [issue("x/y", "1", "auto", false)];
            let mut live = UpstreamStates::default();
            live.issues.insert(key("x/y", 1), open_state("t"));
            assert!(check_fresh(&issues, &[], &live).passed());
        }

        #[test]
        fn one_finding_per_key_lists_every_record() {
            let issues = [
                issue("x/y", "1", "auto", true),
                issue("x/y", "1", "mentioned", false),
            ];
            let mut live = UpstreamStates::default();
            live.issues.insert(key("x/y", 1), open_state("Title"));

            let outcome = check_fresh(&issues, &[], &live);
            assert_eq!(outcome.findings.len(), 1);
            assert_eq!(
                outcome.findings[0].to_string(),
                "- x/y#1 Title (open)\n  (note: auto, closed: true) (note: mentioned, closed: false)"
            );
        }

        #[test]
        fn missing_upstream_is_reported() {
            let issues = [issue("x/y", "7", "auto", false)];
            let outcome = check_fresh(&issues, &[], &UpstreamStates::default());
            assert_eq!(
                outcome.findings,
                [Finding::Missing {
                    kind: CitationKind::Issue,
                    key: key("x/y", 7)
                }]
            );
        }

        #[test]
        fn invalid_numbers_are_reported() {
            let issues = [issue("x/y", "abc", "auto", false)];
            let outcome = check_fresh(&issues, &[], &UpstreamStates::default());
            assert_eq!(outcome.findings[0].to_string(), "- x/y#abc (invalid issue citation)");
        }

        #[test]
        fn pull_rejected_flag_is_checked() {
            let pulls = [PullMeta {
                repo: "x/y".into(),
                num: "3".into(),
                merged: false,
                rejected: false,
            }];
            let mut live = UpstreamStates::default();
            live.pulls.insert(
                key("x/y", 3),
                PullState {
                    title: "Fix".into(),
                    state: "CLOSED".into(),
                    merged: false,
                    closed: true,
                    closed_at: Some("2024-02-02T00:00:00Z".parse().unwrap()),
                },
            );

            let outcome = check_fresh(&[], &pulls, &live);
            assert_eq!(
                outcome.to_string(),
                "\x1b[31mOutdated issues found:\x1b[0m\n\
                 - x/y#3 Fix (closed at 2024-02-02T00:00:00Z without merging)\n  \
                 (merged: false, rejected: false)"
            );
        }
    }

    mod covered {
        use super::*;

        #[test]
        fn uncited_latest_issues_are_reported() {
            let issues = [issue("typst/typst", "1", "auto", false)];
            let latest = [
                LatestIssue {
                    key: key("typst/typst", 1),
                    title: "cited".into(),
                    state_reason: None,
                },
                LatestIssue {
                    key: key("typst/typst", 2),
                    title: "Vertical writing".into(),
                    state_reason: Some("REOPENED".into()),
                },
            ];

            let outcome = check_covered(&issues, &latest);
            assert_eq!(outcome.findings.len(), 1);
            assert_eq!(
                outcome.findings[0].to_string(),
                "- typst/typst#2 (REOPENED) Vertical writing"
            );
        }
    }

    #[test]
    fn targets_are_deduplicated() {
        let issues = [
            issue("x/y", "1", "auto", false),
            issue("x/y", "01", "mentioned", false),
        ];
        let targets = citation_targets(&issues, &[]);
        assert_eq!(targets.issues.len(), 1);
    }
}

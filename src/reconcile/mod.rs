//! reconcile
//!
//! Checks that the issues and pull requests cited by the document agree
//! with their upstream state.
//!
//! # Checks
//!
//! - **Unique**: an issue cited with the default note appears only once.
//!   Cite it again with a `note` to make the repetition intentional.
//! - **Fresh**: the recorded `closed` flag of each issue, and the
//!   `merged`/`rejected` flags of each pull request, match upstream.
//! - **Covered** (optional): every recently updated open issue of the
//!   watched repositories is cited somewhere.
//!
//! # Design
//!
//! Every check runs even when an earlier one failed; findings are values
//! collected into a [`Report`]. Upstream state is fetched with one request
//! for freshness and one for coverage, issued concurrently. Errors from the
//! forge itself abort the run instead of becoming findings.
//!
//! # Example
//!
//! ```
//! use clreq_tools::document::IssueMeta;
//! use clreq_tools::forge::mock::MockForge;
//! use clreq_tools::reconcile::{reconcile, Citations};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new().with_closed_issue("x/y", 1, "Fixed", "COMPLETED");
//! let citations = Citations {
//!     issues: vec![IssueMeta {
//!         repo: "x/y".into(),
//!         num: "1".into(),
//!         note: "auto".into(),
//!         closed: false,
//!     }],
//!     pulls: vec![],
//! };
//!
//! let report = reconcile(&forge, &citations, None).await.unwrap();
//! assert!(!report.succeeded());
//! # });
//! ```

mod checks;

pub use checks::{
    check_covered, check_fresh, check_unique, citation_targets, group, Check, CheckOutcome,
    CitationKind, Finding, Grouped,
};

use std::fmt;

use crate::document::{IssueMeta, PullMeta};
use crate::forge::{Forge, ForgeError, WatchTarget};

/// Everything the document cites.
#[derive(Debug, Clone, Default)]
pub struct Citations {
    pub issues: Vec<IssueMeta>,
    pub pulls: Vec<PullMeta>,
}

/// Outcomes of every check that ran, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub outcomes: Vec<CheckOutcome>,
}

impl Report {
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(CheckOutcome::passed)
    }

    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.outcomes.iter().flat_map(|o| &o.findings)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.outcomes.iter().map(|o| o.to_string()).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

/// Run every check against `forge`.
///
/// The coverage check runs only when `watches` is given.
///
/// # Errors
///
/// Returns the first `ForgeError` from fetching upstream state.
pub async fn reconcile(
    forge: &dyn Forge,
    citations: &Citations,
    watches: Option<&[WatchTarget]>,
) -> Result<Report, ForgeError> {
    let targets = citation_targets(&citations.issues, &citations.pulls);
    log::debug!(
        "reconciling {} issues and {} pull requests via {}",
        targets.issues.len(),
        targets.pulls.len(),
        forge.name()
    );

    let latest = async {
        match watches {
            Some(watches) => forge.latest_open_issues(watches).await.map(Some),
            None => Ok(None),
        }
    };
    let (live, latest) = tokio::join!(forge.fetch_states(&targets), latest);
    let (live, latest) = (live?, latest?);

    let mut outcomes = vec![
        check_unique(&citations.issues),
        check_fresh(&citations.issues, &citations.pulls, &live),
    ];
    if let Some(latest) = latest {
        outcomes.push(check_covered(&citations.issues, &latest));
    }

    Ok(Report { outcomes })
}

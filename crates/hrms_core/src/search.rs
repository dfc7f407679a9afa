//! Global search over every record kind.
//!
//! [`SearchAggregator::search`] debounces keystrokes, sends only the
//! latest term and drops any response that arrives after a newer term was
//! typed. Results are grouped into three [`SearchBuckets`] and each one
//! maps to a single [`NavigationTarget`].

use crate::client::RecordClient;
use crate::config::SearchConfig;
use crate::error::{HrmsError, Result};
use crate::types::{EmployeeId, SearchResult};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Display group of a search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchBucket {
    /// Employee records.
    Identity,
    /// Onboarding tasks and questionnaire responses.
    Onboarding,
    /// Goals, reviews and appraisals.
    Performance,
}

impl SearchBucket {
    pub fn heading(self) -> &'static str {
        match self {
            Self::Identity => "Employees",
            Self::Onboarding => "Onboarding",
            Self::Performance => "Performance",
        }
    }

    pub fn of(result: &SearchResult) -> Self {
        match result {
            SearchResult::Employee { .. } => Self::Identity,
            SearchResult::OnboardingTask { .. } | SearchResult::QuestionnaireResponse { .. } => {
                Self::Onboarding
            }
            SearchResult::Goal { .. }
            | SearchResult::Review { .. }
            | SearchResult::Appraisal { .. } => Self::Performance,
        }
    }
}

/// Results split by bucket, each keeping the service's order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchBuckets {
    pub identity: Vec<SearchResult>,
    pub onboarding: Vec<SearchResult>,
    pub performance: Vec<SearchResult>,
}

impl SearchBuckets {
    pub fn partition(results: &[SearchResult]) -> Self {
        let mut buckets = Self::default();
        for result in results {
            let target = match SearchBucket::of(result) {
                SearchBucket::Identity => &mut buckets.identity,
                SearchBucket::Onboarding => &mut buckets.onboarding,
                SearchBucket::Performance => &mut buckets.performance,
            };
            target.push(result.clone());
        }
        buckets
    }

    /// Non-empty buckets in display order.
    pub fn sections(&self) -> Vec<(SearchBucket, &[SearchResult])> {
        [
            (SearchBucket::Identity, self.identity.as_slice()),
            (SearchBucket::Onboarding, self.onboarding.as_slice()),
            (SearchBucket::Performance, self.performance.as_slice()),
        ]
        .into_iter()
        .filter(|(_, results)| !results.is_empty())
        .collect()
    }

    pub fn len(&self) -> usize {
        self.identity.len() + self.onboarding.len() + self.performance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Page a search result opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    EmployeeDetail(EmployeeId),
    OnboardingAdmin,
    OnboardingQuestionnaire,
    PerformanceGoals,
    PerformanceReviews,
    PerformanceAppraisal,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Self::EmployeeDetail(id) => format!("/employees/{}", id),
            Self::OnboardingAdmin => "/onboarding/admin".to_string(),
            Self::OnboardingQuestionnaire => "/onboarding/questionnaire".to_string(),
            Self::PerformanceGoals => "/performance/goals".to_string(),
            Self::PerformanceReviews => "/performance/reviews".to_string(),
            Self::PerformanceAppraisal => "/performance/appraisal".to_string(),
        }
    }
}

/// Route plus the employee it should be opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationTarget {
    pub route: Route,
    /// Passed as the `employeeId` search parameter. `None` when the id is
    /// already part of the path.
    pub employee_id: Option<EmployeeId>,
}

impl NavigationTarget {
    pub fn for_result(result: &SearchResult) -> Self {
        let context = |route| Self {
            route,
            employee_id: Some(result.employee_id()),
        };
        match result {
            SearchResult::Employee { employee } => Self {
                route: Route::EmployeeDetail(employee.id),
                employee_id: None,
            },
            SearchResult::OnboardingTask { .. } => context(Route::OnboardingAdmin),
            SearchResult::QuestionnaireResponse { .. } => context(Route::OnboardingQuestionnaire),
            SearchResult::Goal { .. } => context(Route::PerformanceGoals),
            SearchResult::Review { .. } => context(Route::PerformanceReviews),
            SearchResult::Appraisal { .. } => context(Route::PerformanceAppraisal),
        }
    }
}

impl fmt::Display for NavigationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.employee_id {
            Some(id) => write!(f, "{}?employeeId={}", self.route.path(), id),
            None => f.write_str(&self.route.path()),
        }
    }
}

/// Title and detail line of a result row.
pub fn describe(result: &SearchResult) -> (String, String) {
    match result {
        SearchResult::Employee { employee } => (
            employee.name.clone(),
            format!("{} • ID: {}", employee.job_title, employee.id),
        ),
        SearchResult::OnboardingTask { employee_id, task } => {
            (task.title.clone(), format!("Employee ID: {}", employee_id))
        }
        SearchResult::QuestionnaireResponse { employee_id, .. } => (
            "Questionnaire Response".to_string(),
            format!("Employee ID: {}", employee_id),
        ),
        SearchResult::Goal { employee_id, goal } => (
            goal.title.clone(),
            format!("Goal • Employee ID: {}", employee_id),
        ),
        SearchResult::Review {
            employee_id,
            review,
        } => (
            "Performance Review".to_string(),
            format!("Review ID: {} • Employee ID: {}", review.id, employee_id),
        ),
        SearchResult::Appraisal { appraisal, .. } => (
            appraisal.employee_name.clone(),
            format!("Appraisal • {}", appraisal.appraisal_period),
        ),
    }
}

/// Results currently on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchView {
    /// Trimmed term the results belong to. Empty for a cleared box.
    pub term: String,
    pub results: Vec<SearchResult>,
}

impl SearchView {
    pub fn buckets(&self) -> SearchBuckets {
        SearchBuckets::partition(&self.results)
    }
}

/// How one `search` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The call's results are now displayed.
    Displayed(SearchView),
    /// Newer input arrived first; nothing was displayed.
    Superseded,
}

/// Debouncing, last-input-wins front end of the global search.
pub struct SearchAggregator {
    client: Arc<RecordClient>,
    debounce: Duration,
    /// Bumped on every input; a call only displays if it is still current.
    generation: AtomicU64,
    displayed: Mutex<SearchView>,
}

impl SearchAggregator {
    /// Opens the search for an administrator.
    ///
    /// Fails with `AccessDenied` for everyone else.
    pub async fn open(client: Arc<RecordClient>, config: &SearchConfig) -> Result<Self> {
        if !client.is_admin().await? {
            return Err(HrmsError::AccessDenied(
                "global search is only available to administrators".to_string(),
            ));
        }
        Ok(Self {
            client,
            debounce: config.debounce(),
            generation: AtomicU64::new(0),
            displayed: Mutex::new(SearchView::default()),
        })
    }

    pub fn displayed(&self) -> SearchView {
        self.displayed.lock().clone()
    }

    /// Handles one change of the search box.
    pub async fn search(&self, raw: &str) -> Result<SearchOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let term = raw.trim();
        if term.is_empty() {
            return Ok(self.display(generation, SearchView::default()));
        }

        tokio::time::sleep(self.debounce).await;
        if !self.is_current(generation) {
            return Ok(SearchOutcome::Superseded);
        }

        debug!(term, "sending global search");
        let results = match self.client.global_search(term).await {
            Ok(results) => results,
            Err(_) if !self.is_current(generation) => return Ok(SearchOutcome::Superseded),
            Err(err) => return Err(err),
        };
        let outcome = self.display(
            generation,
            SearchView {
                term: term.to_string(),
                results,
            },
        );
        if outcome == SearchOutcome::Superseded {
            debug!(term, "discarding results of a superseded search");
        }
        Ok(outcome)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn display(&self, generation: u64, view: SearchView) -> SearchOutcome {
        let mut shown = self.displayed.lock();
        if !self.is_current(generation) {
            return SearchOutcome::Superseded;
        }
        *shown = view.clone();
        SearchOutcome::Displayed(view)
    }
}

impl fmt::Debug for SearchAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchAggregator")
            .field("debounce", &self.debounce)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}

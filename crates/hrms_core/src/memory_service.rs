//! In-process record service.
//!
//! Backs the CLI and the tests. State is seeded from a JSON [`Seed`]
//! document. Latency, outages and per-operation failures can be injected
//! to exercise the retry, dedup and stale-response paths.

use crate::error::{HrmsError, Result};
use crate::service::RecordService;
use crate::types::{
    AppraisalDetails, CreateEmployeeArgs, CycleId, EmployeeId, EmployeePatch, EmployeeRecord, Goal,
    GoalId, GoalStatus, OnboardingResponse, OnboardingTask, PerformanceCycle, Profile,
    QuestionnaireResponse, Review, ReviewId, ReviewStatus, ReviewerRole, SearchResult, Subject,
    TaskId, TaskStatus, Timestamp, UserRole,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Records owned by one employee, as listed in a seed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeItems<T> {
    pub employee_id: EmployeeId,
    pub items: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProfile {
    pub subject: Subject,
    pub profile: Profile,
}

/// Initial contents of an [`InMemoryRecordService`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Seed {
    pub profiles: Vec<SeedProfile>,
    pub admins: Vec<Subject>,
    pub employees: Vec<EmployeeRecord>,
    pub onboarding_tasks: Vec<EmployeeItems<OnboardingTask>>,
    pub goals: Vec<EmployeeItems<Goal>>,
    pub reviews: Vec<Review>,
    pub appraisals: Vec<AppraisalDetails>,
    pub questionnaire_responses: Vec<QuestionnaireResponse>,
    pub onboarding_questions: Vec<String>,
    pub performance_cycles: Vec<PerformanceCycle>,
}

impl Seed {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| HrmsError::Serialization(format!("invalid seed document: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[derive(Default)]
struct State {
    profiles: HashMap<Subject, Profile>,
    admins: HashSet<Subject>,
    employees: BTreeMap<EmployeeId, EmployeeRecord>,
    tasks: BTreeMap<EmployeeId, Vec<OnboardingTask>>,
    goals: BTreeMap<EmployeeId, Vec<Goal>>,
    reviews: BTreeMap<EmployeeId, Vec<Review>>,
    appraisals: BTreeMap<EmployeeId, AppraisalDetails>,
    responses: BTreeMap<EmployeeId, Vec<QuestionnaireResponse>>,
    questions: Vec<String>,
    cycles: BTreeMap<CycleId, PerformanceCycle>,
    next_review: ReviewId,
}

#[derive(Default)]
struct Faults {
    latency: HashMap<&'static str, Duration>,
    search_latency: HashMap<String, Duration>,
    failing: HashSet<&'static str>,
    calls: HashMap<&'static str, usize>,
    search_terms: Vec<String>,
}

/// Complete in-process implementation of [`RecordService`].
pub struct InMemoryRecordService {
    state: Mutex<State>,
    faults: Mutex<Faults>,
    available: AtomicBool,
}

impl InMemoryRecordService {
    pub fn new() -> Self {
        Self::from_seed(Seed::default())
    }

    pub fn from_seed(seed: Seed) -> Self {
        let mut state = State {
            questions: seed.onboarding_questions,
            admins: seed.admins.into_iter().collect(),
            ..Default::default()
        };
        for entry in seed.profiles {
            state.profiles.insert(entry.subject, entry.profile);
        }
        for employee in seed.employees {
            state.employees.insert(employee.id, employee);
        }
        for list in seed.onboarding_tasks {
            state.tasks.entry(list.employee_id).or_default().extend(list.items);
        }
        for list in seed.goals {
            state.goals.entry(list.employee_id).or_default().extend(list.items);
        }
        for review in seed.reviews {
            state.next_review = state.next_review.max(review.id + 1);
            state.reviews.entry(review.employee_id).or_default().push(review);
        }
        for details in seed.appraisals {
            state.appraisals.insert(details.employee_id, details);
        }
        for response in seed.questionnaire_responses {
            state
                .responses
                .entry(response.employee_id)
                .or_default()
                .push(response);
        }
        for cycle in seed.performance_cycles {
            state.cycles.insert(cycle.id, cycle);
        }
        Self {
            state: Mutex::new(state),
            faults: Mutex::new(Faults::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Makes every call fail with `ServiceUnavailable` while `false`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delays every call of `operation`.
    pub fn set_latency(&self, operation: &'static str, delay: Duration) {
        self.faults.lock().latency.insert(operation, delay);
    }

    /// Delays `globalSearch` for one exact term.
    pub fn set_search_latency(&self, term: &str, delay: Duration) {
        self.faults
            .lock()
            .search_latency
            .insert(term.to_string(), delay);
    }

    /// Makes `operation` fail with `ServiceUnavailable` until cleared.
    pub fn fail_operation(&self, operation: &'static str, failing: bool) {
        let mut faults = self.faults.lock();
        if failing {
            faults.failing.insert(operation);
        } else {
            faults.failing.remove(operation);
        }
    }

    /// Number of calls made to `operation` so far.
    pub fn calls(&self, operation: &str) -> usize {
        self.faults.lock().calls.get(operation).copied().unwrap_or(0)
    }

    /// Terms `globalSearch` was called with, in call order.
    pub fn search_terms(&self) -> Vec<String> {
        self.faults.lock().search_terms.clone()
    }

    /// Stores a profile directly, bypassing counters and faults.
    pub fn put_profile(&self, subject: Subject, profile: Profile) {
        self.state.lock().profiles.insert(subject, profile);
    }

    /// Stored profile of `subject`, bypassing counters and faults.
    pub fn stored_profile(&self, subject: &Subject) -> Option<Profile> {
        self.state.lock().profiles.get(subject).cloned()
    }

    async fn enter(&self, operation: &'static str) -> Result<()> {
        self.enter_with(operation, None).await
    }

    async fn enter_with(&self, operation: &'static str, extra: Option<Duration>) -> Result<()> {
        let (delay, failing) = {
            let mut faults = self.faults.lock();
            *faults.calls.entry(operation).or_default() += 1;
            let delay = extra.or_else(|| faults.latency.get(operation).copied());
            (delay, faults.failing.contains(operation))
        };
        debug!(operation, "record service call");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing || !self.available.load(Ordering::SeqCst) {
            return Err(HrmsError::ServiceUnavailable(format!(
                "{} could not reach the record service",
                operation
            )));
        }
        Ok(())
    }

    fn require_employee(state: &State, id: EmployeeId) -> Result<()> {
        if state.employees.contains_key(&id) {
            Ok(())
        } else {
            Err(HrmsError::Validation(format!("employee {} does not exist", id)))
        }
    }
}

impl Default for InMemoryRecordService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryRecordService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InMemoryRecordService")
            .field("profiles", &state.profiles.len())
            .field("employees", &state.employees.len())
            .field("available", &self.available.load(Ordering::SeqCst))
            .finish()
    }
}

fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as Timestamp)
        .unwrap_or_default()
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[async_trait]
impl RecordService for InMemoryRecordService {
    async fn get_profile(&self, caller: &Subject) -> Result<Option<Profile>> {
        self.enter("getProfile").await?;
        Ok(self.state.lock().profiles.get(caller).cloned())
    }

    async fn save_profile(&self, caller: &Subject, profile: Profile) -> Result<()> {
        self.enter("saveProfile").await?;
        self.state.lock().profiles.insert(caller.clone(), profile);
        Ok(())
    }

    async fn employee_id_for_subject(&self, caller: &Subject) -> Result<Option<EmployeeId>> {
        self.enter("getEmployeeIdForSubject").await?;
        let state = self.state.lock();
        let linked = state
            .employees
            .values()
            .find(|e| e.principal_id.as_ref() == Some(caller))
            .map(|e| e.id);
        Ok(linked.or_else(|| state.profiles.get(caller).and_then(|p| p.employee_id)))
    }

    async fn is_admin(&self, caller: &Subject) -> Result<bool> {
        self.enter("isAdmin").await?;
        Ok(self.state.lock().admins.contains(caller))
    }

    async fn user_role(&self, caller: &Subject) -> Result<UserRole> {
        self.enter("getCallerUserRole").await?;
        let state = self.state.lock();
        Ok(if state.admins.contains(caller) {
            UserRole::Admin
        } else if state.profiles.contains_key(caller) {
            UserRole::User
        } else {
            UserRole::Guest
        })
    }

    async fn get_employee(&self, id: EmployeeId) -> Result<Option<EmployeeRecord>> {
        self.enter("getEmployee").await?;
        Ok(self.state.lock().employees.get(&id).cloned())
    }

    async fn create_employee(&self, args: CreateEmployeeArgs) -> Result<Option<EmployeeId>> {
        self.enter("createEmployee").await?;
        let mut state = self.state.lock();
        let id = EmployeeId(state.employees.keys().next_back().map_or(1, |id| id.0 + 1));
        state.employees.insert(
            id,
            EmployeeRecord {
                id,
                name: args.name,
                email: args.email,
                job_title: args.job_title,
                department: args.department,
                manager: args.manager,
                status: Default::default(),
                principal_id: args.principal_id,
                start_date: args.start_date,
            },
        );
        Ok(Some(id))
    }

    async fn update_employee(&self, id: EmployeeId, patch: EmployeePatch) -> Result<bool> {
        self.enter("updateEmployee").await?;
        let mut state = self.state.lock();
        match state.employees.get_mut(&id) {
            Some(record) => {
                patch.apply_to(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn search_employees(&self, term: &str) -> Result<Vec<EmployeeRecord>> {
        self.enter("searchEmployees").await?;
        let needle = term.trim().to_lowercase();
        let state = self.state.lock();
        Ok(state
            .employees
            .values()
            .filter(|e| contains(&e.name, &needle) || contains(&e.email, &needle))
            .cloned()
            .collect())
    }

    async fn get_onboarding_tasks(&self, id: EmployeeId) -> Result<Option<Vec<OnboardingTask>>> {
        self.enter("getOnboardingTasks").await?;
        let state = self.state.lock();
        if !state.employees.contains_key(&id) {
            return Ok(None);
        }
        Ok(Some(state.tasks.get(&id).cloned().unwrap_or_default()))
    }

    async fn assign_onboarding_tasks(
        &self,
        id: EmployeeId,
        tasks: Vec<OnboardingTask>,
    ) -> Result<bool> {
        self.enter("assignOnboardingTasks").await?;
        let mut state = self.state.lock();
        if !state.employees.contains_key(&id) {
            return Ok(false);
        }
        state.tasks.entry(id).or_default().extend(tasks);
        Ok(true)
    }

    async fn update_onboarding_task_status(
        &self,
        id: EmployeeId,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<bool> {
        self.enter("updateOnboardingTaskStatus").await?;
        let mut state = self.state.lock();
        let task = state
            .tasks
            .get_mut(&id)
            .and_then(|tasks| tasks.iter_mut().find(|t| t.id == task_id));
        Ok(match task {
            Some(task) => {
                task.status = status;
                true
            }
            None => false,
        })
    }

    async fn get_goals(&self, id: EmployeeId) -> Result<Option<Vec<Goal>>> {
        self.enter("getGoals").await?;
        let state = self.state.lock();
        if !state.employees.contains_key(&id) {
            return Ok(None);
        }
        Ok(Some(state.goals.get(&id).cloned().unwrap_or_default()))
    }

    async fn add_goals(&self, id: EmployeeId, goals: Vec<Goal>) -> Result<bool> {
        self.enter("addGoals").await?;
        let mut state = self.state.lock();
        if !state.employees.contains_key(&id) {
            return Ok(false);
        }
        state.goals.entry(id).or_default().extend(goals);
        Ok(true)
    }

    async fn update_goal_progress(
        &self,
        id: EmployeeId,
        goal_id: GoalId,
        progress: u8,
        status: GoalStatus,
    ) -> Result<bool> {
        self.enter("updateGoalProgress").await?;
        let mut state = self.state.lock();
        let goal = state
            .goals
            .get_mut(&id)
            .and_then(|goals| goals.iter_mut().find(|g| g.id == goal_id));
        Ok(match goal {
            Some(goal) => {
                goal.progress = progress.min(100);
                goal.status = status;
                true
            }
            None => false,
        })
    }

    async fn get_reviews(&self, id: EmployeeId) -> Result<Option<Vec<Review>>> {
        self.enter("getReviews").await?;
        let state = self.state.lock();
        if !state.employees.contains_key(&id) {
            return Ok(None);
        }
        Ok(Some(state.reviews.get(&id).cloned().unwrap_or_default()))
    }

    async fn create_review(&self, id: EmployeeId, cycle_id: CycleId) -> Result<ReviewId> {
        self.enter("createReview").await?;
        let mut state = self.state.lock();
        Self::require_employee(&state, id)?;
        let review_id = state.next_review.max(1);
        state.next_review = review_id + 1;
        state.reviews.entry(id).or_default().push(Review {
            id: review_id,
            employee_id: id,
            cycle_id,
            status: ReviewStatus::Pending,
            self_review: String::new(),
            manager_review: String::new(),
            hr_review: String::new(),
        });
        Ok(review_id)
    }

    async fn submit_review(
        &self,
        id: EmployeeId,
        review_id: ReviewId,
        role: ReviewerRole,
        text: String,
    ) -> Result<bool> {
        let operation = match role {
            ReviewerRole::SelfReview => "submitSelfReview",
            ReviewerRole::Manager => "submitManagerReview",
            ReviewerRole::Hr => "submitHRReview",
        };
        self.enter(operation).await?;
        let mut state = self.state.lock();
        let review = state
            .reviews
            .get_mut(&id)
            .and_then(|reviews| reviews.iter_mut().find(|r| r.id == review_id));
        let Some(review) = review else {
            return Ok(false);
        };
        match role {
            ReviewerRole::SelfReview => review.self_review = text,
            ReviewerRole::Manager => review.manager_review = text,
            ReviewerRole::Hr => review.hr_review = text,
        }
        review.refresh_status();
        Ok(true)
    }

    async fn get_performance_cycles(&self) -> Result<Vec<PerformanceCycle>> {
        self.enter("getAllPerformanceCycles").await?;
        Ok(self.state.lock().cycles.values().cloned().collect())
    }

    async fn get_performance_cycle(&self, cycle_id: CycleId) -> Result<Option<PerformanceCycle>> {
        self.enter("getPerformanceCycle").await?;
        Ok(self.state.lock().cycles.get(&cycle_id).cloned())
    }

    async fn create_performance_cycle(&self, mut cycle: PerformanceCycle) -> Result<CycleId> {
        self.enter("createPerformanceCycle").await?;
        let mut state = self.state.lock();
        let id = state.cycles.keys().next_back().map_or(1, |id| id + 1);
        cycle.id = id;
        state.cycles.insert(id, cycle);
        Ok(id)
    }

    async fn get_appraisal_details(&self, id: EmployeeId) -> Result<Option<AppraisalDetails>> {
        self.enter("getAppraisalDetails").await?;
        Ok(self.state.lock().appraisals.get(&id).cloned())
    }

    async fn save_appraisal_details(&self, details: AppraisalDetails) -> Result<()> {
        self.enter("saveAppraisalDetails").await?;
        let mut state = self.state.lock();
        Self::require_employee(&state, details.employee_id)?;
        state.appraisals.insert(details.employee_id, details);
        Ok(())
    }

    async fn get_questionnaire_responses(
        &self,
        id: EmployeeId,
    ) -> Result<Vec<QuestionnaireResponse>> {
        self.enter("getQuestionnaireResponses").await?;
        Ok(self
            .state
            .lock()
            .responses
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_questionnaire_responses(
        &self,
        id: EmployeeId,
        responses: Vec<OnboardingResponse>,
    ) -> Result<()> {
        self.enter("submitQuestionnaireResponses").await?;
        let submitted_at = now();
        let mut state = self.state.lock();
        Self::require_employee(&state, id)?;
        let stored = state.responses.entry(id).or_default();
        stored.extend(responses.into_iter().map(|r| QuestionnaireResponse {
            employee_id: id,
            question: r.question,
            answer: r.answer,
            submitted_at,
        }));
        Ok(())
    }

    async fn get_onboarding_questions(&self) -> Result<Vec<String>> {
        self.enter("getOnboardingQuestions").await?;
        Ok(self.state.lock().questions.clone())
    }

    async fn global_search(&self, caller: &Subject, term: &str) -> Result<Vec<SearchResult>> {
        let delay = {
            let mut faults = self.faults.lock();
            faults.search_terms.push(term.to_string());
            faults.search_latency.get(term).copied()
        };
        self.enter_with("globalSearch", delay).await?;

        let state = self.state.lock();
        if !state.admins.contains(caller) {
            return Err(HrmsError::AccessDenied(
                "global search requires the admin role".to_string(),
            ));
        }
        let needle = term.trim().to_lowercase();
        let mut hits = Vec::new();

        for employee in state.employees.values() {
            if [&employee.name, &employee.email, &employee.job_title, &employee.department]
                .iter()
                .any(|field| contains(field, &needle))
            {
                hits.push(SearchResult::Employee {
                    employee: employee.clone(),
                });
            }
        }
        for (id, tasks) in &state.tasks {
            for task in tasks {
                if contains(&task.title, &needle) || contains(&task.description, &needle) {
                    hits.push(SearchResult::OnboardingTask {
                        employee_id: *id,
                        task: task.clone(),
                    });
                }
            }
        }
        for (id, goals) in &state.goals {
            for goal in goals {
                if contains(&goal.title, &needle) || contains(&goal.description, &needle) {
                    hits.push(SearchResult::Goal {
                        employee_id: *id,
                        goal: goal.clone(),
                    });
                }
            }
        }
        for (id, reviews) in &state.reviews {
            for review in reviews {
                if [&review.self_review, &review.manager_review, &review.hr_review]
                    .iter()
                    .any(|text| contains(text, &needle))
                {
                    hits.push(SearchResult::Review {
                        employee_id: *id,
                        review: review.clone(),
                    });
                }
            }
        }
        for (id, responses) in &state.responses {
            for response in responses {
                if contains(&response.question, &needle) || contains(&response.answer, &needle) {
                    hits.push(SearchResult::QuestionnaireResponse {
                        employee_id: *id,
                        response: response.clone(),
                    });
                }
            }
        }
        for (id, appraisal) in &state.appraisals {
            if [
                &appraisal.employee_name,
                &appraisal.appraisal_period,
                &appraisal.grade,
            ]
            .iter()
            .any(|field| contains(field, &needle))
            {
                hits.push(SearchResult::Appraisal {
                    employee_id: *id,
                    appraisal: appraisal.clone(),
                });
            }
        }
        Ok(hits)
    }
}

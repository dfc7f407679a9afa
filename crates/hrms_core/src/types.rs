//! Core data types exchanged with the record service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity handle issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    /// Wraps a raw identity handle.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Returns the raw handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier linking a profile to an employee record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(pub u64);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type TaskId = u64;
pub type GoalId = u64;
pub type ReviewId = u64;
pub type CycleId = u64;

/// Timestamp in seconds since the Unix epoch.
pub type Timestamp = i64;

/// Caller profile owned by the record service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
}

impl Profile {
    /// Profile as created from a display name alone.
    pub fn from_display_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: String::new(),
            employee_id: None,
        }
    }
}

/// Role of the caller as reported by the record service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum EmploymentStatus {
    #[default]
    Active,
    Terminated,
}

/// Employee record owned by the record service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub id: EmployeeId,
    pub name: String,
    pub email: String,
    pub job_title: String,
    pub department: String,
    #[serde(default)]
    pub manager: Option<String>,
    #[serde(default)]
    pub status: EmploymentStatus,
    #[serde(default)]
    pub principal_id: Option<Subject>,
    #[serde(default)]
    pub start_date: Timestamp,
}

/// Arguments for creating an employee record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeArgs {
    pub name: String,
    pub email: String,
    pub job_title: String,
    pub department: String,
    #[serde(default)]
    pub manager: Option<String>,
    #[serde(default)]
    pub principal_id: Option<Subject>,
    #[serde(default)]
    pub start_date: Timestamp,
}

/// Update of a field that may be cleared as well as replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FieldPatch<T> {
    /// Leave the stored value as it is.
    #[default]
    Unchanged,
    /// Replace the stored value.
    Set(T),
    /// Remove the stored value.
    Clear,
}

impl<T> FieldPatch<T> {
    /// Applies the patch to an optional field.
    pub fn apply(self, field: &mut Option<T>) {
        match self {
            Self::Unchanged => {}
            Self::Set(value) => *field = Some(value),
            Self::Clear => *field = None,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

/// Partial update of an employee record.
///
/// `None` on a plain field means "not provided"; clearable fields use
/// [`FieldPatch`] so that "not provided" and "cleared" stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub status: Option<EmploymentStatus>,
    #[serde(default)]
    pub manager: FieldPatch<String>,
    #[serde(default)]
    pub principal_id: FieldPatch<Subject>,
}

impl EmployeePatch {
    /// Returns true when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.job_title.is_none()
            && self.department.is_none()
            && self.status.is_none()
            && self.manager.is_unchanged()
            && self.principal_id.is_unchanged()
    }

    /// Applies the patch to a record in place.
    pub fn apply_to(self, record: &mut EmployeeRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(email) = self.email {
            record.email = email;
        }
        if let Some(job_title) = self.job_title {
            record.job_title = job_title;
        }
        if let Some(department) = self.department {
            record.department = department;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        self.manager.apply(&mut record.manager);
        self.principal_id.apply(&mut record.principal_id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingTask {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Timestamp,
    #[serde(default)]
    pub links: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum GoalStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: GoalId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: GoalStatus,
    /// Completion percentage, 0..=100.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub start_date: Timestamp,
    #[serde(default)]
    pub end_date: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub employee_id: EmployeeId,
    pub cycle_id: CycleId,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default)]
    pub self_review: String,
    #[serde(default)]
    pub manager_review: String,
    #[serde(default)]
    pub hr_review: String,
}

impl Review {
    /// A review completes once all three parts have been written.
    pub fn refresh_status(&mut self) {
        let done = !self.self_review.is_empty()
            && !self.manager_review.is_empty()
            && !self.hr_review.is_empty();
        self.status = if done {
            ReviewStatus::Completed
        } else {
            ReviewStatus::Pending
        };
    }
}

/// Which part of a review is being submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewerRole {
    #[serde(rename = "self")]
    SelfReview,
    Manager,
    Hr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CycleStatus {
    #[default]
    Draft,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceCycle {
    pub id: CycleId,
    pub title: String,
    #[serde(default)]
    pub status: CycleStatus,
    #[serde(default)]
    pub start_date: Timestamp,
    #[serde(default)]
    pub end_date: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalDetails {
    pub employee_id: EmployeeId,
    pub employee_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub department: String,
    pub appraisal_period: String,
    #[serde(default)]
    pub appraisal_type: String,
    #[serde(default)]
    pub work_completion_percent: u8,
    #[serde(default)]
    pub overall_rating_percent: u8,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub increment_percent: u8,
    #[serde(default)]
    pub reason_for_increment: String,
    #[serde(default)]
    pub criteria: Vec<String>,
    #[serde(default)]
    pub feedback: Vec<String>,
}

/// Answer to one onboarding question, as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingResponse {
    pub question: String,
    pub answer: String,
}

/// Stored answer to one onboarding question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireResponse {
    pub employee_id: EmployeeId,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub submitted_at: Timestamp,
}

/// One hit of the global search.
///
/// Every variant except `Employee` carries the id of the employee that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SearchResult {
    Employee {
        employee: EmployeeRecord,
    },
    OnboardingTask {
        employee_id: EmployeeId,
        task: OnboardingTask,
    },
    Goal {
        employee_id: EmployeeId,
        goal: Goal,
    },
    Review {
        employee_id: EmployeeId,
        review: Review,
    },
    QuestionnaireResponse {
        employee_id: EmployeeId,
        response: QuestionnaireResponse,
    },
    Appraisal {
        employee_id: EmployeeId,
        appraisal: AppraisalDetails,
    },
}

impl SearchResult {
    /// Returns the employee the result belongs to.
    pub fn employee_id(&self) -> EmployeeId {
        match self {
            Self::Employee { employee } => employee.id,
            Self::OnboardingTask { employee_id, .. }
            | Self::Goal { employee_id, .. }
            | Self::Review { employee_id, .. }
            | Self::QuestionnaireResponse { employee_id, .. }
            | Self::Appraisal { employee_id, .. } => *employee_id,
        }
    }

    /// Stable kind name, matching the serialized tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Employee { .. } => "employee",
            Self::OnboardingTask { .. } => "onboardingTask",
            Self::Goal { .. } => "goal",
            Self::Review { .. } => "review",
            Self::QuestionnaireResponse { .. } => "questionnaireResponse",
            Self::Appraisal { .. } => "appraisal",
        }
    }
}

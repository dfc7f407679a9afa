//! Contract of the remote record service.

use crate::error::Result;
use crate::types::{
    AppraisalDetails, CreateEmployeeArgs, CycleId, EmployeeId, EmployeePatch, EmployeeRecord, Goal,
    GoalId, GoalStatus, OnboardingResponse, OnboardingTask, PerformanceCycle, Profile,
    QuestionnaireResponse, Review, ReviewId, ReviewerRole, SearchResult, Subject, TaskId,
    TaskStatus, UserRole,
};
use async_trait::async_trait;

/// Remote store of profiles, employees and their records.
///
/// Absent entities come back as `None`. Boolean mutations return `false`
/// when the service refuses the change.
#[async_trait]
pub trait RecordService: Send + Sync {
    async fn get_profile(&self, caller: &Subject) -> Result<Option<Profile>>;
    async fn save_profile(&self, caller: &Subject, profile: Profile) -> Result<()>;
    async fn employee_id_for_subject(&self, caller: &Subject) -> Result<Option<EmployeeId>>;
    async fn is_admin(&self, caller: &Subject) -> Result<bool>;
    async fn user_role(&self, caller: &Subject) -> Result<UserRole>;

    async fn get_employee(&self, id: EmployeeId) -> Result<Option<EmployeeRecord>>;
    async fn create_employee(&self, args: CreateEmployeeArgs) -> Result<Option<EmployeeId>>;
    async fn update_employee(&self, id: EmployeeId, patch: EmployeePatch) -> Result<bool>;
    async fn search_employees(&self, term: &str) -> Result<Vec<EmployeeRecord>>;

    async fn get_onboarding_tasks(&self, id: EmployeeId) -> Result<Option<Vec<OnboardingTask>>>;
    async fn assign_onboarding_tasks(
        &self,
        id: EmployeeId,
        tasks: Vec<OnboardingTask>,
    ) -> Result<bool>;
    async fn update_onboarding_task_status(
        &self,
        id: EmployeeId,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<bool>;

    async fn get_goals(&self, id: EmployeeId) -> Result<Option<Vec<Goal>>>;
    async fn add_goals(&self, id: EmployeeId, goals: Vec<Goal>) -> Result<bool>;
    async fn update_goal_progress(
        &self,
        id: EmployeeId,
        goal_id: GoalId,
        progress: u8,
        status: GoalStatus,
    ) -> Result<bool>;

    async fn get_reviews(&self, id: EmployeeId) -> Result<Option<Vec<Review>>>;
    async fn create_review(&self, id: EmployeeId, cycle_id: CycleId) -> Result<ReviewId>;
    async fn submit_review(
        &self,
        id: EmployeeId,
        review_id: ReviewId,
        role: ReviewerRole,
        text: String,
    ) -> Result<bool>;

    async fn get_performance_cycles(&self) -> Result<Vec<PerformanceCycle>>;
    async fn get_performance_cycle(&self, cycle_id: CycleId) -> Result<Option<PerformanceCycle>>;
    async fn create_performance_cycle(&self, cycle: PerformanceCycle) -> Result<CycleId>;

    async fn get_appraisal_details(&self, id: EmployeeId) -> Result<Option<AppraisalDetails>>;
    async fn save_appraisal_details(&self, details: AppraisalDetails) -> Result<()>;

    async fn get_questionnaire_responses(&self, id: EmployeeId)
        -> Result<Vec<QuestionnaireResponse>>;
    async fn submit_questionnaire_responses(
        &self,
        id: EmployeeId,
        responses: Vec<OnboardingResponse>,
    ) -> Result<()>;
    async fn get_onboarding_questions(&self) -> Result<Vec<String>>;

    /// Searches every record kind. Requires the administrator capability.
    async fn global_search(&self, caller: &Subject, term: &str) -> Result<Vec<SearchResult>>;
}

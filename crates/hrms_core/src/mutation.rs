//! Write operations against the record service.

use crate::error::{HrmsError, Result};
use crate::types::{
    AppraisalDetails, CreateEmployeeArgs, CycleId, EmployeeId, EmployeePatch, Goal, GoalId,
    GoalStatus, OnboardingResponse, OnboardingTask, PerformanceCycle, Profile, ReviewId,
    ReviewerRole, TaskId, TaskStatus,
};

/// A mutating call together with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateEmployee(CreateEmployeeArgs),
    UpdateEmployee {
        id: EmployeeId,
        patch: EmployeePatch,
    },
    AssignOnboardingTasks {
        employee_id: EmployeeId,
        tasks: Vec<OnboardingTask>,
    },
    UpdateOnboardingTaskStatus {
        employee_id: EmployeeId,
        task_id: TaskId,
        status: TaskStatus,
    },
    AddGoals {
        employee_id: EmployeeId,
        goals: Vec<Goal>,
    },
    UpdateGoalProgress {
        employee_id: EmployeeId,
        goal_id: GoalId,
        progress: u8,
        status: GoalStatus,
    },
    CreateReview {
        employee_id: EmployeeId,
        cycle_id: CycleId,
    },
    SubmitReview {
        employee_id: EmployeeId,
        review_id: ReviewId,
        role: ReviewerRole,
        text: String,
    },
    CreatePerformanceCycle(PerformanceCycle),
    SaveAppraisalDetails(AppraisalDetails),
    SubmitQuestionnaireResponses {
        employee_id: EmployeeId,
        responses: Vec<OnboardingResponse>,
    },
    SaveProfile(Profile),
}

/// What a successful mutation returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutput {
    Done,
    /// `createEmployee` may succeed without handing back an id.
    EmployeeCreated(Option<EmployeeId>),
    ReviewCreated(ReviewId),
    CycleCreated(CycleId),
}

impl Mutation {
    /// Operation name as the record service knows it.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateEmployee(_) => "createEmployee",
            Self::UpdateEmployee { .. } => "updateEmployee",
            Self::AssignOnboardingTasks { .. } => "assignOnboardingTasks",
            Self::UpdateOnboardingTaskStatus { .. } => "updateOnboardingTaskStatus",
            Self::AddGoals { .. } => "addGoals",
            Self::UpdateGoalProgress { .. } => "updateGoalProgress",
            Self::CreateReview { .. } => "createReview",
            Self::SubmitReview { role, .. } => match role {
                ReviewerRole::SelfReview => "submitSelfReview",
                ReviewerRole::Manager => "submitManagerReview",
                ReviewerRole::Hr => "submitHRReview",
            },
            Self::CreatePerformanceCycle(_) => "createPerformanceCycle",
            Self::SaveAppraisalDetails(_) => "saveAppraisalDetails",
            Self::SubmitQuestionnaireResponses { .. } => "submitQuestionnaireResponses",
            Self::SaveProfile(_) => "saveProfile",
        }
    }

    /// Rejects arguments the service would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::SaveProfile(profile) if profile.name.trim().is_empty() => Err(
                HrmsError::Validation("profile name must not be empty".to_string()),
            ),
            Self::CreateEmployee(args) if args.name.trim().is_empty() => Err(
                HrmsError::Validation("employee name must not be empty".to_string()),
            ),
            Self::UpdateEmployee { patch, .. } if patch.is_empty() => Err(
                HrmsError::Validation("employee update changes nothing".to_string()),
            ),
            Self::UpdateGoalProgress { progress, .. } if *progress > 100 => Err(
                HrmsError::Validation(format!("goal progress {} exceeds 100", progress)),
            ),
            Self::SubmitReview { text, .. } if text.trim().is_empty() => Err(
                HrmsError::Validation("review text must not be empty".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Notification text after success.
    pub fn success_message(&self) -> &'static str {
        match self {
            Self::CreateEmployee(_) => "Employee created successfully",
            Self::UpdateEmployee { .. } => "Employee updated successfully",
            Self::AssignOnboardingTasks { .. } => "Onboarding tasks assigned successfully",
            Self::UpdateOnboardingTaskStatus { .. } => "Task status updated",
            Self::AddGoals { .. } => "Goals added successfully",
            Self::UpdateGoalProgress { .. } => "Goal progress updated",
            Self::CreateReview { .. } => "Review created successfully",
            Self::SubmitReview { role, .. } => match role {
                ReviewerRole::SelfReview => "Self review submitted successfully",
                ReviewerRole::Manager => "Manager review submitted successfully",
                ReviewerRole::Hr => "HR review submitted successfully",
            },
            Self::CreatePerformanceCycle(_) => "Performance cycle created successfully",
            Self::SaveAppraisalDetails(_) => "Appraisal details saved successfully",
            Self::SubmitQuestionnaireResponses { .. } => "Questionnaire submitted successfully",
            Self::SaveProfile(_) => "Profile saved successfully",
        }
    }

    /// Notification text after failure.
    pub fn failure_message(&self, err: &HrmsError) -> String {
        let action = match self {
            Self::CreateEmployee(_) => "create employee",
            Self::UpdateEmployee { .. } => "update employee",
            Self::AssignOnboardingTasks { .. } => "assign tasks",
            Self::UpdateOnboardingTaskStatus { .. } => "update task",
            Self::AddGoals { .. } => "add goals",
            Self::UpdateGoalProgress { .. } => "update goal",
            Self::CreateReview { .. } => "create review",
            Self::SubmitReview { .. } => "submit review",
            Self::CreatePerformanceCycle(_) => "create cycle",
            Self::SaveAppraisalDetails(_) => "save appraisal",
            Self::SubmitQuestionnaireResponses { .. } => "submit questionnaire",
            Self::SaveProfile(_) => "save profile",
        };
        format!("Failed to {}: {}", action, err)
    }
}

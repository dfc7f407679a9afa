use std::time::Duration;

use hrms_core::{keys, EmployeeId, Fingerprint, Mutation};

use super::assertions::Assertion;

/// Cached read a scenario can issue through the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Read {
    Profile,
    EmployeeIdForSubject,
    IsAdmin,
    Employee(EmployeeId),
    OnboardingTasks(EmployeeId),
    Goals(EmployeeId),
    Reviews(EmployeeId),
    AppraisalDetails(EmployeeId),
    QuestionnaireResponses(EmployeeId),
    PerformanceCycles,
}

impl Read {
    /// Fingerprint the read is cached under.
    pub fn fingerprint(&self) -> Fingerprint {
        match *self {
            Read::Profile => keys::profile(),
            Read::EmployeeIdForSubject => keys::employee_id_for_subject(),
            Read::IsAdmin => keys::is_admin(),
            Read::Employee(id) => keys::employee(id),
            Read::OnboardingTasks(id) => keys::onboarding_tasks(id),
            Read::Goals(id) => keys::goals(id),
            Read::Reviews(id) => keys::reviews(id),
            Read::AppraisalDetails(id) => keys::appraisal_details(id),
            Read::QuestionnaireResponses(id) => keys::questionnaire_responses(id),
            Read::PerformanceCycles => keys::performance_cycles(),
        }
    }

    /// The six reads scoped to one employee.
    pub fn employee_scope(id: EmployeeId) -> [Read; 6] {
        [
            Read::Employee(id),
            Read::OnboardingTasks(id),
            Read::Goals(id),
            Read::Reviews(id),
            Read::AppraisalDetails(id),
            Read::QuestionnaireResponses(id),
        ]
    }
}

/// All possible actions in a test scenario
#[derive(Debug)]
pub enum ScenarioStep {
    // Identity and session
    InitializeIdentity,
    Advance,
    CompleteGate {
        first: String,
        last: String,
    },
    ResetGate,
    Login,
    Logout,
    SubmitManualProfile {
        name: String,
        email: String,
    },

    // Reads and writes
    Read {
        read: Read,
    },
    StartRead {
        read: Read,
    },
    AwaitReads,
    Execute {
        mutation: Mutation,
    },

    // Search box
    OpenSearch,
    Type {
        term: String,
    },
    AwaitSearches,

    // Record service faults
    SetLatency {
        operation: &'static str,
        delay: Duration,
    },
    SetSearchLatency {
        term: String,
        delay: Duration,
    },
    FailOperation {
        operation: &'static str,
        failing: bool,
    },
    SetAvailable {
        available: bool,
    },

    // Time control
    Wait {
        duration: Duration,
    },

    // Assertions (can be interspersed)
    Assert {
        assertion: Assertion,
    },
}

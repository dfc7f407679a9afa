//! Cache keys derived from an operation name and its arguments.
//!
//! A fingerprint renders as `operation:arg1:arg2`. Numeric ids render as
//! decimal, free text as a JSON string, so `employee:42` and
//! `globalSearch:"ada"` are both exact keys and the operation name alone
//! (`employees`) works as a segment-aligned prefix.

use crate::types::{EmployeeId, Subject};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Renders one argument of a fingerprint.
pub trait KeyPart {
    fn key_part(&self) -> String;
}

impl KeyPart for EmployeeId {
    fn key_part(&self) -> String {
        self.0.to_string()
    }
}

impl KeyPart for u64 {
    fn key_part(&self) -> String {
        self.to_string()
    }
}

impl KeyPart for str {
    fn key_part(&self) -> String {
        serde_json::Value::String(self.to_owned()).to_string()
    }
}

impl KeyPart for String {
    fn key_part(&self) -> String {
        self.as_str().key_part()
    }
}

impl KeyPart for Subject {
    fn key_part(&self) -> String {
        self.as_str().key_part()
    }
}

impl<T: KeyPart + ?Sized> KeyPart for &T {
    fn key_part(&self) -> String {
        (**self).key_part()
    }
}

/// Deterministic key of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of an operation without arguments.
    pub fn new(operation: &str) -> Self {
        Self(operation.to_string())
    }

    /// Appends one argument.
    pub fn arg(mut self, part: impl KeyPart) -> Self {
        self.0.push(':');
        self.0.push_str(&part.key_part());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the operation name (the first segment).
    pub fn operation(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }

    /// Returns true if `self` equals `prefix` or extends it by whole segments.
    pub fn starts_with(&self, prefix: &Fingerprint) -> bool {
        match self.0.strip_prefix(prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(':'),
            None => false,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Target of an invalidation: one entry, or every entry under a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Invalidation {
    Exact(Fingerprint),
    Prefix(Fingerprint),
}

impl Invalidation {
    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        match self {
            Self::Exact(target) => target == fingerprint,
            Self::Prefix(prefix) => fingerprint.starts_with(prefix),
        }
    }
}

impl From<Fingerprint> for Invalidation {
    fn from(fingerprint: Fingerprint) -> Self {
        Self::Exact(fingerprint)
    }
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(fp) => write!(f, "{}", fp),
            Self::Prefix(fp) => write!(f, "{}:*", fp),
        }
    }
}

/// Fingerprints of every cached read.
pub mod keys {
    use super::Fingerprint;
    use crate::types::{CycleId, EmployeeId};

    pub fn profile() -> Fingerprint {
        Fingerprint::new("profile")
    }

    pub fn employee_id_for_subject() -> Fingerprint {
        Fingerprint::new("employeeIdForSubject")
    }

    pub fn is_admin() -> Fingerprint {
        Fingerprint::new("isAdmin")
    }

    pub fn user_role() -> Fingerprint {
        Fingerprint::new("userRole")
    }

    pub fn employee(id: EmployeeId) -> Fingerprint {
        Fingerprint::new("employee").arg(id)
    }

    /// Prefix of every employee search.
    pub fn employees() -> Fingerprint {
        Fingerprint::new("employees")
    }

    pub fn employee_search(term: &str) -> Fingerprint {
        employees().arg(term)
    }

    pub fn onboarding_tasks(id: EmployeeId) -> Fingerprint {
        Fingerprint::new("onboardingTasks").arg(id)
    }

    pub fn goals(id: EmployeeId) -> Fingerprint {
        Fingerprint::new("goals").arg(id)
    }

    pub fn reviews(id: EmployeeId) -> Fingerprint {
        Fingerprint::new("reviews").arg(id)
    }

    pub fn appraisal_details(id: EmployeeId) -> Fingerprint {
        Fingerprint::new("appraisalDetails").arg(id)
    }

    pub fn questionnaire_responses(id: EmployeeId) -> Fingerprint {
        Fingerprint::new("questionnaireResponses").arg(id)
    }

    pub fn onboarding_questions() -> Fingerprint {
        Fingerprint::new("onboardingQuestions")
    }

    pub fn performance_cycles() -> Fingerprint {
        Fingerprint::new("performanceCycles")
    }

    pub fn performance_cycle(id: CycleId) -> Fingerprint {
        Fingerprint::new("performanceCycle").arg(id)
    }

    /// Prefix of every global search.
    pub fn global_searches() -> Fingerprint {
        Fingerprint::new("globalSearch")
    }

    pub fn global_search(term: &str) -> Fingerprint {
        global_searches().arg(term)
    }

    /// Every cache scoped to one employee's records.
    pub fn employee_scope(id: EmployeeId) -> [Fingerprint; 6] {
        [
            employee(id),
            onboarding_tasks(id),
            goals(id),
            reviews(id),
            appraisal_details(id),
            questionnaire_responses(id),
        ]
    }
}

use crate::harness::{Assertion, Read, Scenario, SessionStateMatch as S};
use hrms_core::{EmployeeId, EntryStatus, NotificationLevel};

const ADA: EmployeeId = EmployeeId(42);

/// A returning employee with a completed gate and no profile yet: bootstrap
/// provisions the profile and the cascade refreshes everything cached for
/// the linked employee record.
#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_first_sign_in_links_employee_records() {
    Scenario::new("first_sign_in_links_employee_records")
        .from_fixture("seed")
        .gate_completed("Ada Lovelace")
        .signed_in_as("u1")
        .identity_ready()
        .reads_employee_scope(ADA)
        .advance()
        .assert_trace(&[
            S::Initializing,
            S::ProvisioningCheck,
            S::AutoProvisioning,
            S::ProvisioningCheck,
            S::Ready,
        ])
        .assert_profile_name("Ada Lovelace")
        .assert(Assertion::StoredProfileName {
            subject: "u1".to_string(),
            name: "Ada Lovelace".to_string(),
        })
        .assert_invalidated(Read::Profile)
        .assert_invalidated(Read::EmployeeIdForSubject)
        .assert_scope_invalidated(ADA)
        .assert(Assertion::LinkedEmployee(Some(ADA)))
        .assert_entry(Read::Employee(ADA), Some(EntryStatus::Stale))
        .assert_entry(Read::AppraisalDetails(ADA), Some(EntryStatus::Stale))
        .assert_calls("saveProfile", 1)
        .assert_calls("getProfile", 2)
        .assert_notified(NotificationLevel::Success, "Profile saved successfully")
        // Pages reading the scope again get fresh data.
        .reads(Read::Employee(ADA))
        .assert_calls("getEmployee", 2)
        .assert_entry(Read::Employee(ADA), Some(EntryStatus::Fresh))
        .assert(Assertion::NoError)
        .run()
        .await
        .expect("scenario should pass");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_admin_session_then_search() {
    Scenario::new("admin_session_then_search")
        .from_fixture("seed")
        .identity_ready()
        .advance()
        .completes_gate("Grace", "Hopper")
        .assert_state(S::LoginRequired)
        .logs_in()
        // A fresh login has no profile, so the gate name provisions one.
        .assert_state(S::Ready)
        .assert_profile_name("Grace Hopper")
        .opens_search()
        // The new subject is not an administrator.
        .assert(Assertion::SearchUnavailable)
        .run()
        .await
        .unwrap();
}

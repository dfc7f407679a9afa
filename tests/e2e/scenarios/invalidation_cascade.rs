use crate::harness::{Assertion, Read, Scenario};
use hrms_core::{EmployeeId, EntryStatus, GoalStatus, Mutation, NotificationLevel};
use std::time::Duration;

const ADA: EmployeeId = EmployeeId(42);
const CHARLES: EmployeeId = EmployeeId(51);

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_profile_save_cascades_to_linked_employee() {
    Scenario::new("profile_save_cascades_to_linked_employee")
        .from_fixture("seed")
        .signed_in_as("u1")
        .identity_ready()
        .reads(Read::Profile)
        .reads_employee_scope(ADA)
        .reads_employee_scope(CHARLES)
        .saves_profile("Ada Lovelace", "ada@example.com")
        .assert_invalidated(Read::Profile)
        .assert_invalidated(Read::EmployeeIdForSubject)
        .assert_scope_invalidated(ADA)
        .assert(Assertion::LinkedEmployee(Some(ADA)))
        .assert_entry(Read::Goals(ADA), Some(EntryStatus::Stale))
        .assert_entry(Read::QuestionnaireResponses(ADA), Some(EntryStatus::Stale))
        // Other employees keep their entries.
        .assert_not_invalidated(Read::Employee(CHARLES))
        .assert_entry(Read::Goals(CHARLES), Some(EntryStatus::Fresh))
        .assert_notified(NotificationLevel::Success, "Profile saved successfully")
        .run()
        .await
        .expect("scenario should pass");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_profile_save_reloads_lookup_already_in_flight() {
    Scenario::new("profile_save_reloads_lookup_already_in_flight")
        .from_fixture("seed")
        .signed_in_as("u1")
        .identity_ready()
        .reads_employee_scope(ADA)
        .with_latency("getEmployeeIdForSubject", Duration::from_millis(100))
        .starts_read(Read::EmployeeIdForSubject)
        .wait_ms(10)
        .saves_profile("Ada Lovelace", "")
        // The cascade ran its own lookup instead of waiting on the older one.
        .assert_calls("getEmployeeIdForSubject", 2)
        .assert(Assertion::LinkedEmployee(Some(ADA)))
        .assert_scope_invalidated(ADA)
        .assert_entry(Read::Goals(ADA), Some(EntryStatus::Stale))
        .awaits_reads()
        .assert_entry(Read::EmployeeIdForSubject, Some(EntryStatus::Fresh))
        .assert(Assertion::NoError)
        .run()
        .await
        .expect("scenario should pass");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_read_after_invalidation_reloads() {
    Scenario::new("read_after_invalidation_reloads")
        .from_fixture("seed")
        .signed_in_as("admin")
        .identity_ready()
        .with_latency("getGoals", Duration::from_millis(100))
        .starts_read(Read::Goals(ADA))
        .wait_ms(10)
        .executes(Mutation::UpdateGoalProgress {
            employee_id: ADA,
            goal_id: 1,
            progress: 90,
            status: GoalStatus::InProgress,
        })
        .assert_invalidated(Read::Goals(ADA))
        .reads(Read::Goals(ADA))
        .assert_calls("getGoals", 2)
        .assert_entry(Read::Goals(ADA), Some(EntryStatus::Fresh))
        .awaits_reads()
        .assert_entry(Read::Goals(ADA), Some(EntryStatus::Fresh))
        .run()
        .await
        .unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_unlinked_profile_save_stops_after_first_phase() {
    Scenario::new("unlinked_profile_save_stops_after_first_phase")
        .from_fixture("seed")
        .signed_in_as("newcomer")
        .identity_ready()
        .reads_employee_scope(ADA)
        .saves_profile("Mary Somerville", "")
        .assert_invalidated(Read::Profile)
        .assert_invalidated(Read::EmployeeIdForSubject)
        .assert(Assertion::LinkedEmployee(None))
        .assert_not_invalidated(Read::Employee(ADA))
        .assert_entry(Read::Employee(ADA), Some(EntryStatus::Fresh))
        .assert(Assertion::StoredProfileName {
            subject: "newcomer".to_string(),
            name: "Mary Somerville".to_string(),
        })
        .run()
        .await
        .unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_failed_lookup_keeps_first_phase_only() {
    Scenario::new("failed_lookup_keeps_first_phase_only")
        .from_fixture("seed")
        .signed_in_as("u1")
        .identity_ready()
        .reads(Read::Profile)
        .reads_employee_scope(ADA)
        .failing("getEmployeeIdForSubject")
        .saves_profile("Ada Lovelace", "")
        .assert(Assertion::CascadeFailed)
        .assert_invalidated(Read::Profile)
        .assert_not_invalidated(Read::Employee(ADA))
        .assert_entry(Read::Profile, Some(EntryStatus::Stale))
        .assert_entry(Read::Employee(ADA), Some(EntryStatus::Fresh))
        // The save itself went through.
        .assert_notified(NotificationLevel::Success, "Profile saved successfully")
        .run()
        .await
        .unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_failed_mutation_leaves_cache_alone() {
    Scenario::new("failed_mutation_leaves_cache_alone")
        .from_fixture("seed")
        .signed_in_as("u1")
        .identity_ready()
        .reads(Read::Profile)
        .failing("saveProfile")
        .saves_profile("Ada Lovelace", "")
        .assert(Assertion::InvalidationSkipped)
        .assert_entry(Read::Profile, Some(EntryStatus::Fresh))
        .assert_calls("getEmployeeIdForSubject", 0)
        .assert_notified(NotificationLevel::Error, "Failed to save profile")
        .run()
        .await
        .unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_goal_update_touches_only_that_employee() {
    Scenario::new("goal_update_touches_only_that_employee")
        .from_fixture("seed")
        .signed_in_as("admin")
        .identity_ready()
        .reads(Read::Goals(ADA))
        .reads(Read::Goals(CHARLES))
        .executes(Mutation::UpdateGoalProgress {
            employee_id: ADA,
            goal_id: 1,
            progress: 80,
            status: GoalStatus::InProgress,
        })
        .assert_invalidated(Read::Goals(ADA))
        .assert_not_invalidated(Read::Goals(CHARLES))
        .assert_entry(Read::Goals(CHARLES), Some(EntryStatus::Fresh))
        .assert_notified(NotificationLevel::Success, "Goal progress updated")
        .run()
        .await
        .unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_rejected_mutation_is_an_error() {
    Scenario::new("rejected_mutation_is_an_error")
        .from_fixture("seed")
        .signed_in_as("admin")
        .identity_ready()
        .reads(Read::Goals(ADA))
        .executes(Mutation::UpdateGoalProgress {
            employee_id: ADA,
            goal_id: 99,
            progress: 10,
            status: GoalStatus::InProgress,
        })
        .assert_error_contains("rejected")
        .assert_entry(Read::Goals(ADA), Some(EntryStatus::Fresh))
        .assert_notified(NotificationLevel::Error, "Failed to update goal")
        .run()
        .await
        .unwrap();
}

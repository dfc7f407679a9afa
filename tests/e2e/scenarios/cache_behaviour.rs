use crate::harness::{Assertion, Read, Scenario};
use hrms_core::{EmployeeId, EmployeePatch, EntryStatus, Mutation};
use std::time::Duration;

const ADA: EmployeeId = EmployeeId(42);

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_concurrent_reads_share_one_call() {
    Scenario::new("concurrent_reads_share_one_call")
        .from_fixture("seed")
        .signed_in_as("admin")
        .identity_ready()
        .with_latency("getEmployee", Duration::from_millis(100))
        .reads_concurrently(Read::Employee(ADA), 5)
        .assert_calls("getEmployee", 1)
        .assert(Assertion::CacheJoinsGte(4))
        .assert_entry(Read::Employee(ADA), Some(EntryStatus::Fresh))
        .assert(Assertion::NoError)
        .run()
        .await
        .expect("scenario should pass");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_fresh_entry_is_served_without_a_call() {
    Scenario::new("fresh_entry_is_served_without_a_call")
        .from_fixture("seed")
        .signed_in_as("admin")
        .identity_ready()
        .reads(Read::Goals(ADA))
        .reads(Read::Goals(ADA))
        .reads(Read::Goals(ADA))
        .assert_calls("getGoals", 1)
        .run()
        .await
        .unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_invalidation_during_load_wins() {
    Scenario::new("invalidation_during_load_wins")
        .from_fixture("seed")
        .signed_in_as("admin")
        .identity_ready()
        .with_latency("getEmployee", Duration::from_millis(200))
        .starts_read(Read::Employee(ADA))
        .wait_ms(100)
        .executes(Mutation::UpdateEmployee {
            id: ADA,
            patch: EmployeePatch {
                job_title: Some("Senior Analyst".to_string()),
                ..Default::default()
            },
        })
        .awaits_reads()
        // The load that started before the update still lands, but stale.
        .assert_entry(Read::Employee(ADA), Some(EntryStatus::Stale))
        .assert_calls("getEmployee", 1)
        .reads(Read::Employee(ADA))
        .assert_calls("getEmployee", 2)
        .assert_entry(Read::Employee(ADA), Some(EntryStatus::Fresh))
        .run()
        .await
        .unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_transient_failures_are_retried() {
    Scenario::new("transient_failures_are_retried")
        .from_fixture("seed")
        .signed_in_as("admin")
        .identity_ready()
        .failing("getReviews")
        .reads(Read::Reviews(ADA))
        // One attempt plus three retries.
        .assert_calls("getReviews", 4)
        .assert_error_contains("getReviews could not reach the record service")
        .recovering("getReviews")
        .reads(Read::Reviews(ADA))
        .assert_calls("getReviews", 5)
        .assert_entry(Read::Reviews(ADA), Some(EntryStatus::Fresh))
        .run()
        .await
        .unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_profile_reads_are_not_retried() {
    Scenario::new("profile_reads_are_not_retried")
        .from_fixture("seed")
        .signed_in_as("admin")
        .identity_ready()
        .failing("getProfile")
        .reads(Read::Profile)
        .assert_calls("getProfile", 1)
        .run()
        .await
        .unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_reads_need_a_subject() {
    Scenario::new("reads_need_a_subject")
        .from_fixture("seed")
        .identity_ready()
        .reads(Read::Employee(ADA))
        .assert_calls("getEmployee", 0)
        .assert_error_contains("actor not available")
        .run()
        .await
        .unwrap();
}

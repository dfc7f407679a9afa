//! Typed, cached access to the record service.
//!
//! Reads go through the [`CacheStore`] under the fingerprints in
//! [`keys`]. Writes go through [`RecordClient::execute`], which runs the
//! mutation, hands the outcome to the [`InvalidationCoordinator`] and
//! queues a notification.

use crate::cache::{CacheStore, FetchOptions};
use crate::error::{HrmsError, Result};
use crate::fingerprint::{keys, Fingerprint};
use crate::identity::IdentityContext;
use crate::invalidation::{InvalidationCoordinator, InvalidationReport};
use crate::mutation::{Mutation, MutationOutput};
use crate::notify::NotificationCenter;
use crate::service::RecordService;
use crate::types::{
    AppraisalDetails, CycleId, EmployeeId, EmployeeRecord, Goal, OnboardingTask,
    PerformanceCycle, Profile, QuestionnaireResponse, Review, SearchResult, Subject, UserRole,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// A mutation that went through, with what it invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    pub output: MutationOutput,
    pub invalidation: InvalidationReport,
}

/// Entry point for every read and write the client issues.
pub struct RecordClient {
    cache: Arc<CacheStore>,
    service: Arc<dyn RecordService>,
    identity: Arc<IdentityContext>,
    coordinator: InvalidationCoordinator,
    notifications: Arc<NotificationCenter>,
}

impl RecordClient {
    pub fn new(
        cache: Arc<CacheStore>,
        service: Arc<dyn RecordService>,
        identity: Arc<IdentityContext>,
        notifications: Arc<NotificationCenter>,
    ) -> Self {
        let coordinator = InvalidationCoordinator::new(cache.clone(), service.clone());
        Self {
            cache,
            service,
            identity,
            coordinator,
            notifications,
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn identity(&self) -> &Arc<IdentityContext> {
        &self.identity
    }

    pub fn notifications(&self) -> &Arc<NotificationCenter> {
        &self.notifications
    }

    fn caller(&self) -> Result<Subject> {
        self.identity
            .subject()
            .ok_or_else(|| HrmsError::ServiceUnavailable("actor not available".to_string()))
    }

    async fn read<T, F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        options: FetchOptions,
        call: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(Arc<dyn RecordService>, Subject) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let caller = self.caller()?;
        let service = self.service.clone();
        self.cache
            .fetch(fingerprint, options, || call(service.clone(), caller.clone()))
            .await
    }

    /// Profile of the caller. Never retried, so "no profile" is not
    /// mistaken for an outage.
    pub async fn profile(&self) -> Result<Option<Profile>> {
        self.read(&keys::profile(), FetchOptions::NO_RETRY, |svc, caller| async move {
            svc.get_profile(&caller).await
        })
        .await
    }

    pub async fn employee_id_for_subject(&self) -> Result<Option<EmployeeId>> {
        self.read(
            &keys::employee_id_for_subject(),
            self.cache.default_options(),
            |svc, caller| async move { svc.employee_id_for_subject(&caller).await },
        )
        .await
    }

    pub async fn is_admin(&self) -> Result<bool> {
        self.read(&keys::is_admin(), self.cache.default_options(), |svc, caller| async move {
            svc.is_admin(&caller).await
        })
        .await
    }

    pub async fn user_role(&self) -> Result<UserRole> {
        self.read(&keys::user_role(), self.cache.default_options(), |svc, caller| async move {
            svc.user_role(&caller).await
        })
        .await
    }

    pub async fn employee(&self, id: EmployeeId) -> Result<Option<EmployeeRecord>> {
        self.read(&keys::employee(id), self.cache.default_options(), move |svc, _| async move {
            svc.get_employee(id).await
        })
        .await
    }

    pub async fn search_employees(&self, term: &str) -> Result<Vec<EmployeeRecord>> {
        let term = term.to_string();
        self.read(
            &keys::employee_search(&term),
            self.cache.default_options(),
            |svc, _| {
                let term = term.clone();
                async move { svc.search_employees(&term).await }
            },
        )
        .await
    }

    pub async fn onboarding_tasks(&self, id: EmployeeId) -> Result<Option<Vec<OnboardingTask>>> {
        self.read(
            &keys::onboarding_tasks(id),
            self.cache.default_options(),
            move |svc, _| async move { svc.get_onboarding_tasks(id).await },
        )
        .await
    }

    pub async fn goals(&self, id: EmployeeId) -> Result<Option<Vec<Goal>>> {
        self.read(&keys::goals(id), self.cache.default_options(), move |svc, _| async move {
            svc.get_goals(id).await
        })
        .await
    }

    pub async fn reviews(&self, id: EmployeeId) -> Result<Option<Vec<Review>>> {
        self.read(&keys::reviews(id), self.cache.default_options(), move |svc, _| async move {
            svc.get_reviews(id).await
        })
        .await
    }

    pub async fn appraisal_details(&self, id: EmployeeId) -> Result<Option<AppraisalDetails>> {
        self.read(
            &keys::appraisal_details(id),
            self.cache.default_options(),
            move |svc, _| async move { svc.get_appraisal_details(id).await },
        )
        .await
    }

    pub async fn questionnaire_responses(
        &self,
        id: EmployeeId,
    ) -> Result<Vec<QuestionnaireResponse>> {
        self.read(
            &keys::questionnaire_responses(id),
            self.cache.default_options(),
            move |svc, _| async move { svc.get_questionnaire_responses(id).await },
        )
        .await
    }

    pub async fn onboarding_questions(&self) -> Result<Vec<String>> {
        self.read(
            &keys::onboarding_questions(),
            self.cache.default_options(),
            |svc, _| async move { svc.get_onboarding_questions().await },
        )
        .await
    }

    pub async fn performance_cycles(&self) -> Result<Vec<PerformanceCycle>> {
        self.read(
            &keys::performance_cycles(),
            self.cache.default_options(),
            |svc, _| async move { svc.get_performance_cycles().await },
        )
        .await
    }

    pub async fn performance_cycle(&self, id: CycleId) -> Result<Option<PerformanceCycle>> {
        self.read(
            &keys::performance_cycle(id),
            self.cache.default_options(),
            move |svc, _| async move { svc.get_performance_cycle(id).await },
        )
        .await
    }

    /// Raw global search for an already trimmed, non-empty term.
    pub async fn global_search(&self, term: &str) -> Result<Vec<SearchResult>> {
        let term = term.to_string();
        self.read(
            &keys::global_search(&term),
            self.cache.default_options(),
            |svc, caller| {
                let term = term.clone();
                async move { svc.global_search(&caller, &term).await }
            },
        )
        .await
    }

    /// Runs a mutation, then invalidates what it touched.
    ///
    /// Failures are never retried. They are queued as an error
    /// notification and leave the cache as it was.
    pub async fn execute(&self, mutation: Mutation) -> Result<Completed> {
        let caller = self.caller();
        let result = match &caller {
            Ok(caller) => match mutation.validate() {
                Ok(()) => self.dispatch(caller, &mutation).await,
                Err(err) => Err(err),
            },
            Err(err) => Err(err.clone()),
        };

        let invalidation = self
            .coordinator
            .after_mutation(caller.as_ref().ok(), &mutation, &result)
            .await;

        match result {
            Ok(output) => {
                if let Some(err) = &invalidation.cascade_error {
                    warn!(
                        mutation = mutation.name(),
                        "mutation succeeded but the follow-up lookup failed: {}", err
                    );
                }
                info!(
                    mutation = mutation.name(),
                    marked = invalidation.marked.len(),
                    "mutation applied"
                );
                self.notifications.success(mutation.success_message());
                Ok(Completed {
                    output,
                    invalidation,
                })
            }
            Err(err) => {
                warn!(mutation = mutation.name(), "mutation failed: {}", err);
                self.notifications.error(mutation.failure_message(&err));
                Err(err)
            }
        }
    }

    async fn dispatch(&self, caller: &Subject, mutation: &Mutation) -> Result<MutationOutput> {
        let svc = &self.service;
        let accepted = |ok: bool| {
            if ok {
                Ok(MutationOutput::Done)
            } else {
                Err(HrmsError::Rejected {
                    operation: mutation.name().to_string(),
                })
            }
        };
        match mutation.clone() {
            Mutation::CreateEmployee(args) => svc
                .create_employee(args)
                .await
                .map(MutationOutput::EmployeeCreated),
            Mutation::UpdateEmployee { id, patch } => {
                accepted(svc.update_employee(id, patch).await?)
            }
            Mutation::AssignOnboardingTasks { employee_id, tasks } => {
                accepted(svc.assign_onboarding_tasks(employee_id, tasks).await?)
            }
            Mutation::UpdateOnboardingTaskStatus {
                employee_id,
                task_id,
                status,
            } => accepted(
                svc.update_onboarding_task_status(employee_id, task_id, status)
                    .await?,
            ),
            Mutation::AddGoals { employee_id, goals } => {
                accepted(svc.add_goals(employee_id, goals).await?)
            }
            Mutation::UpdateGoalProgress {
                employee_id,
                goal_id,
                progress,
                status,
            } => accepted(
                svc.update_goal_progress(employee_id, goal_id, progress, status)
                    .await?,
            ),
            Mutation::CreateReview {
                employee_id,
                cycle_id,
            } => svc
                .create_review(employee_id, cycle_id)
                .await
                .map(MutationOutput::ReviewCreated),
            Mutation::SubmitReview {
                employee_id,
                review_id,
                role,
                text,
            } => accepted(svc.submit_review(employee_id, review_id, role, text).await?),
            Mutation::CreatePerformanceCycle(cycle) => svc
                .create_performance_cycle(cycle)
                .await
                .map(MutationOutput::CycleCreated),
            Mutation::SaveAppraisalDetails(details) => {
                svc.save_appraisal_details(details).await?;
                Ok(MutationOutput::Done)
            }
            Mutation::SubmitQuestionnaireResponses {
                employee_id,
                responses,
            } => {
                svc.submit_questionnaire_responses(employee_id, responses)
                    .await?;
                Ok(MutationOutput::Done)
            }
            Mutation::SaveProfile(profile) => {
                svc.save_profile(caller, profile).await?;
                Ok(MutationOutput::Done)
            }
        }
    }
}

impl std::fmt::Debug for RecordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordClient")
            .field("cache", &self.cache)
            .field("identity", &self.identity)
            .finish()
    }
}

//! Cache invalidation after successful mutations.
//!
//! Which fingerprints a mutation touches is a fixed table ([`plan`]).
//! Every successful mutation also drops all cached global searches, since
//! any record kind can show up in a search result.
//! `saveProfile` is the only two-phase entry: phase one drops the profile
//! and the subject's employee-id lookup, phase two re-resolves the
//! employee id and drops every cache scoped to that employee. Phase two
//! must wait for the lookup; before it resolves there is no id to key on.

use crate::cache::CacheStore;
use crate::error::{HrmsError, Result};
use crate::fingerprint::{keys, Fingerprint, Invalidation};
use crate::mutation::{Mutation, MutationOutput};
use crate::service::RecordService;
use crate::types::{EmployeeId, Subject};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fingerprints a mutation invalidates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvalidationPlan {
    /// Invalidated as soon as the mutation succeeded.
    pub immediate: Vec<Invalidation>,
    /// Re-resolve the caller's employee id, then invalidate its scope.
    pub cascade: bool,
}

/// What an `after_mutation` call did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvalidationReport {
    /// Every target handed to the cache, in order.
    pub targets: Vec<Invalidation>,
    /// Existing entries that were marked stale.
    pub marked: Vec<Fingerprint>,
    /// Employee id resolved by the cascade, if it ran and found one.
    pub linked_employee: Option<EmployeeId>,
    /// True when the mutation failed and nothing was touched.
    pub skipped: bool,
    /// Why the cascade lookup failed, after phase one already ran.
    pub cascade_error: Option<HrmsError>,
}

impl InvalidationReport {
    pub fn targeted(&self, fingerprint: &Fingerprint) -> bool {
        self.targets.iter().any(|t| t.matches(fingerprint))
    }
}

/// Returns the fingerprints `mutation` invalidates.
pub fn plan(mutation: &Mutation, output: &MutationOutput) -> InvalidationPlan {
    let mut plan = record_plan(mutation, output);
    plan.immediate.push(Invalidation::Prefix(keys::global_searches()));
    plan
}

fn record_plan(mutation: &Mutation, output: &MutationOutput) -> InvalidationPlan {
    let exact = |fp: Fingerprint| vec![Invalidation::Exact(fp)];
    match mutation {
        Mutation::CreateEmployee(_) => {
            let mut immediate = vec![Invalidation::Prefix(keys::employees())];
            if let MutationOutput::EmployeeCreated(Some(id)) = output {
                immediate.push(Invalidation::Exact(keys::employee(*id)));
            }
            InvalidationPlan {
                immediate,
                cascade: false,
            }
        }
        Mutation::UpdateEmployee { id, .. } => InvalidationPlan {
            immediate: vec![
                Invalidation::Prefix(keys::employees()),
                Invalidation::Exact(keys::employee(*id)),
            ],
            cascade: false,
        },
        Mutation::AssignOnboardingTasks { employee_id, .. }
        | Mutation::UpdateOnboardingTaskStatus { employee_id, .. } => InvalidationPlan {
            immediate: exact(keys::onboarding_tasks(*employee_id)),
            cascade: false,
        },
        Mutation::AddGoals { employee_id, .. }
        | Mutation::UpdateGoalProgress { employee_id, .. } => InvalidationPlan {
            immediate: exact(keys::goals(*employee_id)),
            cascade: false,
        },
        Mutation::CreateReview { employee_id, .. } | Mutation::SubmitReview { employee_id, .. } => {
            InvalidationPlan {
                immediate: exact(keys::reviews(*employee_id)),
                cascade: false,
            }
        }
        Mutation::CreatePerformanceCycle(_) => InvalidationPlan {
            immediate: exact(keys::performance_cycles()),
            cascade: false,
        },
        Mutation::SaveAppraisalDetails(details) => InvalidationPlan {
            immediate: exact(keys::appraisal_details(details.employee_id)),
            cascade: false,
        },
        Mutation::SubmitQuestionnaireResponses { employee_id, .. } => InvalidationPlan {
            immediate: exact(keys::questionnaire_responses(*employee_id)),
            cascade: false,
        },
        Mutation::SaveProfile(_) => InvalidationPlan {
            immediate: vec![
                Invalidation::Exact(keys::profile()),
                Invalidation::Exact(keys::employee_id_for_subject()),
            ],
            cascade: true,
        },
    }
}

/// Runs the invalidation table after every mutation.
pub struct InvalidationCoordinator {
    cache: Arc<CacheStore>,
    service: Arc<dyn RecordService>,
}

impl InvalidationCoordinator {
    pub fn new(cache: Arc<CacheStore>, service: Arc<dyn RecordService>) -> Self {
        Self { cache, service }
    }

    /// Invalidates what `mutation` affected, given how it ended.
    ///
    /// A failed mutation touches nothing. The cascade needs `caller` to
    /// resolve the linked employee; if that lookup fails the error is kept
    /// in the report and the employee scope is left alone.
    pub async fn after_mutation(
        &self,
        caller: Option<&Subject>,
        mutation: &Mutation,
        result: &Result<MutationOutput>,
    ) -> InvalidationReport {
        let output = match result {
            Ok(output) => output,
            Err(err) => {
                debug!(mutation = mutation.name(), "mutation failed, cache left as is: {}", err);
                return InvalidationReport {
                    skipped: true,
                    ..Default::default()
                };
            }
        };

        let plan = plan(mutation, output);
        debug!(
            mutation = mutation.name(),
            targets = %describe(&plan),
            "invalidating after mutation"
        );
        let mut report = InvalidationReport::default();
        self.apply(&plan.immediate, &mut report);

        if plan.cascade {
            let Some(caller) = caller else {
                warn!(
                    mutation = mutation.name(),
                    "no subject to resolve the linked employee, skipping cascade"
                );
                return report;
            };
            let linked = match self.resolve_employee_id(caller).await {
                Ok(linked) => linked,
                Err(err) => {
                    report.cascade_error = Some(err);
                    return report;
                }
            };
            report.linked_employee = linked;
            match linked {
                Some(id) => {
                    info!(%caller, employee = %id, "profile linked, invalidating employee scope");
                    let scope: Vec<Invalidation> = keys::employee_scope(id)
                        .into_iter()
                        .map(Invalidation::Exact)
                        .collect();
                    self.apply(&scope, &mut report);
                }
                None => debug!(%caller, "profile has no linked employee"),
            }
        }

        report
    }

    fn apply(&self, targets: &[Invalidation], report: &mut InvalidationReport) {
        for target in targets {
            report.marked.extend(self.cache.invalidate(target));
            report.targets.push(target.clone());
        }
    }

    /// Fetches the employee id through the cache, so readers share the result.
    async fn resolve_employee_id(&self, caller: &Subject) -> Result<Option<EmployeeId>> {
        let service = self.service.clone();
        self.cache
            .fetch(
                &keys::employee_id_for_subject(),
                self.cache.default_options(),
                || {
                    let service = service.clone();
                    let caller = caller.clone();
                    async move { service.employee_id_for_subject(&caller).await }
                },
            )
            .await
            .map_err(|err| {
                warn!(%caller, "employee id lookup after profile save failed: {}", err);
                err
            })
    }
}

impl std::fmt::Debug for InvalidationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationCoordinator")
            .field("cache", &self.cache)
            .finish()
    }
}

/// Renders a plan as a comma-separated target list.
pub fn describe(plan: &InvalidationPlan) -> String {
    let mut parts: Vec<String> = plan.immediate.iter().map(|t| t.to_string()).collect();
    if plan.cascade {
        parts.push("then employee scope of the linked employee".to_string());
    }
    parts.join(", ")
}

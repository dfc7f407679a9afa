use super::assertions::{Assertion, SessionStateMatch};
use super::steps::{Read, ScenarioStep};
use anyhow::{anyhow, bail, Context, Result};
use hrms_core::{
    CacheStore, GateStore, HrmsError, IdentityContext, InMemoryRecordService, InvalidationReport,
    LocalIdentityProvider, MemoryGateStore, Mutation, Notification, NotificationCenter,
    NotificationLevel, RecordClient, SearchAggregator, SearchConfig, SearchOutcome, Seed,
    SessionBootstrap, SessionState, Subject,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

/// World a scenario starts from
#[derive(Debug, Default, Clone)]
pub struct Setup {
    pub fixture: Option<String>,
    pub gate_name: Option<String>,
    pub subject: Option<String>,
}

impl Setup {
    fn seed(&self) -> Result<Seed> {
        let Some(name) = &self.fixture else {
            return Ok(Seed::default());
        };
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(format!("{}.json", name));
        Seed::load(&path).with_context(|| format!("loading fixture {}", path.display()))
    }
}

/// Executes scenarios against the real client core and the in-memory service
pub struct ScenarioRunner {
    service: Arc<InMemoryRecordService>,
    identity: Arc<IdentityContext>,
    client: Arc<RecordClient>,
    bootstrap: SessionBootstrap,
    search: Option<Arc<SearchAggregator>>,
    reads: JoinSet<hrms_core::Result<()>>,
    searches: JoinSet<hrms_core::Result<SearchOutcome>>,
    outcomes: Vec<SearchOutcome>,
    last_report: Option<InvalidationReport>,
    last_error: Option<HrmsError>,
    notifications: Vec<Notification>,
    current_step: usize,
}

impl ScenarioRunner {
    pub fn new(setup: &Setup) -> Result<Self> {
        let service = Arc::new(InMemoryRecordService::from_seed(setup.seed()?));
        let provider = match &setup.subject {
            Some(subject) => LocalIdentityProvider::signed_in(Subject::new(subject.as_str())),
            None => LocalIdentityProvider::new(),
        };
        let identity = Arc::new(IdentityContext::new(Arc::new(provider)));
        let gate: Arc<dyn GateStore> = match &setup.gate_name {
            Some(name) => Arc::new(MemoryGateStore::completed(name)),
            None => Arc::new(MemoryGateStore::new()),
        };
        let client = Arc::new(RecordClient::new(
            Arc::new(CacheStore::default()),
            service.clone(),
            identity.clone(),
            Arc::new(NotificationCenter::new()),
        ));
        let bootstrap = SessionBootstrap::new(client.clone(), gate);

        Ok(Self {
            service,
            identity,
            client,
            bootstrap,
            search: None,
            reads: JoinSet::new(),
            searches: JoinSet::new(),
            outcomes: Vec::new(),
            last_report: None,
            last_error: None,
            notifications: Vec::new(),
            current_step: 0,
        })
    }

    /// Get current step number
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Execute all steps in sequence
    pub async fn execute(&mut self, steps: &[ScenarioStep]) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            self.current_step = i;
            self.execute_step(step)
                .await
                .with_context(|| format!("Step {}: {:?}", i, step))?;
            self.notifications.extend(self.client.notifications().drain());
        }
        Ok(())
    }

    async fn execute_step(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::InitializeIdentity => {
                self.identity.initialize().await;
                Ok(())
            }
            ScenarioStep::Advance => {
                self.bootstrap.advance().await;
                self.collect_bootstrap();
                Ok(())
            }
            ScenarioStep::CompleteGate { first, last } => {
                let result = self.bootstrap.complete_gate(first, last).await;
                self.session_action(result)
            }
            ScenarioStep::ResetGate => {
                let result = self.bootstrap.reset_gate().await;
                self.session_action(result)
            }
            ScenarioStep::Login => {
                let result = self.bootstrap.login().await;
                self.session_action(result)
            }
            ScenarioStep::Logout => {
                let result = self.bootstrap.logout().await;
                self.search = None;
                self.session_action(result)
            }
            ScenarioStep::SubmitManualProfile { name, email } => {
                let result = self.bootstrap.submit_manual_profile(name, email).await;
                self.session_action(result)
            }

            ScenarioStep::Read { read } => {
                if let Err(err) = perform_read(self.client.clone(), *read).await {
                    self.last_error = Some(err);
                }
                Ok(())
            }
            ScenarioStep::StartRead { read } => {
                self.reads.spawn(perform_read(self.client.clone(), *read));
                // Let the task reach its first await before the next step.
                tokio::task::yield_now().await;
                Ok(())
            }
            ScenarioStep::AwaitReads => {
                while let Some(joined) = self.reads.join_next().await {
                    if let Err(err) = joined? {
                        self.last_error = Some(err);
                    }
                }
                Ok(())
            }
            ScenarioStep::Execute { mutation } => self.handle_execute(mutation).await,

            ScenarioStep::OpenSearch => {
                match SearchAggregator::open(self.client.clone(), &SearchConfig::default()).await {
                    Ok(search) => self.search = Some(Arc::new(search)),
                    Err(err) => {
                        self.search = None;
                        self.last_error = Some(err);
                    }
                }
                Ok(())
            }
            ScenarioStep::Type { term } => {
                let search = self
                    .search
                    .clone()
                    .ok_or_else(|| anyhow!("search is not open"))?;
                let term = term.clone();
                self.searches.spawn(async move { search.search(&term).await });
                tokio::task::yield_now().await;
                Ok(())
            }
            ScenarioStep::AwaitSearches => {
                while let Some(joined) = self.searches.join_next().await {
                    match joined? {
                        Ok(outcome) => self.outcomes.push(outcome),
                        Err(err) => self.last_error = Some(err),
                    }
                }
                Ok(())
            }

            ScenarioStep::SetLatency { operation, delay } => {
                self.service.set_latency(*operation, *delay);
                Ok(())
            }
            ScenarioStep::SetSearchLatency { term, delay } => {
                self.service.set_search_latency(term, *delay);
                Ok(())
            }
            ScenarioStep::FailOperation { operation, failing } => {
                self.service.fail_operation(*operation, *failing);
                Ok(())
            }
            ScenarioStep::SetAvailable { available } => {
                self.service.set_available(*available);
                Ok(())
            }

            ScenarioStep::Wait { duration } => {
                tokio::time::sleep(*duration).await;
                Ok(())
            }

            ScenarioStep::Assert { assertion } => self.handle_assertion(assertion),
        }
    }

    // ===== Action handlers =====

    fn session_action(&mut self, result: hrms_core::Result<SessionState>) -> Result<()> {
        if let Err(err) = result {
            self.last_error = Some(err);
        }
        self.collect_bootstrap();
        Ok(())
    }

    /// Picks up what the bootstrap's own mutations and lookups left behind
    fn collect_bootstrap(&mut self) {
        if let Some(report) = self.bootstrap.last_invalidation() {
            self.last_report = Some(report);
        }
        if let Some(err) = self.bootstrap.last_error() {
            self.last_error = Some(err);
        }
    }

    async fn handle_execute(&mut self, mutation: &Mutation) -> Result<()> {
        match self.client.execute(mutation.clone()).await {
            Ok(done) => self.last_report = Some(done.invalidation),
            Err(err) => {
                self.last_report = Some(InvalidationReport {
                    skipped: true,
                    ..Default::default()
                });
                self.last_error = Some(err);
            }
        }
        Ok(())
    }

    // ===== Assertions =====

    fn handle_assertion(&self, assertion: &Assertion) -> Result<()> {
        match assertion {
            Assertion::SessionState(expected) => self.assert_session_state(expected),
            Assertion::Trace(expected) => self.assert_trace(expected),
            Assertion::ProfileName(name) => {
                let state = self.bootstrap.state();
                let actual = state.profile().map(|p| p.name.as_str());
                if actual != Some(name.as_str()) {
                    bail!("expected profile {:?}, session is {:?}", name, state);
                }
                Ok(())
            }
            Assertion::SuggestedName(expected) => {
                let actual = self.bootstrap.suggested_name();
                if &actual != expected {
                    bail!("expected suggested name {:?}, got {:?}", expected, actual);
                }
                Ok(())
            }

            Assertion::CallCount { operation, count } => {
                let actual = self.service.calls(operation);
                if actual != *count {
                    bail!("expected {} {} calls, got {}", count, operation, actual);
                }
                Ok(())
            }
            Assertion::StoredProfileName { subject, name } => {
                let stored = self.service.stored_profile(&Subject::new(subject.as_str()));
                match stored {
                    Some(profile) if &profile.name == name => Ok(()),
                    other => bail!("expected stored profile {:?}, got {:?}", name, other),
                }
            }

            Assertion::EntryStatus { read, status } => {
                let actual = self.client.cache().status(&read.fingerprint());
                if &actual != status {
                    bail!("expected {:?} to be {:?}, got {:?}", read, status, actual);
                }
                Ok(())
            }
            Assertion::CacheEmpty => {
                let left = self.client.cache().fingerprints();
                if !left.is_empty() {
                    bail!("expected an empty cache, found {:?}", left);
                }
                Ok(())
            }
            Assertion::CacheJoinsGte(n) => {
                let metrics = self.client.cache().metrics();
                if metrics.joins < *n {
                    bail!("expected at least {} joins, got {:?}", n, metrics);
                }
                Ok(())
            }

            Assertion::Invalidated(read) => {
                let report = self.report()?;
                if !report.targeted(&read.fingerprint()) {
                    bail!("{:?} was not invalidated: {:?}", read, report.targets);
                }
                Ok(())
            }
            Assertion::NotInvalidated(read) => {
                let report = self.report()?;
                if report.targeted(&read.fingerprint()) {
                    bail!("{:?} was invalidated: {:?}", read, report.targets);
                }
                Ok(())
            }
            Assertion::LinkedEmployee(expected) => {
                let actual = self.report()?.linked_employee;
                if actual != *expected {
                    bail!("expected linked employee {:?}, got {:?}", expected, actual);
                }
                Ok(())
            }
            Assertion::CascadeFailed => match &self.report()?.cascade_error {
                Some(_) => Ok(()),
                None => bail!("expected the cascade lookup to fail"),
            },
            Assertion::InvalidationSkipped => {
                let report = self.report()?;
                if !report.skipped || !report.targets.is_empty() {
                    bail!("expected invalidation to be skipped: {:?}", report);
                }
                Ok(())
            }

            Assertion::ErrorContains(text) => match &self.last_error {
                Some(err) if err.to_string().contains(text.as_str()) => Ok(()),
                other => bail!("expected an error containing {:?}, got {:?}", text, other),
            },
            Assertion::NoError => match &self.last_error {
                None => Ok(()),
                Some(err) => bail!("unexpected error: {}", err),
            },
            Assertion::Notified { level, text } => self.assert_notified(*level, text),

            Assertion::DisplayedTerm(term) => {
                let view = self.search()?.displayed();
                if &view.term != term {
                    bail!("expected results for {:?}, displaying {:?}", term, view.term);
                }
                Ok(())
            }
            Assertion::DisplayedCount(n) => {
                let view = self.search()?.displayed();
                if view.results.len() != *n {
                    bail!("expected {} results, displaying {:?}", n, view.results);
                }
                Ok(())
            }
            Assertion::BucketSizes {
                identity,
                onboarding,
                performance,
            } => {
                let buckets = self.search()?.displayed().buckets();
                let actual = (
                    buckets.identity.len(),
                    buckets.onboarding.len(),
                    buckets.performance.len(),
                );
                if actual != (*identity, *onboarding, *performance) {
                    bail!(
                        "expected buckets {:?}, got {:?}",
                        (identity, onboarding, performance),
                        actual
                    );
                }
                Ok(())
            }
            Assertion::SupersededCount(n) => {
                let superseded = self
                    .outcomes
                    .iter()
                    .filter(|o| matches!(o, SearchOutcome::Superseded))
                    .count();
                if superseded != *n {
                    bail!("expected {} superseded searches, got {:?}", n, self.outcomes);
                }
                Ok(())
            }
            Assertion::SearchTermsSent(terms) => {
                let sent = self.service.search_terms();
                if &sent != terms {
                    bail!("expected search terms {:?}, service saw {:?}", terms, sent);
                }
                Ok(())
            }
            Assertion::SearchUnavailable => match &self.search {
                None => Ok(()),
                Some(_) => bail!("expected search to be unavailable"),
            },

            Assertion::Custom(check) => check(self.client.cache().as_ref()),
        }
    }

    fn report(&self) -> Result<&InvalidationReport> {
        self.last_report
            .as_ref()
            .ok_or_else(|| anyhow!("no mutation has completed yet"))
    }

    fn search(&self) -> Result<&SearchAggregator> {
        self.search
            .as_deref()
            .ok_or_else(|| anyhow!("search is not open"))
    }

    fn assert_session_state(&self, expected: &SessionStateMatch) -> Result<()> {
        let state = self.bootstrap.state();
        if !expected.matches(&state) {
            bail!("expected session state {:?}, got {:?}", expected, state);
        }
        Ok(())
    }

    fn assert_trace(&self, expected: &[SessionStateMatch]) -> Result<()> {
        let trace = self.bootstrap.trace();
        let matches = trace.len() == expected.len()
            && expected.iter().zip(&trace).all(|(m, s)| m.matches(s));
        if !matches {
            let names: Vec<&str> = trace.iter().map(|s| s.name()).collect();
            bail!("expected trace {:?}, got {:?}", expected, names);
        }
        Ok(())
    }

    fn assert_notified(&self, level: NotificationLevel, text: &str) -> Result<()> {
        let found = self
            .notifications
            .iter()
            .any(|n| n.level == level && n.message.contains(text));
        if !found {
            bail!(
                "no {:?} notification containing {:?} in {:?}",
                level,
                text,
                self.notifications
            );
        }
        Ok(())
    }
}

async fn perform_read(client: Arc<RecordClient>, read: Read) -> hrms_core::Result<()> {
    match read {
        Read::Profile => client.profile().await.map(drop),
        Read::EmployeeIdForSubject => client.employee_id_for_subject().await.map(drop),
        Read::IsAdmin => client.is_admin().await.map(drop),
        Read::Employee(id) => client.employee(id).await.map(drop),
        Read::OnboardingTasks(id) => client.onboarding_tasks(id).await.map(drop),
        Read::Goals(id) => client.goals(id).await.map(drop),
        Read::Reviews(id) => client.reviews(id).await.map(drop),
        Read::AppraisalDetails(id) => client.appraisal_details(id).await.map(drop),
        Read::QuestionnaireResponses(id) => client.questionnaire_responses(id).await.map(drop),
        Read::PerformanceCycles => client.performance_cycles().await.map(drop),
    }
}

//! Session bootstrap state machine.
//!
//! Takes a visitor from "unknown" to a signed-in caller with a profile:
//!
//! ```text
//! Initializing -> GateRequired -> LoginRequired -> ProvisioningCheck -> Ready
//!                                                        |              ^
//!                                                        v              |
//!                                                  AutoProvisioning ----+
//! ```
//!
//! The current state is held explicitly and moved by a single transition
//! function, driven by [`SessionBootstrap::advance`] and the user actions.
//! At most one of them runs at once; a call that arrives while another is
//! in progress returns the current state without doing anything.

use crate::client::RecordClient;
use crate::error::{HrmsError, Result};
use crate::gate::{GateRecord, GateStore};
use crate::identity::IdentityStatus;
use crate::invalidation::InvalidationReport;
use crate::mutation::Mutation;
use crate::types::Profile;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the session currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The identity provider has not decided yet.
    Initializing,

    /// The access gate has not been completed on this device.
    GateRequired,

    /// Gate done, nobody signed in.
    LoginRequired,

    /// Signed in; looking up the caller's profile.
    ProvisioningCheck,

    /// No profile yet; creating one from the gate's display name.
    AutoProvisioning {
        /// Name the profile is created with.
        display_name: String,
    },

    /// Bootstrap finished.
    Ready {
        /// The caller's profile, absent when setup is still required.
        profile: Option<Profile>,
        /// The manual profile form must be shown.
        setup_required: bool,
    },
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Ready { profile, .. } => profile.as_ref(),
            _ => None,
        }
    }

    pub fn setup_required(&self) -> bool {
        matches!(
            self,
            Self::Ready {
                setup_required: true,
                ..
            }
        )
    }

    /// Short name used in logs and the CLI trace.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::GateRequired => "GateRequired",
            Self::LoginRequired => "LoginRequired",
            Self::ProvisioningCheck => "ProvisioningCheck",
            Self::AutoProvisioning { .. } => "AutoProvisioning",
            Self::Ready { .. } => "Ready",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutoProvisioning { display_name } => {
                write!(f, "AutoProvisioning({})", display_name)
            }
            Self::Ready {
                setup_required: true,
                ..
            } => write!(f, "Ready(setup required)"),
            other => f.write_str(other.name()),
        }
    }
}

/// Clears the in-progress flag when an advance ends, even if it is dropped.
struct Busy<'a>(&'a AtomicBool);

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Default)]
struct Progress {
    /// Auto-provisioning already ran for this session.
    auto_attempted: bool,
    last_error: Option<HrmsError>,
    last_invalidation: Option<InvalidationReport>,
    trace: Vec<SessionState>,
}

/// Drives the session from first visit to `Ready`.
pub struct SessionBootstrap {
    client: Arc<RecordClient>,
    gate: Arc<dyn GateStore>,
    state: Mutex<SessionState>,
    busy: AtomicBool,
    progress: Mutex<Progress>,
}

impl SessionBootstrap {
    pub fn new(client: Arc<RecordClient>, gate: Arc<dyn GateStore>) -> Self {
        Self {
            client,
            gate,
            state: Mutex::new(SessionState::Initializing),
            busy: AtomicBool::new(false),
            progress: Mutex::new(Progress {
                trace: vec![SessionState::Initializing],
                ..Default::default()
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Every state entered so far, oldest first.
    pub fn trace(&self) -> Vec<SessionState> {
        self.progress.lock().trace.clone()
    }

    /// The most recent failure the machine absorbed.
    pub fn last_error(&self) -> Option<HrmsError> {
        self.progress.lock().last_error.clone()
    }

    /// What the last profile save invalidated.
    pub fn last_invalidation(&self) -> Option<InvalidationReport> {
        self.progress.lock().last_invalidation.clone()
    }

    /// Name to pre-fill the manual profile form with.
    pub fn suggested_name(&self) -> Option<String> {
        self.gate
            .load()
            .ok()
            .and_then(|record| record.display_name().map(str::to_string))
    }

    /// Runs transitions until the state stops changing.
    pub async fn advance(&self) -> SessionState {
        let Some(_busy) = self.enter() else {
            debug!("bootstrap already advancing, ignoring trigger");
            return self.state();
        };
        self.run().await
    }

    fn enter(&self) -> Option<Busy<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Busy(&self.busy))
    }

    async fn run(&self) -> SessionState {
        loop {
            let current = self.state();
            let next = self.transition(&current).await;
            if next == current {
                return current;
            }
            self.set(next);
        }
    }

    fn set(&self, next: SessionState) {
        let previous = std::mem::replace(&mut *self.state.lock(), next.clone());
        info!(from = %previous, to = %next, "session state changed");
        self.progress.lock().trace.push(next);
    }

    fn fail(&self, err: HrmsError) {
        self.progress.lock().last_error = Some(err);
    }

    fn gate_record(&self) -> GateRecord {
        self.gate.load().unwrap_or_else(|err| {
            warn!("gate record unreadable, treating as not completed: {}", err);
            GateRecord::default()
        })
    }

    /// Computes the state that follows `current`.
    async fn transition(&self, current: &SessionState) -> SessionState {
        let identity = self.client.identity().status();
        if identity.is_initializing() {
            return SessionState::Initializing;
        }
        let gate = self.gate_record();
        if !gate.completed {
            return SessionState::GateRequired;
        }
        if !matches!(identity, IdentityStatus::Authenticated(_)) {
            return SessionState::LoginRequired;
        }

        match current {
            SessionState::Initializing
            | SessionState::GateRequired
            | SessionState::LoginRequired => SessionState::ProvisioningCheck,
            SessionState::ProvisioningCheck => self.check_profile(&gate).await,
            SessionState::AutoProvisioning { display_name } => self.provision(display_name).await,
            SessionState::Ready { .. } => current.clone(),
        }
    }

    async fn check_profile(&self, gate: &GateRecord) -> SessionState {
        match self.client.profile().await {
            Ok(Some(profile)) => SessionState::Ready {
                profile: Some(profile),
                setup_required: false,
            },
            Ok(None) => {
                let attempted = self.progress.lock().auto_attempted;
                match gate.display_name() {
                    Some(name) if !attempted => SessionState::AutoProvisioning {
                        display_name: name.to_string(),
                    },
                    _ => SessionState::Ready {
                        profile: None,
                        setup_required: true,
                    },
                }
            }
            Err(err) => {
                warn!("profile lookup failed, staying in provisioning check: {}", err);
                self.fail(err);
                SessionState::ProvisioningCheck
            }
        }
    }

    async fn provision(&self, display_name: &str) -> SessionState {
        self.progress.lock().auto_attempted = true;
        let profile = Profile::from_display_name(display_name);
        match self.client.execute(Mutation::SaveProfile(profile)).await {
            Ok(done) => {
                self.progress.lock().last_invalidation = Some(done.invalidation);
                SessionState::ProvisioningCheck
            }
            Err(err) => {
                warn!("auto-provisioning failed, falling back to manual setup: {}", err);
                self.fail(err);
                SessionState::Ready {
                    profile: None,
                    setup_required: true,
                }
            }
        }
    }

    /// Starts over from `Initializing`, forgetting per-session progress.
    async fn restart(&self) -> SessionState {
        {
            let mut progress = self.progress.lock();
            progress.auto_attempted = false;
            progress.last_error = None;
        }
        self.set(SessionState::Initializing);
        self.run().await
    }

    /// Completes the access gate and moves on.
    pub async fn complete_gate(&self, first: &str, last: &str) -> Result<SessionState> {
        let Some(_busy) = self.enter() else {
            return Ok(self.state());
        };
        let record = self.gate.complete(first, last)?;
        info!(name = %record.display_name, "access gate completed");
        Ok(self.run().await)
    }

    /// Forgets the gate record and restarts the session.
    pub async fn reset_gate(&self) -> Result<SessionState> {
        let Some(_busy) = self.enter() else {
            return Ok(self.state());
        };
        self.gate.reset()?;
        info!("access gate reset");
        Ok(self.restart().await)
    }

    /// Signs in through the identity provider and moves on.
    pub async fn login(&self) -> Result<SessionState> {
        let Some(_busy) = self.enter() else {
            return Ok(self.state());
        };
        self.client.identity().login().await?;
        Ok(self.run().await)
    }

    /// Signs out, drops every cached entry and restarts the session.
    pub async fn logout(&self) -> Result<SessionState> {
        let Some(_busy) = self.enter() else {
            return Ok(self.state());
        };
        self.client.identity().logout().await?;
        self.client.cache().clear();
        Ok(self.restart().await)
    }

    /// Saves the profile entered in the manual setup form.
    ///
    /// Only valid while `Ready` with setup required; otherwise the current
    /// state is returned unchanged.
    pub async fn submit_manual_profile(&self, name: &str, email: &str) -> Result<SessionState> {
        let Some(_busy) = self.enter() else {
            return Ok(self.state());
        };
        if !self.state().setup_required() {
            debug!("manual profile submitted outside setup, ignoring");
            return Ok(self.state());
        }
        let profile = Profile {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            employee_id: None,
        };
        let done = self.client.execute(Mutation::SaveProfile(profile)).await?;
        self.progress.lock().last_invalidation = Some(done.invalidation);
        self.set(SessionState::ProvisioningCheck);
        Ok(self.run().await)
    }
}

impl std::fmt::Debug for SessionBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBootstrap")
            .field("state", &*self.state.lock())
            .field("busy", &self.busy.load(Ordering::Relaxed))
            .finish()
    }
}

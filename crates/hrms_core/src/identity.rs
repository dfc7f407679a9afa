//! Wrapper around the external identity provider.

use crate::error::Result;
use crate::types::Subject;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// What the client currently knows about the caller's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityStatus {
    /// The provider has not finished restoring a previous login.
    Initializing,
    /// No subject.
    Anonymous,
    /// Signed in as the given subject.
    Authenticated(Subject),
}

impl IdentityStatus {
    pub fn subject(&self) -> Option<&Subject> {
        match self {
            Self::Authenticated(subject) => Some(subject),
            _ => None,
        }
    }

    pub fn is_initializing(&self) -> bool {
        matches!(self, Self::Initializing)
    }
}

/// External identity provider. Its protocol is opaque to the client.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the subject of a login that survived a restart, if any.
    async fn restore(&self) -> Result<Option<Subject>>;

    /// Runs an interactive login.
    async fn login(&self) -> Result<Subject>;

    /// Forgets the current login.
    async fn logout(&self) -> Result<()>;
}

/// Exposes the current subject and the initialization flag.
pub struct IdentityContext {
    provider: Arc<dyn IdentityProvider>,
    status: watch::Sender<IdentityStatus>,
}

impl IdentityContext {
    /// Creates a context in the `Initializing` state.
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (status, _) = watch::channel(IdentityStatus::Initializing);
        Self { provider, status }
    }

    /// Restores a previous login and leaves `Initializing`.
    ///
    /// A provider failure is logged and treated as "no subject".
    pub async fn initialize(&self) -> IdentityStatus {
        self.status.send_replace(IdentityStatus::Initializing);
        let status = match self.provider.restore().await {
            Ok(Some(subject)) => IdentityStatus::Authenticated(subject),
            Ok(None) => IdentityStatus::Anonymous,
            Err(err) => {
                warn!("identity restore failed: {}", err);
                IdentityStatus::Anonymous
            }
        };
        self.status.send_replace(status.clone());
        status
    }

    pub async fn login(&self) -> Result<Subject> {
        let subject = self.provider.login().await?;
        info!(%subject, "signed in");
        self.status
            .send_replace(IdentityStatus::Authenticated(subject.clone()));
        Ok(subject)
    }

    pub async fn logout(&self) -> Result<()> {
        self.provider.logout().await?;
        info!("signed out");
        self.status.send_replace(IdentityStatus::Anonymous);
        Ok(())
    }

    pub fn status(&self) -> IdentityStatus {
        self.status.borrow().clone()
    }

    pub fn subject(&self) -> Option<Subject> {
        self.status.borrow().subject().cloned()
    }

    /// Receiver that observes every status change.
    pub fn watch(&self) -> watch::Receiver<IdentityStatus> {
        self.status.subscribe()
    }
}

impl std::fmt::Debug for IdentityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityContext")
            .field("status", &*self.status.borrow())
            .finish()
    }
}

/// Provider that keeps the login in memory and issues random subjects.
#[derive(Debug, Default)]
pub struct LocalIdentityProvider {
    current: Mutex<Option<Subject>>,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose `restore` returns `subject`.
    pub fn signed_in(subject: Subject) -> Self {
        Self {
            current: Mutex::new(Some(subject)),
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn restore(&self) -> Result<Option<Subject>> {
        Ok(self.current.lock().clone())
    }

    async fn login(&self) -> Result<Subject> {
        let mut current = self.current.lock();
        let subject = current
            .get_or_insert_with(|| Subject::new(uuid::Uuid::new_v4().to_string()))
            .clone();
        Ok(subject)
    }

    async fn logout(&self) -> Result<()> {
        *self.current.lock() = None;
        Ok(())
    }
}

//! Session state machine over the auth and admin-registry collaborators.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::aggregates::{Identity, Session};
use crate::domain::events::{DomainEvent, SessionEvent};
use crate::domain::value_objects::IdentityId;
use crate::ports::{AdminRegistry, AuthError, AuthProvider, DocumentStore, StoreError, Subscription, ADMINS_COLLECTION};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The provider rejected the credentials; message passed through as-is.
    #[error(transparent)]
    Authentication(#[from] AuthError),

    #[error("Unauthorized: You do not have admin access.")]
    Unauthorized,
}

/// Admin registry backed by an existence check in the `admins` collection.
pub struct DocumentAdminRegistry {
    store: Arc<dyn DocumentStore>,
}

impl DocumentAdminRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self { Self { store } }
}

#[async_trait]
impl AdminRegistry for DocumentAdminRegistry {
    async fn is_admin(&self, id: &IdentityId) -> Result<bool, StoreError> {
        Ok(self.store.get(ADMINS_COLLECTION, id.as_str()).await?.is_some())
    }
}

/// Owns the current [`Session`] and is the only consumer of the auth and
/// admin-registry collaborators.
pub struct SessionStore {
    auth: Arc<dyn AuthProvider>,
    registry: Arc<dyn AdminRegistry>,
    session: Session,
    loading: bool,
    rejected: Option<Rejected>,
    events: Vec<DomainEvent>,
}

/// An identity refused admin access. Provider notifications for it are
/// dropped until the provider has echoed it and then reported a sign-out.
#[derive(Debug)]
struct Rejected {
    id: IdentityId,
    echoed: bool,
}

impl SessionStore {
    pub fn new(auth: Arc<dyn AuthProvider>, registry: Arc<dyn AdminRegistry>) -> Self {
        Self { auth, registry, session: Session::Unauthenticated, loading: true, rejected: None, events: vec![] }
    }

    pub fn session(&self) -> &Session { &self.session }

    /// True until the first auth-state notification has been handled.
    pub fn is_loading(&self) -> bool { self.loading }

    pub fn listen(&self) -> Subscription<Option<Identity>> { self.auth.subscribe() }

    /// Applies an auth-state notification from the provider.
    pub async fn handle_auth_change(&mut self, identity: Option<Identity>) {
        if let Some(rejected) = &mut self.rejected {
            match &identity {
                Some(i) if i.id == rejected.id => {
                    rejected.echoed = true;
                    tracing::debug!(identity = %i.id, "ignoring notification for rejected identity");
                    self.loading = false;
                    return;
                }
                None if !rejected.echoed => {}
                _ => self.rejected = None,
            }
        }
        let session = match identity {
            None => Session::Unauthenticated,
            Some(identity) => {
                let admin = self.check_admin(&identity.id).await.unwrap_or_else(|e| {
                    tracing::error!(identity = %identity.id, error = %e, "admin check failed");
                    false
                });
                self.raise(SessionEvent::SignedIn { identity_id: identity.id.clone(), admin });
                if admin { Session::Admin(identity) } else { Session::Authenticated(identity) }
            }
        };
        self.session = session;
        self.loading = false;
        tracing::info!(state = ?self.session.state(), "session updated");
    }

    /// Signs in and requires admin privileges. A non-admin identity is signed
    /// straight back out, so the outcome matches never having signed in.
    pub async fn admin_sign_in(&mut self, email: &str, password: &str) -> Result<Identity, SessionError> {
        let identity = self.auth.sign_in(email, password).await?;
        match self.check_admin(&identity.id).await {
            Ok(true) => {
                self.rejected = None;
                self.raise(SessionEvent::SignedIn { identity_id: identity.id.clone(), admin: true });
                self.session = Session::Admin(identity.clone());
                tracing::info!(identity = %identity.id, "admin signed in");
                Ok(identity)
            }
            outcome => {
                if let Err(e) = outcome {
                    tracing::error!(identity = %identity.id, error = %e, "admin check failed during sign-in");
                }
                self.raise(SessionEvent::AdminRejected { identity_id: identity.id.clone() });
                self.rejected = Some(Rejected { id: identity.id.clone(), echoed: false });
                self.sign_out().await;
                Err(SessionError::Unauthorized)
            }
        }
    }

    /// Always ends unauthenticated; provider failures are only logged.
    pub async fn sign_out(&mut self) {
        if let Err(e) = self.auth.sign_out().await {
            tracing::warn!(error = %e, "sign-out failed at provider");
        }
        self.session = Session::Unauthenticated;
        self.raise(SessionEvent::SignedOut);
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    async fn check_admin(&self, id: &IdentityId) -> Result<bool, StoreError> { self.registry.is_admin(id).await }
    fn raise(&mut self, e: SessionEvent) { self.events.push(e.into()); }
}

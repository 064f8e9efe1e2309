//! Session value

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::IdentityId;

/// An authenticated identity handed out by the auth collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<IdentityId>) -> Self { Self { id: id.into(), email: None } }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Unauthenticated,
    Authenticated(Identity),
    Admin(Identity),
}

/// Flattened view of [`Session`] for callers that only need the state name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    Unauthenticated,
    AuthenticatedNonAdmin,
    AuthenticatedAdmin,
}

impl Session {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Unauthenticated => None,
            Self::Authenticated(identity) | Self::Admin(identity) => Some(identity),
        }
    }

    pub fn is_admin(&self) -> bool { matches!(self, Self::Admin(_)) }

    pub fn state(&self) -> SessionState {
        match self {
            Self::Unauthenticated => SessionState::Unauthenticated,
            Self::Authenticated(_) => SessionState::AuthenticatedNonAdmin,
            Self::Admin(_) => SessionState::AuthenticatedAdmin,
        }
    }
}

use crate::identity::IdentityError;
use crate::service::{CallKind, RemoteCall, ServiceError};
use crate::session::SessionError;

/// Where a failure sits in the client's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Identity or session failure; the client falls back to signed-out.
    Session,
    /// A query failed; the view renders its empty state.
    Read,
    /// An update failed; local state is left untouched.
    Write,
    /// Rejected locally before any remote call.
    Validation,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("{0}")]
    Validation(String),

    #[error("Only the author can do that")]
    NotOwner,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{call} failed: {source}")]
    Remote {
        call: RemoteCall,
        #[source]
        source: ServiceError,
    },

    #[error("{call} was not applied by the service")]
    NotApplied { call: RemoteCall },

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn remote(call: RemoteCall, source: ServiceError) -> Self {
        ClientError::Remote { call, source }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    /// Text shown to the user. Local rejections carry their own message;
    /// everything else is reported with the controller's `fallback`.
    pub fn notice(&self, fallback: &str) -> String {
        match self.class() {
            ErrorClass::Validation => self.to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ClientError::NotAuthenticated
            | ClientError::Identity(_)
            | ClientError::Session(_) => ErrorClass::Session,
            ClientError::Validation(_) | ClientError::NotOwner | ClientError::Io(_) => {
                ErrorClass::Validation
            }
            ClientError::NotFound(_) => ErrorClass::Read,
            ClientError::Remote { call, .. } | ClientError::NotApplied { call } => {
                match call.kind() {
                    CallKind::Query => ErrorClass::Read,
                    CallKind::Update => ErrorClass::Write,
                }
            }
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

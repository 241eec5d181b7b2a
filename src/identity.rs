// Identity sessions - establishing and invalidating who the client acts as
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

use crate::service::Principal;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Login was cancelled")]
    Cancelled,

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Session length of {0} hours is out of range")]
    SessionLength(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// External identity provider flow.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The identity of a still-valid previous session, if any.
    async fn restore(&self) -> Result<Option<Principal>, IdentityError>;

    /// Run the login flow; resolves once the provider reports completion.
    async fn login(&self) -> Result<Principal, IdentityError>;

    /// Invalidate the current session.
    async fn logout(&self) -> Result<(), IdentityError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SessionRecord {
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// On-disk identity: the principal survives logout, the session does not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IdentityFile {
    principal: Principal,
    session: Option<SessionRecord>,
}

/// Identity provider backed by a JSON file in the data directory.
pub struct LocalIdentityProvider {
    path: PathBuf,
    session_hours: u64,
    provider_url: Url,
}

impl LocalIdentityProvider {
    pub fn new(path: PathBuf, session_hours: u64, provider_url: Url) -> Self {
        Self {
            path,
            session_hours,
            provider_url,
        }
    }

    async fn read(&self) -> Result<Option<IdentityFile>, IdentityError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, file: &IdentityFile) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(file)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn restore(&self) -> Result<Option<Principal>, IdentityError> {
        let Some(file) = self.read().await? else {
            return Ok(None);
        };

        match file.session {
            Some(session) if session.expires_at > Utc::now() => Ok(Some(file.principal)),
            Some(_) => {
                tracing::info!("Identity session for {} expired", file.principal);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn login(&self) -> Result<Principal, IdentityError> {
        tracing::info!("Starting login with identity provider {}", self.provider_url);

        let principal = match self.read().await? {
            Some(file) => file.principal,
            None => Principal::generate(),
        };

        let now = Utc::now();
        let expires_at = i64::try_from(self.session_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|length| now.checked_add_signed(length))
            .ok_or(IdentityError::SessionLength(self.session_hours))?;
        let file = IdentityFile {
            principal: principal.clone(),
            session: Some(SessionRecord {
                issued_at: now,
                expires_at,
            }),
        };
        self.write(&file).await?;

        tracing::info!("Identity session established for {}", principal);
        Ok(principal)
    }

    async fn logout(&self) -> Result<(), IdentityError> {
        if let Some(mut file) = self.read().await? {
            file.session = None;
            self.write(&file).await?;
            tracing::info!("Identity session for {} invalidated", file.principal);
        }
        Ok(())
    }
}

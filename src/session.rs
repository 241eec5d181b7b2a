// Session bootstrap: who the client acts as and which profile belongs to it.
use std::sync::Arc;

use crate::config::MediaConfig;
use crate::context::AppContext;
use crate::error::{ClientError, ClientResult};
use crate::identity::IdentityProvider;
use crate::media::MediaCache;
use crate::notice::Notices;
use crate::service::{
    Principal, RemoteCall, ServiceConnector, SocialService, UpdateProfileRequest, UserProfile,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    #[error("Profile {profile} does not belong to {identity}")]
    ProfileMismatch {
        identity: Principal,
        profile: Principal,
    },
}

/// Session state machine - explicit transitions, no side effects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,

    /// The identity provider flow is running.
    Authenticating,

    /// Identity established; `profile` is `None` until one is loaded or created.
    Authenticated {
        identity: Principal,
        profile: Option<UserProfile>,
    },
}

impl SessionState {
    pub fn state_name(&self) -> &'static str {
        match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated { profile: None, .. } => "authenticated without profile",
            SessionState::Authenticated {
                profile: Some(_), ..
            } => "authenticated",
        }
    }

    /// Unauthenticated -> Authenticated{noProfile} from a stored session.
    pub fn restore(&self, identity: Principal) -> Result<Self, SessionError> {
        match self {
            SessionState::Unauthenticated => Ok(SessionState::Authenticated {
                identity,
                profile: None,
            }),
            _ => Err(self.invalid("restore a session")),
        }
    }

    /// Unauthenticated -> Authenticating
    pub fn begin_login(&self) -> Result<Self, SessionError> {
        match self {
            SessionState::Unauthenticated => Ok(SessionState::Authenticating),
            _ => Err(self.invalid("start a login")),
        }
    }

    /// Authenticating -> Authenticated{noProfile}
    pub fn complete_login(&self, identity: Principal) -> Result<Self, SessionError> {
        match self {
            SessionState::Authenticating => Ok(SessionState::Authenticated {
                identity,
                profile: None,
            }),
            _ => Err(self.invalid("complete a login")),
        }
    }

    /// Authenticated{_} -> Authenticated{withProfile}
    pub fn attach_profile(&self, profile: UserProfile) -> Result<Self, SessionError> {
        match self {
            SessionState::Authenticated { identity, .. } => {
                if profile.id != *identity {
                    return Err(SessionError::ProfileMismatch {
                        identity: identity.clone(),
                        profile: profile.id,
                    });
                }
                Ok(SessionState::Authenticated {
                    identity: identity.clone(),
                    profile: Some(profile),
                })
            }
            _ => Err(self.invalid("attach a profile")),
        }
    }

    /// Any state -> Unauthenticated
    pub fn sign_out(&self) -> Self {
        SessionState::Unauthenticated
    }

    pub fn identity(&self) -> Option<&Principal> {
        match self {
            SessionState::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            SessionState::Authenticated { profile, .. } => profile.as_ref(),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            from: self.state_name(),
            action,
        }
    }
}

/// Owns the identity session, the bound service client and the current user.
pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    connector: Arc<dyn ServiceConnector>,
    state: SessionState,
    service: Option<Arc<dyn SocialService>>,
    media_limits: MediaConfig,
    notices: Notices,
    media: MediaCache,
}

impl SessionManager {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        connector: Arc<dyn ServiceConnector>,
        media_limits: MediaConfig,
    ) -> Self {
        Self {
            identity,
            connector,
            state: SessionState::Unauthenticated,
            service: None,
            media_limits,
            notices: Notices::new(),
            media: MediaCache::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        self.state.profile()
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn media(&self) -> &MediaCache {
        &self.media
    }

    /// Resume a previous identity session if one exists. Never fails: a
    /// broken identity leaves the session signed out, a failed profile
    /// fetch leaves it without a profile.
    pub async fn bootstrap(&mut self) {
        let identity = match self.identity.restore().await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                tracing::info!("No previous identity session");
                return;
            }
            Err(e) => {
                tracing::error!("Auth initialization error: {}", e);
                self.discard();
                return;
            }
        };

        match self.state.restore(identity.clone()) {
            Ok(next) => self.state = next,
            Err(e) => {
                tracing::warn!("Ignoring stored identity: {}", e);
                return;
            }
        }

        let service = self.connector.connect(&identity);
        self.service = Some(service.clone());
        tracing::info!("Restored identity session for {}", identity);

        match service.get_current_user().await {
            Ok(Some(profile)) => self.attach(profile),
            Ok(None) => tracing::info!("No profile yet for {}", identity),
            Err(e) => tracing::error!("Error fetching user profile: {}", e),
        }
    }

    /// Run the identity provider flow, bind a fresh client to the returned
    /// identity and make sure a profile exists for it.
    pub async fn login(&mut self) -> ClientResult<()> {
        self.state = self.state.begin_login()?;

        let identity = match self.identity.login().await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::error!("Login error: {}", e);
                self.discard();
                self.notices.error("Login failed. Please try again.");
                return Err(e.into());
            }
        };

        self.state = self.state.complete_login(identity.clone())?;
        self.service = Some(self.connector.connect(&identity));
        tracing::info!("Logged in as {}", identity);

        if let Err(e) = self.ensure_profile().await {
            tracing::error!("Error handling user profile: {}", e);
        }
        Ok(())
    }

    /// Load the caller's profile, creating a default one when absent. The
    /// create call sends every optional field absent.
    pub async fn ensure_profile(&mut self) -> ClientResult<UserProfile> {
        if let Some(profile) = self.state.profile() {
            return Ok(profile.clone());
        }
        let service = self.service.clone().ok_or(ClientError::NotAuthenticated)?;

        let existing = service
            .get_current_user()
            .await
            .map_err(|e| ClientError::remote(RemoteCall::GetCurrentUser, e))?;

        let profile = match existing {
            Some(profile) => profile,
            None => {
                tracing::info!("Creating default profile for {}", service.caller());
                service
                    .create_profile(UpdateProfileRequest::default())
                    .await
                    .map_err(|e| ClientError::remote(RemoteCall::CreateProfile, e))?
            }
        };

        self.state = self.state.attach_profile(profile.clone())?;
        Ok(profile)
    }

    /// Invalidate the identity session and drop the client and profile.
    pub async fn logout(&mut self) {
        if let Err(e) = self.identity.logout().await {
            tracing::error!("Logout error: {}", e);
        }
        self.discard();
        tracing::info!("Logged out");
    }

    /// Replace the current-user record, e.g. after a profile edit.
    pub fn set_current_user(&mut self, profile: UserProfile) -> ClientResult<()> {
        self.state = self.state.attach_profile(profile)?;
        Ok(())
    }

    /// Context handed to view controllers; `None` while signed out.
    pub fn context(&self) -> Option<AppContext> {
        let service = self.service.clone()?;
        if !self.state.is_authenticated() {
            return None;
        }
        Some(AppContext {
            service,
            current_user: self.state.profile().cloned(),
            media_limits: self.media_limits,
            notices: self.notices.clone(),
            media: self.media.clone(),
        })
    }

    fn attach(&mut self, profile: UserProfile) {
        match self.state.attach_profile(profile) {
            Ok(next) => self.state = next,
            Err(e) => tracing::error!("Discarding profile: {}", e),
        }
    }

    fn discard(&mut self) {
        self.service = None;
        self.state = self.state.sign_out();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_for(id: &Principal) -> UserProfile {
        UserProfile {
            id: id.clone(),
            username: "ada".into(),
            name: "Ada".into(),
            bio: String::new(),
            profile_photo: None,
            cover_photo: None,
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            created_at: 0,
        }
    }

    #[test]
    fn test_valid_state_transitions() {
        let id = Principal::generate();
        let state = SessionState::Unauthenticated;

        let state = state.begin_login().unwrap();
        assert_eq!(state, SessionState::Authenticating);

        let state = state.complete_login(id.clone()).unwrap();
        assert_eq!(state.identity(), Some(&id));
        assert!(state.profile().is_none());
        assert_eq!(state.state_name(), "authenticated without profile");

        let state = state.attach_profile(profile_for(&id)).unwrap();
        assert_eq!(state.profile().map(|p| p.name.as_str()), Some("Ada"));
        assert_eq!(state.state_name(), "authenticated");

        let state = state.sign_out();
        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[test]
    fn test_restore_skips_authenticating() {
        let id = Principal::generate();
        let state = SessionState::Unauthenticated.restore(id.clone()).unwrap();
        assert_eq!(state.identity(), Some(&id));
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let err = SessionState::Unauthenticated
            .complete_login(Principal::generate())
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                from: "unauthenticated",
                action: "complete a login"
            }
        );

        assert!(SessionState::Authenticating.begin_login().is_err());
        assert!(SessionState::Unauthenticated
            .attach_profile(profile_for(&Principal::generate()))
            .is_err());
    }

    #[test]
    fn test_profile_must_match_identity() {
        let state = SessionState::Unauthenticated
            .restore(Principal::generate())
            .unwrap();
        let err = state
            .attach_profile(profile_for(&Principal::generate()))
            .unwrap_err();
        assert!(matches!(err, SessionError::ProfileMismatch { .. }));
    }
}

use std::sync::Arc;

use crate::config::MediaConfig;
use crate::media::MediaCache;
use crate::notice::Notices;
use crate::service::{Principal, SocialService, UserProfile};

/// Everything a view controller needs, passed by reference to its
/// constructor. Cheap to clone; the service, notices and media cache are
/// shared across clones.
#[derive(Clone)]
pub struct AppContext {
    pub service: Arc<dyn SocialService>,
    pub current_user: Option<UserProfile>,
    pub media_limits: MediaConfig,
    pub notices: Notices,
    pub media: MediaCache,
}

impl AppContext {
    /// Identity the bound client acts as.
    pub fn viewer(&self) -> &Principal {
        self.service.caller()
    }

    pub fn is_viewer(&self, id: &Principal) -> bool {
        self.viewer() == id
    }
}

#[cfg(test)]
impl AppContext {
    /// Context for a fresh user with a profile named `name`.
    pub(crate) async fn signed_up(backend: &crate::service::InMemoryBackend, name: &str) -> Self {
        use crate::service::UpdateProfileRequest;

        let client = backend.client(Principal::generate());
        let profile = client
            .create_profile(UpdateProfileRequest {
                name: Some(name.into()),
                ..Default::default()
            })
            .await
            .unwrap();
        Self {
            service: Arc::new(client),
            current_user: Some(profile),
            media_limits: MediaConfig::default(),
            notices: Notices::new(),
            media: MediaCache::new(),
        }
    }
}

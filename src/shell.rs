// In-memory navigation between the dashboard views. Switching views tears
// down the previous controller, which releases its media handles.
use crate::context::AppContext;
use crate::error::{ClientError, ClientResult};
use crate::service::{Principal, UserProfile};
use crate::session::SessionManager;
use crate::views::{Discovery, Feed, ProfileEditor, ProfileView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Feed,
    /// `None` is the current user's own profile.
    Profile(Option<Principal>),
    EditProfile,
    Discover,
}

pub enum View {
    Feed(Feed),
    Profile(ProfileView),
    EditProfile(ProfileEditor),
    Discover(Discovery),
}

impl View {
    pub fn route(&self) -> Route {
        match self {
            View::Feed(_) => Route::Feed,
            View::Profile(view) if view.is_own() => Route::Profile(None),
            View::Profile(view) => Route::Profile(Some(view.user().clone())),
            View::EditProfile(_) => Route::EditProfile,
            View::Discover(_) => Route::Discover,
        }
    }

    fn teardown(&mut self) {
        match self {
            View::Feed(view) => view.teardown(),
            View::Profile(view) => view.teardown(),
            View::EditProfile(view) => view.teardown(),
            View::Discover(view) => view.teardown(),
        }
    }
}

pub struct Shell {
    session: SessionManager,
    view: Option<View>,
}

impl Shell {
    pub fn new(session: SessionManager) -> Self {
        Self {
            session,
            view: None,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn view_mut(&mut self) -> Option<&mut View> {
        self.view.as_mut()
    }

    pub fn route(&self) -> Option<Route> {
        self.view.as_ref().map(View::route)
    }

    /// Resume any previous session and show the feed when signed in.
    pub async fn start(&mut self) {
        self.session.bootstrap().await;
        if self.session.state().is_authenticated() {
            if let Err(e) = self.navigate(Route::Feed).await {
                tracing::error!("Could not mount the feed: {}", e);
            }
        }
    }

    pub async fn login(&mut self) -> ClientResult<()> {
        self.session.login().await?;
        self.navigate(Route::Feed).await
    }

    pub async fn logout(&mut self) {
        self.unmount();
        self.session.logout().await;
    }

    /// Tear down the current view, then mount and load the next one.
    pub async fn navigate(&mut self, route: Route) -> ClientResult<()> {
        if route == Route::EditProfile && self.session.current_user().is_none() {
            self.session.ensure_profile().await?;
        }
        let ctx = self.context()?;
        self.unmount();

        tracing::debug!(?route, "Mounting view");
        let view = match route {
            Route::Feed => {
                let mut feed = Feed::new(&ctx);
                feed.load().await;
                View::Feed(feed)
            }
            Route::Profile(user) => {
                let mut profile = ProfileView::new(&ctx, user);
                profile.load().await;
                View::Profile(profile)
            }
            Route::EditProfile => View::EditProfile(ProfileEditor::new(&ctx)?),
            Route::Discover => {
                let mut discovery = Discovery::new(&ctx);
                discovery.load().await;
                View::Discover(discovery)
            }
        };
        self.view = Some(view);
        Ok(())
    }

    /// Save the open profile editor, publish the result as the current
    /// user and return to the own profile.
    pub async fn save_profile(&mut self) -> ClientResult<UserProfile> {
        let Some(View::EditProfile(editor)) = self.view.as_mut() else {
            return Err(ClientError::validation("The profile editor is not open"));
        };
        let updated = editor.save().await?;
        self.session.set_current_user(updated.clone())?;
        self.navigate(Route::Profile(None)).await?;
        Ok(updated)
    }

    pub async fn cancel_edit(&mut self) -> ClientResult<()> {
        self.navigate(Route::Profile(None)).await
    }

    fn context(&self) -> ClientResult<AppContext> {
        self.session.context().ok_or(ClientError::NotAuthenticated)
    }

    fn unmount(&mut self) {
        if let Some(mut view) = self.view.take() {
            view.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaConfig;
    use crate::identity::LocalIdentityProvider;
    use crate::service::{InMemoryBackend, RemoteCall};
    use std::sync::Arc;

    fn shell_in(dir: &std::path::Path, backend: &InMemoryBackend) -> Shell {
        let identity = LocalIdentityProvider::new(
            dir.join("identity.json"),
            8,
            url::Url::parse("https://identity.ic0.app").unwrap(),
        );
        Shell::new(SessionManager::new(
            Arc::new(identity),
            Arc::new(backend.clone()),
            MediaConfig::default(),
        ))
    }

    #[tokio::test]
    async fn signed_out_shell_has_no_view() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = InMemoryBackend::new();
        let mut shell = shell_in(tmp.path(), &backend);

        shell.start().await;
        assert!(shell.route().is_none());
        assert!(matches!(
            shell.navigate(Route::Discover).await,
            Err(ClientError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn login_lands_on_the_feed() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = InMemoryBackend::new();
        let mut shell = shell_in(tmp.path(), &backend);

        shell.login().await.unwrap();
        assert_eq!(shell.route(), Some(Route::Feed));
        assert_eq!(
            shell.session().current_user().map(|u| u.name.as_str()),
            Some("Anonymous User")
        );
    }

    #[tokio::test]
    async fn editor_save_updates_the_session_and_returns_to_profile() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = InMemoryBackend::new();
        let mut shell = shell_in(tmp.path(), &backend);
        shell.login().await.unwrap();

        shell.navigate(Route::EditProfile).await.unwrap();
        if let Some(View::EditProfile(editor)) = shell.view_mut() {
            editor.draft_mut().name = "Ada".into();
        }
        let updated = shell.save_profile().await.unwrap();

        assert_eq!(updated.name, "Ada");
        assert_eq!(shell.route(), Some(Route::Profile(None)));
        assert_eq!(
            shell.session().current_user().map(|u| u.name.as_str()),
            Some("Ada")
        );
    }

    #[tokio::test]
    async fn edit_without_profile_creates_one_first() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = InMemoryBackend::new();
        let mut first = shell_in(tmp.path(), &backend);
        first.login().await.unwrap();
        let me = first.session().current_user().unwrap().id.clone();

        // Same identity, but the backend forgot the profile.
        let fresh = InMemoryBackend::new();
        let mut shell = shell_in(tmp.path(), &fresh);
        shell.start().await;
        assert!(shell.session().current_user().is_none());

        shell.navigate(Route::EditProfile).await.unwrap();
        assert_eq!(shell.route(), Some(Route::EditProfile));
        assert_eq!(shell.session().current_user().map(|u| &u.id), Some(&me));
        assert_eq!(fresh.call_count(RemoteCall::CreateProfile).await, 1);
    }

    #[tokio::test]
    async fn switching_views_releases_media() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = InMemoryBackend::new();
        let mut shell = shell_in(tmp.path(), &backend);
        shell.login().await.unwrap();

        let ctx = shell.session().context().unwrap();
        ctx.service
            .create_post(crate::service::CreatePostRequest {
                content: "pic".into(),
                media: Some(vec![1; 8]),
                media_type: Some("image/png".into()),
            })
            .await
            .unwrap();
        shell.navigate(Route::Feed).await.unwrap();
        assert_eq!(shell.session().media().len(), 1);

        shell.navigate(Route::Discover).await.unwrap();
        assert!(shell.session().media().is_empty());
    }

    #[tokio::test]
    async fn logout_unmounts_and_signs_out() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = InMemoryBackend::new();
        let mut shell = shell_in(tmp.path(), &backend);
        shell.login().await.unwrap();

        shell.logout().await;
        assert!(shell.route().is_none());
        assert!(!shell.session().state().is_authenticated());
        assert!(shell.session().context().is_none());
    }

    #[tokio::test]
    async fn discovery_selects_a_user_profile() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = InMemoryBackend::new();
        let others = backend.seed_demo().await.unwrap();
        let mut shell = shell_in(tmp.path(), &backend);
        shell.login().await.unwrap();

        shell.navigate(Route::Discover).await.unwrap();
        let Some(View::Discover(discovery)) = shell.view() else {
            panic!("discovery not mounted");
        };
        assert_eq!(discovery.visible().len(), others.len());

        shell
            .navigate(Route::Profile(Some(others[0].clone())))
            .await
            .unwrap();
        assert_eq!(shell.route(), Some(Route::Profile(Some(others[0].clone()))));
        let Some(View::Profile(profile)) = shell.view() else {
            panic!("profile not mounted");
        };
        assert!(!profile.is_own());
        assert_eq!(profile.posts().cards().len(), 1);
    }
}

use crate::context::AppContext;
use crate::error::{ClientError, ClientResult};
use crate::media::{MediaHandle, MediaLeases};
use crate::service::{Principal, RemoteCall, UserProfile};

use super::{rejected, write_failed, PostList};

/// A user's profile header and posts.
pub struct ProfileView {
    ctx: AppContext,
    user: Principal,
    profile: Option<UserProfile>,
    following: bool,
    posts: PostList,
    photo: Option<MediaHandle>,
    cover: Option<MediaHandle>,
    leases: MediaLeases,
}

impl ProfileView {
    /// Profile of `user`, or of the current user when `None`.
    pub fn new(ctx: &AppContext, user: Option<Principal>) -> Self {
        let user = user.unwrap_or_else(|| ctx.viewer().clone());
        Self {
            ctx: ctx.clone(),
            user,
            profile: None,
            following: false,
            posts: PostList::new(ctx),
            photo: None,
            cover: None,
            leases: MediaLeases::new(ctx.media.clone()),
        }
    }

    pub fn user(&self) -> &Principal {
        &self.user
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn is_own(&self) -> bool {
        self.ctx.is_viewer(&self.user)
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn posts(&self) -> &PostList {
        &self.posts
    }

    pub fn posts_mut(&mut self) -> &mut PostList {
        &mut self.posts
    }

    pub fn photo(&self) -> Option<&MediaHandle> {
        self.photo.as_ref()
    }

    pub fn cover(&self) -> Option<&MediaHandle> {
        self.cover.as_ref()
    }

    pub async fn load(&mut self) {
        self.load_profile().await;

        let posts = match self.ctx.service.get_user_posts(&self.user).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!("Error loading posts of {}: {}", self.user, e);
                Vec::new()
            }
        };
        self.posts.load(posts).await;

        self.following = if self.is_own() {
            false
        } else {
            match self.ctx.service.is_following(&self.user).await {
                Ok(following) => following,
                Err(e) => {
                    tracing::warn!("is_following for {} failed: {}", self.user, e);
                    false
                }
            }
        };
    }

    /// Follow or unfollow this user. The follower count is patched locally,
    /// then the profile is refetched.
    pub async fn toggle_follow(&mut self) -> ClientResult<bool> {
        if self.is_own() {
            return Err(rejected(
                &self.ctx,
                ClientError::validation("You cannot follow yourself"),
            ));
        }

        let service = self.ctx.service.clone();
        let (call, result) = if self.following {
            (RemoteCall::UnfollowUser, service.unfollow_user(&self.user).await)
        } else {
            (RemoteCall::FollowUser, service.follow_user(&self.user).await)
        };
        if let Err(e) = result {
            return Err(write_failed(
                &self.ctx,
                call,
                e,
                "Failed to update follow status",
            ));
        }

        let was_following = self.following;
        self.following = !was_following;
        if let Some(profile) = self.profile.as_mut() {
            profile.followers_count = if was_following {
                profile.followers_count.saturating_sub(1)
            } else {
                profile.followers_count + 1
            };
        }

        self.load_profile().await;
        Ok(self.following)
    }

    pub fn teardown(&mut self) {
        self.photo = None;
        self.cover = None;
        self.leases.release_all();
        self.posts.teardown();
    }

    /// Fetch the header. Keeps the previous value when the fetch fails.
    async fn load_profile(&mut self) {
        match self.ctx.service.get_profile(&self.user).await {
            Ok(Some(profile)) => self.set_profile(profile),
            Ok(None) => {
                tracing::info!("No profile for {}", self.user);
                self.profile = None;
            }
            Err(e) => tracing::warn!("Error loading profile {}: {}", self.user, e),
        }
    }

    fn set_profile(&mut self, profile: UserProfile) {
        self.leases.release_all();
        self.photo = profile
            .profile_photo
            .as_deref()
            .filter(|bytes| !bytes.is_empty())
            .map(|bytes| self.leases.acquire(bytes, None));
        self.cover = profile
            .cover_photo
            .as_deref()
            .filter(|bytes| !bytes.is_empty())
            .map(|bytes| self.leases.acquire(bytes, None));
        self.profile = Some(profile);
    }
}

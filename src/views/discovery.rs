use std::collections::HashMap;

use crate::context::AppContext;
use crate::error::{ClientError, ClientResult};
use crate::media::{MediaHandle, MediaLeases};
use crate::service::{Principal, RemoteCall, UserProfile};

use super::{fetch_flags, write_failed};

/// Every other user, with a follow toggle and a local text filter.
pub struct Discovery {
    ctx: AppContext,
    users: Vec<UserProfile>,
    following: HashMap<Principal, bool>,
    photos: HashMap<Principal, MediaHandle>,
    query: String,
    leases: MediaLeases,
}

impl Discovery {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            ctx: ctx.clone(),
            users: Vec::new(),
            following: HashMap::new(),
            photos: HashMap::new(),
            query: String::new(),
            leases: MediaLeases::new(ctx.media.clone()),
        }
    }

    pub async fn load(&mut self) {
        let users = match self.ctx.service.get_all_users().await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!("Error loading users: {}", e);
                Vec::new()
            }
        };
        let viewer = self.ctx.viewer().clone();
        self.users = users.into_iter().filter(|u| u.id != viewer).collect();

        self.leases.release_all();
        self.photos.clear();
        for user in &self.users {
            if let Some(bytes) = user.profile_photo.as_deref().filter(|b| !b.is_empty()) {
                let handle = self.leases.acquire(bytes, None);
                self.photos.insert(user.id.clone(), handle);
            }
        }

        let service = self.ctx.service.clone();
        let ids: Vec<Principal> = self.users.iter().map(|u| u.id.clone()).collect();
        self.following = fetch_flags(ids, RemoteCall::IsFollowing, |id| {
            let service = service.clone();
            async move { service.is_following(&id).await }
        })
        .await;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Users whose name or username contains the query, ignoring case.
    pub fn visible(&self) -> Vec<&UserProfile> {
        let needle = self.query.trim().to_lowercase();
        self.users
            .iter()
            .filter(|u| {
                needle.is_empty()
                    || u.name.to_lowercase().contains(&needle)
                    || u.username.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn is_following(&self, user: &Principal) -> bool {
        self.following.get(user).copied().unwrap_or(false)
    }

    pub fn photo(&self, user: &Principal) -> Option<&MediaHandle> {
        self.photos.get(user)
    }

    pub async fn toggle_follow(&mut self, user: &Principal) -> ClientResult<bool> {
        if !self.users.iter().any(|u| &u.id == user) {
            return Err(ClientError::NotFound(user.to_string()));
        }

        let following = self.is_following(user);
        let service = self.ctx.service.clone();
        let (call, result) = if following {
            (RemoteCall::UnfollowUser, service.unfollow_user(user).await)
        } else {
            (RemoteCall::FollowUser, service.follow_user(user).await)
        };
        if let Err(e) = result {
            return Err(write_failed(
                &self.ctx,
                call,
                e,
                "Failed to update follow status",
            ));
        }

        self.following.insert(user.clone(), !following);
        Ok(!following)
    }

    pub fn teardown(&mut self) {
        self.photos.clear();
        self.leases.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{InMemoryBackend, UpdateProfileRequest};

    async fn named(backend: &InMemoryBackend, name: &str, username: &str) -> AppContext {
        let ctx = AppContext::signed_up(backend, name).await;
        ctx.service
            .update_profile(UpdateProfileRequest {
                username: Some(username.into()),
                ..Default::default()
            })
            .await
            .unwrap();
        ctx
    }

    #[tokio::test]
    async fn lists_everyone_but_the_viewer() {
        let backend = InMemoryBackend::new();
        let ada = named(&backend, "Ada Lovelace", "ada").await;
        named(&backend, "Grace Hopper", "grace").await;
        named(&backend, "Alan Turing", "alan").await;

        let mut discovery = Discovery::new(&ada);
        discovery.load().await;
        let names: Vec<&str> = discovery.visible().iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Grace Hopper", "Alan Turing"]);
    }

    #[tokio::test]
    async fn filter_matches_name_or_username_ignoring_case() {
        let backend = InMemoryBackend::new();
        let ada = named(&backend, "Ada Lovelace", "ada").await;
        named(&backend, "Grace Hopper", "admiral").await;
        named(&backend, "Alan Turing", "alan").await;

        let mut discovery = Discovery::new(&ada);
        discovery.load().await;
        backend.clear_journal().await;

        discovery.set_query("HOP");
        assert_eq!(discovery.visible().len(), 1);
        discovery.set_query("ad");
        assert_eq!(discovery.visible()[0].username, "admiral");
        discovery.set_query("");
        assert_eq!(discovery.visible().len(), 2);
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn follow_toggle_alternates() {
        let backend = InMemoryBackend::new();
        let ada = named(&backend, "Ada", "ada").await;
        let grace = named(&backend, "Grace", "grace").await;

        let mut discovery = Discovery::new(&ada);
        discovery.load().await;
        assert!(discovery.toggle_follow(grace.viewer()).await.unwrap());
        assert!(discovery.is_following(grace.viewer()));
        assert!(!discovery.toggle_follow(grace.viewer()).await.unwrap());
        assert_eq!(backend.call_count(RemoteCall::FollowUser).await, 1);
        assert_eq!(backend.call_count(RemoteCall::UnfollowUser).await, 1);
    }

    #[tokio::test]
    async fn failed_lookup_reads_as_not_following() {
        let backend = InMemoryBackend::new();
        let ada = named(&backend, "Ada", "ada").await;
        let grace = named(&backend, "Grace", "grace").await;
        ada.service.follow_user(grace.viewer()).await.unwrap();
        backend.inject_fault(RemoteCall::IsFollowing, None).await;

        let mut discovery = Discovery::new(&ada);
        discovery.load().await;
        assert!(!discovery.is_following(grace.viewer()));
    }
}

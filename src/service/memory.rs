// In-process backend used by the terminal shell and the test suite. It keeps
// the observable behaviour of the social backend: default profile values,
// author-only deletes, counts maintained server-side, feed = own + followed
// posts newest first.
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::*;

/// Most recent calls kept in the journal; older entries are dropped.
pub const JOURNAL_LIMIT: usize = 1024;

/// A scripted failure: every matching call fails with a transport error.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fault {
    call: RemoteCall,
    target: Option<String>,
}

#[derive(Default)]
struct BackendState {
    users: HashMap<Principal, UserProfile>,
    posts: HashMap<String, Post>,
    comments: HashMap<String, Comment>,
    followers: HashMap<Principal, HashSet<Principal>>,
    following: HashMap<Principal, HashSet<Principal>>,
    post_likes: HashMap<String, HashSet<Principal>>,
    comment_likes: HashMap<String, HashSet<Principal>>,
    user_posts: HashMap<Principal, Vec<String>>,
    post_comments: HashMap<String, Vec<String>>,
    journal: VecDeque<(Principal, RemoteCall)>,
    faults: Vec<Fault>,
    last_timestamp: Timestamp,
}

impl BackendState {
    fn now(&mut self) -> Timestamp {
        let wall = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        self.last_timestamp = wall.max(self.last_timestamp + 1);
        self.last_timestamp
    }

    /// Journal the call and apply any matching fault.
    fn enter(&mut self, caller: &Principal, call: RemoteCall, target: Option<&str>) -> ServiceResult<()> {
        if self.journal.len() == JOURNAL_LIMIT {
            self.journal.pop_front();
        }
        self.journal.push_back((caller.clone(), call));
        let faulted = self.faults.iter().any(|fault| {
            fault.call == call
                && match (&fault.target, target) {
                    (None, _) => true,
                    (Some(expected), Some(actual)) => expected == actual,
                    (Some(_), None) => false,
                }
        });
        if faulted {
            return Err(ServiceError::Transport(format!(
                "injected failure for {}",
                call
            )));
        }
        Ok(())
    }

    fn posts_of(&self, user: &Principal) -> Vec<Post> {
        self.user_posts
            .get(user)
            .map(|ids| ids.iter().filter_map(|id| self.posts.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    fn adjust_posts_count(&mut self, user: &Principal, delta: i32) {
        if let Some(profile) = self.users.get_mut(user) {
            profile.posts_count = apply_delta(profile.posts_count, delta);
        }
    }
}

fn apply_delta(count: u32, delta: i32) -> u32 {
    if delta >= 0 {
        count.saturating_add(delta as u32)
    } else {
        count.saturating_sub(delta.unsigned_abs())
    }
}

/// Shared backend state; hand out one [`InMemoryService`] per caller.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<BackendState>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client bound to `caller`, without call tracing.
    pub fn client(&self, caller: Principal) -> InMemoryService {
        InMemoryService {
            backend: self.clone(),
            caller,
        }
    }

    /// Make every `call` fail, or only those addressing `target`.
    pub async fn inject_fault(&self, call: RemoteCall, target: Option<&str>) {
        self.state.lock().await.faults.push(Fault {
            call,
            target: target.map(str::to_string),
        });
    }

    pub async fn clear_faults(&self) {
        self.state.lock().await.faults.clear();
    }

    /// Calls received so far, in order, up to the last [`JOURNAL_LIMIT`].
    pub async fn calls(&self) -> Vec<RemoteCall> {
        let state = self.state.lock().await;
        state.journal.iter().map(|(_, call)| *call).collect()
    }

    pub async fn call_count(&self, call: RemoteCall) -> usize {
        let state = self.state.lock().await;
        state.journal.iter().filter(|(_, c)| *c == call).count()
    }

    pub async fn clear_journal(&self) {
        self.state.lock().await.journal.clear();
    }

    /// Populate a few users, posts and follows for the demo shell.
    pub async fn seed_demo(&self) -> ServiceResult<Vec<Principal>> {
        let people = [
            ("ada", "Ada Lovelace", "Counting engines and poetry."),
            ("grace", "Grace Hopper", "It's easier to ask forgiveness."),
            ("alan", "Alan Turing", "Can machines think?"),
        ];

        let mut ids = Vec::new();
        for (username, name, bio) in people {
            let client = self.client(Principal::generate());
            client
                .create_profile(UpdateProfileRequest {
                    username: Some(username.to_string()),
                    name: Some(name.to_string()),
                    bio: Some(bio.to_string()),
                    ..Default::default()
                })
                .await?;
            client
                .create_post(CreatePostRequest {
                    content: format!("Hello from {}!", name),
                    media: None,
                    media_type: None,
                })
                .await?;
            ids.push(client.caller.clone());
        }

        let ada = self.client(ids[0].clone());
        ada.follow_user(&ids[1]).await?;
        self.clear_journal().await;

        tracing::info!("Seeded in-memory backend with {} demo users", ids.len());
        Ok(ids)
    }
}

impl ServiceConnector for InMemoryBackend {
    fn connect(&self, identity: &Principal) -> Arc<dyn SocialService> {
        Arc::new(TracedService::new(Arc::new(self.client(identity.clone()))))
    }
}

/// A client of [`InMemoryBackend`] bound to one caller.
#[derive(Clone)]
pub struct InMemoryService {
    backend: InMemoryBackend,
    caller: Principal,
}

#[async_trait]
impl SocialService for InMemoryService {
    fn caller(&self) -> &Principal {
        &self.caller
    }

    async fn get_current_user(&self) -> ServiceResult<Option<UserProfile>> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::GetCurrentUser, None)?;
        if self.caller.is_anonymous() {
            return Ok(None);
        }
        Ok(state.users.get(&self.caller).cloned())
    }

    async fn create_profile(&self, request: UpdateProfileRequest) -> ServiceResult<UserProfile> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::CreateProfile, None)?;
        let now = state.now();

        let short_id: String = self.caller.as_str().chars().take(8).collect();
        let profile = UserProfile {
            id: self.caller.clone(),
            username: request
                .username
                .unwrap_or_else(|| format!("user_{}", short_id)),
            name: request
                .name
                .unwrap_or_else(|| "Anonymous User".to_string()),
            bio: request.bio.unwrap_or_default(),
            profile_photo: request.profile_photo,
            cover_photo: request.cover_photo,
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            created_at: now,
        };

        state.users.insert(self.caller.clone(), profile.clone());
        Ok(profile)
    }

    async fn update_profile(&self, request: UpdateProfileRequest) -> ServiceResult<UserProfile> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::UpdateProfile, None)?;

        let profile = state
            .users
            .get_mut(&self.caller)
            .ok_or_else(|| ServiceError::Rejected("Profile not found".to_string()))?;

        if let Some(username) = request.username {
            profile.username = username;
        }
        if let Some(name) = request.name {
            profile.name = name;
        }
        if let Some(bio) = request.bio {
            profile.bio = bio;
        }
        if let Some(photo) = request.profile_photo {
            profile.profile_photo = Some(photo);
        }
        if let Some(cover) = request.cover_photo {
            profile.cover_photo = Some(cover);
        }

        Ok(profile.clone())
    }

    async fn get_profile(&self, user: &Principal) -> ServiceResult<Option<UserProfile>> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::GetProfile, Some(user.as_str()))?;
        Ok(state.users.get(user).cloned())
    }

    async fn search_users(&self, query: &str) -> ServiceResult<Vec<UserProfile>> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::SearchUsers, Some(query))?;
        let needle = query.to_lowercase();
        Ok(state
            .users
            .values()
            .filter(|user| {
                user.username.to_lowercase().contains(&needle)
                    || user.name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn get_all_users(&self) -> ServiceResult<Vec<UserProfile>> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::GetAllUsers, None)?;
        let mut users: Vec<UserProfile> = state.users.values().cloned().collect();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }

    async fn follow_user(&self, target: &Principal) -> ServiceResult<bool> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::FollowUser, Some(target.as_str()))?;
        if *target == self.caller {
            return Ok(false);
        }

        let added = state
            .following
            .entry(self.caller.clone())
            .or_default()
            .insert(target.clone());
        state
            .followers
            .entry(target.clone())
            .or_default()
            .insert(self.caller.clone());

        if added {
            if let Some(profile) = state.users.get_mut(&self.caller) {
                profile.following_count += 1;
            }
            if let Some(profile) = state.users.get_mut(target) {
                profile.followers_count += 1;
            }
        }
        Ok(true)
    }

    async fn unfollow_user(&self, target: &Principal) -> ServiceResult<bool> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::UnfollowUser, Some(target.as_str()))?;

        let removed_following = state
            .following
            .entry(self.caller.clone())
            .or_default()
            .remove(target);
        let removed_follower = state
            .followers
            .entry(target.clone())
            .or_default()
            .remove(&self.caller);

        if !(removed_following && removed_follower) {
            return Ok(false);
        }
        if let Some(profile) = state.users.get_mut(&self.caller) {
            profile.following_count = profile.following_count.saturating_sub(1);
        }
        if let Some(profile) = state.users.get_mut(target) {
            profile.followers_count = profile.followers_count.saturating_sub(1);
        }
        Ok(true)
    }

    async fn is_following(&self, target: &Principal) -> ServiceResult<bool> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::IsFollowing, Some(target.as_str()))?;
        Ok(state
            .following
            .get(&self.caller)
            .is_some_and(|set| set.contains(target)))
    }

    async fn get_followers(&self, user: &Principal) -> ServiceResult<Vec<Principal>> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::GetFollowers, Some(user.as_str()))?;
        let mut ids: Vec<Principal> = state
            .followers
            .get(user)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        Ok(ids)
    }

    async fn get_following(&self, user: &Principal) -> ServiceResult<Vec<Principal>> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::GetFollowing, Some(user.as_str()))?;
        let mut ids: Vec<Principal> = state
            .following
            .get(user)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        Ok(ids)
    }

    async fn create_post(&self, request: CreatePostRequest) -> ServiceResult<Post> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::CreatePost, None)?;
        let now = state.now();

        let post = Post {
            id: format!("post_{}", uuid::Uuid::now_v7().simple()),
            author: self.caller.clone(),
            content: request.content,
            media: request.media,
            media_type: request.media_type,
            likes_count: 0,
            comments_count: 0,
            shares_count: 0,
            created_at: now,
            updated_at: now,
        };

        state.posts.insert(post.id.clone(), post.clone());
        state
            .user_posts
            .entry(self.caller.clone())
            .or_default()
            .push(post.id.clone());
        state.adjust_posts_count(&self.caller, 1);

        Ok(post)
    }

    async fn get_post(&self, post_id: &str) -> ServiceResult<Option<Post>> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::GetPost, Some(post_id))?;
        Ok(state.posts.get(post_id).cloned())
    }

    async fn get_user_posts(&self, user: &Principal) -> ServiceResult<Vec<Post>> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::GetUserPosts, Some(user.as_str()))?;
        Ok(state.posts_of(user))
    }

    async fn get_feed(&self) -> ServiceResult<Vec<Post>> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::GetFeed, None)?;

        let mut feed = state.posts_of(&self.caller);
        let followed: Vec<Principal> = state
            .following
            .get(&self.caller)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        for user in &followed {
            feed.extend(state.posts_of(user));
        }

        feed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(feed)
    }

    async fn delete_post(&self, post_id: &str) -> ServiceResult<bool> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::DeletePost, Some(post_id))?;

        match state.posts.get(post_id) {
            Some(post) if post.author == self.caller => {}
            _ => return Ok(false),
        }

        state.posts.remove(post_id);
        if let Some(ids) = state.user_posts.get_mut(&self.caller) {
            ids.retain(|id| id != post_id);
        }
        state.adjust_posts_count(&self.caller, -1);
        Ok(true)
    }

    async fn like_post(&self, post_id: &str) -> ServiceResult<bool> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::LikePost, Some(post_id))?;

        let liked = state
            .post_likes
            .entry(post_id.to_string())
            .or_default()
            .insert(self.caller.clone());
        if liked {
            if let Some(post) = state.posts.get_mut(post_id) {
                post.likes_count += 1;
            }
        }
        Ok(liked)
    }

    async fn unlike_post(&self, post_id: &str) -> ServiceResult<bool> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::UnlikePost, Some(post_id))?;

        let unliked = state
            .post_likes
            .entry(post_id.to_string())
            .or_default()
            .remove(&self.caller);
        if unliked {
            if let Some(post) = state.posts.get_mut(post_id) {
                post.likes_count = post.likes_count.saturating_sub(1);
            }
        }
        Ok(unliked)
    }

    async fn is_post_liked(&self, post_id: &str) -> ServiceResult<bool> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::IsPostLiked, Some(post_id))?;
        Ok(state
            .post_likes
            .get(post_id)
            .is_some_and(|set| set.contains(&self.caller)))
    }

    async fn share_post(&self, post_id: &str) -> ServiceResult<Post> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::SharePost, Some(post_id))?;

        let original = state
            .posts
            .get(post_id)
            .cloned()
            .ok_or_else(|| ServiceError::Rejected("Original post not found".to_string()))?;
        let now = state.now();

        let shared = Post {
            id: format!("shared_post_{}", uuid::Uuid::now_v7().simple()),
            author: self.caller.clone(),
            content: format!("Shared: {}", original.content),
            media: original.media,
            media_type: original.media_type,
            likes_count: 0,
            comments_count: 0,
            shares_count: 0,
            created_at: now,
            updated_at: now,
        };

        state.posts.insert(shared.id.clone(), shared.clone());
        state
            .user_posts
            .entry(self.caller.clone())
            .or_default()
            .push(shared.id.clone());
        if let Some(post) = state.posts.get_mut(post_id) {
            post.shares_count += 1;
        }
        state.adjust_posts_count(&self.caller, 1);

        Ok(shared)
    }

    async fn create_comment(&self, request: CreateCommentRequest) -> ServiceResult<Comment> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::CreateComment, Some(request.post_id.as_str()))?;
        let now = state.now();

        let comment = Comment {
            id: format!("comment_{}", uuid::Uuid::now_v7().simple()),
            post_id: request.post_id.clone(),
            author: self.caller.clone(),
            content: request.content,
            likes_count: 0,
            created_at: now,
        };

        state.comments.insert(comment.id.clone(), comment.clone());
        state
            .post_comments
            .entry(request.post_id.clone())
            .or_default()
            .push(comment.id.clone());
        if let Some(post) = state.posts.get_mut(&request.post_id) {
            post.comments_count += 1;
        }

        Ok(comment)
    }

    async fn get_post_comments(&self, post_id: &str) -> ServiceResult<Vec<Comment>> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::GetPostComments, Some(post_id))?;
        Ok(state
            .post_comments
            .get(post_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.comments.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn like_comment(&self, comment_id: &str) -> ServiceResult<bool> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::LikeComment, Some(comment_id))?;

        let liked = state
            .comment_likes
            .entry(comment_id.to_string())
            .or_default()
            .insert(self.caller.clone());
        if liked {
            if let Some(comment) = state.comments.get_mut(comment_id) {
                comment.likes_count += 1;
            }
        }
        Ok(liked)
    }

    async fn unlike_comment(&self, comment_id: &str) -> ServiceResult<bool> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::UnlikeComment, Some(comment_id))?;

        let unliked = state
            .comment_likes
            .entry(comment_id.to_string())
            .or_default()
            .remove(&self.caller);
        if unliked {
            if let Some(comment) = state.comments.get_mut(comment_id) {
                comment.likes_count = comment.likes_count.saturating_sub(1);
            }
        }
        Ok(unliked)
    }

    async fn delete_comment(&self, comment_id: &str) -> ServiceResult<bool> {
        let mut state = self.backend.state.lock().await;
        state.enter(&self.caller, RemoteCall::DeleteComment, Some(comment_id))?;

        let post_id = match state.comments.get(comment_id) {
            Some(comment) if comment.author == self.caller => comment.post_id.clone(),
            _ => return Ok(false),
        };

        state.comments.remove(comment_id);
        if let Some(ids) = state.post_comments.get_mut(&post_id) {
            ids.retain(|id| id != comment_id);
        }
        if let Some(post) = state.posts.get_mut(&post_id) {
            post.comments_count = post.comments_count.saturating_sub(1);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_request(name: &str) -> UpdateProfileRequest {
        UpdateProfileRequest {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn text_post(content: &str) -> CreatePostRequest {
        CreatePostRequest {
            content: content.to_string(),
            media: None,
            media_type: None,
        }
    }

    #[tokio::test]
    async fn create_profile_fills_defaults_for_absent_fields() {
        let backend = InMemoryBackend::new();
        let client = backend.client(Principal::new("abcdefghij-xyz"));

        let profile = client
            .create_profile(UpdateProfileRequest::default())
            .await
            .unwrap();

        assert_eq!(profile.username, "user_abcdefgh");
        assert_eq!(profile.name, "Anonymous User");
        assert_eq!(profile.bio, "");
        assert_eq!(profile.followers_count, 0);
        assert_eq!(profile.posts_count, 0);
    }

    #[tokio::test]
    async fn anonymous_caller_has_no_current_user() {
        let backend = InMemoryBackend::new();
        let client = backend.client(Principal::anonymous());
        client.create_profile(profile_request("x")).await.unwrap();
        assert_eq!(client.get_current_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_without_profile_is_rejected() {
        let backend = InMemoryBackend::new();
        let client = backend.client(Principal::generate());
        let err = client
            .update_profile(profile_request("x"))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Rejected("Profile not found".to_string()));
    }

    #[tokio::test]
    async fn feed_contains_own_and_followed_posts_newest_first() {
        let backend = InMemoryBackend::new();
        let me = backend.client(Principal::generate());
        let friend = backend.client(Principal::generate());
        let stranger = backend.client(Principal::generate());
        for client in [&me, &friend, &stranger] {
            client.create_profile(profile_request("x")).await.unwrap();
        }

        me.create_post(text_post("mine")).await.unwrap();
        friend.create_post(text_post("friend's")).await.unwrap();
        stranger.create_post(text_post("stranger's")).await.unwrap();
        me.follow_user(friend.caller()).await.unwrap();

        let feed = me.get_feed().await.unwrap();
        let contents: Vec<&str> = feed.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, vec!["friend's", "mine"]);
    }

    #[tokio::test]
    async fn only_the_author_can_delete_a_post() {
        let backend = InMemoryBackend::new();
        let author = backend.client(Principal::generate());
        let other = backend.client(Principal::generate());
        author.create_profile(profile_request("a")).await.unwrap();

        let post = author.create_post(text_post("hi")).await.unwrap();
        assert!(!other.delete_post(&post.id).await.unwrap());
        assert!(author.delete_post(&post.id).await.unwrap());

        let profile = author.get_current_user().await.unwrap().unwrap();
        assert_eq!(profile.posts_count, 0);
    }

    #[tokio::test]
    async fn follow_counts_are_maintained_once() {
        let backend = InMemoryBackend::new();
        let a = backend.client(Principal::generate());
        let b = backend.client(Principal::generate());
        a.create_profile(profile_request("a")).await.unwrap();
        b.create_profile(profile_request("b")).await.unwrap();

        assert!(a.follow_user(b.caller()).await.unwrap());
        assert!(a.follow_user(b.caller()).await.unwrap());
        let target = a.get_profile(b.caller()).await.unwrap().unwrap();
        assert_eq!(target.followers_count, 1);

        assert!(a.unfollow_user(b.caller()).await.unwrap());
        assert!(!a.unfollow_user(b.caller()).await.unwrap());
        let target = a.get_profile(b.caller()).await.unwrap().unwrap();
        assert_eq!(target.followers_count, 0);
    }

    #[tokio::test]
    async fn cannot_follow_self() {
        let backend = InMemoryBackend::new();
        let a = backend.client(Principal::generate());
        assert!(!a.follow_user(&a.caller.clone()).await.unwrap());
    }

    #[tokio::test]
    async fn share_creates_a_new_post_and_counts_on_the_original() {
        let backend = InMemoryBackend::new();
        let a = backend.client(Principal::generate());
        let b = backend.client(Principal::generate());
        let original = a.create_post(text_post("news")).await.unwrap();

        let shared = b.share_post(&original.id).await.unwrap();
        assert_eq!(shared.content, "Shared: news");
        assert_eq!(shared.author, *b.caller());

        let original = a.get_post(&original.id).await.unwrap().unwrap();
        assert_eq!(original.shares_count, 1);

        let missing = b.share_post("nope").await.unwrap_err();
        assert!(matches!(missing, ServiceError::Rejected(_)));
    }

    #[tokio::test]
    async fn comments_are_listed_in_order_and_deleted_by_author_only() {
        let backend = InMemoryBackend::new();
        let a = backend.client(Principal::generate());
        let b = backend.client(Principal::generate());
        let post = a.create_post(text_post("topic")).await.unwrap();

        let first = a
            .create_comment(CreateCommentRequest {
                post_id: post.id.clone(),
                content: "first".to_string(),
            })
            .await
            .unwrap();
        b.create_comment(CreateCommentRequest {
            post_id: post.id.clone(),
            content: "second".to_string(),
        })
        .await
        .unwrap();

        let comments = a.get_post_comments(&post.id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "first");

        assert!(!b.delete_comment(&first.id).await.unwrap());
        assert!(a.delete_comment(&first.id).await.unwrap());
        let post = a.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(post.comments_count, 1);
    }

    #[tokio::test]
    async fn comment_likes_toggle_once_per_caller() {
        let backend = InMemoryBackend::new();
        let a = backend.client(Principal::generate());
        let post = a.create_post(text_post("topic")).await.unwrap();
        let comment = a
            .create_comment(CreateCommentRequest {
                post_id: post.id,
                content: "c".to_string(),
            })
            .await
            .unwrap();

        assert!(a.like_comment(&comment.id).await.unwrap());
        assert!(!a.like_comment(&comment.id).await.unwrap());
        assert!(a.unlike_comment(&comment.id).await.unwrap());
        assert!(!a.unlike_comment(&comment.id).await.unwrap());
    }

    #[tokio::test]
    async fn search_matches_name_or_username_case_insensitively() {
        let backend = InMemoryBackend::new();
        backend.seed_demo().await.unwrap();
        let client = backend.client(Principal::generate());

        let hits = client.search_users("GRACE").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "grace");
    }

    #[tokio::test]
    async fn injected_faults_target_specific_arguments() {
        let backend = InMemoryBackend::new();
        let client = backend.client(Principal::generate());
        let bad = Principal::new("bad");
        let good = Principal::new("good");
        backend
            .inject_fault(RemoteCall::GetProfile, Some(bad.as_str()))
            .await;

        assert!(client.get_profile(&bad).await.is_err());
        assert!(client.get_profile(&good).await.is_ok());
        assert_eq!(backend.call_count(RemoteCall::GetProfile).await, 2);

        backend.clear_faults().await;
        assert!(client.get_profile(&bad).await.is_ok());
    }

    #[tokio::test]
    async fn seed_demo_leaves_an_empty_journal() {
        let backend = InMemoryBackend::new();
        let ids = backend.seed_demo().await.unwrap();
        assert_eq!(ids.len(), 3);
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn journal_keeps_only_the_latest_calls() {
        let backend = InMemoryBackend::new();
        let client = backend.client(Principal::generate());
        for _ in 0..JOURNAL_LIMIT {
            client.get_feed().await.unwrap();
        }
        client.get_all_users().await.unwrap();

        let calls = backend.calls().await;
        assert_eq!(calls.len(), JOURNAL_LIMIT);
        assert_eq!(calls.last(), Some(&RemoteCall::GetAllUsers));
        assert_eq!(backend.call_count(RemoteCall::GetFeed).await, JOURNAL_LIMIT - 1);
    }
}

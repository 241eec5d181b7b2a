// Remote service contract - every backend call the client can issue
mod memory;
mod traced;
mod types;
pub mod wire;

pub use memory::{InMemoryBackend, InMemoryService, JOURNAL_LIMIT};
pub use traced::TracedService;
pub use types::*;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The backend trapped or refused the call.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The call never reached the backend or its reply was lost.
    #[error("Transport error: {0}")]
    Transport(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Whether a remote call may mutate backend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Query,
    Update,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::Query => write!(f, "query"),
            CallKind::Update => write!(f, "update"),
        }
    }
}

/// Every method exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCall {
    GetCurrentUser,
    CreateProfile,
    UpdateProfile,
    GetProfile,
    SearchUsers,
    GetAllUsers,
    FollowUser,
    UnfollowUser,
    IsFollowing,
    GetFollowers,
    GetFollowing,
    CreatePost,
    GetPost,
    GetUserPosts,
    GetFeed,
    DeletePost,
    LikePost,
    UnlikePost,
    IsPostLiked,
    SharePost,
    CreateComment,
    GetPostComments,
    LikeComment,
    UnlikeComment,
    DeleteComment,
}

impl RemoteCall {
    pub fn name(&self) -> &'static str {
        match self {
            RemoteCall::GetCurrentUser => "get_current_user",
            RemoteCall::CreateProfile => "create_profile",
            RemoteCall::UpdateProfile => "update_profile",
            RemoteCall::GetProfile => "get_profile",
            RemoteCall::SearchUsers => "search_users",
            RemoteCall::GetAllUsers => "get_all_users",
            RemoteCall::FollowUser => "follow_user",
            RemoteCall::UnfollowUser => "unfollow_user",
            RemoteCall::IsFollowing => "is_following",
            RemoteCall::GetFollowers => "get_followers",
            RemoteCall::GetFollowing => "get_following",
            RemoteCall::CreatePost => "create_post",
            RemoteCall::GetPost => "get_post",
            RemoteCall::GetUserPosts => "get_user_posts",
            RemoteCall::GetFeed => "get_feed",
            RemoteCall::DeletePost => "delete_post",
            RemoteCall::LikePost => "like_post",
            RemoteCall::UnlikePost => "unlike_post",
            RemoteCall::IsPostLiked => "is_post_liked",
            RemoteCall::SharePost => "share_post",
            RemoteCall::CreateComment => "create_comment",
            RemoteCall::GetPostComments => "get_post_comments",
            RemoteCall::LikeComment => "like_comment",
            RemoteCall::UnlikeComment => "unlike_comment",
            RemoteCall::DeleteComment => "delete_comment",
        }
    }

    pub fn kind(&self) -> CallKind {
        match self {
            RemoteCall::GetCurrentUser
            | RemoteCall::GetProfile
            | RemoteCall::SearchUsers
            | RemoteCall::GetAllUsers
            | RemoteCall::IsFollowing
            | RemoteCall::GetFollowers
            | RemoteCall::GetFollowing
            | RemoteCall::GetPost
            | RemoteCall::GetUserPosts
            | RemoteCall::GetFeed
            | RemoteCall::IsPostLiked
            | RemoteCall::GetPostComments => CallKind::Query,
            _ => CallKind::Update,
        }
    }
}

impl fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed binding to the social backend, scoped to one caller identity.
#[async_trait]
pub trait SocialService: Send + Sync {
    /// Identity every call is made as.
    fn caller(&self) -> &Principal;

    async fn get_current_user(&self) -> ServiceResult<Option<UserProfile>>;

    async fn create_profile(&self, request: UpdateProfileRequest) -> ServiceResult<UserProfile>;

    async fn update_profile(&self, request: UpdateProfileRequest) -> ServiceResult<UserProfile>;

    async fn get_profile(&self, user: &Principal) -> ServiceResult<Option<UserProfile>>;

    async fn search_users(&self, query: &str) -> ServiceResult<Vec<UserProfile>>;

    async fn get_all_users(&self) -> ServiceResult<Vec<UserProfile>>;

    async fn follow_user(&self, target: &Principal) -> ServiceResult<bool>;

    async fn unfollow_user(&self, target: &Principal) -> ServiceResult<bool>;

    async fn is_following(&self, target: &Principal) -> ServiceResult<bool>;

    async fn get_followers(&self, user: &Principal) -> ServiceResult<Vec<Principal>>;

    async fn get_following(&self, user: &Principal) -> ServiceResult<Vec<Principal>>;

    async fn create_post(&self, request: CreatePostRequest) -> ServiceResult<Post>;

    async fn get_post(&self, post_id: &str) -> ServiceResult<Option<Post>>;

    async fn get_user_posts(&self, user: &Principal) -> ServiceResult<Vec<Post>>;

    async fn get_feed(&self) -> ServiceResult<Vec<Post>>;

    async fn delete_post(&self, post_id: &str) -> ServiceResult<bool>;

    async fn like_post(&self, post_id: &str) -> ServiceResult<bool>;

    async fn unlike_post(&self, post_id: &str) -> ServiceResult<bool>;

    async fn is_post_liked(&self, post_id: &str) -> ServiceResult<bool>;

    async fn share_post(&self, post_id: &str) -> ServiceResult<Post>;

    async fn create_comment(&self, request: CreateCommentRequest) -> ServiceResult<Comment>;

    async fn get_post_comments(&self, post_id: &str) -> ServiceResult<Vec<Comment>>;

    async fn like_comment(&self, comment_id: &str) -> ServiceResult<bool>;

    async fn unlike_comment(&self, comment_id: &str) -> ServiceResult<bool>;

    async fn delete_comment(&self, comment_id: &str) -> ServiceResult<bool>;
}

/// Binds a service client to an authenticated identity.
pub trait ServiceConnector: Send + Sync {
    fn connect(&self, identity: &Principal) -> Arc<dyn SocialService>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_queries_and_mutations_are_updates() {
        assert_eq!(RemoteCall::GetFeed.kind(), CallKind::Query);
        assert_eq!(RemoteCall::IsPostLiked.kind(), CallKind::Query);
        assert_eq!(RemoteCall::GetPost.kind(), CallKind::Query);
        assert_eq!(RemoteCall::LikePost.kind(), CallKind::Update);
        assert_eq!(RemoteCall::CreateProfile.kind(), CallKind::Update);
        assert_eq!(RemoteCall::DeleteComment.kind(), CallKind::Update);
    }

    #[test]
    fn call_names_match_the_backend_methods() {
        assert_eq!(RemoteCall::GetCurrentUser.to_string(), "get_current_user");
        assert_eq!(RemoteCall::UnfollowUser.name(), "unfollow_user");
        assert_eq!(CallKind::Update.to_string(), "update");
    }
}

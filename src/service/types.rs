// Records exchanged with the social backend. Field shapes follow the service
// declarations; every optional field travels in the present/absent wrapper.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::service::wire;

/// Nanoseconds since the Unix epoch, as stamped by the backend.
pub type Timestamp = i64;

/// Opaque caller identity used to authorize and attribute actions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal(pub String);

impl Principal {
    const ANONYMOUS: &'static str = "2vxsx-fae";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity of an unauthenticated caller. It never owns a profile.
    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_string())
    }

    /// Generate a fresh self-authenticating identity in the grouped textual form.
    pub fn generate() -> Self {
        let bytes: [u8; 15] = rand::thread_rng().gen();
        let hex = hex::encode(bytes);
        let groups: Vec<&str> = hex
            .as_bytes()
            .chunks(5)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .collect();
        Self(groups.join("-"))
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == Self::ANONYMOUS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Principal,
    pub username: String,
    pub name: String,
    pub bio: String,
    #[serde(with = "wire::opt", default)]
    pub profile_photo: Option<Vec<u8>>,
    #[serde(with = "wire::opt", default)]
    pub cover_photo: Option<Vec<u8>>,
    pub followers_count: u32,
    pub following_count: u32,
    pub posts_count: u32,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author: Principal,
    pub content: String,
    #[serde(with = "wire::opt", default)]
    pub media: Option<Vec<u8>>,
    #[serde(with = "wire::opt", default)]
    pub media_type: Option<String>,
    pub likes_count: u32,
    pub comments_count: u32,
    pub shares_count: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author: Principal,
    pub content: String,
    pub likes_count: u32,
    pub created_at: Timestamp,
}

/// Profile fields for `create_profile` and `update_profile`.
///
/// On create, `None` means "no value" and the backend fills its default. On
/// update, `None` means "leave unchanged", never "clear".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(with = "wire::opt", default)]
    pub username: Option<String>,
    #[serde(with = "wire::opt", default)]
    pub name: Option<String>,
    #[serde(with = "wire::opt", default)]
    pub bio: Option<String>,
    #[serde(with = "wire::opt", default)]
    pub profile_photo: Option<Vec<u8>>,
    #[serde(with = "wire::opt", default)]
    pub cover_photo: Option<Vec<u8>>,
}

impl UpdateProfileRequest {
    /// True when no field is present.
    pub fn is_unchanged(&self) -> bool {
        self.username.is_none()
            && self.name.is_none()
            && self.bio.is_none()
            && self.profile_photo.is_none()
            && self.cover_photo.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(with = "wire::opt", default)]
    pub media: Option<Vec<u8>>,
    #[serde(with = "wire::opt", default)]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: String,
    pub content: String,
}

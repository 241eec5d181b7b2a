// Author lookups for list views: one get_profile per distinct identity,
// issued together, each failure contained to its own slot.
use futures::future::join_all;
use std::collections::{HashMap, HashSet};

use crate::service::{Principal, SocialService, UserProfile};

pub const UNKNOWN_USER: &str = "Unknown User";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorSlot {
    Known(UserProfile),
    /// The service has no profile for this identity.
    Missing,
    /// The lookup failed; retried on the next resolve.
    Failed,
}

impl AuthorSlot {
    pub fn display_name(&self) -> &str {
        match self {
            AuthorSlot::Known(profile) => &profile.name,
            AuthorSlot::Missing | AuthorSlot::Failed => UNKNOWN_USER,
        }
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            AuthorSlot::Known(profile) => Some(profile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthorDirectory {
    slots: HashMap<Principal, AuthorSlot>,
}

impl AuthorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch every identity not already resolved. Duplicates are collapsed
    /// before any call is made.
    pub async fn resolve<'a, I>(&mut self, service: &dyn SocialService, ids: I)
    where
        I: IntoIterator<Item = &'a Principal>,
    {
        let mut seen = HashSet::new();
        let pending: Vec<Principal> = ids
            .into_iter()
            .filter(|id| match self.slots.get(*id) {
                Some(AuthorSlot::Failed) | None => true,
                Some(_) => false,
            })
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect();

        if pending.is_empty() {
            return;
        }

        let lookups = pending.iter().map(|id| async move {
            let slot = match service.get_profile(id).await {
                Ok(Some(profile)) => AuthorSlot::Known(profile),
                Ok(None) => AuthorSlot::Missing,
                Err(e) => {
                    tracing::warn!("Error loading author {}: {}", id, e);
                    AuthorSlot::Failed
                }
            };
            (id.clone(), slot)
        });

        for (id, slot) in join_all(lookups).await {
            self.slots.insert(id, slot);
        }
    }

    /// Record a profile the caller already holds, e.g. the current user.
    pub fn insert(&mut self, profile: UserProfile) {
        self.slots
            .insert(profile.id.clone(), AuthorSlot::Known(profile));
    }

    pub fn get(&self, id: &Principal) -> Option<&AuthorSlot> {
        self.slots.get(id)
    }

    pub fn display_name(&self, id: &Principal) -> &str {
        self.slots
            .get(id)
            .map_or(UNKNOWN_USER, AuthorSlot::display_name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

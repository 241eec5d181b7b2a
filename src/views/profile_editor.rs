use std::path::Path;

use crate::context::AppContext;
use crate::error::{ClientError, ClientResult};
use crate::media::{MediaHandle, MediaKind, MediaLeases, MediaUpload};
use crate::service::{RemoteCall, UpdateProfileRequest, UserProfile};

use super::{rejected, write_failed};

/// Form state of the profile editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub name: String,
    pub username: String,
    pub bio: String,
    /// Newly chosen photos only; the stored ones are never re-sent.
    pub profile_photo: Option<MediaUpload>,
    pub cover_photo: Option<MediaUpload>,
}

impl ProfileDraft {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            name: profile.name.clone(),
            username: profile.username.clone(),
            bio: profile.bio.clone(),
            profile_photo: None,
            cover_photo: None,
        }
    }
}

/// Only fields that differ from `current` after trimming are sent.
pub fn build_update_request(current: &UserProfile, draft: &ProfileDraft) -> UpdateProfileRequest {
    fn changed(value: &str, current: &str) -> Option<String> {
        let value = value.trim();
        (value != current).then(|| value.to_string())
    }

    UpdateProfileRequest {
        username: changed(&draft.username, &current.username),
        name: changed(&draft.name, &current.name),
        bio: changed(&draft.bio, &current.bio),
        profile_photo: draft.profile_photo.as_ref().map(|p| p.bytes.clone()),
        cover_photo: draft.cover_photo.as_ref().map(|p| p.bytes.clone()),
    }
}

pub struct ProfileEditor {
    ctx: AppContext,
    current: UserProfile,
    draft: ProfileDraft,
    photo_preview: Option<MediaHandle>,
    cover_preview: Option<MediaHandle>,
    leases: MediaLeases,
}

impl ProfileEditor {
    /// Editor for the current user. Needs a loaded profile.
    pub fn new(ctx: &AppContext) -> ClientResult<Self> {
        let current = ctx
            .current_user
            .clone()
            .ok_or_else(|| ClientError::NotFound("current user profile".to_string()))?;
        Ok(Self {
            ctx: ctx.clone(),
            draft: ProfileDraft::from_profile(&current),
            current,
            photo_preview: None,
            cover_preview: None,
            leases: MediaLeases::new(ctx.media.clone()),
        })
    }

    pub fn current(&self) -> &UserProfile {
        &self.current
    }

    pub fn draft(&self) -> &ProfileDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut ProfileDraft {
        &mut self.draft
    }

    /// Preview of the newly chosen photo of `kind`, if any.
    pub fn preview(&self, kind: MediaKind) -> Option<&MediaHandle> {
        match kind {
            MediaKind::ProfilePhoto => self.photo_preview.as_ref(),
            MediaKind::CoverPhoto => self.cover_preview.as_ref(),
            MediaKind::PostMedia => None,
        }
    }

    /// Choose a new profile or cover photo. Photos over the limit are refused.
    pub fn choose_photo(&mut self, kind: MediaKind, bytes: Vec<u8>, mime_type: &str) -> ClientResult<()> {
        let upload = MediaUpload::new(kind, bytes, mime_type, &self.ctx.media_limits)
            .map_err(|e| rejected(&self.ctx, e))?;
        self.set_photo(upload)
    }

    pub fn choose_photo_file(&mut self, kind: MediaKind, path: &Path) -> ClientResult<()> {
        let upload = MediaUpload::from_path(kind, path, &self.ctx.media_limits)
            .map_err(|e| rejected(&self.ctx, e))?;
        self.set_photo(upload)
    }

    /// Send the changed fields. Returns the profile as stored by the service.
    pub async fn save(&mut self) -> ClientResult<UserProfile> {
        if self.draft.name.trim().is_empty() {
            return Err(rejected(&self.ctx, ClientError::validation("Name is required")));
        }

        let request = build_update_request(&self.current, &self.draft);
        if request.is_unchanged() {
            tracing::debug!("Saving profile with no changed fields");
        }

        let updated = self
            .ctx
            .service
            .update_profile(request)
            .await
            .map_err(|e| {
                write_failed(
                    &self.ctx,
                    RemoteCall::UpdateProfile,
                    e,
                    "Failed to update profile. Please try again.",
                )
            })?;

        tracing::info!("Profile {} updated", updated.id);
        self.current = updated.clone();
        self.draft = ProfileDraft::from_profile(&updated);
        self.clear_previews();
        Ok(updated)
    }

    pub fn teardown(&mut self) {
        self.clear_previews();
    }

    /// Put `upload` in its slot; the preview it replaces is released.
    fn set_photo(&mut self, upload: MediaUpload) -> ClientResult<()> {
        let (slot, preview) = match upload.kind {
            MediaKind::ProfilePhoto => (&mut self.draft.profile_photo, &mut self.photo_preview),
            MediaKind::CoverPhoto => (&mut self.draft.cover_photo, &mut self.cover_preview),
            MediaKind::PostMedia => {
                return Err(ClientError::validation("Not a profile or cover photo"));
            }
        };
        let next = self.leases.acquire(&upload.bytes, Some(&upload.mime_type));
        if let Some(previous) = preview.replace(next) {
            self.leases.release(&previous.key);
        }
        *slot = Some(upload);
        Ok(())
    }

    fn clear_previews(&mut self) {
        self.photo_preview = None;
        self.cover_preview = None;
        self.leases.release_all();
    }
}

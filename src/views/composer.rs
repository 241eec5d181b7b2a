use std::path::Path;

use crate::context::AppContext;
use crate::error::{ClientError, ClientResult};
use crate::media::{MediaHandle, MediaKind, MediaLeases, MediaUpload};
use crate::service::{CreatePostRequest, Post, RemoteCall};

use super::{rejected, write_failed};

/// Draft of a new post with an optional attachment.
pub struct Composer {
    ctx: AppContext,
    content: String,
    attachment: Option<MediaUpload>,
    preview: Option<MediaHandle>,
    leases: MediaLeases,
}

impl Composer {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            ctx: ctx.clone(),
            content: String::new(),
            attachment: None,
            preview: None,
            leases: MediaLeases::new(ctx.media.clone()),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn attachment(&self) -> Option<&MediaUpload> {
        self.attachment.as_ref()
    }

    pub fn preview(&self) -> Option<&MediaHandle> {
        self.preview.as_ref()
    }

    /// Attach raw bytes. Oversized media is refused here, so no upload is
    /// ever attempted for it.
    pub fn attach(&mut self, bytes: Vec<u8>, mime_type: &str) -> ClientResult<()> {
        let upload = MediaUpload::new(MediaKind::PostMedia, bytes, mime_type, &self.ctx.media_limits)
            .map_err(|e| rejected(&self.ctx, e))?;
        self.set_attachment(upload);
        Ok(())
    }

    /// Attach a file; the size is checked before it is read.
    pub fn attach_file(&mut self, path: &Path) -> ClientResult<()> {
        let upload = MediaUpload::from_path(MediaKind::PostMedia, path, &self.ctx.media_limits)
            .map_err(|e| rejected(&self.ctx, e))?;
        self.set_attachment(upload);
        Ok(())
    }

    pub fn clear_attachment(&mut self) {
        self.attachment = None;
        self.preview = None;
        self.leases.release_all();
    }

    pub async fn submit(&mut self) -> ClientResult<Post> {
        let content = self.content.trim();
        if content.is_empty() && self.attachment.is_none() {
            return Err(rejected(
                &self.ctx,
                ClientError::validation("Please add some content or media to your post"),
            ));
        }

        let request = CreatePostRequest {
            content: content.to_string(),
            media: self.attachment.as_ref().map(|a| a.bytes.clone()),
            media_type: self.attachment.as_ref().map(|a| a.mime_type.clone()),
        };
        let post = self.ctx.service.create_post(request).await.map_err(|e| {
            write_failed(
                &self.ctx,
                RemoteCall::CreatePost,
                e,
                "Failed to create post. Please try again.",
            )
        })?;

        tracing::info!("Created post {}", post.id);
        self.content.clear();
        self.clear_attachment();
        Ok(post)
    }

    pub fn teardown(&mut self) {
        self.clear_attachment();
    }

    fn set_attachment(&mut self, upload: MediaUpload) {
        self.leases.release_all();
        self.preview = Some(self.leases.acquire(&upload.bytes, Some(&upload.mime_type)));
        self.attachment = Some(upload);
    }
}

use crate::authors::AuthorDirectory;
use crate::context::AppContext;
use crate::error::{ClientError, ClientResult};
use crate::service::{Comment, CreateCommentRequest, RemoteCall};

use super::{rejected, write_failed};

/// Comments of one post, oldest first.
pub struct CommentThread {
    ctx: AppContext,
    post_id: String,
    comments: Vec<Comment>,
    authors: AuthorDirectory,
}

impl CommentThread {
    pub fn new(ctx: &AppContext, post_id: impl Into<String>) -> Self {
        Self {
            ctx: ctx.clone(),
            post_id: post_id.into(),
            comments: Vec::new(),
            authors: AuthorDirectory::new(),
        }
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn authors(&self) -> &AuthorDirectory {
        &self.authors
    }

    pub fn author_name(&self, comment: &Comment) -> &str {
        self.authors.display_name(&comment.author)
    }

    /// Only the author of a comment may delete it.
    pub fn can_delete(&self, comment: &Comment) -> bool {
        self.ctx.is_viewer(&comment.author)
    }

    pub async fn load(&mut self) {
        let service = self.ctx.service.clone();
        match service.get_post_comments(&self.post_id).await {
            Ok(comments) => self.comments = comments,
            Err(e) => {
                tracing::warn!("Error loading comments for {}: {}", self.post_id, e);
                self.comments.clear();
            }
        }
        self.authors
            .resolve(service.as_ref(), self.comments.iter().map(|c| &c.author))
            .await;
    }

    /// Post a comment. Blank input is ignored without a remote call.
    pub async fn submit(&mut self, text: &str) -> ClientResult<Option<Comment>> {
        let content = text.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let service = self.ctx.service.clone();
        let request = CreateCommentRequest {
            post_id: self.post_id.clone(),
            content: content.to_string(),
        };
        let comment = service.create_comment(request).await.map_err(|e| {
            write_failed(
                &self.ctx,
                RemoteCall::CreateComment,
                e,
                "Failed to post comment. Please try again.",
            )
        })?;

        self.comments.push(comment.clone());
        self.authors
            .resolve(service.as_ref(), [&comment.author])
            .await;
        Ok(Some(comment))
    }

    pub async fn delete(&mut self, comment_id: &str) -> ClientResult<()> {
        let Some(comment) = self.comments.iter().find(|c| c.id == comment_id) else {
            return Err(ClientError::NotFound(comment_id.to_string()));
        };
        if !self.can_delete(comment) {
            return Err(rejected(&self.ctx, ClientError::NotOwner));
        }

        let removed = self
            .ctx
            .service
            .delete_comment(comment_id)
            .await
            .map_err(|e| {
                write_failed(
                    &self.ctx,
                    RemoteCall::DeleteComment,
                    e,
                    "Failed to delete comment",
                )
            })?;
        if !removed {
            tracing::error!("delete_comment {} was not applied", comment_id);
            self.ctx.notices.error("Failed to delete comment");
            return Err(ClientError::NotApplied {
                call: RemoteCall::DeleteComment,
            });
        }

        self.comments.retain(|c| c.id != comment_id);
        Ok(())
    }
}

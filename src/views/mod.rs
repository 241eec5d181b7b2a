// View controllers. Each one owns the state it fetched, issues its own
// remote calls and patches that state only after a write settles.
mod comments;
mod composer;
mod discovery;
mod feed;
mod post_list;
mod profile;
mod profile_editor;

pub use comments::CommentThread;
pub use composer::Composer;
pub use discovery::Discovery;
pub use feed::Feed;
pub use post_list::{PostAction, PostCard, PostList};
pub use profile::ProfileView;
pub use profile_editor::{build_update_request, ProfileDraft, ProfileEditor};

use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use crate::context::AppContext;
use crate::error::ClientError;
use crate::service::{RemoteCall, ServiceError, ServiceResult, Timestamp};

/// Run one boolean lookup per key concurrently. A failed lookup is logged
/// and reads as `false`.
pub(crate) async fn fetch_flags<K, F, Fut>(
    keys: Vec<K>,
    call: RemoteCall,
    lookup: F,
) -> HashMap<K, bool>
where
    K: Eq + Hash + Clone + std::fmt::Display,
    F: Fn(K) -> Fut,
    Fut: Future<Output = ServiceResult<bool>>,
{
    let lookups = keys.into_iter().map(|key| {
        let pending = lookup(key.clone());
        async move {
            let flag = match pending.await {
                Ok(flag) => flag,
                Err(e) => {
                    tracing::warn!("{} for {} failed: {}", call, key, e);
                    false
                }
            };
            (key, flag)
        }
    });
    join_all(lookups).await.into_iter().collect()
}

/// A remote write failed: log it, tell the user, hand the error back.
pub(crate) fn write_failed(
    ctx: &AppContext,
    call: RemoteCall,
    source: ServiceError,
    message: &str,
) -> ClientError {
    tracing::error!("{} failed: {}", call, source);
    ctx.notices.error(message);
    ClientError::remote(call, source)
}

/// A local check failed before any remote call.
pub(crate) fn rejected(ctx: &AppContext, err: ClientError) -> ClientError {
    tracing::debug!("Rejected locally: {}", err);
    ctx.notices.error(err.to_string());
    err
}

fn to_datetime(timestamp: Timestamp) -> DateTime<Utc> {
    Utc.timestamp_nanos(timestamp)
}

/// Age of a nanosecond timestamp as shown next to posts and comments.
pub fn format_relative(timestamp: Timestamp, now: DateTime<Utc>) -> String {
    let then = to_datetime(timestamp);
    let elapsed = now.signed_duration_since(then);

    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{}m", minutes);
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{}h", hours);
    }
    let days = elapsed.num_days();
    if days < 7 {
        return format!("{}d", days);
    }
    format_date(timestamp)
}

/// Calendar date of a nanosecond timestamp, e.g. for "joined" lines.
pub fn format_date(timestamp: Timestamp) -> String {
    to_datetime(timestamp).format("%Y-%m-%d").to_string()
}

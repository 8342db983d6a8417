//! Flash notices: short-lived, caller-scoped messages queued for
//! display on the next rendered response. Backed by the notice cache in
//! [`AppState`](crate::schemas::AppState), keyed by session token.

use moka::future::Cache;

/// Queue a notice for the session identified by `token`.
pub async fn push(notices: &Cache<String, Vec<String>>, token: &str, message: impl Into<String>) {
    let mut queue = notices.get(token).await.unwrap_or_default();
    queue.push(message.into());
    notices.insert(token.to_string(), queue).await;
}

/// Take and clear all pending notices for the session identified by
/// `token`. A drained notice is gone; the next drain returns nothing.
pub async fn drain(notices: &Cache<String, Vec<String>>, token: &str) -> Vec<String> {
    let queue = notices.get(token).await.unwrap_or_default();
    notices.invalidate(token).await;
    queue
}

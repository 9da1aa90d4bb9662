//! Notification history: REST calls against the server-side store plus the
//! local cache mirror.
//!
//! The cache is synchronized on demand only — a task-status event arriving
//! on the live stream does not appear here until the next fetch. Mutations
//! never update the cache optimistically; the local record changes only
//! after the server confirms. None of these operations return errors to the
//! caller: failures are logged, emitted as `error` events, and leave the
//! cache at its last-known-good state.

use tracing::{debug, info, warn};

use taskwire_protocol::{
    ApiEnvelope, HistoryData, NotificationRecord, NotificationStatus, UnreadCountData,
};

use crate::client::Shared;
use crate::error::ClientError;
use crate::observers::ClientEvent;

/// Query parameters for a history page.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub skip: usize,
    pub limit: usize,
    pub unread_only: bool,
    /// Filter by record status (pending/sent/read/failed)
    pub status: Option<String>,
    /// Filter by task type
    pub task_type: Option<String>,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 20,
            unread_only: false,
            status: None,
            task_type: None,
        }
    }
}

/// Local mirror of the server-side notification store.
#[derive(Default)]
pub(crate) struct HistoryCache {
    pub(crate) records: Vec<NotificationRecord>,
    pub(crate) unread: u64,
}

impl Shared {
    /// Replace the cache wholesale with one page and recompute the unread
    /// count from it.
    pub(crate) async fn fetch_history(&self, token: &str, query: HistoryQuery) {
        match self.request_history(token, &query).await {
            Ok(records) => {
                let snapshot = {
                    let mut cache = self.cache.lock();
                    cache.records = records;
                    cache.unread = cache
                        .records
                        .iter()
                        .filter(|r| !r.status.is_read())
                        .count() as u64;
                    cache.records.clone()
                };
                info!("loaded {} notification(s) from history", snapshot.len());
                self.observers.emit(&ClientEvent::HistoryLoaded(snapshot));
            }
            Err(e) => self.report(e, "failed to load notification history"),
        }
    }

    async fn request_history(
        &self,
        token: &str,
        query: &HistoryQuery,
    ) -> Result<Vec<NotificationRecord>, ClientError> {
        let mut params = vec![
            ("skip", query.skip.to_string()),
            ("limit", query.limit.to_string()),
            ("unread_only", query.unread_only.to_string()),
        ];
        if let Some(status) = &query.status {
            params.push(("status", status.clone()));
        }
        if let Some(task_type) = &query.task_type {
            params.push(("task_type", task_type.clone()));
        }

        let envelope: ApiEnvelope<HistoryData> = self
            .http
            .get(self.config.rest_url("/notifications"))
            .bearer_auth(token)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !envelope.is_success() {
            return Err(ClientError::Api {
                code: envelope.code,
                message: envelope.message.unwrap_or_default(),
            });
        }
        Ok(envelope.data.map(|d| d.notifications).unwrap_or_default())
    }

    /// Mark one record read. Mutates the cache only on confirmed success;
    /// the unread counter decrement is floored at zero.
    pub(crate) async fn mark_read(&self, id: i64, token: &str) {
        let url = self.config.rest_url(&format!("/notifications/{id}/read"));
        match self.put_ok(&url, token).await {
            Ok(()) => {
                let snapshot = {
                    let mut cache = self.cache.lock();
                    match cache.records.iter_mut().find(|r| r.id == id) {
                        Some(record) => {
                            record.status = NotificationStatus::Read;
                            cache.unread = cache.unread.saturating_sub(1);
                            Some(cache.records.clone())
                        }
                        None => None,
                    }
                };
                debug!("notification {id} marked read");
                if let Some(records) = snapshot {
                    self.observers
                        .emit(&ClientEvent::NotificationsUpdated(records));
                }
            }
            Err(e) => self.report(e, "failed to mark notification read"),
        }
    }

    /// Mark every cached record read and zero the counter, on confirmed
    /// success.
    pub(crate) async fn mark_all_read(&self, token: &str) {
        let url = self.config.rest_url("/notifications/read-all");
        match self.put_ok(&url, token).await {
            Ok(()) => {
                let snapshot = {
                    let mut cache = self.cache.lock();
                    for record in &mut cache.records {
                        record.status = NotificationStatus::Read;
                    }
                    cache.unread = 0;
                    cache.records.clone()
                };
                debug!("all notifications marked read");
                self.observers
                    .emit(&ClientEvent::NotificationsUpdated(snapshot));
            }
            Err(e) => self.report(e, "failed to mark all notifications read"),
        }
    }

    /// Remove one record from the cache on confirmed success. The unread
    /// counter is left alone — deletion is not a read.
    pub(crate) async fn delete_notification(&self, id: i64, token: &str) {
        let url = self.config.rest_url(&format!("/notifications/{id}"));
        let result = async {
            self.http
                .delete(&url)
                .bearer_auth(token)
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, ClientError>(())
        }
        .await;

        match result {
            Ok(()) => {
                let snapshot = {
                    let mut cache = self.cache.lock();
                    cache.records.retain(|r| r.id != id);
                    cache.records.clone()
                };
                debug!("notification {id} deleted");
                self.observers
                    .emit(&ClientEvent::NotificationsUpdated(snapshot));
            }
            Err(e) => self.report(e, "failed to delete notification"),
        }
    }

    /// Fetch the authoritative unread count and overwrite the local counter
    /// with it. Returns 0 on any failure, leaving the counter untouched.
    pub(crate) async fn fetch_unread_count(&self, token: &str) -> u64 {
        let result = async {
            let envelope: ApiEnvelope<UnreadCountData> = self
                .http
                .get(self.config.rest_url("/notifications/unread-count"))
                .bearer_auth(token)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            if !envelope.is_success() {
                return Err(ClientError::Api {
                    code: envelope.code,
                    message: envelope.message.unwrap_or_default(),
                });
            }
            Ok(envelope.data.map(|d| d.unread_count).unwrap_or(0))
        }
        .await;

        match result {
            Ok(count) => {
                self.cache.lock().unread = count;
                self.observers.emit(&ClientEvent::UnreadCount(count));
                count
            }
            Err(e) => {
                self.report(e, "failed to fetch unread count");
                0
            }
        }
    }

    async fn put_ok(&self, url: &str, token: &str) -> Result<(), ClientError> {
        self.http
            .put(url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn report(&self, error: ClientError, context: &str) {
        warn!("{context}: {error}");
        self.observers
            .emit(&ClientEvent::Error(error.to_string()));
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-team batched delivery with retry, backoff, and auth suspension.
//!
//! Each team has an independent FIFO queue. A queue flushes when it
//! reaches the batch size or when the batch timer fires, whichever comes
//! first. Failed batches are requeued at the head and retried with
//! exponential backoff; HTTP 401 suspends the team until explicitly
//! unsuspended. Events are tagged with their source journal path so the
//! supervisor can tell when a path's bytes are fully acknowledged.

use crate::client::{ApiError, IngestTransport};
use ovl_core::{Event, TracerConfig};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Delivery tuning. Defaults match the tracer config defaults.
#[derive(Debug, Clone)]
pub struct SenderParams {
    pub batch_interval: Duration,
    pub max_batch_size: usize,
    pub max_queue_size: usize,
    pub max_retries: u32,
    pub max_retry_delay: Duration,
}

impl Default for SenderParams {
    fn default() -> Self {
        Self {
            batch_interval: Duration::from_millis(2000),
            max_batch_size: 50,
            max_queue_size: 500,
            max_retries: 5,
            max_retry_delay: Duration::from_secs(60),
        }
    }
}

impl SenderParams {
    pub fn from_tracer(config: &TracerConfig) -> Self {
        Self {
            batch_interval: Duration::from_millis(config.batch_interval_ms),
            max_batch_size: config.effective_batch_size(),
            ..Self::default()
        }
    }
}

/// Credentials used when flushing a team's queue.
#[derive(Debug, Clone)]
pub struct TeamAuth {
    pub token: String,
    pub user_id: String,
}

/// Out-of-band reports from the sender to the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderNotice {
    /// A batch was acknowledged.
    Sent { team_url: String, processed: u64 },
    /// The team rejected our token; its queue is now suspended.
    AuthFailure { team_url: String },
}

#[derive(Debug)]
struct QueueEntry {
    event: Event,
    source: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct TeamQueue {
    token: String,
    user_id: String,
    events: VecDeque<QueueEntry>,
    /// Batch currently being POSTed. Still "pending" for durability.
    inflight: Vec<QueueEntry>,
    suspended: bool,
    /// Reentrancy guard: a flush is on the wire.
    flushing: bool,
    flush_scheduled: bool,
    retry_pending: bool,
    retry_count: u32,
    /// Bumped to cancel outstanding timers (suspend, success, rebuild).
    epoch: u64,
}

impl TeamQueue {
    fn clear(&mut self) {
        self.events.clear();
        self.inflight.clear();
        self.flushing = false;
        self.flush_scheduled = false;
        self.retry_pending = false;
        self.retry_count = 0;
        self.epoch += 1;
    }
}

struct Inner<T> {
    transport: T,
    params: SenderParams,
    queues: Mutex<HashMap<String, TeamQueue>>,
    notice_tx: mpsc::UnboundedSender<SenderNotice>,
}

/// Batched event sender, generic over the wire seam.
pub struct Sender<T: IngestTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: IngestTransport> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: IngestTransport> Sender<T> {
    pub fn new(
        transport: T,
        params: SenderParams,
    ) -> (Self, mpsc::UnboundedReceiver<SenderNotice>) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let sender = Self {
            inner: Arc::new(Inner {
                transport,
                params,
                queues: Mutex::new(HashMap::new()),
                notice_tx,
            }),
        };
        (sender, notice_rx)
    }

    /// Enqueue one event for a team.
    ///
    /// Suspended teams drop silently; a full queue drops the incoming
    /// (newest) event. Reaching the batch size triggers an immediate flush
    /// unless one is already on the wire or a retry is pending.
    pub fn add(&self, team_url: &str, auth: &TeamAuth, event: Event, source: Option<&Path>) {
        let params = &self.inner.params;
        let mut queues = self.inner.queues.lock();
        let queue = queues.entry(team_url.to_string()).or_default();
        queue.token = auth.token.clone();
        queue.user_id = auth.user_id.clone();

        if queue.suspended {
            return;
        }
        if queue.events.len() >= params.max_queue_size {
            debug!(team_url, "sender queue full, dropping event");
            return;
        }
        queue.events.push_back(QueueEntry {
            event,
            source: source.map(Path::to_path_buf),
        });

        if queue.retry_pending {
            // Backoff owns the schedule; filling further must not flush.
            return;
        }
        if queue.events.len() >= params.max_batch_size && !queue.flushing {
            let sender = self.clone();
            let team = team_url.to_string();
            drop(queues);
            tokio::spawn(async move {
                sender.run_flush(&team, false).await;
            });
        } else if !queue.flush_scheduled {
            queue.flush_scheduled = true;
            let epoch = queue.epoch;
            let sender = self.clone();
            let team = team_url.to_string();
            let interval = params.batch_interval;
            drop(queues);
            tokio::spawn(async move {
                tokio::time::sleep(interval).await;
                sender.timer_flush(&team, epoch).await;
            });
        }
    }

    /// Flush one batch now, if the queue is idle.
    pub async fn flush(&self, team_url: &str) {
        self.run_flush(team_url, false).await;
    }

    /// Drain every team's queue in parallel, bounded by `timeout`.
    pub async fn flush_all(&self, timeout: Duration) {
        let teams = self.team_urls();
        let drain_all = async {
            let mut set = tokio::task::JoinSet::new();
            for team in teams {
                let sender = self.clone();
                set.spawn(async move { sender.drain_team(&team).await });
            }
            while set.join_next().await.is_some() {}
        };
        if tokio::time::timeout(timeout, drain_all).await.is_err() {
            warn!("sender drain timed out with events still queued");
        }
    }

    /// Suspend a team: clear all pending state and drop future adds.
    pub fn suspend(&self, team_url: &str) {
        let mut queues = self.inner.queues.lock();
        let queue = queues.entry(team_url.to_string()).or_default();
        queue.suspended = true;
        queue.clear();
    }

    pub fn unsuspend(&self, team_url: &str) {
        let mut queues = self.inner.queues.lock();
        if let Some(queue) = queues.get_mut(team_url) {
            queue.suspended = false;
            queue.retry_count = 0;
        }
    }

    pub fn is_suspended(&self, team_url: &str) -> bool {
        self.inner
            .queues
            .lock()
            .get(team_url)
            .is_some_and(|q| q.suspended)
    }

    /// Whether any queue still holds events derived from this journal file.
    ///
    /// The state store may only advance a path's durable offset once this
    /// returns false for it.
    pub fn has_pending_for(&self, source: &Path) -> bool {
        let queues = self.inner.queues.lock();
        queues.values().any(|q| {
            q.events
                .iter()
                .chain(q.inflight.iter())
                .any(|e| e.source.as_deref() == Some(source))
        })
    }

    pub fn pending_count(&self, team_url: &str) -> usize {
        self.inner
            .queues
            .lock()
            .get(team_url)
            .map(|q| q.events.len() + q.inflight.len())
            .unwrap_or(0)
    }

    pub fn team_urls(&self) -> Vec<String> {
        self.inner.queues.lock().keys().cloned().collect()
    }

    /// Tear down all queues (used when the sender is replaced on reload).
    pub fn shutdown(&self) {
        let mut queues = self.inner.queues.lock();
        for queue in queues.values_mut() {
            queue.clear();
            queue.suspended = true;
        }
    }

    async fn timer_flush(&self, team_url: &str, epoch: u64) {
        {
            let mut queues = self.inner.queues.lock();
            let Some(queue) = queues.get_mut(team_url) else {
                return;
            };
            if queue.epoch != epoch {
                return;
            }
            queue.flush_scheduled = false;
        }
        self.run_flush(team_url, false).await;
    }

    async fn retry_flush(&self, team_url: &str, epoch: u64) {
        {
            let mut queues = self.inner.queues.lock();
            let Some(queue) = queues.get_mut(team_url) else {
                return;
            };
            if queue.epoch != epoch || queue.suspended {
                return;
            }
            queue.retry_pending = false;
        }
        self.run_flush(team_url, false).await;
    }

    /// Pop and send one batch. Returns true iff a batch was acknowledged.
    ///
    /// `force` lets the shutdown drain push through a pending retry.
    ///
    /// Boxed to break the recursive opaque-future cycle with `timer_flush`/
    /// `retry_flush`, which themselves await this method.
    fn run_flush<'a>(
        &'a self,
        team_url: &'a str,
        force: bool,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
        let params = &self.inner.params;
        let (wire_batch, token) = {
            let mut queues = self.inner.queues.lock();
            let Some(queue) = queues.get_mut(team_url) else {
                return false;
            };
            if queue.flushing || queue.suspended || (queue.retry_pending && !force) {
                return false;
            }
            if queue.events.is_empty() {
                return false;
            }
            let take = queue.events.len().min(params.max_batch_size);
            queue.inflight = queue.events.drain(..take).collect();
            queue.flushing = true;

            let user_id = queue.user_id.clone();
            let wire_batch: Vec<Event> = queue
                .inflight
                .iter()
                .map(|entry| {
                    let mut event = entry.event.clone();
                    event.user_id = Some(user_id.clone());
                    event.redact();
                    event
                })
                .collect();
            (wire_batch, queue.token.clone())
        };

        let result = self
            .inner
            .transport
            .ingest(team_url, &token, &wire_batch)
            .await;

        let mut queues = self.inner.queues.lock();
        let Some(queue) = queues.get_mut(team_url) else {
            return false;
        };
        match result {
            Ok(report) => {
                if !report.errors.is_empty() {
                    warn!(
                        team_url,
                        errors = report.errors.len(),
                        "ingest reported partial errors (not retried)"
                    );
                }
                queue.inflight.clear();
                queue.flushing = false;
                queue.flush_scheduled = false;
                queue.retry_pending = false;
                queue.retry_count = 0;
                queue.epoch += 1;
                let _ = self.inner.notice_tx.send(SenderNotice::Sent {
                    team_url: team_url.to_string(),
                    processed: report.processed,
                });
                if !queue.events.is_empty() && !queue.flush_scheduled {
                    queue.flush_scheduled = true;
                    let epoch = queue.epoch;
                    let sender = self.clone();
                    let team = team_url.to_string();
                    let interval = if queue.events.len() >= params.max_batch_size {
                        Duration::ZERO
                    } else {
                        params.batch_interval
                    };
                    tokio::spawn(async move {
                        tokio::time::sleep(interval).await;
                        sender.timer_flush(&team, epoch).await;
                    });
                }
                true
            }
            Err(ApiError::Auth) => {
                warn!(
                    team_url,
                    "team rejected our token; suspending delivery. Re-join the team to resume."
                );
                queue.suspended = true;
                queue.clear();
                let _ = self.inner.notice_tx.send(SenderNotice::AuthFailure {
                    team_url: team_url.to_string(),
                });
                false
            }
            Err(error) => {
                queue.flushing = false;
                queue.retry_count += 1;
                if queue.retry_count > params.max_retries {
                    warn!(
                        team_url,
                        batch = queue.inflight.len(),
                        %error,
                        "retries exhausted, dropping batch"
                    );
                    queue.inflight.clear();
                    queue.retry_count = 0;
                    // Events that arrived during the failed attempts still
                    // need a flush of their own
                    if !queue.events.is_empty() && !queue.flush_scheduled {
                        queue.flush_scheduled = true;
                        let epoch = queue.epoch;
                        let sender = self.clone();
                        let team = team_url.to_string();
                        let interval = params.batch_interval;
                        tokio::spawn(async move {
                            tokio::time::sleep(interval).await;
                            sender.timer_flush(&team, epoch).await;
                        });
                    }
                } else {
                    // Requeue at the head so per-team order is preserved
                    for entry in queue.inflight.drain(..).rev() {
                        queue.events.push_front(entry);
                    }
                    queue.retry_pending = true;
                    let delay = retry_delay(params, queue.retry_count);
                    debug!(team_url, retry = queue.retry_count, ?delay, %error, "ingest failed, backing off");
                    let epoch = queue.epoch;
                    let sender = self.clone();
                    let team = team_url.to_string();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        sender.retry_flush(&team, epoch).await;
                    });
                }
                false
            }
        }
        })
    }

    async fn drain_team(&self, team_url: &str) {
        loop {
            {
                let queues = self.inner.queues.lock();
                let Some(queue) = queues.get(team_url) else {
                    return;
                };
                if queue.suspended || (queue.events.is_empty() && queue.inflight.is_empty()) {
                    return;
                }
                if queue.flushing {
                    // Another task is on the wire; it owns this batch.
                    return;
                }
            }
            if !self.run_flush(team_url, true).await {
                return;
            }
        }
    }
}

/// Backoff: `min(batch_interval × 2^retry_count, max_retry_delay)`.
fn retry_delay(params: &SenderParams, retry_count: u32) -> Duration {
    params
        .batch_interval
        .saturating_mul(2u32.saturating_pow(retry_count.min(16)))
        .min(params.max_retry_delay)
}

#[cfg(test)]
#[path = "sender_tests.rs"]
mod tests;

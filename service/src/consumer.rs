use arcade_types::GachaEvent;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    store::{EventStream, History, StreamEntry},
    StoreError,
};

/// Stream id before every entry.
const PENDING_FROM_START: &str = "0";

/// Outcome of one poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    pub acked: usize,
    /// Written but the ack failed; redelivery is harmless.
    pub unacked: usize,
    /// Could not be parsed. Counted the first time an entry is seen.
    pub malformed: usize,
    /// The history write failed.
    pub failed: usize,
}

impl PollReport {
    /// Entries worth retrying were left pending.
    fn left_pending(&self) -> bool {
        self.failed > 0 || self.unacked > 0
    }
}

/// Where the next read starts.
#[derive(Debug)]
struct Cursor {
    /// Scanning this consumer's pending entries after this id.
    pending_after: Option<String>,
    /// A retryable entry was left pending since the last scan started.
    dirty: bool,
}

/// Turns gacha pull events into durable history rows.
///
/// Pending entries are scanned once at startup and again after a poll leaves
/// something retryable behind; otherwise only new entries are read. Malformed
/// entries stay pending for an operator and are skipped on later scans.
pub struct GachaHistoryConsumer<S, E> {
    history: Arc<S>,
    stream: Arc<E>,
    batch_size: usize,
    block_timeout: Duration,
    cursor: Mutex<Cursor>,
    parked: Mutex<HashSet<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: History, E: EventStream> GachaHistoryConsumer<S, E> {
    pub fn new(
        history: Arc<S>,
        stream: Arc<E>,
        batch_size: usize,
        block_timeout: Duration,
    ) -> Self {
        Self {
            history,
            stream,
            batch_size: batch_size.max(1),
            block_timeout,
            cursor: Mutex::new(Cursor {
                pending_after: Some(PENDING_FROM_START.to_string()),
                dirty: false,
            }),
            parked: Mutex::new(HashSet::new()),
        }
    }

    /// Reads one batch and processes it.
    pub async fn poll_once(&self) -> Result<PollReport, StoreError> {
        let (batch, scanning) = self.read().await?;
        Ok(self.settle(batch, scanning).await)
    }

    /// Next batch, and whether it came from a pending scan.
    ///
    /// A pending scan that runs dry falls through to a read of new entries.
    async fn read(&self) -> Result<(Vec<StreamEntry>, bool), StoreError> {
        let pending_after = lock(&self.cursor).pending_after.clone();
        if let Some(after) = pending_after {
            let batch = self.stream.read_pending(&after, self.batch_size).await?;
            if !batch.is_empty() {
                return Ok((batch, true));
            }
            lock(&self.cursor).pending_after = None;
        }
        let batch = self
            .stream
            .read_new(self.batch_size, self.block_timeout)
            .await?;
        Ok((batch, false))
    }

    async fn settle(&self, batch: Vec<StreamEntry>, scanning: bool) -> PollReport {
        let last_id = batch.last().map(|entry| entry.id.clone());
        let report = self.process(batch).await;

        let mut cursor = lock(&self.cursor);
        cursor.dirty |= report.left_pending();
        cursor.pending_after = if scanning {
            last_id
        } else if std::mem::take(&mut cursor.dirty) {
            Some(PENDING_FROM_START.to_string())
        } else {
            None
        };
        report
    }

    /// Records a malformed entry; false when it was already reported.
    fn park(&self, entry_id: &str) -> bool {
        lock(&self.parked).insert(entry_id.to_string())
    }

    async fn process(&self, batch: Vec<StreamEntry>) -> PollReport {
        let mut report = PollReport::default();
        for entry in batch {
            if lock(&self.parked).contains(&entry.id) {
                continue;
            }
            let parsed = match entry.data.as_deref() {
                Some(data) => GachaEvent::from_json(data).map_err(|err| err.to_string()),
                None => Err("stream entry has no data field".to_string()),
            };
            let event = match parsed {
                Ok(event) => event,
                Err(err) => {
                    if self.park(&entry.id) {
                        warn!(
                            entry_id = %entry.id,
                            %err,
                            "leaving unparseable stream entry pending"
                        );
                        report.malformed += 1;
                    }
                    continue;
                }
            };

            let session_id = match self
                .history
                .record_pull_batch(&entry.id, event.session, &event.item_ids)
                .await
            {
                Ok(session_id) => session_id,
                Err(err) => {
                    warn!(entry_id = %entry.id, ?err, "failed to record gacha history");
                    report.failed += 1;
                    continue;
                }
            };
            debug!(
                entry_id = %entry.id,
                session_id,
                items = event.item_ids.len(),
                "recorded gacha history"
            );

            match self.stream.ack(&entry.id).await {
                Ok(()) => report.acked += 1,
                Err(err) => {
                    warn!(entry_id = %entry.id, ?err, "failed to ack stream entry");
                    report.unacked += 1;
                }
            }
        }
        report
    }

    /// Consumes until `shutdown` flips or its sender goes away.
    ///
    /// Shutdown interrupts a blocking read but never a batch being processed.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let backoff = self.block_timeout.max(Duration::from_millis(100));
        loop {
            let ensured = tokio::select! {
                biased;
                _ = shutdown.changed() => return,
                ensured = self.stream.ensure_group() => ensured,
            };
            match ensured {
                Ok(()) => break,
                Err(err) => {
                    warn!(?err, "failed to create consumer group");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
        info!(batch_size = self.batch_size, "gacha history consumer started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            let read = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                read = self.read() => read,
            };
            let report = match read {
                Ok((batch, scanning)) => self.settle(batch, scanning).await,
                Err(err) => {
                    warn!(?err, "failed to read gacha stream");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            };
            if report.left_pending() {
                tokio::time::sleep(backoff).await;
            }
        }
        info!("gacha history consumer stopped");
    }
}

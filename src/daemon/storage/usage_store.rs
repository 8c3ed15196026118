use std::{
    path::Path,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, ErrorCode, InterruptHandle};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::utils::{
    clock::Clock,
    time::{date_to_key, usage_day},
};

use super::{
    entities::{Source, UsageEvent, UsageRecord},
    migrations::migrate,
    UsageLedger,
};

/// Upper bound for a single store call. A call exceeding it drops its event.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Insert-or-accumulate in a single statement. The unique key on `(name, source, usage_date)`
/// turns a concurrent second insert into an update instead of a duplicate row.
const UPSERT_SQL: &str = r#"
    INSERT INTO daily_usage (name, source, usage_date, minutes_used)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(name, source, usage_date) DO UPDATE SET
        minutes_used = minutes_used + excluded.minutes_used
"#;

const SNAPSHOT_SQL: &str = r#"
    SELECT name, source, minutes_used
    FROM daily_usage
    WHERE usage_date = ?1
    ORDER BY minutes_used DESC, id ASC
"#;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store call exceeded {0:?}")]
    Timeout(Duration),
    #[error("store worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error("store handle is poisoned")]
    Poisoned,
    #[error("usage can only grow, got a delta of {0}")]
    InvalidDelta(f64),
    #[error("store call was abandoned by its caller")]
    Abandoned,
}

// Lifecycle of a single store call, shared between the caller and the blocking task.
const CALL_PENDING: u8 = 0;
const CALL_RUNNING: u8 = 1;
const CALL_ABANDONED: u8 = 2;

struct StoreHandle {
    connection: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
}

/// The only owner of persisted usage. A single connection behind an `Arc<Mutex<_>>` is handed
/// to every blocking call, so writers are serialized inside the process while the upsert
/// statement keeps other processes correct.
pub struct UsageStore {
    handle: Option<StoreHandle>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl UsageStore {
    /// Opens the database at `path`. Without a path, or when the database can't be opened,
    /// the store is inert: writes are dropped and reads are empty.
    pub fn connect(path: Option<&Path>, clock: Arc<dyn Clock>) -> Self {
        let Some(path) = path else {
            warn!("No database configured, running in dry mode");
            return Self::dry(clock);
        };

        match open_connection(path, DEFAULT_STORE_TIMEOUT) {
            Ok(connection) => {
                info!("Connected to usage database {path:?}");
                let interrupt = Arc::new(connection.get_interrupt_handle());
                Self {
                    handle: Some(StoreHandle {
                        connection: Arc::new(Mutex::new(connection)),
                        interrupt,
                    }),
                    clock,
                    timeout: DEFAULT_STORE_TIMEOUT,
                }
            }
            Err(e) => {
                error!("Unable to open usage database {path:?}, running in dry mode: {e}");
                Self::dry(clock)
            }
        }
    }

    pub fn dry(clock: Arc<dyn Clock>) -> Self {
        Self {
            handle: None,
            clock,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn is_dry(&self) -> bool {
        self.handle.is_none()
    }

    /// Adds `minutes_delta` to today's record of `(name, source)`.
    pub async fn upsert(&self, name: &str, source: Source, minutes_delta: f64) {
        self.apply(UsageEvent::new(name, source, minutes_delta, self.clock.time()))
            .await
    }

    /// Same as [UsageStore::try_apply] but failures are logged and the event is dropped.
    pub async fn apply(&self, event: UsageEvent) {
        if let Err(e) = self.try_apply(&event).await {
            error!("Dropped usage event {event:?}: {e}");
        }
    }

    pub async fn try_apply(&self, event: &UsageEvent) -> Result<(), StoreError> {
        if !event.minutes_delta.is_finite() || event.minutes_delta < 0. {
            return Err(StoreError::InvalidDelta(event.minutes_delta));
        }
        let Some(handle) = &self.handle else {
            debug!("Dry mode, skipping {event:?}");
            return Ok(());
        };

        let name = event.name.to_string();
        let source = event.source;
        let day = date_to_key(usage_day(event.occurred_at));
        let minutes = event.minutes_delta;

        let span = info_span!("Upserting usage", %name, %source, %day);
        self.run(handle, move |conn| {
            conn.execute(UPSERT_SQL, params![name, source, day, minutes])?;
            Ok(())
        })
        .instrument(span)
        .await
    }

    /// Records of `day` ordered by minutes. Failures are logged and yield an empty list.
    pub async fn daily_snapshot(&self, day: NaiveDate) -> Vec<UsageRecord> {
        self.try_daily_snapshot(day).await.unwrap_or_else(|e| {
            error!("Failed to read usage for {day}: {e}");
            vec![]
        })
    }

    pub async fn try_daily_snapshot(&self, day: NaiveDate) -> Result<Vec<UsageRecord>, StoreError> {
        let Some(handle) = &self.handle else {
            return Ok(vec![]);
        };

        let key = date_to_key(day);
        self.run(handle, move |conn| {
            let mut stmt = conn.prepare(SNAPSHOT_SQL)?;
            let rows = stmt.query_map(params![key], |row| {
                Ok(UsageRecord {
                    name: row.get(0)?,
                    source: row.get(1)?,
                    day,
                    minutes: row.get(2)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .instrument(info_span!("Reading daily snapshot", %day))
        .await
    }

    /// Executes `operation` on the blocking pool, bounded by the store timeout.
    ///
    /// A call that times out while waiting for the connection never runs. A call that is already
    /// executing is interrupted and its real outcome is returned, so a timeout error always means
    /// nothing was written.
    async fn run<T, F>(&self, handle: &StoreHandle, operation: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(CALL_PENDING));
        let connection = handle.connection.clone();
        let task_state = state.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            let conn = connection.lock().map_err(|_| StoreError::Poisoned)?;
            if task_state
                .compare_exchange(CALL_PENDING, CALL_RUNNING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Err(StoreError::Abandoned);
            }
            operation(&conn).map_err(StoreError::from)
        });

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(joined) => joined?,
            Err(_) => {
                if state
                    .compare_exchange(CALL_PENDING, CALL_ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    return Err(StoreError::Timeout(self.timeout));
                }

                handle.interrupt.interrupt();
                match task.await? {
                    Err(StoreError::Sqlite(e))
                        if e.sqlite_error_code() == Some(ErrorCode::OperationInterrupted) =>
                    {
                        Err(StoreError::Timeout(self.timeout))
                    }
                    other => other,
                }
            }
        }
    }
}

#[async_trait]
impl UsageLedger for UsageStore {
    async fn record(&self, event: UsageEvent) {
        self.apply(event).await
    }

    async fn daily_snapshot(&self, day: NaiveDate) -> Vec<UsageRecord> {
        UsageStore::daily_snapshot(self, day).await
    }
}

fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent().filter(|v| !v.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(busy_timeout)?;
    migrate(&mut conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration as StdDuration};

    use anyhow::{anyhow, Result};
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::{tempdir, NamedTempFile, TempDir};

    use crate::{
        daemon::storage::{
            entities::{Source, UsageEvent},
            UsageLedger,
        },
        utils::{clock::FixedClock, logging::TEST_LOGGING, time::usage_day},
    };

    use super::{StoreError, UsageStore};

    const TEST_START_DATE: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(),
        NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
    );

    fn test_time() -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE)
    }

    fn test_store() -> Result<(TempDir, UsageStore)> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let store = UsageStore::connect(
            Some(&dir.path().join("usage.db")),
            Arc::new(FixedClock(test_time())),
        );
        assert!(!store.is_dry());
        Ok((dir, store))
    }

    fn names(records: &[crate::daemon::storage::entities::UsageRecord]) -> Vec<&str> {
        records.iter().map(|v| v.name.as_str()).collect()
    }

    #[tokio::test]
    async fn dry_mode_is_inert() {
        *TEST_LOGGING;
        let store = UsageStore::connect(None, Arc::new(FixedClock(test_time())));
        assert!(store.is_dry());

        store.upsert("Code", Source::Desktop, 1.).await;
        assert!(store
            .try_apply(&UsageEvent::new("Code", Source::Desktop, 1., test_time()))
            .await
            .is_ok());
        assert!(store.daily_snapshot(usage_day(test_time())).await.is_empty());
    }

    #[tokio::test]
    async fn upsert_creates_then_accumulates() -> Result<()> {
        let (_dir, store) = test_store()?;
        store.upsert("Code", Source::Desktop, 1.5).await;
        store.upsert("Code", Source::Desktop, 2.).await;

        let records = store.try_daily_snapshot(usage_day(test_time())).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Code");
        assert_eq!(records[0].source, Source::Desktop);
        assert_eq!(records[0].minutes, 3.5);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_upserts_on_one_key_net_to_the_sum() -> Result<()> {
        let (_dir, store) = test_store()?;
        let store = Arc::new(store);

        let tasks = (0..50).map(|i| {
            let store = store.clone();
            let source = Source::Browser;
            tokio::spawn(async move {
                // Half of the writers go through the shared ledger contract.
                if i % 2 == 0 {
                    store.upsert("github.com", source, 1.).await
                } else {
                    UsageLedger::record(
                        store.as_ref(),
                        UsageEvent::new("github.com", source, 1., test_time()),
                    )
                    .await
                }
            })
        });
        for result in futures::future::join_all(tasks).await {
            result?;
        }

        let records = store.try_daily_snapshot(usage_day(test_time())).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].minutes, 50.);
        Ok(())
    }

    #[tokio::test]
    async fn snapshot_is_ordered_by_minutes_with_stable_ties() -> Result<()> {
        let (_dir, store) = test_store()?;
        store.upsert("A", Source::Desktop, 30.).await;
        store.upsert("B", Source::Desktop, 50.).await;
        store.upsert("C", Source::Desktop, 10.).await;
        store.upsert("D", Source::Browser, 20.).await;
        store.upsert("E", Source::Browser, 20.).await;

        let records = store.try_daily_snapshot(usage_day(test_time())).await?;
        assert_eq!(names(&records), vec!["B", "A", "D", "E", "C"]);

        // Running it again gives the same order.
        let again = store.try_daily_snapshot(usage_day(test_time())).await?;
        assert_eq!(records, again);
        Ok(())
    }

    #[tokio::test]
    async fn keys_are_separated_by_source_and_day() -> Result<()> {
        let (_dir, store) = test_store()?;
        let today = test_time();
        let tomorrow = today + Duration::days(1);

        store
            .apply(UsageEvent::new("github.com", Source::Browser, 2., today))
            .await;
        store
            .apply(UsageEvent::new("github.com", Source::Desktop, 1., today))
            .await;
        store
            .apply(UsageEvent::new("github.com", Source::Browser, 7., tomorrow))
            .await;

        let records = store.try_daily_snapshot(usage_day(today)).await?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, Source::Browser);
        assert_eq!(records[0].minutes, 2.);

        let records = store.try_daily_snapshot(usage_day(tomorrow)).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].minutes, 7.);
        Ok(())
    }

    #[tokio::test]
    async fn negative_deltas_are_rejected() -> Result<()> {
        let (_dir, store) = test_store()?;
        let result = store
            .try_apply(&UsageEvent::new("Code", Source::Desktop, -1., test_time()))
            .await;
        assert!(matches!(result, Err(StoreError::InvalidDelta(_))));

        store
            .apply(UsageEvent::new("Code", Source::Desktop, f64::NAN, test_time()))
            .await;
        assert!(store.try_daily_snapshot(usage_day(test_time())).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn data_survives_reopening() -> Result<()> {
        let (dir, store) = test_store()?;
        store.upsert("Code", Source::Desktop, 4.).await;
        drop(store);

        let store = UsageStore::connect(
            Some(&dir.path().join("usage.db")),
            Arc::new(FixedClock(test_time())),
        );
        store.upsert("Code", Source::Desktop, 1.).await;
        let records = store.try_daily_snapshot(usage_day(test_time())).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].minutes, 5.);
        Ok(())
    }

    #[tokio::test]
    async fn timed_out_calls_write_nothing() -> Result<()> {
        let (_dir, store) = test_store()?;
        let connection = store
            .handle
            .as_ref()
            .map(|v| v.connection.clone())
            .ok_or_else(|| anyhow!("store is dry"))?;

        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let holder = std::thread::spawn(move || {
            let _guard = connection.lock().unwrap();
            locked_tx.send(()).unwrap();
            std::thread::sleep(StdDuration::from_millis(300));
        });
        locked_rx.recv()?;

        let store = store.with_timeout(StdDuration::from_millis(50));
        let result = store
            .try_apply(&UsageEvent::new("Code", Source::Desktop, 1., test_time()))
            .await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));

        holder.join().map_err(|_| anyhow!("lock holder panicked"))?;
        let store = store.with_timeout(StdDuration::from_secs(5));
        assert!(store.try_daily_snapshot(usage_day(test_time())).await?.is_empty());

        // The store stays usable after a dropped call.
        store.upsert("Code", Source::Desktop, 2.).await;
        let records = store.try_daily_snapshot(usage_day(test_time())).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].minutes, 2.);
        Ok(())
    }

    #[tokio::test]
    async fn unopenable_database_makes_store_inert() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let file = NamedTempFile::new()?;
        let paths = [dir.path().to_path_buf(), file.path().join("usage.db")];

        for path in paths {
            let store = UsageStore::connect(Some(&path), Arc::new(FixedClock(test_time())));
            assert!(store.is_dry(), "{path:?} was opened");

            store.upsert("Code", Source::Desktop, 1.).await;
            assert!(store.daily_snapshot(usage_day(test_time())).await.is_empty());
        }
        Ok(())
    }
}

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{anyhow, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::{
    config::aliases::AliasMap,
    daemon::storage::{
        entities::{Source, UsageEvent},
        UsageLedger,
    },
    utils::clock::Clock,
    window_api::WindowManager,
};

/// Upper bound for a single foreground application query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Periodically asks the window manager for the foreground application and credits it with one
/// polling interval of usage.
pub struct ActiveWindowPoller {
    ledger: Arc<dyn UsageLedger>,
    producer: Arc<Mutex<Box<dyn WindowManager>>>,
    aliases: Arc<AliasMap>,
    shutdown: CancellationToken,
    interval: Duration,
    query_timeout: Duration,
    time_provider: Arc<dyn Clock>,
}

impl ActiveWindowPoller {
    pub fn new(
        ledger: Arc<dyn UsageLedger>,
        producer: Box<dyn WindowManager>,
        aliases: Arc<AliasMap>,
        shutdown: CancellationToken,
        interval: Duration,
        time_provider: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            producer: Arc::new(Mutex::new(producer)),
            aliases,
            shutdown,
            interval,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            time_provider,
        }
    }

    pub fn with_query_timeout(self, query_timeout: Duration) -> Self {
        Self {
            query_timeout,
            ..self
        }
    }

    fn minutes_per_tick(&self) -> f64 {
        self.interval.as_secs_f64() / 60.
    }

    /// Platform queries are blocking, so they run on the blocking pool.
    async fn query_foreground(&self) -> Result<String> {
        let producer = self.producer.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut producer = producer
                .lock()
                .map_err(|_| anyhow!("Window manager is poisoned"))?;
            producer.get_foreground_app()
        });

        match tokio::time::timeout(self.query_timeout, task).await {
            Ok(joined) => joined?,
            Err(_) => Err(anyhow!(
                "Foreground query exceeded {:?}",
                self.query_timeout
            )),
        }
    }

    async fn collect_data(&self) -> Result<UsageEvent> {
        let app = self.query_foreground().await?;
        let name = self.aliases.resolve(&app);

        Ok(UsageEvent::new(
            name,
            Source::Desktop,
            self.minutes_per_tick(),
            self.time_provider.time(),
        ))
    }

    /// Executes the poller event loop. Each tick first waits for the interval to pass, then
    /// credits the application that is in the foreground at that moment.
    pub async fn run(self) -> Result<()> {
        let mut collection_point = self.time_provider.instant();
        loop {
            collection_point += self.interval;

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Stopping window poller");
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(collection_point) => ()
            }

            match self.collect_data().await {
                Ok(event) => {
                    debug!("Active application {}", event.name);
                    let span = info_span!("Recording desktop usage");
                    self.ledger.record(event).instrument(span).await;
                }
                Err(e) => {
                    error!("Encountered an error during collection {:?}", e)
                }
            }
        }
    }
}

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use collection::poller::ActiveWindowPoller;
use gateway::GatewayState;
use storage::{usage_store::UsageStore, UsageLedger};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    config::{aliases::AliasMap, TrackerConfig},
    utils::clock::{Clock, DefaultClock},
    window_api::{GenericWindowManager, WindowManager},
};

pub mod args;
pub mod collection;
pub mod gateway;
pub mod shutdown;
pub mod storage;

/// Represents the starting point for the daemon. The store, the alias map and the clock are
/// built once here and shared by the poller and the gateway.
pub async fn start_daemon(config: TrackerConfig) -> Result<()> {
    info!("Starting tracker daemon with {config:?}");
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let aliases = Arc::new(AliasMap::load(&config.alias_path));
    let ledger: Arc<dyn UsageLedger> = Arc::new(UsageStore::connect(
        config.db_path.as_deref(),
        clock.clone(),
    ));

    let listener = TcpListener::bind(config.listen)
        .await
        .inspect_err(|e| error!("Can't listen on {}: {e}", config.listen))?;

    let shutdown_token = CancellationToken::new();

    let poller = match GenericWindowManager::new() {
        Ok(manager) => Some(create_poller(
            ledger.clone(),
            manager,
            aliases.clone(),
            &shutdown_token,
            config.polling_interval,
            clock.clone(),
        )),
        Err(e) => {
            warn!("Desktop tracking is disabled: {e:?}");
            None
        }
    };

    let state = GatewayState::new(ledger, aliases, clock);
    run_components(poller, listener, state, shutdown_token).await;
    info!("Tracker daemon stopped");
    Ok(())
}

fn create_poller(
    ledger: Arc<dyn UsageLedger>,
    manager: impl WindowManager + 'static,
    aliases: Arc<AliasMap>,
    shutdown_token: &CancellationToken,
    interval: Duration,
    clock: Arc<dyn Clock>,
) -> ActiveWindowPoller {
    ActiveWindowPoller::new(
        ledger,
        Box::new(manager),
        aliases,
        shutdown_token.clone(),
        interval,
        clock,
    )
}

/// Runs until the token is cancelled, either by a signal or by a component failing.
async fn run_components(
    poller: Option<ActiveWindowPoller>,
    listener: TcpListener,
    state: GatewayState,
    shutdown_token: CancellationToken,
) {
    let (_, poller_result, gateway_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        async {
            match poller {
                Some(poller) => poller.run().await,
                None => Ok(()),
            }
        },
        async {
            let result = gateway::serve(listener, state, shutdown_token.clone()).await;
            shutdown_token.cancel();
            result
        },
    );

    if let Err(poller_result) = poller_result {
        error!("Window poller got an error {:?}", poller_result);
    }

    if let Err(gateway_result) = gateway_result {
        error!("Ingestion gateway got an error {:?}", gateway_result);
    }
}

#[cfg(test)]
mod daemon_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };
    use tokio_util::sync::CancellationToken;

    use crate::{
        config::aliases::AliasMap,
        daemon::{
            create_poller, gateway::GatewayState, run_components,
            storage::{entities::Source, usage_store::UsageStore, UsageLedger},
        },
        utils::{
            clock::{Clock, FixedClock},
            logging::TEST_LOGGING,
            time::usage_day,
        },
        window_api::MockWindowManager,
    };

    async fn post_usage(address: std::net::SocketAddr, body: &str) -> Result<String> {
        let mut stream = TcpStream::connect(address).await?;
        let request = format!(
            "POST /usage HTTP/1.1\r\nHost: {address}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(request.as_bytes()).await?;
        let mut response = String::new();
        stream.read_to_string(&mut response).await?;
        Ok(response)
    }

    /// Runs the poller and the gateway against one real store and checks both producers end
    /// up in the same daily snapshot.
    #[tokio::test]
    async fn smoke_test_daemon() -> Result<()> {
        *TEST_LOGGING;
        let interval = Duration::from_millis(50);
        let mut mock_window_manager = MockWindowManager::new();
        mock_window_manager
            .expect_get_foreground_app()
            .returning(|| Ok("code".to_string()));

        let dir = tempdir()?;
        let clock: Arc<dyn Clock> =
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap()));
        let store = Arc::new(UsageStore::connect(
            Some(&dir.path().join("usage.db")),
            clock.clone(),
        ));
        let ledger: Arc<dyn UsageLedger> = store.clone();
        let aliases = Arc::new(AliasMap::from_iter([
            ("code", "VS Code"),
            ("www.github.com", "github.com"),
        ]));

        let shutdown_token = CancellationToken::new();
        let poller = create_poller(
            ledger.clone(),
            mock_window_manager,
            aliases.clone(),
            &shutdown_token,
            interval,
            clock.clone(),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        let state = GatewayState::new(ledger, aliases, clock.clone());

        let (_, response) = tokio::join!(
            run_components(Some(poller), listener, state, shutdown_token.clone()),
            async {
                tokio::time::sleep(interval * 5).await;
                let response = post_usage(
                    address,
                    r#"[{"domain":"newtab","minutes":5},{"domain":"www.github.com","minutes":12}]"#,
                )
                .await;
                tokio::time::sleep(interval * 2).await;
                shutdown_token.cancel();
                response
            },
        );

        assert!(response?.starts_with("HTTP/1.1 200"));

        let records = store.try_daily_snapshot(usage_day(clock.time())).await?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "github.com");
        assert_eq!(records[0].source, Source::Browser);
        assert_eq!(records[0].minutes, 12.);
        assert_eq!(records[1].name, "VS Code");
        assert_eq!(records[1].source, Source::Desktop);
        assert!(records[1].minutes > 0.);
        Ok(())
    }
}

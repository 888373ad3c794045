//! flagsync demo: record penalties offline, reconnect, watch the queue drain.
//!
//! Usage: `flagsync-cli [demo|status|sync]` (default: demo)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use flagsync_core::domain::{DeliveryError, QueueRecord, RecordKind, SyncError};
use flagsync_core::impls::{HttpTransport, JsonFileQueueStore, NetworkState, TcpProbe};
use flagsync_core::ports::{FnTransport, Transport};
use flagsync_core::{SyncAppBuilder, SyncConfig, SyncOrchestrator};

/// Penalty as entered by the crew on the field.
#[derive(Debug, Serialize)]
struct Penalty {
    id: &'static str,
    code: &'static str,
    team: &'static str,
    player: &'static str,
    quarter: u8,
    game_clock: &'static str,
}

fn sample_penalties() -> Vec<Penalty> {
    vec![
        Penalty {
            id: "p1",
            code: "FST",
            team: "home",
            player: "12",
            quarter: 1,
            game_clock: "11:42",
        },
        Penalty {
            id: "p2",
            code: "HLD",
            team: "away",
            player: "77",
            quarter: 1,
            game_clock: "08:03",
        },
        Penalty {
            id: "p3",
            code: "DPI",
            team: "home",
            player: "24",
            quarter: 2,
            game_clock: "02:15",
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let command = std::env::args().nth(1).unwrap_or_else(|| "demo".into());
    let config = SyncConfig::load();

    let store = JsonFileQueueStore::open(&config.storage_dir, &config.namespace)
        .await
        .context("opening offline queue")?;
    let network = NetworkState::new(false);
    let transport = build_transport(&config).context("building transport")?;

    let orchestrator = SyncAppBuilder::new()
        .config(&config)
        .store(Arc::new(store))
        .monitor(Arc::new(network.clone()))
        .transport(transport)
        .build()
        .context("wiring sync orchestrator")?;

    let probe = config.probe.as_ref().map(|p| {
        TcpProbe::new(p.target.clone(), p.interval(), p.timeout()).spawn(network.clone())
    });

    let result = match command.as_str() {
        "demo" => run_demo(&orchestrator, &network, probe.is_some()).await,
        "status" => print_status(&orchestrator).await,
        "sync" => run_manual_sync(&orchestrator, &network, probe.is_some()).await,
        other => Err(anyhow::anyhow!(
            "unknown command {other:?} (expected demo, status or sync)"
        )),
    };

    orchestrator.shutdown();
    if let Some(probe) = probe {
        probe.shutdown_and_join().await;
    }
    result
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// HTTP when an endpoint is configured, otherwise a transport that just logs.
fn build_transport(config: &SyncConfig) -> anyhow::Result<Arc<dyn Transport>> {
    if let Some(endpoint) = &config.endpoint {
        info!(%endpoint, "delivering over http");
        let transport = HttpTransport::new(endpoint.clone(), config.delivery_timeout())?;
        return Ok(Arc::new(transport));
    }

    warn!("no endpoint configured; deliveries are only logged");
    Ok(Arc::new(FnTransport::new(|record: QueueRecord| async move {
        let body = serde_json::to_string(record.payload())?;
        info!(record_id = %record.id(), kind = %record.kind(), %body, "delivered (dry run)");
        Ok::<_, DeliveryError>(true)
    })))
}

/// Simulates the platform signal unless a real probe drives it.
async fn go_online(network: &NetworkState, probed: bool) {
    if probed {
        sleep(Duration::from_millis(200)).await;
    } else {
        network.set_online(true);
    }
}

async fn run_demo(
    orchestrator: &SyncOrchestrator,
    network: &NetworkState,
    probed: bool,
) -> anyhow::Result<()> {
    for penalty in sample_penalties() {
        let payload = serde_json::to_value(&penalty)?;
        let id = orchestrator
            .record(RecordKind::penalty(), payload)
            .await
            .context("queueing penalty")?;
        println!(
            "queued {} ({} #{}) as {id}",
            penalty.code, penalty.team, penalty.player
        );
    }
    println!("pending: {}", orchestrator.queue_depth().await?);

    go_online(network, probed).await;

    for _ in 0..50 {
        if orchestrator.queue_depth().await? == 0 {
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }
    print_status(orchestrator).await
}

async fn run_manual_sync(
    orchestrator: &SyncOrchestrator,
    network: &NetworkState,
    probed: bool,
) -> anyhow::Result<()> {
    go_online(network, probed).await;
    match orchestrator.trigger_manual_sync().await {
        Ok(outcome) => println!("{}", serde_json::to_string_pretty(&outcome)?),
        Err(SyncError::Offline) => {
            let pending = orchestrator.queue_depth().await?;
            println!("offline; {pending} record(s) stay queued");
        }
        Err(e) => return Err(e).context("manual sync"),
    }
    Ok(())
}

async fn print_status(orchestrator: &SyncOrchestrator) -> anyhow::Result<()> {
    let status = orchestrator.status().await.context("reading status")?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

//! Maintenance entry point: ledger import/export, sync status, stock alerts.
//!
//! Usage: `shopledger [migrate|import|export|status|alerts]` (default `status`).

use anyhow::{Context, bail};
use tracing::{info, warn};

use shopledger_infra::{AppConfig, Engine, InMemoryStore, PostgresStore, Store};
use shopledger_reconciliation::{ExportKind, SampleLedgerSource, SimulatedLedgerTarget};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    shopledger_observability::init(&config.log);
    let policy = config
        .business
        .policy()
        .context("invalid business configuration")?;
    let command = std::env::args().nth(1).unwrap_or_else(|| "status".to_string());

    info!(
        environment = %config.environment,
        ledger = %config.ledger.url,
        company = %config.ledger.company,
        %command,
        "starting"
    );

    match config.database.url.as_deref() {
        Some(url) => {
            let store = PostgresStore::connect(url, config.database.max_connections)
                .context("failed to connect to database")?;
            store.migrate().context("failed to run migrations")?;
            run(&Engine::new(store).with_policy(policy), &command)
        }
        None => {
            warn!("no database url configured; using the in-memory store");
            run(&Engine::new(InMemoryStore::new()).with_policy(policy), &command)
        }
    }
}

fn run<S: Store>(engine: &Engine<S>, command: &str) -> anyhow::Result<()> {
    match command {
        // Migrations run on every connect.
        "migrate" => {}
        "import" => {
            let summary = engine.bulk_import(&SampleLedgerSource)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "export" => {
            for kind in [ExportKind::Items, ExportKind::Suppliers, ExportKind::Customers] {
                let synced = engine.bulk_sync(kind, &SimulatedLedgerTarget)?;
                println!("{}: {synced} synced", kind.noun());
            }
        }
        "status" => {
            let status = engine.sync_status()?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        "alerts" => {
            let alerts = engine.unresolved_alerts()?;
            println!("{}", serde_json::to_string_pretty(&alerts)?);
        }
        other => bail!("unknown command `{other}` (expected migrate, import, export, status or alerts)"),
    }
    Ok(())
}

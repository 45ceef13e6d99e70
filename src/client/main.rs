/**
 * logitrack command-line client
 *
 * Each invocation builds the configuration, local cache, record store client
 * and sync controller, runs one command, prints the notifications it
 * produced, and flushes state back to the cache.
 */
use clap::{Parser, Subcommand};
use logitrack::client::export::share_url;
use logitrack::client::{Config, LocalCache, NetworkMonitor, Notification, SyncController, SyncOptions};
use logitrack::shared::{Carrier, LogisticsRecord, TrackingStatus};
use std::path::PathBuf;
use tokio::sync::broadcast;

#[derive(Parser)]
#[command(name = "logitrack", version, about = "Offline-first logistics tracking")]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Start disconnected; changes are queued locally
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List tracked shipments
    List {
        /// Only favorites
        #[arg(long)]
        favorites: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Track a new shipment
    Add {
        tracking_number: String,
        /// Carrier code (see `carriers`)
        carrier: String,
    },
    /// Toggle the favorite flag
    Favorite { record: String },
    /// Mark a shipment delivered
    Deliver {
        record: String,
        /// Clear the delivered flag instead
        #[arg(long)]
        undo: bool,
    },
    /// Set the tracking status
    StatusSet { record: String, status: TrackingStatus },
    /// Stop tracking a shipment
    Delete { record: String },
    /// Print a share token for the current list
    Export,
    /// Import shipments from a share token or link
    Import { token: String },
    /// Reconcile with the record store
    Sync,
    /// Show connection and queue status
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Follow remote changes and connectivity until Ctrl-C
    Watch,
    /// List carrier codes
    Carriers,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::Carriers = cli.command {
        for carrier in Carrier::ALL {
            println!("{:<8} {}", carrier.code(), carrier.display_name());
        }
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let cache = LocalCache::open(&config.app().cache).await?;
    let store = config.record_store();
    let options = SyncOptions {
        start_offline: cli.offline,
        ..SyncOptions::from(config.app())
    };
    let mut controller = SyncController::new(store.clone(), cache, options);
    let mut notes = controller.subscribe_notifications();

    controller.init().await?;

    let result = run(&cli.command, &config, &mut controller, &mut notes, store).await;

    controller.dispose().await?;
    print_notifications(&mut notes);
    result
}

async fn run(
    command: &Command,
    config: &Config,
    controller: &mut SyncController,
    notes: &mut broadcast::Receiver<Notification>,
    store: std::sync::Arc<dyn logitrack::client::RecordStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::List { favorites, json } => {
            let records: Vec<&LogisticsRecord> = controller
                .records()
                .iter()
                .filter(|r| !favorites || r.is_favorite)
                .collect();
            if *json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_table(&records);
            }
        }
        Command::Add { tracking_number, carrier } => {
            let record = controller.add(tracking_number, carrier).await?;
            print_table(&[&record]);
        }
        Command::Favorite { record } => {
            let id = resolve(controller, record)?;
            if let Some(updated) = controller.toggle_favorite(&id).await? {
                print_table(&[&updated]);
            }
        }
        Command::Deliver { record, undo } => {
            let id = resolve(controller, record)?;
            if let Some(updated) = controller.mark_delivered(&id, !undo).await? {
                print_table(&[&updated]);
            }
        }
        Command::StatusSet { record, status } => {
            let id = resolve(controller, record)?;
            if let Some(updated) = controller.set_status(&id, *status).await? {
                print_table(&[&updated]);
            }
        }
        Command::Delete { record } => {
            let id = resolve(controller, record)?;
            controller.delete(&id).await?;
        }
        Command::Export => {
            let token = controller.export_snapshot()?;
            match config.app().share_base_url.as_deref() {
                Some(base) => println!("{}", share_url(base, &token)),
                None => println!("{}", token),
            }
        }
        Command::Import { token } => {
            let count = controller.import_snapshot(token).await?;
            println!("{} record(s) imported", count);
        }
        Command::Sync => {
            controller.set_online(true).await?;
            controller.load().await?;
            println!("{}", controller.status());
        }
        Command::Status { json } => {
            let status = controller.status();
            if *json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{}", status);
                match config.source() {
                    Some(path) => println!("config: {}", path.display()),
                    None => println!("config: defaults"),
                }
            }
        }
        Command::Watch => watch(config, controller, notes, store).await?,
        Command::Carriers => {}
    }
    Ok(())
}

async fn watch(
    config: &Config,
    controller: &mut SyncController,
    notes: &mut broadcast::Receiver<Notification>,
    store: std::sync::Arc<dyn logitrack::client::RecordStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut monitor = NetworkMonitor::new(store, config.app().probe_interval(), config.app().request_timeout());
    let mut network = monitor.subscribe();
    monitor.start();

    print_notifications(notes);
    eprintln!("{}", controller.status());
    eprintln!("Watching for changes, Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = network.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = network.borrow_and_update().is_online();
                controller.set_online(online).await?;
            }
            event = controller.next_remote_event(), if controller.is_subscribed() => {
                if event?.is_some() {
                    print_table(&controller.records().iter().collect::<Vec<_>>());
                }
            }
            note = notes.recv() => match note {
                Ok(note) => eprintln!("* {}", note),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    monitor.stop();
    Ok(())
}

/// Accept a record id or a tracking number
fn resolve(controller: &SyncController, key: &str) -> Result<String, Box<dyn std::error::Error>> {
    let key = key.trim();
    controller
        .records()
        .iter()
        .find(|r| r.id == key)
        .or_else(|| controller.records().iter().find(|r| r.tracking_number == key))
        .map(|r| r.id.clone())
        .ok_or_else(|| format!("no tracked shipment matches '{}'", key).into())
}

fn print_notifications(notes: &mut broadcast::Receiver<Notification>) {
    loop {
        match notes.try_recv() {
            Ok(note) => eprintln!("* {}", note),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}

fn print_table(records: &[&LogisticsRecord]) {
    if records.is_empty() {
        println!("No shipments tracked");
        return;
    }
    println!("{:<36}  {:<24} {:<12} {:<17} {}", "ID", "TRACKING", "CARRIER", "STATUS", "FLAGS");
    for record in records {
        let mut flags = String::new();
        if record.is_favorite {
            flags.push('*');
        }
        if record.is_delivered {
            flags.push('D');
        }
        println!(
            "{:<36}  {:<24} {:<12} {:<17} {}",
            record.id, record.tracking_number, record.carrier_name, record.status.as_str(), flags
        );
    }
}

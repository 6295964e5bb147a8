use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use tokio_util::sync::CancellationToken;

use nse_snapshot::app::{App, TargetSelection};
use nse_snapshot::cli::{Cli, Commands};
use nse_snapshot::config::{self, Config};
use nse_snapshot::fetch::discover_indices;
use nse_snapshot::records::{render_table, IndexSnapshot};
use nse_snapshot::utils::{current_human_timestamp, format_file_modified};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(&cli.config).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config::validate(&config)?;

    let app = App::from_config(config).context("Failed to initialise HTTP client")?;
    let shutdown = CancellationToken::new();
    spawn_signal_watcher(shutdown.clone());

    match cli.command {
        Commands::Poll {
            names,
            all_indices,
            option_chain,
            ..
        } => {
            let selection = TargetSelection {
                names,
                all_indices,
                option_chain,
            };
            poll(&app, &selection, shutdown).await?
        }
        Commands::Fetch { name, kind } => {
            let target = kind.endpoint(name);
            let path = app
                .poller()
                .refresh_once(&target, &shutdown)
                .await
                .with_context(|| format!("Failed to refresh {}", target))?;
            println!("{} -> {}", target, path.display());
        }
        Commands::Indices => {
            let names = discover_indices(app.fetcher(), &shutdown)
                .await
                .context("Failed to list indices")?;
            for name in names {
                println!("{}", name);
            }
        }
        Commands::Show { name, limit } => show(&app, &name, limit)?,
        Commands::Cookie { renew } => cookie(&app, renew).await?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();
}

fn spawn_signal_watcher(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for Ctrl-C: {}", err);
            return;
        }
        log::info!("shutdown requested");
        shutdown.cancel();
    });
}

async fn poll(app: &App, selection: &TargetSelection, shutdown: CancellationToken) -> Result<()> {
    let targets = app
        .resolve_targets(selection, &shutdown)
        .await
        .context("Failed to resolve poll targets")?;
    if targets.is_empty() {
        anyhow::bail!("nothing to poll");
    }

    println!(
        "Polling {} target(s) from {}; press Ctrl-C to stop.",
        targets.len(),
        current_human_timestamp()
    );
    let stats = app.poller().run(targets, shutdown).await?;

    for entry in stats {
        println!(
            "{}: {} cycle(s), {} ok, {} failed",
            entry.target, entry.cycles, entry.successes, entry.failures
        );
    }
    Ok(())
}

fn show(app: &App, name: &str, limit: Option<usize>) -> Result<()> {
    let Some(payload) = app.store().read(name)? else {
        println!("No data yet for {}.", name);
        let stored = app.store().list();
        if !stored.is_empty() {
            println!("Stored snapshots:");
            for entry in stored {
                println!(
                    "  {:<32} {}",
                    entry.identifier,
                    format_file_modified(entry.file.modified)
                );
            }
        }
        return Ok(());
    };

    let snapshot = IndexSnapshot::from_value(&payload);
    println!(
        "{} as of {} (advances {}, declines {}, unchanged {})",
        snapshot.name,
        snapshot.timestamp,
        snapshot.breadth.advances,
        snapshot.breadth.declines,
        snapshot.breadth.unchanged
    );
    if let Some(index) = snapshot.index_row() {
        println!("Last {:.2}, change {:.2}%", index.last_price, index.p_change);
    }
    print!("{}", render_table(&snapshot, limit));
    Ok(())
}

async fn cookie(app: &App, renew: bool) -> Result<()> {
    let session = if renew {
        app.session().renew().await?
    } else {
        app.session().load().await?
    };

    println!("Cookie file: {}", app.session().cookie_path().display());
    let names: Vec<&str> = session.cookies.values.keys().map(String::as_str).collect();
    println!("Cookies: {}", names.join(", "));
    match &session.cookies.expires {
        Some(expires) => println!("Expires: {}", expires),
        None => println!("Expires: not set"),
    }
    Ok(())
}

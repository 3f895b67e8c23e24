use anyhow::Context;
use clap::Parser;
use modelsync::cli::{Cli, Commands};
use modelsync::daemon::{self, Daemon, SharedStatus};
use modelsync::model::{EntryStatus, Synchronizer};
use modelsync::{server, Error};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let listen = cli.global.listen.clone();
    let config = cli
        .global
        .into_config()
        .context("invalid configuration")?;

    match cli.command.unwrap_or_default() {
        Commands::Run => {
            let listener = match listen {
                Some(addr) => Some(server::bind(&addr).await.context("status server")?),
                None => None,
            };

            let synchronizer = Synchronizer::new(config.clone())?;
            let status = SharedStatus::default();
            let (shutdown_tx, shutdown_rx) = watch::channel(false);

            tokio::spawn(async move {
                daemon::shutdown_signal().await;
                let _ = shutdown_tx.send(true);
            });

            let server_task = listener.map(|listener| {
                let state = server::AppState::new(config.clone(), status.clone());
                let rx = shutdown_rx.clone();
                tokio::spawn(async move {
                    let result = server::serve(listener, state, rx).await;
                    if let Err(e) = &result {
                        tracing::error!("Status server stopped: {}", e);
                    }
                    result
                })
            });

            tracing::info!(
                "Syncing {} into {} every {} minutes",
                config.manifest_path.display(),
                config.cache_path.display(),
                config.interval_minutes()
            );

            Daemon::new(synchronizer, status).run(shutdown_rx).await;

            if let Some(task) = server_task {
                task.await.context("status server task panicked")??;
            }
        }

        Commands::Sync => {
            let mut synchronizer = Synchronizer::new(config)?;
            let report = synchronizer
                .run_cycle()
                .await
                .context("download cycle failed")?;

            println!(
                "✓ Cache in sync: {} verified, {} downloaded",
                report.verified, report.downloaded
            );
        }

        Commands::Verify => {
            let synchronizer = Synchronizer::new(config)?;
            let results = synchronizer.verify().await?;

            let mut failures = 0;
            for (resolved, status) in &results {
                let marker = match status {
                    EntryStatus::Verified => "ok      ",
                    EntryStatus::Missing => "missing ",
                    EntryStatus::Mismatch => "mismatch",
                };
                if *status != EntryStatus::Verified {
                    failures += 1;
                }
                println!("  {}  {}", marker, resolved.path.display());
            }

            if failures > 0 {
                return Err(Error::VerificationFailed(failures).into());
            }
            println!("\n✓ All {} models verified", results.len());
        }

        Commands::List => {
            let synchronizer = Synchronizer::new(config)?;
            let entries = synchronizer.resolve_entries().await?;

            if entries.is_empty() {
                println!("Manifest lists no models.");
            } else {
                println!("Manifest models:\n");
                for resolved in entries {
                    println!("  {}/{}", resolved.folder, resolved.entry.filename);
                    println!("    Source: {}", resolved.entry.url);
                    println!("    Path: {}", resolved.path.display());
                    match synchronizer
                        .registry()
                        .get(&resolved.folder, &resolved.entry.filename)
                    {
                        Some(cached) if cached.sha256 == resolved.entry.sha256 => {
                            println!("    Verified: {} ({} bytes)", cached.verified_at, cached.size);
                        }
                        _ => println!("    Verified: never"),
                    }
                    println!();
                }
            }
        }
    }

    Ok(())
}

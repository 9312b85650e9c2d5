//! QMS Metrics CLI - Main entry point for the `qms-metrics` binary
//!
//! Serves the metrics API and prints the same reports on the terminal.

use anyhow::Context;
use clap::Parser;
use qms_metrics_lib::engine::{
    adapter::{MetricsSource, MongoSource, ProfilingLevel},
    api::{create_router, ApiEnvelope, ApiState},
    cli::{formatter::CliFormatter, Cli, Commands, ConfigAction, OutputFormat, ProfileAction},
    config::Config,
    database::Database,
    logging::init_logging,
    observability::{MetricsCollector, MetricsError},
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{}", e);
    }

    if let Err(e) = run_cli(cli) {
        CliFormatter::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

#[tokio::main]
async fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let json = cli.format == OutputFormat::Json;
    let target = cli.config_target();

    match cli.command {
        Commands::Config { action } => cmd_config(action, &target, cli.config.as_deref(), json),
        command => {
            let config = Config::resolve(cli.config.as_deref())?;
            let collector = connect(&config).await;

            match command {
                Commands::Serve { port, host } => cmd_serve(collector, &config, host, port).await,
                Commands::Health => report(
                    collector.health_summary().await,
                    json,
                    CliFormatter::health_summary,
                ),
                Commands::Stats => report(
                    collector.database_stats().await,
                    json,
                    CliFormatter::database_stats,
                ),
                Commands::SlowQueries { limit } => report(
                    collector.slow_queries(limit).await,
                    json,
                    CliFormatter::slow_queries,
                ),
                Commands::Indexes => report(collector.missing_indexes().await, json, |r| {
                    CliFormatter::missing_indexes(r)
                }),
                Commands::Latency => report(collector.collection_latency().await, json, |r| {
                    CliFormatter::collection_latency(r)
                }),
                Commands::Profile { action } => cmd_profile(action, &collector, &config, json).await,
                Commands::Config { .. } => Ok(()),
            }
        }
    }
}

/// A collector over the configured database. An unreachable server yields a
/// collector without a handle, whose operations all report `NotConnected`.
async fn connect(config: &Config) -> Arc<MetricsCollector> {
    let source = match Database::connect(&config.mongodb).await {
        Ok(db) => Some(Arc::new(MongoSource::new(db)) as Arc<dyn MetricsSource>),
        Err(e) => {
            warn!(
                uri = %config.redacted_uri(),
                error = %e,
                "MongoDB unavailable; metrics requests will report failures"
            );
            None
        }
    };

    Arc::new(MetricsCollector::from_config(source, config))
}

fn report<T: Serialize>(
    result: Result<T, MetricsError>,
    json: bool,
    render: impl Fn(&T),
) -> anyhow::Result<()> {
    if json {
        let failure = result.as_ref().err().map(|e| e.to_string());
        println!("{}", serde_json::to_string_pretty(&ApiEnvelope::from(result))?);
        return match failure {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(()),
        };
    }

    render(&result?);
    Ok(())
}

async fn cmd_serve(
    collector: Arc<MetricsCollector>,
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| config.api.host.clone());
    let port = port.unwrap_or(config.api.port);

    let app = create_router(ApiState {
        collector: Arc::clone(&collector),
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let guard = if config.profiling.enable_on_serve && collector.is_connected() {
        match collector.profile(config.profiling.slow_ms).await {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!(error = %e, "could not enable profiling; slow-query reports may stay empty");
                None
            }
        }
    } else {
        None
    };

    info!(%addr, database = %config.mongodb.database, connected = collector.is_connected(), "metrics API listening");
    CliFormatter::header("QMS Metrics API");
    CliFormatter::kv("Database", &format!("{} ({})", config.mongodb.database, config.redacted_uri()));
    CliFormatter::kv("Listening", &format!("http://{}", addr));
    CliFormatter::kv("Summary", &format!("http://{}/api/admin/mongodb-metrics", addr));
    if !collector.is_connected() {
        CliFormatter::warning("Database connection not established; endpoints will report failures");
    }
    CliFormatter::info("Press Ctrl+C to stop");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    let served = match guard {
        Some(guard) => guard.hold(server).await,
        None => server.await,
    };

    served.context("server error")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn cmd_profile(
    action: ProfileAction,
    collector: &MetricsCollector,
    config: &Config,
    json: bool,
) -> anyhow::Result<()> {
    match action {
        ProfileAction::Status => report(
            collector.profiling_status().await,
            json,
            CliFormatter::profiling_status,
        ),
        ProfileAction::Disable => {
            let result = async {
                let current = collector.profiling_status().await?;
                collector.set_profiling(ProfilingLevel::Off, current.slow_ms).await?;
                collector.profiling_status().await
            }
            .await;
            report(result, json, CliFormatter::profiling_status)
        }
        ProfileAction::Enable { slow_ms, duration } => {
            let slow_ms = slow_ms.unwrap_or(config.profiling.slow_ms);
            let guard = collector.profile(slow_ms).await?;

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "data": {
                            "slowMs": slow_ms,
                            "changed": guard.changed(),
                            "previous": guard.previous(),
                        }
                    })
                );
            } else if guard.changed() {
                CliFormatter::success(&format!("Profiling operations slower than {}ms", slow_ms));
            } else {
                CliFormatter::info(&format!(
                    "Profiler already at level {}; leaving it unchanged",
                    guard.previous().level
                ));
            }

            let changed = guard.changed();
            let waited = guard
                .hold(async {
                    match duration {
                        Some(secs) => {
                            if !json {
                                CliFormatter::info(&format!(
                                    "Restoring in {}s (Ctrl+C to stop early)",
                                    secs
                                ));
                            }
                            tokio::select! {
                                _ = tokio::time::sleep(Duration::from_secs(secs)) => Ok(()),
                                signal = tokio::signal::ctrl_c() => signal,
                            }
                        }
                        None => {
                            if !json {
                                CliFormatter::info("Press Ctrl+C to restore the previous level");
                            }
                            tokio::signal::ctrl_c().await
                        }
                    }
                })
                .await;

            waited?;
            if changed && !json {
                CliFormatter::success("Previous profiling level restored");
            }
            Ok(())
        }
    }
}

fn cmd_config(
    action: ConfigAction,
    target: &Path,
    explicit: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init { force } => {
            Config::init(target, force)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "success": true, "path": target.display().to_string() })
                );
            } else {
                CliFormatter::success(&format!("Wrote {}", target.display()));
            }
        }
        ConfigAction::Show => {
            let mut config = Config::resolve(explicit)?;
            config.mongodb.uri = config.redacted_uri();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

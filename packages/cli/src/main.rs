#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Headless driver for the residue map dashboard.
//!
//! ```text
//! residue_map summary
//! residue_map classify shore.jpg --location Santos
//! residue_map globe --frames 120 --click 400,300
//! residue_map endpoints
//! ```
//!
//! Service URLs come from the compiled-in endpoint registry and can be
//! overridden with `RESIDUE_MAP_API_URL` and `RESIDUE_MAP_CLASSIFY_URLS`.
//! Set `RUST_LOG=debug` to see every endpoint attempt.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use residue_map_analytics::summary::format_percent;
use residue_map_analytics::trend::{date_range, sparkline};
use residue_map_analytics::{AggregateOptions, Snapshot};
use residue_map_dashboard::classify::{Classifier, ImageUpload};
use residue_map_dashboard::driver::run_with_fetch;
use residue_map_dashboard::fetch::SnapshotSource;
use residue_map_dashboard::surface::{HeadlessSurface, RenderSurface};
use residue_map_dashboard::{Dashboard, DashboardConfig, DashboardError, FetchStatus};
use residue_map_globe::palette::{category_color, css_hex};
use residue_map_transport::Transport;
use residue_map_transport::registry::{all_groups, group_from_env};

#[derive(Parser)]
#[command(name = "residue_map", about = "Coastal residue report dashboard")]
struct Cli {
    /// Dashboard settings file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch reports and print the fleet summary as JSON
    Summary {
        /// Sparkline width in pixels
        #[arg(long, default_value = "120")]
        spark_width: f64,
        /// Sparkline height in pixels
        #[arg(long, default_value = "34")]
        spark_height: f64,
    },
    /// Upload an image for residue classification
    Classify {
        /// Image file to upload
        image: PathBuf,
        /// Location label sent with the image
        #[arg(long)]
        location: String,
    },
    /// Run the globe headlessly and optionally resolve a click
    Globe {
        /// Number of frame ticks to run
        #[arg(long, default_value = "120")]
        frames: u64,
        /// Pointer position to click after the run, as `X,Y` pixels
        #[arg(long, value_parser = parse_point)]
        click: Option<(f64, f64)>,
        /// Render surface width in pixels
        #[arg(long, default_value = "800")]
        width: f64,
        /// Render surface height in pixels
        #[arg(long, default_value = "600")]
        height: f64,
    },
    /// List the configured service endpoints
    Endpoints,
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got {s:?}"))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad X: {e}"))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad Y: {e}"))?;
    Ok((x, y))
}

fn load_config(path: Option<&Path>) -> Result<DashboardConfig, DashboardError> {
    path.map_or_else(|| Ok(DashboardConfig::from_env()), DashboardConfig::load)
}

fn aggregate_options(config: &DashboardConfig) -> AggregateOptions {
    AggregateOptions {
        clean_category: config.clean_category.clone(),
        ..AggregateOptions::now()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    log::debug!("Dashboard settings: {config:?}");
    let transport = Arc::new(Transport::with_reqwest());

    match cli.command {
        Commands::Summary {
            spark_width,
            spark_height,
        } => {
            let source =
                SnapshotSource::from_env(transport.clone())?.with_deadline(config.fetch_deadline);
            let snapshot = match source.fetch(&aggregate_options(&config)).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    return Err(e.into());
                }
            };
            log::info!(
                "Fetched {} location(s), {} report(s)",
                snapshot.locations.len(),
                snapshot.summary.total_reports
            );
            let report = summary_report(&snapshot, spark_width, spark_height);
            println!("{}", serde_json::to_string_pretty(&report)?);

            for label in ["locations", "summary"] {
                if let Some(served) = transport.last_served(label)
                    && served.is_degraded()
                {
                    eprintln!("Note: {label} served by fallback {}", served.url);
                }
            }
        }
        Commands::Classify { image, location } => {
            let bytes = tokio::fs::read(&image).await?;
            let file_name = image
                .file_name()
                .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
            log::info!("Classifying {file_name} ({} bytes) at {location:?}", bytes.len());
            let classifier =
                Classifier::from_env(transport)?.with_deadline(config.fetch_deadline);

            match classifier
                .classify(ImageUpload::new(file_name, bytes), &location)
                .await
            {
                Ok(outcome) => {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                    if outcome.source_endpoint.is_degraded() {
                        eprintln!(
                            "Note: classified by fallback endpoint {}",
                            outcome.source_endpoint.url
                        );
                    }
                }
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    return Err(e.into());
                }
            }
        }
        Commands::Globe {
            frames,
            click,
            width,
            height,
        } => {
            let source = SnapshotSource::from_env(transport)?.with_deadline(config.fetch_deadline);
            let options = aggregate_options(&config);

            let mut surface = HeadlessSurface::new(width, height);
            let mut dashboard = Dashboard::new(config);
            dashboard.mount(surface.viewport());

            let report =
                run_with_fetch(&mut dashboard, &mut surface, source.fetch(&options), frames).await;

            println!("phase: {}", dashboard.phase());
            println!("ticks: {}", report.ticks);
            println!("frames presented: {}", report.presented);
            if let Some(last) = surface.last_frame() {
                println!("markers: {}", last.marker_count);
                println!("globe rotation: {:.4} rad", last.globe_rotation);
            }
            if let FetchStatus::Failed { message } = dashboard.status() {
                eprintln!("{message}");
            }

            if let Some((x, y)) = click {
                match dashboard.click(x, y) {
                    Some(selected) => println!("{}", serde_json::to_string_pretty(selected)?),
                    None => println!("No location at ({x}, {y})"),
                }
            }

            if dashboard.unmount() {
                log::debug!("Dashboard unmounted");
            }
        }
        Commands::Endpoints => {
            for group in all_groups() {
                let group = group_from_env(&group.id).unwrap_or(group);
                println!("{} ({}, {})", group.id, group.name, group.method);
                for endpoint in group.enabled_endpoints() {
                    println!(
                        "  {:<2} {:<20} {:<9} {}",
                        endpoint.priority,
                        endpoint.id,
                        endpoint.role,
                        endpoint.url()
                    );
                }
            }
        }
    }

    Ok(())
}

fn summary_report(snapshot: &Snapshot, spark_width: f64, spark_height: f64) -> serde_json::Value {
    let reports: Vec<_> = snapshot
        .locations
        .iter()
        .flat_map(|l| l.member_reports.iter().cloned())
        .collect();
    let locations: Vec<serde_json::Value> = snapshot
        .locations
        .iter()
        .map(|l| {
            serde_json::json!({
                "locationLabel": l.location_label,
                "totalReports": l.total_reports,
                "dominantCategory": l.dominant_category,
                "color": css_hex(category_color(&l.dominant_category)),
            })
        })
        .collect();

    serde_json::json!({
        "summary": snapshot.summary,
        "residueRate": format_percent(snapshot.summary.residue_rate),
        "changeRate": format_percent(snapshot.summary.change_rate),
        "dateRange": date_range(&reports).map(|r| r.to_string()),
        "sparkline": sparkline(&snapshot.summary.trend_series, spark_width, spark_height),
        "locations": locations,
    })
}

//! reportvis - browse, filter, chart and map service-request records
//!
//! Each command builds the matching view over the shared filter state,
//! refreshes it once and prints its snapshot as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use sr_core::events::events::{AppliedFiltersChanged, QueryFailed};
use sr_core::events::handler_from_fn;
use sr_core::{AppState, QueryClient, Record};
use sr_data::{ClientConfig, HttpQueryClient, ReportService};
use sr_views::{
    ChartView, HeatmapView, MapView, RefreshOutcome, SpaceView, TableView, ViewStatus, ViewerContext,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod demo;

/// Refresh attempts before giving up on a view whose filters keep moving
const MAX_REFRESH_ATTEMPTS: usize = 3;

#[derive(Parser, Debug)]
#[command(name = "reportvis")]
#[command(about = "Browse, filter, chart and map service-request records")]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serve a generated in-memory dataset instead of the report API
    #[arg(long)]
    demo: bool,

    /// Filter as column=value; repeat for several values or columns
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One page of the record table
    Table {
        /// Page number, 1-based
        #[arg(long, default_value = "1")]
        page: String,
    },
    /// Filter values of a column, scoped to the other filters
    Values { column: String },
    /// Number of matching records
    Count,
    /// Distribution of a categorical column
    Chart {
        column: String,
        /// Slices kept before the rest is folded into OTHER
        #[arg(long)]
        top: Option<usize>,
    },
    /// Map pins
    Map,
    /// Heat map points
    Heatmap {
        /// Column requested from the heat map endpoint
        #[arg(long)]
        column: Option<String>,
    },
}

fn parse_filter(arg: &str) -> Result<(String, String), String> {
    let (column, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected column=value, got '{}'", arg))?;
    if !Record::has_column(column) {
        return Err(format!("unknown column '{}'", column));
    }
    Ok((column.to_string(), value.to_string()))
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sr_core=debug,sr_views=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    let config = match path {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ClientConfig::default(),
    }
    .with_env_overrides();

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_context(state: &AppState, client: Arc<dyn QueryClient>, config: ClientConfig) -> ViewerContext {
    state.event_bus.subscribe::<AppliedFiltersChanged>(handler_from_fn(|event| {
        if let Some(change) = event.as_any().downcast_ref::<AppliedFiltersChanged>() {
            debug!(
                "Filters now at generation {} ({} columns)",
                change.generation, change.active_columns
            );
        }
    }));
    state.event_bus.subscribe::<QueryFailed>(handler_from_fn(|event| {
        if let Some(failure) = event.as_any().downcast_ref::<QueryFailed>() {
            warn!("Query '{}' degraded: {}", failure.operation, failure.error);
        }
    }));

    let service = ReportService::new(client).with_event_bus(state.event_bus.clone());
    ViewerContext::new(state.filters.clone(), Arc::new(service), Arc::new(config))
}

/// Refresh a view until it reflects the current filters, then snapshot it
async fn refreshed(view: &mut dyn SpaceView, ctx: &ViewerContext) -> Value {
    for attempt in 1..=MAX_REFRESH_ATTEMPTS {
        if view.refresh(ctx).await == RefreshOutcome::Updated {
            break;
        }
        warn!("{} refresh {} was stale, retrying", view.view_type(), attempt);
    }

    if let ViewStatus::Failed(message) = view.status() {
        error!("{} failed: {}", view.title(), message);
    }
    view.snapshot()
}

async fn run(command: Command, ctx: &ViewerContext) -> Result<Value> {
    let output = match command {
        Command::Table { page } => {
            let mut table = TableView::from_config("Service Requests", &ctx.config)?;
            table.go_to_page(&page)?;
            refreshed(&mut table, ctx).await
        }
        Command::Values { column } => {
            let mut table = TableView::from_config("Service Requests", &ctx.config)?;
            table.open_filter(ctx, &column).await?;
            json!({
                "column": column,
                "values": table.filter_values(),
            })
        }
        Command::Count => {
            let filters = ctx.filters.applied();
            let count = ctx.service.fetch_count(&filters).await;
            json!({
                "filters": filters,
                "count": count,
            })
        }
        Command::Chart { column, top } => {
            let display_limit = top.unwrap_or(ctx.config.chart_display_limit);
            let mut chart = ChartView::new("Dashboard", &column, ctx.config.chart_sample_limit, display_limit)?;
            refreshed(&mut chart, ctx).await
        }
        Command::Map => {
            let mut map = MapView::new("Map", ctx.config.map_limit);
            refreshed(&mut map, ctx).await
        }
        Command::Heatmap { column } => {
            let mut heatmap = HeatmapView::from_config("Heat Map", &ctx.config);
            heatmap.set_column(column.as_deref())?;
            refreshed(&mut heatmap, ctx).await
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let client: Arc<dyn QueryClient> = if cli.demo {
        Arc::new(demo::demo_client())
    } else {
        Arc::new(HttpQueryClient::new(&config).context("Failed to create HTTP client")?)
    };
    info!("Using {} source", client.source_name());

    let state = AppState::new();
    let ctx = build_context(&state, client, config);

    // Same path as the table: stage every selection, then apply once
    if !cli.filters.is_empty() {
        for (column, value) in &cli.filters {
            if !ctx.filters.toggle_staged(column, value) {
                bail!("Filter {}={} given twice", column, value);
            }
        }
        ctx.filters.apply_staged();
    }

    let output = run(cli.command, &ctx).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            parse_filter("borough=BRONX"),
            Ok(("borough".to_string(), "BRONX".to_string()))
        );
        assert_eq!(
            parse_filter("incidentAddress=1 MAIN ST=REAR"),
            Ok(("incidentAddress".to_string(), "1 MAIN ST=REAR".to_string()))
        );
        assert!(parse_filter("borough").is_err());
        assert!(parse_filter("nope=1").is_err());
    }

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from([
            "reportvis", "--demo", "--filter", "borough=BRONX", "chart", "complaintType", "--top", "5",
        ])
        .unwrap();
        assert!(cli.demo);
        assert_eq!(cli.filters.len(), 1);
        assert!(matches!(cli.command, Command::Chart { top: Some(5), .. }));
    }

    #[tokio::test]
    async fn test_demo_chart_end_to_end() {
        let state = AppState::new();
        let ctx = build_context(&state, Arc::new(demo::demo_client()), ClientConfig::default());
        ctx.filters.toggle_staged("borough", "BRONX");
        ctx.filters.apply_staged();

        let output = run(
            Command::Chart {
                column: "complaintType".to_string(),
                top: Some(2),
            },
            &ctx,
        )
        .await
        .unwrap();

        assert_eq!(output["status"]["state"], "ready");
        let slices = output["slices"].as_array().unwrap();
        assert_eq!(slices.len(), 3);
        assert!(slices[2]["label"].as_str().unwrap().ends_with("OTHER"));
    }
}

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use timeseries_loader::config::{load_config, AxisCheck, LongConfig, WideConfig};
use timeseries_loader::data::export::{pretty, write_csv, write_parquet};
use timeseries_loader::data::loader::load_dataset;
use timeseries_loader::data::model::Table;
use timeseries_loader::{can_accept_long, can_accept_wide, reshape_long, reshape_wide};

#[derive(Parser)]
#[command(version, about = "Reshape file-referenced time series into tables")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// One row per series, one column per timestamp.
    Wide(WideArgs),
    /// One row per series sample, joined with its source row.
    Long(LongArgs),
}

#[derive(Args)]
struct Common {
    /// Dataset descriptor (JSON).
    #[arg(long)]
    dataset: PathBuf,
    /// JSON options file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Reference column index; inferred from annotations when omitted.
    #[arg(long)]
    file_col: Option<usize>,
    /// Write to .parquet or .csv instead of printing.
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Only report whether the configuration applies to the dataset.
    #[arg(long)]
    check: bool,
}

#[derive(Args)]
struct WideArgs {
    #[command(flatten)]
    common: Common,
    /// Resource holding the reference column.
    #[arg(long, default_value = "1")]
    resource: String,
    #[arg(long)]
    time_col: Option<usize>,
    #[arg(long)]
    value_col: Option<usize>,
    #[arg(long, value_enum)]
    axis_check: Option<AxisCheck>,
}

#[derive(Args)]
struct LongArgs {
    #[command(flatten)]
    common: Common,
    #[arg(long)]
    main_resource: Option<String>,
    #[arg(long)]
    reference_resource: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when `--check` rejects the configuration.
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Wide(args) => run_wide(args),
        Command::Long(args) => run_long(args),
    }
}

fn run_wide(args: WideArgs) -> Result<bool> {
    let mut config: WideConfig = match &args.common.config {
        Some(path) => load_config(path).context("loading wide options")?,
        None => WideConfig::default(),
    };
    if args.common.file_col.is_some() {
        config.file_col_index = args.common.file_col;
    }
    if let Some(t) = args.time_col {
        config.time_col_index = t;
    }
    if let Some(v) = args.value_col {
        config.value_col_index = v;
    }
    if let Some(check) = args.axis_check {
        config.axis_check = check;
    }

    let dataset = load_dataset(&args.common.dataset).context("loading dataset")?;
    let Some(table) = dataset.get(&args.resource) else {
        bail!("resource '{}' not found in dataset", args.resource);
    };

    if args.common.check {
        return Ok(report(can_accept_wide(table, Some(&dataset), &config)));
    }
    let out = reshape_wide(table, Some(&dataset), &config).context("wide reshape")?;
    emit(&out, args.common.output.as_deref())?;
    Ok(true)
}

fn run_long(args: LongArgs) -> Result<bool> {
    let mut config: LongConfig = match &args.common.config {
        Some(path) => load_config(path).context("loading long options")?,
        None => LongConfig::default(),
    };
    if args.common.file_col.is_some() {
        config.file_col_index = args.common.file_col;
    }
    if args.main_resource.is_some() {
        config.main_resource = args.main_resource;
    }
    if args.reference_resource.is_some() {
        config.reference_resource = args.reference_resource;
    }

    let dataset = load_dataset(&args.common.dataset).context("loading dataset")?;
    if args.common.check {
        return Ok(report(can_accept_long(&dataset, &config)));
    }
    let out = reshape_long(&dataset, &config).context("long reshape")?;
    emit(&out, args.common.output.as_deref())?;
    Ok(true)
}

fn report(accepted: bool) -> bool {
    println!("{}", if accepted { "accepted" } else { "rejected" });
    accepted
}

fn emit(table: &Table, output: Option<&Path>) -> Result<()> {
    let Some(path) = output else {
        println!("{}", pretty(table)?);
        return Ok(());
    };

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "parquet" | "pq" => write_parquet(table, path)?,
        "csv" => write_csv(table, path)?,
        other => bail!("Unsupported output extension: .{other}"),
    }
    info!(
        "wrote {} rows x {} columns to {}",
        table.num_rows(),
        table.num_columns(),
        path.display()
    );
    Ok(())
}

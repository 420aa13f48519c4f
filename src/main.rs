//! Breath Classifier CLI
//!
//! Aggregates breath-sensor logs into per-patient features and classifies
//! them locally or through the prediction service.

use anyhow::{bail, Context};
use breath_classifier::{
    aggregate_sources,
    config::Config,
    core::{FeatureTable, FeatureVector, FEATURE_COUNT},
    inference::{Label, LabelCounts, ModelBundle},
    VERSION,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "breath-classifier")]
#[command(version = VERSION)]
#[command(about = "Breath-sensor feature aggregation and classification", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate patient logs into a feature table
    Aggregate {
        /// Log files or directories of log files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output CSV (defaults to the configured export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Classify a feature table with the prediction service
    Predict {
        /// Feature table CSV
        #[arg(long, short)]
        input: PathBuf,

        /// Write the table with a Prediction column to this CSV
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Prediction service URL (overrides config)
        #[arg(long)]
        url: Option<String>,
    },

    /// Classify one feature vector with the prediction service
    PredictOne {
        /// 65 comma-separated values: Min_Sec, D1..D64
        #[arg(long, value_delimiter = ',', num_args = 1.., allow_hyphen_values = true)]
        values: Vec<f64>,

        /// Prediction service URL (overrides config)
        #[arg(long)]
        url: Option<String>,
    },

    /// Classify a feature table with a local model artifact
    Classify {
        /// Feature table CSV
        #[arg(long, short)]
        input: PathBuf,

        /// Model artifact (overrides config)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Write the table with a Prediction column to this CSV
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Run the prediction service
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Model artifact (overrides config)
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Show or change configuration
    Config {
        /// Set a value and save, as KEY=VALUE (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Could not load config, using defaults: {}", e);
        Config::default()
    });

    let result = match cli.command {
        Commands::Aggregate { inputs, output } => cmd_aggregate(&config, &inputs, output),
        Commands::Predict { input, output, url } => {
            cmd_predict(&config, &input, output.as_deref(), url.as_deref())
        }
        Commands::PredictOne { values, url } => cmd_predict_one(&config, &values, url.as_deref()),
        Commands::Classify {
            input,
            model,
            output,
        } => cmd_classify(&config, &input, model, output.as_deref()),
        #[cfg(feature = "server")]
        Commands::Serve { port, model } => cmd_serve(&config, port, model),
        Commands::Config { set } => cmd_config(&mut config, &set),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_aggregate(config: &Config, inputs: &[PathBuf], output: Option<PathBuf>) -> anyhow::Result<()> {
    let report = aggregate_sources(inputs);
    println!("{}", report.summary());

    if report.patients.is_empty() {
        bail!("no patients could be aggregated");
    }

    let output = match output {
        Some(path) => path,
        None => {
            config.ensure_directories()?;
            config.default_export_file()
        }
    };

    let table = FeatureTable::from(&report);
    table
        .export_csv(&output)
        .with_context(|| format!("writing feature table to {output:?}"))?;
    println!();
    println!("Exported {} patients to {:?}", table.len(), output);
    Ok(())
}

#[cfg(feature = "client")]
fn cmd_predict(
    config: &Config,
    input: &Path,
    output: Option<&Path>,
    url: Option<&str>,
) -> anyhow::Result<()> {
    use breath_classifier::BlockingInferenceClient;

    let table = FeatureTable::import_csv(input)?;
    if table.is_empty() {
        bail!("{input:?} contains no rows");
    }

    let client = BlockingInferenceClient::new(config.client_config(url))?;
    println!("Sending {} records to {}", table.len(), client.config().base_url);
    let labels = client.predict_batch(&table.vectors())?;

    report_labels(&table, &labels, output)
}

#[cfg(not(feature = "client"))]
fn cmd_predict(_: &Config, _: &Path, _: Option<&Path>, _: Option<&str>) -> anyhow::Result<()> {
    bail!("remote prediction requires the `client` feature")
}

#[cfg(feature = "client")]
fn cmd_predict_one(config: &Config, values: &[f64], url: Option<&str>) -> anyhow::Result<()> {
    use breath_classifier::BlockingInferenceClient;

    let vector = vector_from_args(values)?;
    let client = BlockingInferenceClient::new(config.client_config(url))?;
    let label = client.predict(&vector)?;
    println!("Test result: {}", label.report_text());
    Ok(())
}

#[cfg(not(feature = "client"))]
fn cmd_predict_one(_: &Config, _: &[f64], _: Option<&str>) -> anyhow::Result<()> {
    bail!("remote prediction requires the `client` feature")
}

fn cmd_classify(
    config: &Config,
    input: &Path,
    model: Option<PathBuf>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let model_path = model.unwrap_or_else(|| config.model_path.clone());
    let model = ModelBundle::load(&model_path)?;
    let table = FeatureTable::import_csv(input)?;
    if table.is_empty() {
        bail!("{input:?} contains no rows");
    }

    let labels = model.classify(&table.vectors());
    report_labels(&table, &labels, output)
}

#[cfg(feature = "server")]
fn cmd_serve(config: &Config, port: Option<u16>, model: Option<PathBuf>) -> anyhow::Result<()> {
    use breath_classifier::server::{run, ServerConfig};

    let model_path = model.unwrap_or_else(|| config.model_path.clone());
    let model = ModelBundle::load(&model_path)?;
    let server_config = ServerConfig::new(port.unwrap_or(config.server_port), model);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let (addr, shutdown_tx) = run(server_config).await?;
        println!("Prediction service on http://{addr}");
        println!("Press Ctrl+C to stop");

        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        ctrlc::set_handler(move || {
            let _ = stop_tx.send(());
        })
        .context("installing Ctrl+C handler")?;

        tokio::task::spawn_blocking(move || stop_rx.recv()).await??;
        let _ = shutdown_tx.send(());
        println!();
        println!("Stopping prediction service...");
        Ok::<(), anyhow::Error>(())
    })
}

fn cmd_config(config: &mut Config, settings: &[String]) -> anyhow::Result<()> {
    for setting in settings {
        let (key, value) = setting
            .split_once('=')
            .with_context(|| format!("expected KEY=VALUE, got {setting:?}"))?;
        config.set(key.trim(), value.trim())?;
    }
    if !settings.is_empty() {
        config.save()?;
        println!("Saved {} setting(s)", settings.len());
        println!();
    }

    println!("Breath Classifier v{VERSION}");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn vector_from_args(values: &[f64]) -> anyhow::Result<FeatureVector> {
    let values: [f64; FEATURE_COUNT] = values.try_into().map_err(|_| {
        anyhow::anyhow!(
            "expected {FEATURE_COUNT} values (Min_Sec, D1..D64), got {}",
            values.len()
        )
    })?;
    Ok(FeatureVector::from_values(values))
}

fn report_labels(table: &FeatureTable, labels: &[Label], output: Option<&Path>) -> anyhow::Result<()> {
    for (row, label) in table.rows.iter().zip(labels) {
        println!("  {:<20} {}", row.patient_id, label.report_text());
    }
    let counts: LabelCounts = labels.iter().collect();
    println!();
    println!("{counts}");

    if let Some(path) = output {
        let file = std::fs::File::create(path).with_context(|| format!("creating {path:?}"))?;
        table.write_labeled_csv(file, labels)?;
        println!("Wrote predictions to {path:?}");
    }
    Ok(())
}

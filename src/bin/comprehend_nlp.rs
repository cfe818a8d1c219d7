//! comprehend-nlp: 使用 Amazon Comprehend 并行处理数据集的命令行工具
//!
//! Usage:
//!   comprehend-nlp run --config <file> --input <file> --output <file>
//!   comprehend-nlp check-config --config <file> [--input <file>]
//!   comprehend-nlp version

use anyhow::{bail, Context};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use comprehend_nlp::dataset::{InputDataset, JsonLinesDataset};
use comprehend_nlp::recipe::{Recipe, RecipeConfig};
use comprehend_nlp::transport::HttpComprehendClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "run" => cmd_run(&args[2..]).await,
        "check-config" => cmd_check_config(&args[2..]),
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"comprehend-nlp: Amazon Comprehend 数据集处理工具

USAGE:
    comprehend-nlp <COMMAND> [OPTIONS]

COMMANDS:
    run --config <file> --input <file> --output <file>
                                Apply the configured capability to a JSON Lines dataset
    check-config --config <file> [--input <file>]
                                Validate a recipe configuration
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN, AWS_REGION
    COMPREHEND_ENDPOINT_URL     Override the service endpoint
    COMPREHEND_PARALLEL_WORKERS, COMPREHEND_BATCH_SIZE
    COMPREHEND_QUOTA_RATE_LIMIT, COMPREHEND_QUOTA_PERIOD_SECS
    RUST_LOG                    Log filter (default: info)"#
    );
}

fn cmd_version() {
    println!("comprehend-nlp {}", env!("CARGO_PKG_VERSION"));
}

fn flag(args: &[String], name: &str) -> Option<PathBuf> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

fn required(args: &[String], name: &str) -> anyhow::Result<PathBuf> {
    match flag(args, name) {
        Some(path) => Ok(path),
        None => bail!("missing required option {name} <file>"),
    }
}

fn load_config(args: &[String]) -> anyhow::Result<RecipeConfig> {
    let path = required(args, "--config")?;
    RecipeConfig::from_path(&path).with_context(|| format!("loading {}", path.display()))
}

fn cmd_check_config(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args)?;
    if let Some(input) = flag(args, "--input") {
        let columns = JsonLinesDataset::new(&input).column_names()?;
        config.validate(&columns)?;
        println!("✅ configuration is valid for {} ({} columns)", input.display(), columns.len());
    } else {
        println!("✅ configuration parsed");
    }
    println!("   capability: {:?}", config.capability());
    println!("   batching:   {:?}", config.batch_config());
    println!(
        "   quota:      {} calls / {}s, {} workers",
        config.api_configuration_preset.api_quota_rate_limit,
        config.api_configuration_preset.api_quota_period,
        config.api_configuration_preset.parallel_workers
    );
    Ok(())
}

async fn cmd_run(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let input = JsonLinesDataset::new(required(args, "--input")?);
    let mut output = JsonLinesDataset::new(required(args, "--output")?);

    let client = HttpComprehendClient::new(config.http_client_config()?)?;
    let recipe = Recipe::new(config, Arc::new(client));
    let summary = recipe.run(&input, &mut output).await?;

    println!(
        "processed {} rows ({} failed) in {:.1}s -> {}",
        summary.rows,
        summary.failed_rows,
        summary.elapsed.as_secs_f64(),
        output.path().display()
    );
    Ok(())
}

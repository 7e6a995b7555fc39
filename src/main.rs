use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use regex::Regex;
use std::path::{Path, PathBuf};
use tmplet::{EngineConfig, TemplateEngine};

/// `NAME=VALUE` pairs given with `--var`.
const VAR_PATTERN: &str = r"^(?P<name>[A-Za-z_][A-Za-z0-9_]*)=(?P<value>.*)$";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Template to render, relative to the template directory
    template: Option<String>,

    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template directory (overrides config if provided)
    #[arg(short = 'D', long)]
    dir: Option<PathBuf>,

    /// JSON or YAML file whose top-level map is assigned as variables
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Assign a variable; VALUE is parsed as JSON, falling back to a string
    #[arg(short, long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,

    /// Write the output to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            EngineConfig::load(path).context("Failed to load config")?
        }
        None => EngineConfig::default(),
    };
    let mut engine = TemplateEngine::from_config(config)?;

    if let Some(dir) = &cli.dir {
        engine.set_template_dir(dir)?;
    }

    if let Some(data_path) = &cli.data {
        info!("Loading data from {:?}", data_path);
        let data = load_data(data_path)?;
        engine.assign_dataset(data)?;
    }

    let re = Regex::new(VAR_PATTERN)?;
    for var in &cli.vars {
        let (name, value) = parse_var(&re, var)?;
        debug!("Assigning {} = {}", name, value);
        engine.assign(name, value)?;
    }

    match &cli.output {
        Some(output) => {
            let rendered = engine.fetch(cli.template.as_deref())?;
            std::fs::write(output, rendered)
                .with_context(|| format!("Failed to write output file {:?}", output))?;
            info!("{:?}", output);
        }
        None => engine.display(cli.template.as_deref())?,
    }

    Ok(())
}

fn load_data(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path).context("Failed to read data file")?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    let data = if is_yaml {
        serde_yaml::from_str(&content).context("Failed to parse YAML data")?
    } else {
        serde_json::from_str(&content).context("Failed to parse JSON data")?
    };
    if !matches!(data, serde_json::Value::Object(_)) {
        anyhow::bail!("Data file {:?} must contain a map", path);
    }
    Ok(data)
}

fn parse_var(re: &Regex, var: &str) -> Result<(String, serde_json::Value)> {
    let caps = re
        .captures(var)
        .ok_or_else(|| anyhow::anyhow!("Invalid variable '{}', expected NAME=VALUE", var))?;
    let name = caps["name"].to_string();
    let raw = &caps["value"];
    let value = serde_json::from_str(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((name, value))
}

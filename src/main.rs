use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use renderpdf::{RenderOptions, RenderRequest, Settings, TemplateNames, UrlFetcher};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Render Handlebars templates to PDF.
#[derive(Parser, Debug)]
#[command(name = "renderpdf", version, about)]
struct Cli {
    /// Settings file (TOML). Defaults to ./renderpdf.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the first existing template to a PDF file.
    Render {
        /// Candidate template names, tried in order.
        #[arg(long = "template", required = true, num_args = 1..)]
        templates: Vec<String>,

        /// JSON object used as the template context.
        #[arg(long)]
        context: Option<PathBuf>,

        #[arg(long, short)]
        output: PathBuf,

        /// Engine option as KEY=VALUE; VALUE is parsed as JSON, else taken as a string.
        #[arg(long = "option", value_parser = parse_option)]
        options: Vec<(String, Value)>,
    },
    /// Fetch a URL through the configured fetch chain.
    Fetch { url: String },
}

fn parse_option(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty option name in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn load_context(path: Option<&PathBuf>) -> anyhow::Result<Map<String, Value>> {
    let Some(path) = path else {
        return Ok(Map::new());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading context file {}", path.display()))?;
    match serde_json::from_str(&raw)? {
        Value::Object(map) => Ok(map),
        other => bail!("context must be a JSON object, got {}", other),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let fetcher: Arc<dyn UrlFetcher> = Arc::new(settings.build_fetcher(None)?);

    match cli.command {
        Command::Render {
            templates,
            context,
            output,
            options,
        } => {
            let names = TemplateNames::new(templates).context("no template names given")?;
            let overrides: RenderOptions = options.into_iter().collect();
            let request = RenderRequest::new(names)
                .with_context(load_context(context.as_ref())?)
                .with_options(overrides);

            let renderer = settings.build_renderer(fetcher);
            renderer.render_to_file(&request, &output)?;
            log::info!("Wrote {}", output.display());
        }
        Command::Fetch { url } => {
            let resource = fetcher.fetch(&url)?;
            println!(
                "{} {} bytes",
                resource.mime_type.as_deref().unwrap_or("unknown"),
                resource.content.len()
            );
        }
    }
    Ok(())
}

//! Fragment Composer CLI
//!
//! Usage:
//!   fragment-composer [OPTIONS] <COMMAND>
//!
//! Commands:
//!   render   Render a template file or URL against JSON data
//!   compose  Compose a page from a TOML manifest and print its HTML
//!   lint     Check a template's block tags
//!
//! Options:
//!   -v, --verbose  Log lifecycle activity to stderr (repeat for more)

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fragment_composer::{compose_file, lint, Context, TemplateEngine};

#[derive(Parser)]
#[command(name = "fragment-composer")]
#[command(about = "Compose pages from reusable markup fragments")]
struct Cli {
    /// Log lifecycle activity to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template file or URL against JSON data
    Render {
        /// Template file, or an http(s) URL to fetch
        template: String,

        /// JSON file holding the data object
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Compose a page from a TOML manifest and print its HTML
    Compose {
        /// Manifest file
        manifest: PathBuf,
    },

    /// Check a template's block tags
    Lint {
        /// Template file
        template: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Render { template, data } => run_render(&template, data.as_deref()).await,
        Command::Compose { manifest } => run_compose(&manifest).await,
        Command::Lint { template } => run_lint(&template),
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

async fn run_render(template: &str, data: Option<&Path>) -> Result<ExitCode, String> {
    let data = match data {
        Some(path) => read_data(path)?,
        None => Context::new(),
    };

    let mut engine = TemplateEngine::new();
    let source = if template.starts_with("http") {
        template.to_string()
    } else {
        fs::read_to_string(template)
            .map_err(|e| format!("reading template '{}': {}", template, e))?
    };
    engine
        .register_template("cli", &source)
        .await
        .map_err(|e| e.to_string())?;

    println!("{}", engine.render_named("cli", &data));
    Ok(ExitCode::SUCCESS)
}

fn read_data(path: &Path) -> Result<Context, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("reading data file '{}': {}", path.display(), e))?;
    serde_json::from_str::<Context>(&content)
        .map_err(|e| format!("data file '{}' is not a JSON object: {}", path.display(), e))
}

async fn run_compose(manifest: &Path) -> Result<ExitCode, String> {
    let composition = compose_file(manifest).await.map_err(|e| e.to_string())?;
    println!("{}", composition.html);

    if composition.is_complete() {
        return Ok(ExitCode::SUCCESS);
    }
    for mount in &composition.failed {
        eprintln!(
            "Failed to mount fragment '{}' into '{}'",
            mount.fragment, mount.target
        );
    }
    Ok(ExitCode::FAILURE)
}

fn run_lint(path: &Path) -> Result<ExitCode, String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("reading template '{}': {}", path.display(), e))?;
    let filename = path.display().to_string();

    let warnings = lint(&source);
    for warning in &warnings {
        eprint!("{}", warning.format(&source, &filename));
    }

    if warnings.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{} warning(s)", warnings.len());
        Ok(ExitCode::FAILURE)
    }
}

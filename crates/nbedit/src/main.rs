use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nbedit::{Config, EditContext, Request, Response};
use nbformat::v4::Notebook;
use nbformat::SourceStyle;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nbedit", version, about = "Edit Jupyter notebooks one atomic operation at a time")]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Print the full response as JSON instead of its text
    #[arg(long, global = true)]
    json: bool,

    /// Kernel name written into new notebooks
    #[arg(long, global = true, env = "NBEDIT_KERNEL", default_value = "python3")]
    kernel: String,

    /// Kernel display name written into new notebooks
    #[arg(long, global = true, env = "NBEDIT_KERNEL_DISPLAY_NAME", default_value = "Python 3")]
    kernel_display_name: String,

    /// Language written into new notebooks
    #[arg(long, global = true, env = "NBEDIT_LANGUAGE", default_value = "python")]
    language: String,

    /// How cell sources are written to disk
    #[arg(long, global = true, env = "NBEDIT_SOURCE_STYLE", value_enum, default_value_t = StyleArg::Lines)]
    source_style: StyleArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum StyleArg {
    Lines,
    Joined,
}

impl From<StyleArg> for SourceStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Lines => SourceStyle::Lines,
            StyleArg::Joined => SourceStyle::Joined,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty notebook
    Create {
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Apply one operation given as JSON, e.g. '{"operation":"count"}'
    Run {
        path: PathBuf,
        /// Request JSON, or `-` to read it from stdin
        request: String,
    },
    /// Check a notebook file's structure without decoding it
    Check { path: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::default()
        .with_kernel(&cli.kernel, &cli.kernel_display_name, &cli.language)
        .with_source_style(cli.source_style.into());
    let ctx = EditContext::new(config);

    match cli.command {
        Command::Create { path, force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            let notebook = ctx.create_notebook();
            save(&ctx, &path, &notebook)?;
            println!("Created {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Run { path, request } => {
            let request = read_request(&request)?;
            let response = if matches!(request, Request::Validate) {
                Response::validation(nbformat::validate::validate(&load_value(&path)?))
            } else {
                let mut notebook = load(&path)?;
                let response = ctx
                    .apply(&mut notebook, request)
                    .with_context(|| format!("operation failed on {}", path.display()))?;
                if response.modified {
                    save(&ctx, &path, &notebook)?;
                    tracing::info!(path = %path.display(), "saved notebook");
                }
                response
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.text);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { path } => {
            let response = Response::validation(nbformat::validate::validate(&load_value(&path)?));
            println!("{}", response.text);
            Ok(if response.is_invalid() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

fn read_request(arg: &str) -> Result<Request> {
    let text = if arg == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read request from stdin")?;
        buf
    } else {
        arg.to_string()
    };
    serde_json::from_str(&text).context("invalid request")
}

fn load(path: &Path) -> Result<Notebook> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    nbformat::parse_notebook(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Raw JSON of a notebook file, for validating documents that may not decode.
fn load_value(path: &Path) -> Result<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn save(ctx: &EditContext, path: &Path, notebook: &Notebook) -> Result<()> {
    let text = ctx.encode(notebook)?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use gherkin_lens::config::EditorConfig;
use gherkin_lens::editor::Editor;
use gherkin_lens::{format, PayloadFiles};

#[derive(Parser, Debug)]
#[command(
    name = "gherkin-lens",
    version,
    about = "Tokenize, check and serve behavior-style step scripts",
    long_about = "Editing support for behavior-style step scripts.\n\n\
        Classifies script lines against a configurable keyword vocabulary,\n\
        indexes reusable steps for completion, and tracks breakpoints and\n\
        runtime highlights for a debugging host.\n\n\
        Examples:\n  \
        gherkin-lens tokenize login.feature --keywords keywords.json\n  \
        gherkin-lens steps steps.json --keywords keywords.json --format markdown\n  \
        gherkin-lens check login.feature --catalog steps.json --keywords keywords.json\n  \
        gherkin-lens host --config editor.json\n  \
        gherkin-lens lsp"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "json",
        help = "Output format",
        long_help = "Output format.\n  json     - JSON (default, best for programmatic use)\n  markdown - Human-readable markdown"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        help = "Editor configuration file (JSON)",
        long_help = "Editor configuration file (JSON).\n\n\
            Sets the breakpoint report delay, diagnostics debounce, built-in\n\
            keywords and initial keyword/element/variable/step payloads."
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Debug)]
enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the token classes of every line of a script
    Tokenize {
        /// Script file
        file: PathBuf,

        #[arg(long, short, help = "Keyword list (JSON array of phrases)")]
        keywords: Option<PathBuf>,
    },

    /// List the step catalog with computed keys and labels
    #[command(long_about = "List the step catalog with computed keys and labels.\n\n\
        Each step's leading keyword is split off and its placeholders are\n\
        filled from the element table (then the variable table).\n\n\
        Examples:\n  \
        gherkin-lens steps steps.json --keywords keywords.json\n  \
        gherkin-lens steps steps.json -k keywords.json -e elements.json --format markdown")]
    Steps {
        /// Step list (JSON array of {insertText, sortText, section, ...})
        catalog: PathBuf,

        #[arg(long, short, help = "Keyword list (JSON array of phrases)")]
        keywords: Option<PathBuf>,

        #[arg(long, short, help = "Element table (JSON object of name: label)")]
        elements: Option<PathBuf>,

        #[arg(long, short, help = "Variable table (JSON object of name: value)")]
        variables: Option<PathBuf>,
    },

    /// Report lines whose step is not in the catalog (exit code 1 if any)
    Check {
        /// Script file
        file: PathBuf,

        #[arg(long, short, help = "Step list (JSON array)")]
        catalog: PathBuf,

        #[arg(long, short, help = "Keyword list (JSON array of phrases)")]
        keywords: Option<PathBuf>,
    },

    /// Run the JSON-lines host bridge on stdio
    Host,

    /// Start the Language Server Protocol server (stdio)
    Lsp,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("GHERKIN_LENS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EditorConfig> {
    match path {
        Some(path) => Ok(EditorConfig::load(path)?),
        None => Ok(EditorConfig::default()),
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Tokenize { file, keywords } => {
            let context = gherkin_lens::load_context(
                &config,
                PayloadFiles {
                    keywords: keywords.as_deref(),
                    ..Default::default()
                },
            )?;
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let result = gherkin_lens::tokenize_text(&context, &text);
            print_output(&cli.format, &result, |r| format::tokens(r))?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Steps {
            catalog,
            keywords,
            elements,
            variables,
        } => {
            let context = gherkin_lens::load_context(
                &config,
                PayloadFiles {
                    keywords: keywords.as_deref(),
                    elements: elements.as_deref(),
                    variables: variables.as_deref(),
                    steps: Some(catalog.as_path()),
                },
            )?;
            let result = gherkin_lens::step_entries(&context);
            print_output(&cli.format, &result, |r| format::steps(r))?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Check {
            file,
            catalog,
            keywords,
        } => {
            let context = gherkin_lens::load_context(
                &config,
                PayloadFiles {
                    keywords: keywords.as_deref(),
                    steps: Some(catalog.as_path()),
                    ..Default::default()
                },
            )?;
            let result = gherkin_lens::check_file(&context, &file)?;
            let clean = result.is_empty();
            print_output(&cli.format, &result, |r| format::problems(r))?;
            Ok(if clean {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }

        Command::Host => {
            let editor = Editor::from_config(&config)?;
            let delay = Duration::from_millis(config.report_delay_ms);
            gherkin_lens::host::serve_stdio(editor, delay).await?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Lsp => {
            gherkin_lens::lsp::serve_stdio(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Print output in the requested format
fn print_output<T: serde::Serialize>(
    fmt: &OutputFormat,
    value: &T,
    markdown_fn: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    match fmt {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Markdown => {
            print!("{}", markdown_fn(value));
        }
    }
    Ok(())
}

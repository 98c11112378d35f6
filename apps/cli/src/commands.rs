//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use autoresearch_completion::CompletionOptions;
use autoresearch_core::download::{download_link, write_document};
use autoresearch_core::pipeline::{
    ProgressReporter, ResearchConfig, ResearchMode, ResearchReport, run_research,
};
use autoresearch_core::view::{ViewMode, render};
use autoresearch_fetch::FetchOptions;
use autoresearch_shared::{
    AppConfig, DecodedResults, ResearchError, ResultSet, init_config, load_config,
    validate_api_key,
};
use autoresearch_sources::{determine_sources, include_user_sources, split_lines};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// autoresearch: gather research results as portable XML.
#[derive(Parser)]
#[command(
    name = "autoresearch",
    version,
    about = "Gather research results from the web, APIs or a completion endpoint and save them as XML.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Extra sources named on the command line.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct SourceArgs {
    /// Additional web page URL (repeatable).
    #[arg(long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// Additional API URL (repeatable).
    #[arg(long = "api", value_name = "URL")]
    pub apis: Vec<String>,

    /// File with one additional web page URL per line.
    #[arg(long, value_name = "FILE")]
    pub urls_from: Option<PathBuf>,

    /// File with one additional API URL per line.
    #[arg(long, value_name = "FILE")]
    pub apis_from: Option<PathBuf>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Research a query and encode the results as XML.
    Research {
        /// Free-text research query.
        query: String,

        /// Ask the completion endpoint instead of consulting sources.
        #[arg(long)]
        completion: bool,

        #[command(flatten)]
        sources: SourceArgs,

        /// Fetch each source (scrape pages, call APIs) into the results.
        #[arg(long)]
        fetch: bool,

        /// Bearer token for API sources (overrides the configured env var).
        #[arg(long, env = "AUTORESEARCH_API_TOKEN", hide_env_values = true)]
        api_token: Option<String>,

        /// Write the XML document to this path.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print an HTML download link for the document.
        #[arg(long)]
        link: bool,

        /// Show every field instead of one title per item.
        #[arg(long)]
        detailed: bool,
    },

    /// List the sources a query would consult.
    Sources {
        /// Free-text research query.
        query: String,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Encode a JSON result set file as an XML document.
    Encode {
        /// JSON file: an object of categories.
        input: PathBuf,

        /// Write the document here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Decode an XML document and show its contents.
    Decode {
        /// XML document to read.
        input: PathBuf,

        /// Show every field instead of one title per item.
        #[arg(long)]
        detailed: bool,
    },

    /// Print an HTML download link embedding an XML document.
    Link {
        /// XML document to embed.
        input: PathBuf,

        /// File name offered to the browser.
        #[arg(long)]
        filename: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "autoresearch=info",
        1 => "autoresearch=debug",
        _ => "autoresearch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Research {
            query,
            completion,
            sources,
            fetch,
            api_token,
            out,
            link,
            detailed,
        } => {
            let opts = ResearchOpts {
                completion,
                fetch,
                api_token,
                out,
                link,
                detailed,
            };
            cmd_research(&query, &sources, opts).await
        }
        Command::Sources { query, sources } => cmd_sources(&query, &sources),
        Command::Encode { input, out } => cmd_encode(&input, out.as_deref()),
        Command::Decode { input, detailed } => cmd_decode(&input, detailed),
        Command::Link { input, filename } => cmd_link(&input, filename.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

struct ResearchOpts {
    completion: bool,
    fetch: bool,
    api_token: Option<String>,
    out: Option<PathBuf>,
    link: bool,
    detailed: bool,
}

async fn cmd_research(query: &str, sources: &SourceArgs, opts: ResearchOpts) -> Result<()> {
    let config = load_config()?;

    let mode = if opts.completion {
        // Fail before any network traffic when the key is missing.
        let api_key = validate_api_key(&config)?;
        ResearchMode::Completion {
            options: CompletionOptions::from(&config.completion),
            api_key,
        }
    } else {
        ResearchMode::Sources { fetch: opts.fetch }
    };

    let (additional_urls, additional_apis) = collect_user_sources(sources)?;
    if opts.completion && !(additional_urls.is_empty() && additional_apis.is_empty()) {
        warn!("user-specified sources are ignored in completion mode");
    }

    let research = ResearchConfig {
        query: query.to_string(),
        mode,
        additional_urls,
        additional_apis,
        fetch: FetchOptions::from(&config.fetch),
        api_token: opts.api_token.or_else(|| config.fetch.api_key()),
    };

    info!(query, completion = opts.completion, fetch = opts.fetch, "researching");

    let reporter = CliProgress::new();
    let report = run_research(&research, &reporter).await?;

    if let Some(path) = &opts.out {
        write_document(path, &report.xml)?;
    }

    let decoded = autoresearch_xml::decode(&report.xml)?;

    println!();
    println!("  Research complete!");
    println!("  Method:     {}", report.method);
    println!("  Sources:    {}", report.sources.len());
    println!("  Categories: {}", report.results.len());
    println!("  Size:       {} bytes", report.xml.len());
    if let Some(path) = &opts.out {
        println!("  Path:       {}", path.display());
    }
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();

    for source in &report.sources {
        println!("  {source}");
    }
    if !report.sources.is_empty() {
        println!();
    }

    print!("{}", render(&decoded, view_mode(opts.detailed)));

    if opts.link {
        let filename = opts
            .out
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .unwrap_or(config.defaults.output_file.as_str());
        println!();
        println!(
            "{}",
            download_link(&report.xml, filename, &config.defaults.download_text)
        );
    }

    Ok(())
}

fn cmd_sources(query: &str, sources: &SourceArgs) -> Result<()> {
    let (urls, apis) = collect_user_sources(sources)?;
    let found = include_user_sources(determine_sources(query), &urls, &apis)?;

    if found.is_empty() {
        println!("No sources matched '{query}'.");
        return Ok(());
    }
    for source in &found {
        println!("{source}");
    }
    Ok(())
}

fn cmd_encode(input: &Path, out: Option<&Path>) -> Result<()> {
    let json = std::fs::read_to_string(input).map_err(|e| ResearchError::io(input, e))?;
    let results = ResultSet::from_json_str(&json)
        .wrap_err_with(|| format!("cannot encode {}", input.display()))?;

    let xml = autoresearch_xml::encode(&results)?;

    match out {
        Some(path) => {
            write_document(path, &xml)?;
            println!("Document written to: {}", path.display());
        }
        None => {
            let text = String::from_utf8(xml).map_err(|e| eyre!("encoder produced invalid UTF-8: {e}"))?;
            print!("{text}");
        }
    }
    Ok(())
}

fn cmd_decode(input: &Path, detailed: bool) -> Result<()> {
    let bytes = std::fs::read(input).map_err(|e| ResearchError::io(input, e))?;

    let decoded = decode_or_empty(&bytes)
        .wrap_err_with(|| format!("cannot decode {}", input.display()))?;

    print!("{}", render(&decoded, view_mode(detailed)));
    Ok(())
}

/// Decode a document, treating a malformed one as empty. Other errors propagate.
fn decode_or_empty(bytes: &[u8]) -> autoresearch_shared::Result<DecodedResults> {
    decode_with(bytes, autoresearch_xml::decode)
}

fn decode_with(
    bytes: &[u8],
    decode: impl FnOnce(&[u8]) -> autoresearch_shared::Result<DecodedResults>,
) -> autoresearch_shared::Result<DecodedResults> {
    match decode(bytes) {
        Ok(decoded) => Ok(decoded),
        Err(e @ ResearchError::Parse { .. }) => {
            warn!(error = %e, "error parsing XML; showing nothing");
            Ok(DecodedResults::new())
        }
        Err(e) => Err(e),
    }
}

fn cmd_link(input: &Path, filename: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let xml = std::fs::read(input).map_err(|e| ResearchError::io(input, e))?;
    let filename = filename.unwrap_or(config.defaults.output_file.as_str());
    println!(
        "{}",
        download_link(&xml, filename, &config.defaults.download_text)
    );
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn view_mode(detailed: bool) -> ViewMode {
    if detailed {
        ViewMode::Detailed
    } else {
        ViewMode::Summary
    }
}

/// Merge repeated `--url`/`--api` flags with the contents of `--urls-from`/`--apis-from`.
fn collect_user_sources(args: &SourceArgs) -> Result<(Vec<String>, Vec<String>)> {
    let mut urls = args.urls.clone();
    let mut apis = args.apis.clone();
    if let Some(path) = &args.urls_from {
        urls.extend(read_lines(path)?);
    }
    if let Some(path) = &args.apis_from {
        apis.extend(read_lines(path)?);
    }
    Ok((urls, apis))
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let block = std::fs::read_to_string(path).map_err(|e| ResearchError::io(path, e))?;
    Ok(split_lines(&block))
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("static spinner template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_fetched(&self, url: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetched [{current}/{total}] {url}"));
    }

    fn done(&self, _report: &ResearchReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn research_flags_parse() {
        let cli = Cli::try_parse_from([
            "autoresearch",
            "research",
            "corporate misconduct",
            "--url",
            "https://a.example",
            "--url",
            "https://b.example",
            "--api",
            "https://api.example",
            "--fetch",
            "--link",
        ])
        .expect("parse");

        match cli.command {
            Command::Research {
                query,
                sources,
                fetch,
                link,
                completion,
                ..
            } => {
                assert_eq!(query, "corporate misconduct");
                assert_eq!(sources.urls.len(), 2);
                assert_eq!(sources.apis, ["https://api.example"]);
                assert!(fetch && link && !completion);
            }
            _ => panic!("expected research command"),
        }
    }

    #[test]
    fn malformed_document_decodes_to_empty_view() {
        let decoded =
            decode_or_empty(b"<ResearchResults><open></ResearchResults>").expect("fallback");
        assert!(decoded.is_empty());
        assert_eq!(render(&decoded, ViewMode::Summary), "");

        let decoded = decode_or_empty(b"\xff\xfe not utf-8").expect("fallback");
        assert!(decoded.is_empty());
    }

    #[test]
    fn well_formed_document_decodes_normally() {
        let decoded =
            decode_or_empty(b"<r><c><Item><title>T</title></Item></c></r>").expect("decode");
        assert_eq!(decoded["c"][0]["title"].as_deref(), Some("T"));
    }

    #[test]
    fn non_parse_errors_still_fail() {
        let err = decode_with(b"<r/>", |_| Err(ResearchError::validation("boom"))).unwrap_err();
        assert!(matches!(err, ResearchError::Validation { .. }));
    }

    #[test]
    fn decode_accepts_detailed_flag() {
        let cli = Cli::try_parse_from(["autoresearch", "-vv", "decode", "out.xml", "--detailed"])
            .expect("parse");
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Decode { detailed: true, .. }));
    }

    #[test]
    fn user_sources_merge_flags_and_files() {
        let path = std::env::temp_dir().join(format!("autoresearch-urls-{}.txt", std::process::id()));
        std::fs::write(&path, "https://c.example\n\n  https://d.example \n").expect("write list");

        let args = SourceArgs {
            urls: vec!["https://a.example".into()],
            urls_from: Some(path.clone()),
            ..SourceArgs::default()
        };
        let (urls, apis) = collect_user_sources(&args).expect("collect");
        let _ = std::fs::remove_file(&path);

        assert_eq!(urls, ["https://a.example", "https://c.example", "https://d.example"]);
        assert!(apis.is_empty());
    }
}

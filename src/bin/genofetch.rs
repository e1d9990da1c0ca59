use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use genofetch::app::{App, DownloadResult, FetchResult, MetadataSource, ProgressSink};
use genofetch::config::{self, ConfigLoader};
use genofetch::datasets_api::DatasetsApiClient;
use genofetch::datasets_cli::{DatasetsCliClient, ToolStatus};
use genofetch::domain::{Backend, GenomeAccession, TaxonQuery};
use genofetch::error::GenofetchError;
use genofetch::output::{ConsoleProgress, JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "genofetch")]
#[command(about = "Fetch bacterial genome assemblies from NCBI by taxon query")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List genome accessions matching a taxon")]
    Fetch(FetchArgs),
    #[command(about = "Fetch accessions and download their genome archives")]
    Download(DownloadArgs),
    #[command(about = "Show external tool availability")]
    Tools,
}

#[derive(Args, Clone)]
struct FetchArgs {
    taxon: Option<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    backend: Option<Backend>,

    #[arg(long)]
    limit: Option<u32>,
}

#[derive(Args, Clone)]
struct DownloadArgs {
    #[command(flatten)]
    fetch: FetchArgs,

    /// Download only the first N fetched accessions.
    #[arg(long)]
    take: Option<usize>,

    #[arg(long)]
    output: Option<String>,
}

struct RunSettings {
    taxon: TaxonQuery,
    backend: Backend,
    max_records: u32,
    output_dir: Utf8PathBuf,
    take: Option<usize>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<GenofetchError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GenofetchError) -> u8 {
    match error {
        GenofetchError::MissingConfig
        | GenofetchError::ConfigRead(_)
        | GenofetchError::ConfigParse(_) => 2,
        GenofetchError::NcbiHttp(_)
        | GenofetchError::NcbiStatus { .. }
        | GenofetchError::DatasetsCli(_)
        | GenofetchError::MissingTool(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Some(Commands::Fetch(args)) => run_fetch(args, output_mode),
        Some(Commands::Download(args)) => run_download(args, output_mode),
        Some(Commands::Tools) => run_tools(output_mode),
        None => run_driver(output_mode),
    }
}

/// Default invocation: resolve genofetch.json, list matching accessions,
/// then download the configured prefix of the result list.
fn run_driver(output_mode: OutputMode) -> miette::Result<()> {
    let resolved = ConfigLoader::resolve(None)?;
    let settings = RunSettings {
        taxon: resolved.taxon,
        backend: resolved.backend,
        max_records: resolved.max_records,
        output_dir: resolved.output_dir,
        take: Some(resolved.download_limit),
    };
    let (fetch, download) = execute_download(&settings, output_mode)?;
    match output_mode {
        OutputMode::NonInteractive => {
            JsonOutput::print_fetch(&fetch).into_diagnostic()?;
            JsonOutput::print_download(&download).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            print_fetch_summary(&fetch);
            print_download_summary(&download);
        }
    }
    Ok(())
}

fn run_fetch(args: FetchArgs, output_mode: OutputMode) -> miette::Result<()> {
    let settings = resolve_settings(args, None, None)?;
    let fetch = execute_fetch(&settings, output_mode)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_fetch(&fetch).into_diagnostic()?,
        OutputMode::Interactive => print_fetch_summary(&fetch),
    }
    Ok(())
}

fn run_download(args: DownloadArgs, output_mode: OutputMode) -> miette::Result<()> {
    let DownloadArgs {
        fetch: fetch_args,
        take,
        output,
    } = args;
    let settings = resolve_settings(fetch_args, take, output)?;
    let (fetch, download) = execute_download(&settings, output_mode)?;
    match output_mode {
        OutputMode::NonInteractive => {
            JsonOutput::print_fetch(&fetch).into_diagnostic()?;
            JsonOutput::print_download(&download).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            print_fetch_summary(&fetch);
            print_download_summary(&download);
        }
    }
    Ok(())
}

fn run_tools(output_mode: OutputMode) -> miette::Result<()> {
    let client = DatasetsCliClient::new();
    match output_mode {
        OutputMode::NonInteractive => {
            JsonOutput::print_tools(&client.tool_info()).into_diagnostic()?
        }
        OutputMode::Interactive => match client.tool_status() {
            ToolStatus::Ready => match client.tool_info().datasets {
                Some(version) => println!("datasets: {version}"),
                None => println!("datasets: found (version unavailable)"),
            },
            ToolStatus::Missing { message } => println!("{message}"),
        },
    }
    Ok(())
}

/// Command-line arguments win over the config file; the config file is
/// only consulted when no taxon was given on the command line.
fn resolve_settings(
    args: FetchArgs,
    take: Option<usize>,
    output: Option<String>,
) -> miette::Result<RunSettings> {
    let FetchArgs {
        taxon,
        config: config_path,
        backend,
        limit,
    } = args;

    if let Some(taxon) = taxon {
        return Ok(RunSettings {
            taxon: taxon.parse::<TaxonQuery>()?,
            backend: backend.unwrap_or(Backend::Cli),
            max_records: limit.unwrap_or(config::default_max_records()),
            output_dir: Utf8PathBuf::from(
                output.unwrap_or_else(|| config::default_output_dir().to_string()),
            ),
            take,
        });
    }

    let resolved = ConfigLoader::resolve(config_path.as_deref())?;
    Ok(RunSettings {
        taxon: resolved.taxon,
        backend: backend.unwrap_or(resolved.backend),
        max_records: limit.unwrap_or(resolved.max_records),
        output_dir: output.map(Utf8PathBuf::from).unwrap_or(resolved.output_dir),
        take: take.or(Some(resolved.download_limit)),
    })
}

fn execute_fetch(settings: &RunSettings, output_mode: OutputMode) -> miette::Result<FetchResult> {
    match settings.backend {
        Backend::Cli => fetch_with(DatasetsCliClient::new(), settings, output_mode),
        Backend::Api => fetch_with(DatasetsApiClient::new()?, settings, output_mode),
    }
}

fn fetch_with<S: MetadataSource>(
    source: S,
    settings: &RunSettings,
    output_mode: OutputMode,
) -> miette::Result<FetchResult> {
    let app = App::new(source, DatasetsCliClient::new());
    let sink = progress_sink(output_mode);
    Ok(app.fetch(&settings.taxon, settings.max_records, sink.as_ref())?)
}

fn execute_download(
    settings: &RunSettings,
    output_mode: OutputMode,
) -> miette::Result<(FetchResult, DownloadResult)> {
    match settings.backend {
        Backend::Cli => download_with(DatasetsCliClient::new(), settings, output_mode),
        Backend::Api => download_with(DatasetsApiClient::new()?, settings, output_mode),
    }
}

fn download_with<S: MetadataSource>(
    source: S,
    settings: &RunSettings,
    output_mode: OutputMode,
) -> miette::Result<(FetchResult, DownloadResult)> {
    let app = App::new(source, DatasetsCliClient::new());
    let sink = progress_sink(output_mode);
    let fetch = app.fetch(&settings.taxon, settings.max_records, sink.as_ref())?;

    let take = settings.take.unwrap_or(fetch.accessions.len());
    let accessions: Vec<GenomeAccession> = fetch
        .accessions
        .iter()
        .take(take)
        .map(|value| value.parse())
        .collect::<Result<_, GenofetchError>>()?;

    let download = app.download(&accessions, &settings.output_dir, sink.as_ref())?;
    Ok((fetch, download))
}

fn progress_sink(output_mode: OutputMode) -> Box<dyn ProgressSink> {
    match output_mode {
        OutputMode::NonInteractive => Box::new(JsonOutput),
        OutputMode::Interactive => Box::new(ConsoleProgress),
    }
}

fn print_fetch_summary(result: &FetchResult) {
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!(
        "{cyan}Found {} genomes for taxon {}{reset}",
        result.total, result.taxon
    );
    for accession in &result.accessions {
        println!(" - {accession}");
    }
}

fn print_download_summary(result: &DownloadResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    println!(
        "Downloaded {} of {} archives to {}",
        result.downloaded,
        result.items.len(),
        result.output_dir
    );
    for item in &result.items {
        match &item.error {
            None => println!("{green}  ok {} -> {}{reset}", item.accession, item.archive_path),
            Some(error) => println!("{red}  failed {}: {error}{reset}", item.accession),
        }
    }
    if result.failed > 0 {
        println!("{yellow}{} download(s) failed{reset}", result.failed);
    }
}

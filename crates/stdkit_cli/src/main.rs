/* 📖 # What is the CLI for?

The library is meant to be embedded, but each component has a natural one-shot use from a
shell: dump a CSV file as JSON lines, fetch a URL, re-encode a JSON document. Settings come
from `--config FILE`, or from `stdkit.toml` in the current directory when it exists, and
command-line flags win over both.

Exit codes:
- 0: Success
- 1: Error (message on stderr)
*/

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;
use stdkit::config::{StdkitConfig, load_config};
use stdkit::{CsvFileIterator, CsvJsonFileIterator, TransferOption};
use stdkit_base::tracing::init_tracing;
use stdkit_base::{ErrorKind, ResultExt, StdkitError, StdkitResult};
use tracing::debug;

const DEFAULT_CONFIG: &str = "stdkit.toml";

#[derive(Parser)]
#[command(name = "stdkit")]
#[command(about = "Read CSV files, fetch URLs and re-encode JSON", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./stdkit.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print each record of a CSV file as one JSON document
    Csv {
        path: PathBuf,
        /// The first row holds column names
        #[arg(long)]
        header: bool,
        #[arg(long)]
        delimiter: Option<char>,
        #[arg(long)]
        enclosure: Option<char>,
        #[arg(long)]
        escape: Option<char>,
        /// Pad short rows instead of failing (needs --header)
        #[arg(long)]
        allow_fewer: bool,
        /// Drop extra fields instead of failing (needs --header)
        #[arg(long)]
        allow_more: bool,
    },
    /// Print each line of a file of comma-separated JSON values
    CsvJson { path: PathBuf },
    /// Fetch a URL and print the response body
    Fetch {
        url: String,
        /// Request header as 'Name: value' (can be specified multiple times)
        #[arg(long = "header", short = 'H', action = clap::ArgAction::Append)]
        headers: Vec<String>,
        /// Timeout for the whole transfer, in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Fail on HTTP status 400 and above
        #[arg(long)]
        fail: bool,
        /// Print the transfer info as JSON after the body
        #[arg(long)]
        info: bool,
    },
    /// Re-encode the JSON document read from stdin
    Json {
        #[arg(long)]
        pretty: bool,
        #[arg(long)]
        max_depth: Option<u32>,
    },
}

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Warning: {}", e);
    }

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> StdkitResult<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None if Path::new(DEFAULT_CONFIG).is_file() => load_config(DEFAULT_CONFIG)?,
        None => StdkitConfig::default(),
    };
    debug!(?config, "effective configuration");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Commands::Csv {
            path,
            header,
            delimiter,
            enclosure,
            escape,
            allow_fewer,
            allow_more,
        } => {
            let mut options = config.csv.clone();
            options.header_row |= header;
            options.allow_fewer_columns |= allow_fewer;
            options.allow_more_columns |= allow_more;
            if let Some(delimiter) = delimiter {
                options.delimiter = delimiter;
            }
            if let Some(enclosure) = enclosure {
                options.enclosure = enclosure;
            }
            if escape.is_some() {
                options.escape = escape;
            }
            let encoder = config.json.encoder()?;
            for record in CsvFileIterator::open(&path, options)? {
                writeln!(out, "{}", encoder.encode(&record?)?).map_err(output_error)?;
            }
        }
        Commands::CsvJson { path } => {
            let encoder = config.json.encoder()?;
            let mut iterator = CsvJsonFileIterator::open(&path)?;
            *iterator.decoder_mut() = config.json.decoder()?;
            for entry in iterator {
                let (line, values) = entry?;
                writeln!(out, "{}\t{}", line, encoder.encode(&values)?).map_err(output_error)?;
            }
        }
        Commands::Fetch {
            url,
            headers,
            timeout,
            fail,
            info,
        } => {
            let mut client = config.transfer.client();
            client.set_option(TransferOption::Url(url));
            client.set_option(TransferOption::FailOnError(fail));
            if let Some(secs) = timeout {
                client.set_option(TransferOption::Timeout(Duration::from_secs(secs)));
            }
            for header in &headers {
                let (name, value) = parse_header(header)?;
                client.set_option(TransferOption::Header(name, value));
            }
            let body = client.execute()?;
            out.write_all(&body).map_err(output_error)?;
            if let Some(transfer_info) = client.info().filter(|_| info) {
                let encoder = config.json.encoder()?;
                writeln!(out).map_err(output_error)?;
                writeln!(out, "{}", encoder.encode(transfer_info)?).map_err(output_error)?;
            }
        }
        Commands::Json { pretty, max_depth } => {
            let mut json = config.json.clone();
            json.options.pretty_print |= pretty;
            if let Some(max_depth) = max_depth {
                json.max_depth = max_depth;
            }
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|source| Box::new(StdkitError::new(ErrorKind::Io { source })))
                .context("Failed to read stdin")?;
            let value = json.decoder()?.decode(&text)?;
            writeln!(out, "{}", json.encoder()?.encode(&value)?).map_err(output_error)?;
        }
    }
    out.flush().map_err(output_error)
}

/// Splits `Name: value` at the first colon.
fn parse_header(header: &str) -> StdkitResult<(String, String)> {
    match header.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(Box::new(StdkitError::invalid_input(format!(
            "Invalid header, expected 'Name: value': {header}"
        )))),
    }
}

fn output_error(source: io::Error) -> Box<StdkitError> {
    Box::new(StdkitError::new(ErrorKind::Io { source }).context("Failed to write output"))
}

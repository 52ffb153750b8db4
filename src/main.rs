//! CLI entry point for `emlsift`.

use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use walkdir::WalkDir;

use emlsift::cancel::CancelToken;
use emlsift::config;
use emlsift::email::Email;
use emlsift::model::metrics::Metrics;
use emlsift::parser::attrs::read_message;

#[derive(Parser)]
#[command(name = "emlsift", version, about = "Dissect .eml files for threat intel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect raw Received headers from every .eml under a directory
    Received {
        /// Directory to scan recursively
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Output file
        #[arg(short, long, default_value = "recv_headers.txt")]
        output: PathBuf,
        /// File extension to match
        #[arg(long, default_value = ".eml")]
        ext: String,
    },
    /// Decode one message: metrics and relay chain
    Inspect {
        path: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print per-part SHA-256 digests of one message
    Hashes {
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = config::load_config();

    match cli.command {
        Commands::Received { dir, output, ext } => cmd_received(&dir, &output, &ext),
        Commands::Inspect { path, json } => cmd_inspect(&path, json, &cfg),
        Commands::Hashes { path } => cmd_hashes(&path, &cfg),
    }
}

fn init_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Walk `dir` for files with `ext` and append each message's raw
/// `Received` values to `output`, one blank line between messages.
fn cmd_received(dir: &Path, output: &Path, ext: &str) -> anyhow::Result<()> {
    let mut out = File::create(output)
        .with_context(|| format!("creating output file '{}'", output.display()))?;

    let mut messages: u64 = 0;
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(ext) {
            continue;
        }

        let data = match std::fs::read(entry.path()) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "skipping unreadable file");
                continue;
            }
        };

        let (attrs, _) = read_message(&data)?;
        for value in attrs.get_all("Received") {
            if value.is_empty() {
                continue;
            }
            writeln!(out, "{value}")?;
        }
        writeln!(out)?;
        messages += 1;
    }

    tracing::info!(messages, output = %output.display(), "Received headers collected");
    Ok(())
}

fn cmd_inspect(path: &Path, json: bool, cfg: &config::Config) -> anyhow::Result<()> {
    let data = std::fs::read(path)
        .with_context(|| format!("reading '{}'", path.display()))?;

    let email = Email::decode_with_limit(&data, &CancelToken::new(), cfg.parser.max_depth)
        .with_context(|| format!("decoding '{}'", path.display()))?;
    let metrics = Metrics::compile(&email)?;
    let chain = email.received_chain()?;

    if json {
        let doc = serde_json::json!({
            "metrics": metrics,
            "received_chain": chain,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Subject:     {}", metrics.subject);
    println!("Message-ID:  {}", metrics.envelope.id);
    if let Some(date) = metrics.envelope.date {
        println!("Date:        {date}");
    }
    for from in &metrics.envelope.from {
        println!("From:        {from}");
    }
    for to in &metrics.envelope.to {
        println!("To:          {to}");
    }
    println!("Attachments: {}", metrics.attachments);
    println!("Embedded:    {}", metrics.embeds);

    println!("\nParts ({}):", metrics.hashes.len());
    for digest in &metrics.hashes {
        println!("  {digest}");
    }

    if !metrics.links.is_empty() {
        println!("\nLinks:");
        for link in &metrics.links {
            println!("  {link}");
        }
    }

    println!("\nRelay chain ({} hops):", chain.len());
    for (i, hop) in chain.iter().enumerate() {
        let by = hop.by.as_deref().unwrap_or("?");
        let helo = hop.helo.as_deref().unwrap_or("-");
        let id = hop.id.as_deref().unwrap_or("-");
        let date = hop
            .date
            .map(|d| d.to_rfc2822())
            .unwrap_or_else(|| "-".to_string());
        println!("  #{i} by={by} helo={helo} id={id} date={date}");
    }

    Ok(())
}

fn cmd_hashes(path: &Path, cfg: &config::Config) -> anyhow::Result<()> {
    let data = std::fs::read(path)
        .with_context(|| format!("reading '{}'", path.display()))?;

    let email = Email::decode_with_limit(&data, &CancelToken::new(), cfg.parser.max_depth)
        .with_context(|| format!("decoding '{}'", path.display()))?;

    for digest in email.hashes()? {
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        println!("{hex}");
    }

    Ok(())
}

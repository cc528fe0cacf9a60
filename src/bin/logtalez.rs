// src/bin/logtalez.rs

//! Command-line log tail.
//!
//! ```text
//! logtalez --endpoints tcp://logs1:24444,tcp://logs2:24444 \
//!          --hosts web1,web2 --programs nginx \
//!          --servercertpath ~/.curve/server_cert \
//!          --clientcertpath ~/.curve/client_cert
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use logtalez::{
    // ---
    create_zmq_transport,
    payload::cee_payload,
    LogTail,
    LogTailBuilder,
    TailError,
};

/// Tail encrypted syslog streams from remote forwarders.
#[derive(Parser, Debug)]
#[command(name = "logtalez", version)]
struct Args {
    /// Comma delimited list of publisher endpoints
    #[arg(long)]
    endpoints: String,

    /// Comma delimited list of hostnames to get logs from
    #[arg(long, default_value = "")]
    hosts: String,

    /// Comma delimited list of programs to get logs from
    #[arg(long, default_value = "")]
    programs: String,

    /// Comma delimited list of explicit topics (instead of hosts/programs)
    #[arg(long, conflicts_with_all = ["hosts", "programs"])]
    topics: Option<String>,

    /// Path to server public cert
    #[arg(long = "servercertpath")]
    server_cert_path: PathBuf,

    /// Path to client cert (secret key read from <path>_secret when present)
    #[arg(long = "clientcertpath")]
    client_cert_path: PathBuf,

    /// Restrict output to the JSON body of @cee: lines
    #[arg(long)]
    json: bool,

    /// Strip everything up to and including this delimiter from each line
    #[arg(long)]
    delimiter: Option<String>,
}

fn check_cert(kind: &str, path: &Path) -> Result<(), String> {
    // ---
    std::fs::metadata(path)
        .map(|_| ())
        .map_err(|err| format!("error reading {kind} certificate {path:?}: {err}"))
}

fn print_line(line: &[u8], json: bool) {
    // ---
    let line = String::from_utf8_lossy(line);
    if !json {
        println!("{line}");
        return;
    }

    match cee_payload(&line) {
        Some(body) => println!("{body}"),
        None => tracing::debug!(target: "logtalez", "skipping line without @cee: marker"),
    }
}

async fn tail_until_interrupted(tail: &mut LogTail, json: bool) -> Result<(), TailError> {
    // ---
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = &mut interrupt => {
                tracing::info!(target: "logtalez", "interrupted, shutting down");
                return Ok(());
            }
            line = tail.read_payload() => print_line(&line?, json),
        }
    }
}

async fn run(args: Args) -> Result<(), String> {
    // ---
    check_cert("server", &args.server_cert_path)?;
    check_cert("client", &args.client_cert_path)?;

    let mut builder = LogTailBuilder::new()
        .transport(create_zmq_transport())
        .endpoints(&args.endpoints)
        .server_cert(&args.server_cert_path)
        .client_cert(&args.client_cert_path);

    builder = match args.topics {
        Some(topics) => builder.topics(topics),
        None => builder.hosts(args.hosts).programs(args.programs),
    };
    if let Some(delimiter) = args.delimiter {
        builder = builder.topic_delimiter(delimiter);
    }

    let mut tail = builder.build().await.map_err(|err| err.to_string())?;

    let tailed = tail_until_interrupted(&mut tail, args.json).await;
    let torn_down = tail.teardown().await;

    tailed.and(torn_down).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    // ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            tracing::error!(target: "logtalez", "{msg}");
            ExitCode::FAILURE
        }
    }
}

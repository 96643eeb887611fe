//! Command-line surface.
//!
//! - `send` plays the role of the capture pipeline: every file given is
//!   treated as a photo that was just saved, and gets its own transfer.
//! - `receive` runs the reference receiver.
//! - `config` edits the persisted endpoint and receive directory.

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;

use crate::{
    capture::CapturePipeline,
    config::{AppConfig, EndpointEditor},
    entities::Endpoint,
    receiver::PhotoReceiver,
    sender::{PhotoSender, SenderConfig},
    source::FileProvider,
};

#[derive(Parser, Debug)]
#[clap(name = "camdrop", version)]
#[clap(about = "Send captured photos to a host over raw TCP", long_about = None)]
pub struct Cli {
    /// Log transfer progress and diagnostics
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send photos, one connection per file
    Send {
        #[clap(required = true)]
        files: Vec<PathBuf>,

        /// Host to send to, instead of the configured one
        #[clap(long)]
        host: Option<String>,

        /// Port to send to, instead of the configured one
        #[clap(long)]
        port: Option<String>,

        /// Bytes per read/write
        #[clap(long)]
        chunk_size: Option<usize>,
    },

    /// Receive photos and store each connection as one file
    Receive {
        /// Address to listen on
        #[clap(long, default_value = "0.0.0.0")]
        bind: String,

        /// Port to listen on, defaults to the configured endpoint port
        #[clap(long)]
        port: Option<u16>,

        /// Directory to store photos in
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Exit after the first photo
        #[clap(long)]
        once: bool,
    },

    /// Show or change the saved configuration
    #[clap(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the current configuration
    Show,
    /// Save the endpoint photos are sent to
    SetEndpoint { host: String, port: String },
    /// Save the directory received photos are stored in
    SetOutput { dir: PathBuf },
    /// Forget the saved receive directory
    ClearOutput,
    /// Restore every setting to its default
    Reset,
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Command::Send {
            files,
            host,
            port,
            chunk_size,
        } => run_send(files, host, port, chunk_size).await,
        Command::Receive {
            bind,
            port,
            output,
            once,
        } => run_receive(bind, port, output, once).await,
        Command::Config(command) => run_config(command),
    }
}

async fn run_send(
    files: Vec<PathBuf>,
    host: Option<String>,
    port: Option<String>,
    chunk_size: Option<usize>,
) -> Result<()> {
    let config = AppConfig::load()?;

    for file in &files {
        if !file.is_file() {
            return Err(anyhow!("File does not exist: {}", file.display()));
        }
    }

    let mut endpoint = config.endpoint.clone();
    if let Some(host) = host {
        endpoint.host = host;
    }
    if let Some(port) = port {
        endpoint.port = Endpoint::parse_port(&port)?;
    }
    let sender_config = match chunk_size {
        Some(chunk_size) => SenderConfig::with_chunk_size(chunk_size)?,
        None => config.sender_config()?,
    };

    let sender = PhotoSender::new(Arc::new(FileProvider), sender_config)?;
    let pipeline = CapturePipeline::new(sender, EndpointEditor::new(endpoint));

    let mut handles = Vec::with_capacity(files.len());
    for file in &files {
        let reference = file
            .to_str()
            .ok_or_else(|| anyhow!("Path is not valid UTF-8: {}", file.display()))?;
        println!("Photo capture succeeded: {reference}");
        handles.push(pipeline.on_capture_saved(reference));
    }

    // Transfers are detached; only keep the process alive until they end.
    for handle in handles {
        handle.wait().await;
    }
    Ok(())
}

async fn run_receive(
    bind: String,
    port: Option<u16>,
    output: Option<PathBuf>,
    once: bool,
) -> Result<()> {
    let config = AppConfig::load()?;
    let port = port.unwrap_or(config.endpoint.port);
    let output_dir = output
        .or(config.receive_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    let receiver = PhotoReceiver::bind((bind.as_str(), port), output_dir)
        .await
        .with_context(|| format!("Failed to listen on {bind}:{port}"))?;
    println!("Listening on {}", receiver.local_addr()?);

    if once {
        let photo = receiver.accept_one().await?;
        println!(
            "Received {} bytes from {}: {}",
            photo.bytes,
            photo.peer,
            photo.path.display()
        );
        return Ok(());
    }

    tokio::select! {
        result = receiver.run() => result.context("Receiver stopped"),
        _ = tokio::signal::ctrl_c() => Ok(()),
    }
}

fn run_config(command: ConfigCommand) -> Result<()> {
    let mut config = AppConfig::load()?;
    match command {
        ConfigCommand::Show => {
            println!("Endpoint: {}", config.endpoint);
            println!("Chunk size: {} bytes", config.chunk_size);
            match &config.receive_dir {
                Some(dir) => println!("Receive directory: {}", dir.display()),
                None => println!("No default receive directory set"),
            }
            return Ok(());
        }
        ConfigCommand::SetEndpoint { host, port } => {
            config.endpoint = Endpoint::from_text(&host, &port)?;
            println!("Endpoint set to {}", config.endpoint);
        }
        ConfigCommand::SetOutput { dir } => {
            println!("Receive directory set to {}", dir.display());
            config.receive_dir = Some(dir);
        }
        ConfigCommand::ClearOutput => {
            config.receive_dir = None;
            println!("Receive directory cleared");
        }
        ConfigCommand::Reset => {
            config = AppConfig::default();
            println!("Configuration reset");
        }
    }
    config.save()
}

mod cli;

use streamvisor::{
    bootstrap,
    config::{self, Config},
    events::EventBus,
    server::{self, AppContext},
    supervisor::{ChannelSet, EventOptions, RestartPolicy},
};
use streamvisor_av::{Engine, FfmpegEngine};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Values given on the `start` command line; each one overrides the file.
struct StartOverrides {
    host: Option<String>,
    port: Option<u16>,
    udp_base_port: Option<u16>,
    channels: Option<u32>,
    source_host: Option<String>,
}

impl StartOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(base) = self.udp_base_port {
            config.channels.base_port = base;
        }
        if let Some(count) = self.channels {
            config.channels.count = count;
        }
        if let Some(source_host) = self.source_host {
            config.channels.source_host = source_host;
        }
    }
}

async fn start(config: Config) -> Result<()> {
    // The only fatal step: nothing is started if the layout can't be created.
    bootstrap::prepare_directories(&config.paths)
        .context("Failed to prepare output and log directories")?;

    tracing::info!("Starting streamvisor");
    tracing::info!(
        "Supervising {} channels from udp://{}:{}..",
        config.channels.count,
        config.channels.source_host,
        config.channels.base_port
    );

    let engine: Arc<dyn Engine> = Arc::new(
        discover_engine(&config).with_mirror_output(config.engine.mirror_output),
    );
    let bus = Arc::new(EventBus::new(config.events.inbox_capacity));
    let shutdown = CancellationToken::new();

    let channels = ChannelSet::spawn(
        config.channel_descriptors(),
        engine,
        Arc::clone(&bus),
        RestartPolicy::from(&config.restart),
        EventOptions::from(&config.events),
        &shutdown,
    );

    let ctx = AppContext::new(config, bus, channels.statuses(), shutdown.clone());
    let server_result = server::start_server(ctx).await;

    // Cleanup
    tracing::info!("Shutting down...");
    shutdown.cancel();
    channels.join().await;

    server_result
}

/// A missing ffmpeg is not fatal: every run fails to spawn and is retried
/// with backoff until it appears.
fn discover_engine(config: &Config) -> FfmpegEngine {
    let hls = config.engine.hls.clone();
    match FfmpegEngine::discover(config.engine.ffmpeg_path.as_deref(), hls.clone()) {
        Ok(engine) => {
            tracing::info!("Using ffmpeg at {:?}", engine.program());
            engine
        }
        Err(e) => {
            tracing::warn!("{}; channels will retry until ffmpeg is available", e);
            FfmpegEngine::new(PathBuf::from("ffmpeg"), hls)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "streamvisor=trace,streamvisor_av=debug,tower_http=debug".to_string()
        } else {
            "streamvisor=info,streamvisor_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start {
            host,
            port,
            udp_base_port,
            channels,
            source_host,
        } => {
            let mut config = config::read_config_or_default(cli.config.as_deref())?;
            StartOverrides {
                host,
                port,
                udp_base_port,
                channels,
                source_host,
            }
            .apply(&mut config);
            config::validate_config(&config)?;

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start(config))
        }
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Channels => list_channels(cli.config.as_deref()),
        Commands::Version => {
            println!("streamvisor {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = streamvisor_av::check_tools();

    for tool in &tools {
        let status = if tool.available { "✓" } else { "✗" };

        print!("{} {}", status, tool.name);
        if !tool.required {
            print!(" (optional)");
        }

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if !tools.iter().any(|tool| tool.is_blocking()) {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Channels cannot run without ffmpeg.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_summary(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            print_summary(&config);
        }
    }

    Ok(())
}

fn print_summary(config: &Config) {
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!(
        "  Channels: {} (udp://{}:{}+)",
        config.channels.count, config.channels.source_host, config.channels.base_port
    );
    println!("  Output dir: {}", config.paths.output_dir.display());
    println!("  Log dir: {}", config.paths.log_dir.display());
    println!("  Observer inbox: {}", config.events.inbox_capacity);
    println!(
        "  Restart delay: {}ms..{}ms (x{})",
        config.restart.first_delay_ms, config.restart.max_delay_ms, config.restart.factor
    );
}

fn list_channels(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let extension = config.engine.hls.segment_extension();

    for channel in config.channel_descriptors() {
        println!("channel {}", channel.index);
        println!("  source:   {}", channel.source_address);
        println!("  manifest: {}", channel.manifest_path.display());
        println!("  segments: {}", channel.segment_pattern(extension).display());
        println!("  log:      {}", channel.log_path.display());
    }

    Ok(())
}

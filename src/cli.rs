use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "streamvisor")]
#[command(author, version, about = "Supervisor for live UDP to HLS channels")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the channel supervisors and the HTTP server
    Start {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port serving streams and events
        #[arg(short, long)]
        port: Option<u16>,

        /// UDP port of channel 0; channel i listens on base + i
        #[arg(short = 's', long)]
        udp_base_port: Option<u16>,

        /// Number of channels
        #[arg(short = 'n', long)]
        channels: Option<u32>,

        /// Host the UDP sources are read from
        #[arg(short = 'i', long)]
        source_host: Option<String>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Print the channels that would be supervised
    Channels,

    /// Display version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_short_flags() {
        let cli = Cli::try_parse_from([
            "streamvisor", "start", "-p", "8080", "-s", "3000", "-n", "4", "-i", "10.0.0.2",
        ])
        .unwrap();

        match cli.command {
            Commands::Start {
                host,
                port,
                udp_base_port,
                channels,
                source_host,
            } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(8080));
                assert_eq!(udp_base_port, Some(3000));
                assert_eq!(channels, Some(4));
                assert_eq!(source_host.as_deref(), Some("10.0.0.2"));
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["streamvisor", "channels", "-v", "-c", "x.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Channels));
    }
}

//! CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keystation")]
#[command(author, version, about = "M-Audio Keystation32 USB-MIDI driver")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/keystation/keystation.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print key and button presses until interrupted
    #[command(visible_aliases = ["l", "monitor"])]
    Listen {
        /// Override the USB vendor ID (hex)
        #[arg(long, value_parser = parse_hex_u16)]
        vid: Option<u16>,
        /// Override the USB product ID (hex)
        #[arg(long, value_parser = parse_hex_u16)]
        pid: Option<u16>,
    },

    /// List attached USB devices
    #[command(visible_alias = "ls")]
    List,
}

/// Parse a USB identifier given as `0a4d` or `0x0A4D`
pub fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex id '{s}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_ids() {
        assert_eq!(parse_hex_u16("0a4d"), Ok(0x0A4D));
        assert_eq!(parse_hex_u16("0x129D"), Ok(0x129D));
        assert!(parse_hex_u16("xyz").is_err());
        assert!(parse_hex_u16("0x10000").is_err());
    }

    #[test]
    fn test_listen_is_default() {
        let cli = Cli::parse_from(["keystation"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["keystation", "listen", "--vid", "0x0a4d"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Listen {
                vid: Some(0x0A4D),
                pid: None
            })
        ));
    }
}

// Command-line interface definitions for blinkspeak
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blinkspeak")]
#[command(author, version, about = "Single-switch scanning keyboard that speaks what you type")]
#[command(long_about = "
Blinkspeak is a scanning keyboard for people who can only give one signal,
such as a deliberate blink or a single assistive switch.

A highlight steps through the keyboard on its own. Activate once to pick the
highlighted key, then confirm with YES or NO. Letters that cannot continue
any dictionary word are skipped. Typed sentences and canned phrases are
spoken aloud.

SETUP:
  1. Add yourself to the input group: sudo usermod -aG input $USER
  2. Log out and back in
  3. Install espeak-ng (or espeak / speech-dispatcher)
  4. Run: blinkspeak setup (to write a default config and phrase file)
  5. Run: blinkspeak (to start the daemon)

USAGE:
  Press SPACE (default) to activate, or pipe a blink detector into
  'blinkspeak --activation stdin', or call 'blinkspeak activate'.
  Watch the keyboard with 'blinkspeak status --follow'.
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Override the dictionary word list
    #[arg(long, value_name = "FILE")]
    pub dictionary: Option<String>,

    /// Override the phrase file
    #[arg(long, value_name = "FILE")]
    pub phrases: Option<String>,

    /// Override the activation source (evdev, stdin, signal)
    #[arg(long, value_name = "SOURCE")]
    pub activation: Option<String>,

    /// Override the evdev activation key (e.g., SPACE, ENTER, F13, BTN_LEFT)
    #[arg(long, value_name = "KEY")]
    pub key: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as daemon (default if no command specified)
    Daemon,

    /// Send one activation to the running daemon (SIGUSR1)
    Activate,

    /// Show the scanner state written by the daemon
    Status {
        /// Keep printing whenever the state changes
        #[arg(long)]
        follow: bool,

        /// Output format: "text" (default) or "json"
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Show current configuration
    Config,

    /// Write a default config and phrase file, then check dependencies
    Setup {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::parse_from(["blinkspeak", "-vv"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_status_flags() {
        let cli = Cli::parse_from(["blinkspeak", "status", "--format", "json", "--follow"]);
        match cli.command {
            Some(Commands::Status { follow, format }) => {
                assert!(follow);
                assert_eq!(format, "json");
            }
            _ => panic!("expected status"),
        }
    }

    #[test]
    fn test_status_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["blinkspeak", "status", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "blinkspeak",
            "--activation",
            "stdin",
            "--phrases",
            "/tmp/p.toml",
            "daemon",
        ]);
        assert_eq!(cli.activation.as_deref(), Some("stdin"));
        assert_eq!(cli.phrases.as_deref(), Some("/tmp/p.toml"));
        assert!(matches!(cli.command, Some(Commands::Daemon)));
    }
}

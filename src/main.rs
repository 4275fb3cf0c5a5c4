//! Blinkspeak - single-switch scanning keyboard with speech output
//!
//! Run with `blinkspeak` or `blinkspeak daemon` to start the daemon.
//! Use `blinkspeak setup` to write a default config and check dependencies.
//! Use `blinkspeak activate` to send one activation to the running daemon.

use anyhow::Context;
use blinkspeak::cli::{Cli, Commands};
use blinkspeak::config::{self, ActivationSourceKind, Config};
use blinkspeak::daemon::{self, Daemon};
use blinkspeak::scan::render::RenderModel;
use blinkspeak::vocab;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("blinkspeak={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(dictionary) = cli.dictionary {
        config.dictionary.file = dictionary;
    }
    if let Some(phrases) = cli.phrases {
        config.phrases.file = phrases;
    }
    if let Some(source) = cli.activation {
        config.activation.source = source
            .parse::<ActivationSourceKind>()
            .map_err(anyhow::Error::msg)?;
    }
    if let Some(key) = cli.key {
        config.activation.key = key;
    }

    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            config.validate()?;
            let mut daemon = Daemon::new(config);
            daemon.run().await?;
        }

        Commands::Activate => {
            send_activation()?;
        }

        Commands::Status { follow, format } => {
            run_status(&config, follow, &format)?;
        }

        Commands::Config => {
            show_config(&config)?;
        }

        Commands::Setup { force } => {
            run_setup(&config, force)?;
        }
    }

    Ok(())
}

/// Read the daemon PID from the runtime directory
fn read_daemon_pid(path: &Path) -> anyhow::Result<i32> {
    let contents = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Cannot read PID file {:?}. Is the blinkspeak daemon running?",
            path
        )
    })?;
    contents
        .trim()
        .parse::<i32>()
        .with_context(|| format!("Invalid PID file {:?}", path))
}

/// Send SIGUSR1 to the running daemon
#[cfg(target_os = "linux")]
fn send_activation() -> anyhow::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid_path = daemon::pid_file_path();
    let pid = read_daemon_pid(&pid_path)?;

    match kill(Pid::from_raw(pid), Signal::SIGUSR1) {
        Ok(()) => {
            tracing::debug!("Sent SIGUSR1 to pid {}", pid);
            Ok(())
        }
        Err(Errno::ESRCH) => anyhow::bail!(
            "Daemon (pid {}) is not running. Remove stale PID file {:?}",
            pid,
            pid_path
        ),
        Err(e) => Err(e).with_context(|| format!("Failed to signal pid {}", pid)),
    }
}

/// Send SIGUSR1 to the running daemon
#[cfg(not(target_os = "linux"))]
fn send_activation() -> anyhow::Result<()> {
    let pid_path = daemon::pid_file_path();
    let pid = read_daemon_pid(&pid_path)?;

    // SAFETY: kill has no memory-safety preconditions
    let rc = unsafe { libc::kill(pid, libc::SIGUSR1) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("Failed to signal pid {}", pid));
    }
    Ok(())
}

/// Render the state file contents in the requested format
///
/// `None` means the daemon is not running.
fn format_state(contents: Option<&str>, format: &str) -> String {
    let Some(contents) = contents else {
        return if format == "json" {
            r#"{"mode":"stopped"}"#.to_string()
        } else {
            "stopped".to_string()
        };
    };

    if format == "json" {
        return contents.trim().to_string();
    }

    match serde_json::from_str::<RenderModel>(contents) {
        Ok(model) => model.to_text().trim_end().to_string(),
        Err(e) => format!("unreadable state file: {}", e),
    }
}

fn read_state(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
}

/// Run the status command - show what the scanner currently displays
fn run_status(config: &Config, follow: bool, format: &str) -> anyhow::Result<()> {
    let Some(state_path) = config.resolve_state_file() else {
        eprintln!("Error: state_file is not configured.");
        eprintln!();
        eprintln!("To enable status monitoring, add to your config.toml:");
        eprintln!();
        eprintln!("  state_file = \"auto\"");
        std::process::exit(1);
    };

    let mut last = read_state(&state_path);
    println!("{}", format_state(last.as_deref(), format));

    if !follow {
        return Ok(());
    }

    // Follow mode: watch for changes using inotify
    use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
    use std::sync::mpsc::channel;
    use std::time::Duration;

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        NotifyConfig::default().with_poll_interval(Duration::from_millis(100)),
    )?;

    // The daemon replaces the file on every write, so watch the directory
    if let Some(parent) = state_path.parent() {
        std::fs::create_dir_all(parent)?;
        watcher.watch(parent, RecursiveMode::NonRecursive)?;
    }

    loop {
        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(Ok(_)) | Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                let current = read_state(&state_path);
                if current != last {
                    if format == "text" {
                        println!();
                    }
                    println!("{}", format_state(current.as_deref(), format));
                    last = current;
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Watch error: {:?}", e);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

/// Write `contents` to `path` unless it exists (or `force` is set)
fn write_starter_file(path: &Path, contents: &str, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        println!("  Exists: {:?}", path);
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))?;
    println!("  ✓ Created: {:?}", path);
    Ok(())
}

/// Run the setup command - starter files and dependency checks
fn run_setup(config: &Config, force: bool) -> anyhow::Result<()> {
    println!("Blinkspeak Setup\n");
    println!("================\n");

    println!("Writing starter files...");
    match Config::default_path() {
        Some(path) => write_starter_file(&path, config::DEFAULT_CONFIG, force)?,
        None => println!("  ✗ Could not determine the config directory"),
    }
    if let Some(path) = config.resolve_phrase_file() {
        write_starter_file(&path, vocab::SAMPLE_PHRASES, force)?;
    }

    let mut all_ok = true;

    println!("\nChecking speech engines...");
    let engines: Vec<&str> = ["espeak-ng", "espeak", "spd-say"]
        .into_iter()
        .filter(|name| which::which(name).is_ok())
        .collect();
    if engines.is_empty() {
        println!("  ✗ No speech engine found");
        println!("    Install espeak-ng via your package manager");
        all_ok = false;
    } else {
        println!("  ✓ Found: {}", engines.join(", "));
    }

    println!("\nChecking dictionary...");
    match config.resolve_dictionary_file() {
        Some(path) if path.exists() => println!("  ✓ Word list: {:?}", path),
        _ => {
            println!("  ✗ No word list found, the built-in ten words will be used");
            println!("    Install a words package (e.g. wamerican) or set [dictionary] file");
        }
    }

    if config.activation.source == ActivationSourceKind::Evdev {
        println!("\nChecking input group membership...");
        let groups_output = std::process::Command::new("groups").output()?;
        let groups = String::from_utf8_lossy(&groups_output.stdout);
        if groups.split_whitespace().any(|g| g == "input") {
            println!("  ✓ User is in 'input' group");
        } else {
            println!("  ✗ User is NOT in 'input' group");
            println!("    Run: sudo usermod -aG input $USER");
            println!("    Then log out and back in");
            all_ok = false;
        }
    }

    println!("\n---");
    if all_ok {
        println!("✓ All checks passed! Run 'blinkspeak' to start.");
    } else {
        println!("✗ Some checks failed. Please fix the issues above.");
    }

    Ok(())
}

/// Show current configuration
fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("Current Configuration\n");
    println!("=====================\n");

    println!("[scan]");
    println!("  green_ms = {}", config.scan.green_ms);
    println!("  flash_ms = {}", config.scan.flash_ms);
    println!("  frame_ms = {}", config.scan.frame_ms);

    println!("\n[keyboard]");
    println!("  rows = {:?}", config.keyboard.rows);

    println!("\n[phrases]");
    println!("  file = {:?}", config.phrases.file);
    if let Some(resolved) = config.resolve_phrase_file() {
        println!("  (resolves to: {:?})", resolved);
    }
    println!(
        "  rows = {}, columns = {} ({} per page)",
        config.phrases.rows,
        config.phrases.columns,
        config.phrases.page_size()
    );

    println!("\n[dictionary]");
    println!("  file = {:?}", config.dictionary.file);
    match config.resolve_dictionary_file() {
        Some(resolved) => println!("  (resolves to: {:?})", resolved),
        None => println!("  (built-in words)"),
    }

    println!("\n[activation]");
    println!("  source = {}", config.activation.source);
    println!("  key = {:?}", config.activation.key);
    println!("  cooldown_ms = {}", config.activation.cooldown_ms);

    println!("\n[speech]");
    println!("  engine = {:?}", config.speech.engine);
    println!("  rate = {}", config.speech.rate);
    println!("  pitch = {}", config.speech.pitch);
    if let Some(ref voice) = config.speech.voice {
        println!("  voice = {:?}", voice);
    }
    if let Some(ref command) = config.speech.command {
        println!("  command = {:?}", command);
    }

    println!("\n[audio.feedback]");
    println!("  enabled = {}", config.audio.feedback.enabled);
    println!("  theme = {:?}", config.audio.feedback.theme);
    println!("  volume = {}", config.audio.feedback.volume);

    if let Some(ref state_file) = config.state_file {
        println!("\nstate_file = {:?}", state_file);
        if let Some(resolved) = config.resolve_state_file() {
            println!("  (resolves to: {:?})", resolved);
        }
    }

    println!("\n---");
    println!(
        "Config file: {:?}",
        Config::default_path().unwrap_or_else(|| PathBuf::from("(not found)"))
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_state_stopped() {
        assert_eq!(format_state(None, "text"), "stopped");
        assert_eq!(format_state(None, "json"), r#"{"mode":"stopped"}"#);
    }

    #[test]
    fn test_format_state_json_passthrough() {
        assert_eq!(format_state(Some("{\"a\":1}\n"), "json"), "{\"a\":1}");
    }

    #[test]
    fn test_format_state_garbage() {
        assert!(format_state(Some("not json"), "text").starts_with("unreadable"));
    }

    #[test]
    fn test_read_daemon_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pid");
        std::fs::write(&path, "4242\n").unwrap();
        assert_eq!(read_daemon_pid(&path).unwrap(), 4242);

        std::fs::write(&path, "nope").unwrap();
        assert!(read_daemon_pid(&path).is_err());
        assert!(read_daemon_pid(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_write_starter_file_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "mine").unwrap();

        write_starter_file(&path, "default", false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "mine");

        write_starter_file(&path, "default", true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "default");
    }
}

//! Development tasks for blinkspeak
//!
//! Usage:
//!   cargo xtask install [--prefix DIR]    Install release binary to DIR/bin (default /usr/local, uses sudo)
//!   cargo xtask uninstall [--prefix DIR]  Remove the installed binary
//!   cargo xtask dist                      Build release binary and man pages into target/dist

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

const BINARY: &str = "blinkspeak";
const DEFAULT_PREFIX: &str = "/usr/local";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    let prefix = option_value(&args, "--prefix").unwrap_or_else(|| DEFAULT_PREFIX.to_string());

    let result = match args[0].as_str() {
        "install" => install(Path::new(&prefix)),
        "uninstall" => uninstall(Path::new(&prefix)),
        "dist" => dist(),
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_help();
            Err(anyhow::anyhow!("Unknown command"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    eprintln!(
        r#"
blinkspeak development tasks

Usage: cargo xtask <COMMAND> [OPTIONS]

Commands:
  install    Build release binary and install to PREFIX/bin (requires sudo for /usr)
  uninstall  Remove blinkspeak from PREFIX/bin
  dist       Build binary and man pages into target/dist

Options:
  --prefix DIR   Installation prefix (default: /usr/local)

Examples:
  cargo xtask install                  # Install to /usr/local/bin
  cargo xtask install --prefix ~/.local
  cargo xtask dist
  cargo xtask uninstall
"#
    );
}

/// Value following `flag`, if present
fn option_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

/// Get the project root directory
fn project_root() -> anyhow::Result<PathBuf> {
    let dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => env::current_dir()?,
    };

    // xtask is in a subdirectory, go up one level
    Ok(dir.parent().unwrap_or(&dir).to_path_buf())
}

fn cargo_build_release(root: &Path, gen_manpages: bool) -> anyhow::Result<PathBuf> {
    let mut cmd = Command::new("cargo");
    cmd.args(["build", "--release", "--bin", BINARY]).current_dir(root);
    if gen_manpages {
        cmd.env("BLINKSPEAK_GEN_MANPAGES", "1");
    }

    if !cmd.status()?.success() {
        anyhow::bail!("Build failed");
    }

    let binary = root.join("target/release").join(BINARY);
    if !binary.exists() {
        anyhow::bail!("Binary not found at {:?}", binary);
    }
    Ok(binary)
}

/// Whether writing under `dir` needs sudo
fn needs_sudo(dir: &Path) -> bool {
    let in_home = match env::var("HOME") {
        Ok(home) if !home.is_empty() => dir.starts_with(home),
        _ => false,
    };
    !in_home && !dir.starts_with("/tmp")
}

fn run_maybe_sudo(sudo: bool, args: &[&str]) -> anyhow::Result<bool> {
    let status = if sudo {
        Command::new("sudo").args(args).status()?
    } else {
        Command::new(args[0]).args(&args[1..]).status()?
    };
    Ok(status.success())
}

/// Build release binary and install to PREFIX/bin
fn install(prefix: &Path) -> anyhow::Result<()> {
    let root = project_root()?;

    println!("==> Building release binary...");
    let binary = cargo_build_release(&root, false)?;

    let target = prefix.join("bin").join(BINARY);
    let binary_arg = binary.display().to_string();
    let target_arg = target.display().to_string();
    println!("==> Installing to {}...", target_arg);

    if !run_maybe_sudo(needs_sudo(prefix), &["install", "-Dm755", &binary_arg, &target_arg])? {
        anyhow::bail!("Install failed (sudo may be required)");
    }

    println!("==> Installed successfully!");
    println!();
    println!("Installed: {}", target_arg);
    println!("Next: run '{} setup' to create a config and phrase file", BINARY);

    let _ = Command::new(&target).arg("--version").status();

    Ok(())
}

/// Remove blinkspeak from PREFIX/bin
fn uninstall(prefix: &Path) -> anyhow::Result<()> {
    let target = prefix.join("bin").join(BINARY);
    let target_arg = target.display().to_string();
    println!("==> Removing {}...", target_arg);

    if !run_maybe_sudo(needs_sudo(prefix), &["rm", "-f", &target_arg])? {
        anyhow::bail!("Uninstall failed (sudo may be required)");
    }

    println!("==> Uninstalled successfully!");
    Ok(())
}

/// Newest `man` directory produced by build.rs
fn find_man_dir(root: &Path) -> Option<PathBuf> {
    let build_dir = root.join("target/release/build");
    std::fs::read_dir(build_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("blinkspeak-"))
        .map(|entry| entry.path().join("out/man"))
        .filter(|dir| dir.is_dir())
        .max_by_key(|dir| {
            std::fs::metadata(dir)
                .and_then(|m| m.modified())
                .ok()
        })
}

/// Build the distribution tree in target/dist/blinkspeak
fn dist() -> anyhow::Result<()> {
    let root = project_root()?;

    println!("==> Building distribution binary...");
    let binary = cargo_build_release(&root, true)?;

    let dist_dir = root.join("target/dist").join(BINARY);
    if dist_dir.exists() {
        std::fs::remove_dir_all(&dist_dir)?;
    }
    std::fs::create_dir_all(dist_dir.join("bin"))?;
    std::fs::copy(&binary, dist_dir.join("bin").join(BINARY))?;

    match find_man_dir(&root) {
        Some(man_dir) => {
            let dest = dist_dir.join("share/man/man1");
            std::fs::create_dir_all(&dest)?;
            for entry in std::fs::read_dir(man_dir)? {
                let entry = entry?;
                std::fs::copy(entry.path(), dest.join(entry.file_name()))?;
            }
        }
        None => println!("    (no man pages found, skipping)"),
    }

    println!("==> Built: {:?}", dist_dir);

    let _ = Command::new("ls").arg("-lhR").arg(&dist_dir).status();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_value() {
        let args: Vec<String> = ["install", "--prefix", "/opt/bs"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(option_value(&args, "--prefix").as_deref(), Some("/opt/bs"));
        assert_eq!(option_value(&args, "--missing"), None);
    }

    #[test]
    fn test_needs_sudo() {
        assert!(needs_sudo(Path::new("/usr/local")));
        assert!(!needs_sudo(Path::new("/tmp/stage")));
    }
}

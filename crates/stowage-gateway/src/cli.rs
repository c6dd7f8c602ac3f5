use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stowage_storage_core::EntryMetadata;

/// Command line for the stowage operator tool.
#[derive(Parser, Debug)]
#[command(name = "stowage")]
#[command(about = "Browse and upload through the stowage virtual namespace")]
pub struct Cli {
    /// Configuration file with the [path.<segment>] tables
    #[arg(long, default_value = "config.toml", env = "STOWAGE_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the configuration and construct every backend
    Check,

    /// List a virtual directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Describe one entry
    Stat { path: String },

    /// Create a directory
    Mkdir { path: String },

    /// Upload a local file
    Put {
        local: PathBuf,
        path: String,

        /// Append instead of replacing (backends may ignore this)
        #[arg(long)]
        append: bool,
    },
}

/// One `ls -l` style line.
pub fn format_entry(entry: &EntryMetadata) -> String {
    let modified = entry
        .modified
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{} {:<10} {:<10} {:>12} {:>16} {}",
        entry.mode_string(),
        entry.owner.as_deref().unwrap_or("-"),
        entry.group.as_deref().unwrap_or("-"),
        entry.size,
        modified,
        entry.name
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn test_format_synthetic_entry() {
        let line = format_entry(&EntryMetadata::synthetic_dir("docs"));
        assert!(line.starts_with("dr-xr-xr-x -"));
        assert!(line.ends_with(" docs"));
    }

    #[test]
    fn test_format_file_entry() {
        let entry = EntryMetadata {
            name: "q1.csv".to_string(),
            size: 4096,
            mode: 0o644,
            modified: Some(Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap()),
            is_dir: false,
            owner: Some("1000".to_string()),
            group: Some("1000".to_string()),
        };
        let line = format_entry(&entry);
        assert!(line.starts_with("-rw-r--r-- 1000"));
        assert!(line.contains(" 4096 "));
        assert!(line.contains("2021-03-04 05:06"));
        assert!(line.ends_with(" q1.csv"));
    }

    #[test]
    fn test_parse_put() {
        let cli = Cli::try_parse_from([
            "stowage",
            "--config",
            "/etc/stowage.toml",
            "put",
            "scan.pdf",
            "/docs/inbox/scan.pdf",
            "--append",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("/etc/stowage.toml"));
        match cli.command {
            Command::Put {
                local,
                path,
                append,
            } => {
                assert_eq!(local, PathBuf::from("scan.pdf"));
                assert_eq!(path, "/docs/inbox/scan.pdf");
                assert!(append);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_ls_defaults_to_root() {
        let cli = Cli::try_parse_from(["stowage", "ls"]).unwrap();
        assert!(matches!(cli.command, Command::Ls { path } if path == "/"));
    }
}

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Payload written and read back by `check`.
const CHECK_SENTENCE: &str = "Far out in the uncharted backwaters of the \
    unfashionable end of the western spiral arm of the Galaxy lies a small, \
    unregarded yellow sun.";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Atomically replace PATH with data read from --input or stdin
    Write {
        /// Destination file; its directory must already exist
        path: PathBuf,

        /// Read the payload from FILE instead of stdin
        #[arg(long, short, value_name = "FILE", env = "ATOMICWRITE_INPUT")]
        input: Option<PathBuf>,
    },
    /// Write a known sentence to PATH and verify it reads back intact
    Check {
        #[arg(default_value = "check.result")]
        path: PathBuf,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Written { bytes: usize },
    Passed,
    Failed,
}

pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub async fn run() -> Result<()> {
    if run_with_args(Args::parse()).await? == Outcome::Failed {
        bail!("check failed");
    }
    Ok(())
}

async fn run_with_args(args: Args) -> Result<Outcome> {
    init_logging();
    dispatch(args.command).await
}

async fn dispatch(command: Command) -> Result<Outcome> {
    match command {
        Command::Write { path, input } => {
            let data = read_input(input.as_deref()).await?;
            let bytes = data.len();
            tracing::debug!(path = %path.display(), bytes, "writing");
            atomicwrite_core::write_async(path, data).await?;
            Ok(Outcome::Written { bytes })
        }
        Command::Check { path } => {
            let outcome = check(&path).await?;
            match outcome {
                Outcome::Passed => println!("PASSED"),
                _ => println!("FAILED"),
            }
            Ok(outcome)
        }
    }
}

async fn read_input(input: Option<&Path>) -> Result<Vec<u8>> {
    match input {
        Some(file) => tokio::fs::read(file)
            .await
            .with_context(|| format!("reading {}", file.display())),
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

async fn check(path: &Path) -> Result<Outcome> {
    atomicwrite_core::write_async(path, CHECK_SENTENCE).await?;
    let written = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading back {}", path.display()))?;
    if written == CHECK_SENTENCE.as_bytes() {
        Ok(Outcome::Passed)
    } else {
        tracing::warn!(path = %path.display(), bytes = written.len(), "content mismatch");
        Ok(Outcome::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Command {
        Args::parse_from(std::iter::once("atomicwrite").chain(args.iter().cloned())).command
    }

    fn run_command(command: Command) -> Result<Outcome> {
        tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(dispatch(command))
    }

    #[test]
    fn parses_write_with_input() {
        assert_eq!(
            parse(&["write", "out.bin", "--input", "in.bin"]),
            Command::Write {
                path: PathBuf::from("out.bin"),
                input: Some(PathBuf::from("in.bin")),
            }
        );
    }

    #[test]
    fn check_defaults_to_check_result() {
        assert_eq!(
            parse(&["check"]),
            Command::Check {
                path: PathBuf::from("check.result")
            }
        );
    }

    #[test]
    fn requires_a_subcommand() {
        assert!(Args::try_parse_from(["atomicwrite"]).is_err());
        assert!(Args::try_parse_from(["atomicwrite", "write"]).is_err());
    }

    #[test]
    fn write_copies_input_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        let path = dir.path().join("out.bin");
        std::fs::write(&input, b"payload\0bytes").unwrap();
        std::fs::write(&path, b"previous").unwrap();

        let outcome = run_command(Command::Write {
            path: path.clone(),
            input: Some(input),
        })
        .unwrap();
        assert_eq!(outcome, Outcome::Written { bytes: 13 });
        assert_eq!(std::fs::read(&path).unwrap(), b"payload\0bytes");
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        std::fs::write(&input, b"x").unwrap();
        let err = run_command(Command::Write {
            path: dir.path().join("missing").join("out.bin"),
            input: Some(input),
        })
        .unwrap_err();
        assert!(err.to_string().contains("atomically"));
    }

    #[test]
    fn write_with_missing_input_fails() {
        let dir = tempdir().unwrap();
        let err = run_command(Command::Write {
            path: dir.path().join("out.bin"),
            input: Some(dir.path().join("absent")),
        })
        .unwrap_err();
        assert!(err.to_string().starts_with("reading"));
        assert!(!dir.path().join("out.bin").exists());
    }

    #[test]
    fn check_passes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("check.result");
        assert_eq!(
            run_command(Command::Check { path: path.clone() }).unwrap(),
            Outcome::Passed
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), CHECK_SENTENCE);
    }
}

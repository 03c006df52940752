//! # wintail
//!
//! Interactive front end: reads file paths from stdin and tails each one, printing
//! new lines prefixed with their path.
//!
//! ## Commands
//! ```text
//! <path>        start tailing <path> (ignored if already tailed)
//! stop <path>   stop tailing <path>
//! list          show live workers
//! exit          shut down and quit
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=tailvisor=debug cargo run --bin wintail --features logging
//! ```

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use tailvisor::{
    Coordinator, CoordinatorConfig, LogWriter, RuntimeError, StopRequest, Subscribe, TailRequest,
};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "path> ";

/// Rejected user input.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
enum Invalid {
    #[error("path must not be empty")]
    Blank,
}

/// Why an interactive session ended early.
#[derive(Debug, thiserror::Error)]
enum SessionError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("console unavailable: {0}")]
    Console(#[from] io::Error),
}

/// Accepts any non-blank input as a path.
fn validate(input: &str) -> Result<PathBuf, Invalid> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Invalid::Blank);
    }
    Ok(PathBuf::from(trimmed))
}

/// One parsed prompt line.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Exit,
    List,
    Stop(PathBuf),
    Tail(PathBuf),
}

fn parse(line: &str) -> Result<Input, Invalid> {
    let line = line.trim();
    match line {
        "exit" => Ok(Input::Exit),
        "list" => Ok(Input::List),
        "stop" => Err(Invalid::Blank),
        _ => match line.split_once(char::is_whitespace) {
            Some(("stop", rest)) => validate(rest).map(Input::Stop),
            _ => validate(line).map(Input::Tail),
        },
    }
}

async fn prompt(out: &mut tokio::io::Stdout) -> io::Result<()> {
    out.write_all(PROMPT.as_bytes()).await?;
    out.flush().await
}

/// Reads stdin on a plain thread so a pending read never holds up runtime shutdown.
fn spawn_stdin_reader() -> io::Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("wintail-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Consumes input lines until `exit` or EOF, forwarding valid paths to the coordinator.
async fn produce(
    coordinator: Coordinator,
    reporter: Arc<dyn Subscribe>,
    mut lines: mpsc::UnboundedReceiver<String>,
) -> Result<(), SessionError> {
    let mut out = tokio::io::stdout();

    prompt(&mut out).await?;
    while let Some(line) = lines.recv().await {
        match parse(&line) {
            Ok(Input::Exit) => break,
            Ok(Input::List) => {
                for info in coordinator.list().await? {
                    println!(
                        "  {} gen={} restarts={}",
                        info.path.display(),
                        info.generation,
                        info.restart_count
                    );
                }
            }
            Ok(Input::Stop(path)) => coordinator.stop_tail(StopRequest::new(path))?,
            Ok(Input::Tail(path)) => {
                coordinator.begin_tail(TailRequest::new(path, Arc::clone(&reporter)))?
            }
            Err(e) => eprintln!("{e}"),
        }
        prompt(&mut out).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let coordinator = Coordinator::builder(CoordinatorConfig::default()).build();
    let reporter: Arc<dyn Subscribe> = Arc::new(LogWriter::new());

    let lines = spawn_stdin_reader()?;
    let producer = tokio::spawn(produce(coordinator.clone(), reporter, lines));
    tokio::select! {
        res = coordinator.run_until_signal() => res?,
        res = producer => {
            res??;
            coordinator.shutdown().await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_is_rejected() {
        assert_eq!(validate(""), Err(Invalid::Blank));
        assert_eq!(validate("   \t"), Err(Invalid::Blank));
        assert_eq!(parse("stop   "), Err(Invalid::Blank));
    }

    #[test]
    fn test_paths_are_trimmed() {
        assert_eq!(validate("  /var/log/app.log \n"), Ok(PathBuf::from("/var/log/app.log")));
    }

    #[test]
    fn test_commands_are_recognized() {
        assert_eq!(parse("exit"), Ok(Input::Exit));
        assert_eq!(parse(" list "), Ok(Input::List));
        assert_eq!(parse("stop a.log"), Ok(Input::Stop(PathBuf::from("a.log"))));
        assert_eq!(parse("a.log"), Ok(Input::Tail(PathBuf::from("a.log"))));
    }

    #[tokio::test]
    async fn test_session_ends_on_exit_and_skips_blank_lines() {
        let coordinator = Coordinator::builder(CoordinatorConfig::default()).build();
        let (tx, rx) = mpsc::unbounded_channel();
        for line in ["", "   ", "list", "exit", "never-read.log"] {
            tx.send(line.to_string()).unwrap();
        }

        let reporter: Arc<dyn Subscribe> = Arc::new(LogWriter::new());
        produce(coordinator.clone(), reporter, rx).await.unwrap();
        assert!(coordinator.list().await.unwrap().is_empty());
        coordinator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_session_fails_once_coordinator_is_gone() {
        let coordinator = Coordinator::builder(CoordinatorConfig::default()).build();
        coordinator.shutdown().await.unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send("list".to_string()).unwrap();
        let reporter: Arc<dyn Subscribe> = Arc::new(LogWriter::new());
        let err = produce(coordinator, reporter, rx).await.unwrap_err();
        assert!(matches!(err, SessionError::Runtime(RuntimeError::Closed)));
    }
}

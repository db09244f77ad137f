use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use davsync::config::SyncConfig;
use davsync::session::{ProjectConfig, ProjectSession, SessionProvider, credentials_from_vars};
use davsync::storage::CredentialStorage;
use davsync::sync::{FileSync, SyncOptions};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: davsync file-path=<path> [remote-path=<sub/path>] [--quiet]
       davsync --login | --logout | --help

  file-path=<path>      Local file to upload (also --file-path <path>)
  remote-path=<path>    Directory below the remote mount (also --remote-path <path>)
  --quiet, -q           Suppress progress output; only the exit code reports the outcome
  --login               Save DAVSYNC_USERNAME/DAVSYNC_PASSWORD for the current project
  --logout              Remove saved credentials for the current project";

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliMode {
    Sync {
        file_path: PathBuf,
        remote_path: Option<String>,
        quiet: bool,
    },
    Login,
    Logout,
    Help,
}

fn parse_cli_mode<I>(args: I) -> anyhow::Result<CliMode>
where
    I: IntoIterator<Item = String>,
{
    let mut file_path = None;
    let mut remote_path = None;
    let mut quiet = false;
    let mut mode = None;

    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(CliMode::Help),
            "--login" => mode = Some(CliMode::Login),
            "--logout" => mode = Some(CliMode::Logout),
            "--quiet" | "-q" => quiet = true,
            "--file-path" => {
                file_path = Some(args.next().context("--file-path requires a value")?);
            }
            "--remote-path" => {
                remote_path = Some(args.next().context("--remote-path requires a value")?);
            }
            other => {
                if let Some(value) = other.strip_prefix("file-path=") {
                    file_path = Some(value.to_string());
                } else if let Some(value) = other.strip_prefix("remote-path=") {
                    remote_path = Some(value.to_string());
                } else {
                    anyhow::bail!("unknown argument: {other}");
                }
            }
        }
    }

    if let Some(mode) = mode {
        return Ok(mode);
    }
    let file_path = file_path
        .filter(|value| !value.is_empty())
        .context("missing required argument file-path=<path>")?;
    Ok(CliMode::Sync {
        file_path: PathBuf::from(file_path),
        remote_path,
        quiet,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let mode = match parse_cli_mode(std::env::args()) {
        Ok(mode) => mode,
        Err(err) => {
            eprintln!("[davsync] error: {err}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match run(mode).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[davsync] error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(mode: CliMode) -> anyhow::Result<ExitCode> {
    match mode {
        CliMode::Help => {
            println!("{USAGE}");
            Ok(ExitCode::SUCCESS)
        }
        CliMode::Login => {
            let config = SyncConfig::from_env()?;
            let project = require_project(&config)?;
            let credentials = credentials_from_vars(
                &project,
                std::env::var("DAVSYNC_USERNAME").ok(),
                std::env::var("DAVSYNC_PASSWORD").ok(),
            )
            .context("set DAVSYNC_USERNAME and DAVSYNC_PASSWORD to save credentials")?;
            CredentialStorage::for_project(&project.name)?.save(&credentials)?;
            eprintln!("[davsync] credentials saved for project {}", project.name);
            Ok(ExitCode::SUCCESS)
        }
        CliMode::Logout => {
            let config = SyncConfig::from_env()?;
            let project = require_project(&config)?;
            CredentialStorage::for_project(&project.name)?.delete()?;
            eprintln!("[davsync] saved credentials removed for project {}", project.name);
            Ok(ExitCode::SUCCESS)
        }
        CliMode::Sync {
            file_path,
            remote_path,
            quiet,
        } => {
            let config = SyncConfig::from_env()?;
            let mut options = SyncOptions::from_config(&config);
            options.suppress_interactive_output |= quiet;
            let sync = FileSync::new(ProjectSession::new(&config), options);
            let outcome = sync.sync_file(&file_path, remote_path.as_deref()).await;
            Ok(ExitCode::from(outcome.exit_code()))
        }
    }
}

fn require_project(config: &SyncConfig) -> anyhow::Result<ProjectConfig> {
    ProjectSession::new(config)
        .project_config()?
        .context("no project configuration found (.davsync.json)")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

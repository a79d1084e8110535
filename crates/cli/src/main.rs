use crate::{
    commands::{Commands, RunOptions},
    error::CliError,
    output::ImportReport,
    settings::{ENV_DATABASE_URL, ENV_STATE_DIR, Settings, load_env},
    shutdown::{EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_OK, Shutdown},
};
use clap::Parser;
use connectors::CatalogStore;
use engine_core::{
    progress::{ProgressService, ProgressStatus},
    state::StateStore,
};
use engine_processing::state_manager::{StateManager, derive_run_id};
use engine_runtime::{
    error::RuntimeError,
    executor,
    registry::{ImportJob, ImportRegistry},
    state::open_state_store,
};
use model::core::kind::RecordKind;
use std::{collections::BTreeMap, path::PathBuf, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod env;
mod error;
mod output;
mod settings;
mod shutdown;
mod store;

#[derive(Parser)]
#[command(name = "catalog", version = "0.1.0", about = "Card catalog bulk importer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    // Initialize logger
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let shutdown = Shutdown::listen();

    let registry = ImportRegistry::standard();

    let code = match run(cli.command, &registry, &shutdown).await {
        Ok(()) => EXIT_OK,
        Err(CliError::ShutdownRequested | CliError::Runner(RuntimeError::ShutdownRequested)) => {
            warn!("Imports interrupted, progress up to the last committed batch is saved");
            EXIT_INTERRUPTED
        }
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("Error: {err}");
            EXIT_FAILURE
        }
    };

    std::process::exit(code);
}

async fn run(
    command: Commands,
    registry: &ImportRegistry,
    shutdown: &Shutdown,
) -> Result<(), CliError> {
    match command {
        Commands::Import {
            kind,
            file,
            resume_from,
            resume,
            run_id,
            output,
            options,
        } => {
            let kind: RecordKind = kind.parse()?;
            let (settings, state) = prepare(&options)?;

            let run_id = run_id.unwrap_or_else(|| derive_run_id(kind, &file));
            let manager = StateManager::new(&run_id, kind, &file, state);
            let resume_from = if resume {
                manager.resume_point().await?
            } else {
                resume_from.unwrap_or(0)
            };
            info!(run_id = %run_id, kind = %kind, resume_from, "Prepared import");

            let job = build_job(kind, file, &settings, manager, resume_from).await?;
            import(registry, vec![job], output, shutdown).await
        }
        Commands::ImportAll {
            sets,
            cards,
            resume,
            output,
            options,
        } => {
            let (settings, state) = prepare(&options)?;

            let mut jobs = Vec::with_capacity(2);
            for (kind, file) in [(RecordKind::Sets, sets), (RecordKind::Cards, cards)] {
                let run_id = derive_run_id(kind, &file);
                let manager = StateManager::new(&run_id, kind, &file, state.clone());
                let resume_from = if resume {
                    manager.resume_point().await?
                } else {
                    0
                };
                info!(run_id = %run_id, kind = %kind, resume_from, "Prepared import");
                jobs.push(build_job(kind, file, &settings, manager, resume_from).await?);
            }

            import(registry, jobs, output, shutdown).await
        }
        Commands::Progress {
            run,
            json,
            state_dir,
        } => show_progress(&run, json, state_dir).await,
        Commands::Inspect { kind, id, env_file } => {
            let kind: RecordKind = kind.parse()?;
            let env = load_env(env_file.as_deref())?;
            let url = env
                .get(ENV_DATABASE_URL)
                .ok_or_else(|| CliError::Config(format!("{ENV_DATABASE_URL} must be set")))?;

            let store = store::open_postgres(kind, url).await?;
            let record = store.get(&id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    }
}

fn prepare(options: &RunOptions) -> Result<(Settings, Arc<dyn StateStore>), CliError> {
    let env = load_env(options.env_file.as_deref())?;
    let settings = Settings::resolve(options, &env)?;
    let state: Arc<dyn StateStore> = open_state_store(settings.state_dir.clone())?;
    Ok((settings, state))
}

async fn build_job(
    kind: RecordKind,
    file: PathBuf,
    settings: &Settings,
    manager: StateManager,
    resume_from: u64,
) -> Result<ImportJob, CliError> {
    let store = store::open_store(kind, settings).await?;
    Ok(
        ImportJob::new(kind, file, store, settings.processing.clone())
            .resume_from(resume_from)
            .with_state(manager),
    )
}

async fn import(
    registry: &ImportRegistry,
    jobs: Vec<ImportJob>,
    output: Option<PathBuf>,
    shutdown: &Shutdown,
) -> Result<(), CliError> {
    let outcomes = executor::run_all(registry, jobs, shutdown.token()).await?;

    if shutdown.requested() {
        return Err(CliError::ShutdownRequested);
    }

    let reports: BTreeMap<String, ImportReport> = outcomes
        .iter()
        .map(|(key, outcome)| (key.to_string(), ImportReport::from_outcome(outcome)))
        .collect();

    match &output {
        Some(path) => output::write_report(&reports, path).await?,
        None => output::print_report(&reports)?,
    }

    let aborted = reports.values().filter(|r| r.is_aborted()).count();
    if aborted > 0 {
        return Err(CliError::ImportsAborted(aborted));
    }
    Ok(())
}

async fn show_progress(run: &str, as_json: bool, state_dir: Option<PathBuf>) -> Result<(), CliError> {
    let state_dir = state_dir.or_else(|| std::env::var_os(ENV_STATE_DIR).map(PathBuf::from));
    let store: Arc<dyn StateStore> = open_state_store(state_dir)?;
    let service = ProgressService::new(store);

    let status = service
        .run_status(run)
        .await
        .map_err(|err| CliError::Progress(err.to_string()))?;

    if as_json {
        let json = serde_json::to_string_pretty(&status)?;
        println!("{json}");
    } else {
        print_progress_table(run, &status);
    }

    Ok(())
}

fn print_progress_table(run: &str, status: &ProgressStatus) {
    let or_na = |v: Option<String>| v.unwrap_or_else(|| "n/a".to_string());

    println!("Progress for run '{run}':");
    println!("-----------------------------");
    println!("{:<16} {}", "Stage", status.stage.as_str());
    println!("{:<16} {}", "Kind", or_na(status.kind.clone()));
    println!("{:<16} {}", "Source", or_na(status.source.clone()));
    println!("{:<16} {}", "Last batch", or_na(status.last_batch.map(|b| b.to_string())));
    println!("{:<16} {}", "Records done", status.records_done);
    println!("{:<16} {}", "Resume from", status.resume_from_batch());
    println!("{:<16} {}", "Last update", or_na(status.last_update.map(|ts| ts.to_rfc3339())));
    if let Some(err) = &status.last_error {
        println!("{:<16} {}", "Last error", err);
    }
}

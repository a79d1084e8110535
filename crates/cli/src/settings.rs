use crate::{
    commands::{RunOptions, StoreKind},
    env::EnvManager,
    error::CliError,
};
use engine_processing::ProcessingConfig;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::warn;

pub const ENV_BATCH_SIZE: &str = "CATALOG_BATCH_SIZE";
pub const ENV_MAX_RETRIES: &str = "CATALOG_MAX_RETRIES";
pub const ENV_RETRY_DELAY_SECS: &str = "CATALOG_RETRY_DELAY_SECS";
pub const ENV_SKIP_VALIDATION_ERRORS: &str = "CATALOG_SKIP_VALIDATION_ERRORS";
pub const ENV_PERSIST_FAILURES: &str = "CATALOG_PERSIST_FAILURES";
pub const ENV_ARTIFACT_DIR: &str = "CATALOG_ARTIFACT_DIR";
pub const ENV_STATE_DIR: &str = "CATALOG_STATE_DIR";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Run settings resolved from flags, then environment, then defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub processing: ProcessingConfig,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub state_dir: Option<PathBuf>,
}

pub fn load_env(env_file: Option<&Path>) -> Result<EnvManager, CliError> {
    let mut env = EnvManager::new();
    if let Some(path) = env_file {
        env.load_from_file(path)?;
    }
    Ok(env)
}

impl Settings {
    pub fn resolve(options: &RunOptions, env: &EnvManager) -> Result<Self, CliError> {
        let defaults = ProcessingConfig::default();

        let batch_size = match options.batch_size {
            Some(n) => n,
            None => env.get_parsed(ENV_BATCH_SIZE)?.unwrap_or(defaults.batch_size),
        };
        if batch_size == 0 {
            return Err(CliError::Config("batch size must be at least 1".to_string()));
        }

        let max_retries = match options.max_retries {
            Some(n) => n,
            None => env
                .get_parsed(ENV_MAX_RETRIES)?
                .unwrap_or(defaults.max_retries),
        };

        let retry_delay = match options.retry_delay {
            Some(secs) => Some(secs),
            None => env.get_parsed::<f64>(ENV_RETRY_DELAY_SECS)?,
        };
        let retry_delay = match retry_delay {
            Some(secs) => Duration::try_from_secs_f64(secs)
                .map_err(|_| CliError::Config(format!("Invalid retry delay: {secs}")))?,
            None => defaults.retry_delay,
        };

        let skip_validation_errors = if options.fail_fast {
            false
        } else {
            env.get_bool(ENV_SKIP_VALIDATION_ERRORS)?
                .unwrap_or(defaults.skip_validation_errors)
        };

        let persist_failures = if options.no_artifacts {
            false
        } else {
            env.get_bool(ENV_PERSIST_FAILURES)?
                .unwrap_or(defaults.persist_failures)
        };

        let artifact_dir = options
            .artifact_dir
            .clone()
            .or_else(|| env.get(ENV_ARTIFACT_DIR).map(PathBuf::from))
            .unwrap_or(defaults.artifact_dir.clone());

        let database_url = env.get(ENV_DATABASE_URL).map(str::to_string);
        let store = match options.store {
            Some(store) => store,
            None if database_url.is_some() => StoreKind::Postgres,
            None => {
                warn!("DATABASE_URL is not set, importing into an in-memory store");
                StoreKind::Memory
            }
        };

        let state_dir = options
            .state_dir
            .clone()
            .or_else(|| env.get(ENV_STATE_DIR).map(PathBuf::from));

        let processing = defaults
            .with_batch_size(batch_size)
            .with_max_retries(max_retries)
            .with_retry_delay(retry_delay)
            .with_skip_validation_errors(skip_validation_errors)
            .with_persist_failures(persist_failures)
            .with_artifact_dir(artifact_dir);

        Ok(Settings {
            processing,
            store,
            database_url,
            state_dir,
        })
    }

    pub fn database_url(&self) -> Result<&str, CliError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| CliError::Config(format!("{ENV_DATABASE_URL} must be set")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env_from(content: &str) -> EnvManager {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        // process variables are loaded too, so only keys set here are asserted on
        load_env(Some(file.path())).unwrap()
    }

    #[test]
    fn flags_override_environment() {
        let env = env_from("CATALOG_BATCH_SIZE=200\nCATALOG_MAX_RETRIES=9\n");
        let options = RunOptions {
            batch_size: Some(50),
            store: Some(StoreKind::Memory),
            ..Default::default()
        };

        let settings = Settings::resolve(&options, &env).unwrap();
        assert_eq!(settings.processing.batch_size, 50);
        assert_eq!(settings.processing.max_retries, 9);
    }

    #[test]
    fn environment_fills_missing_flags() {
        let env = env_from(
            "CATALOG_RETRY_DELAY_SECS=0.5\nCATALOG_SKIP_VALIDATION_ERRORS=false\nCATALOG_PERSIST_FAILURES=no\nCATALOG_ARTIFACT_DIR=/tmp/failed\n",
        );
        let options = RunOptions {
            store: Some(StoreKind::Memory),
            ..Default::default()
        };

        let settings = Settings::resolve(&options, &env).unwrap();
        assert_eq!(settings.processing.retry_delay, Duration::from_millis(500));
        assert!(!settings.processing.skip_validation_errors);
        assert!(!settings.processing.persist_failures);
        assert_eq!(settings.processing.artifact_dir, PathBuf::from("/tmp/failed"));
    }

    #[test]
    fn fail_fast_and_no_artifacts_flags() {
        let env = env_from("CATALOG_SKIP_VALIDATION_ERRORS=true\n");
        let options = RunOptions {
            fail_fast: true,
            no_artifacts: true,
            store: Some(StoreKind::Memory),
            ..Default::default()
        };

        let settings = Settings::resolve(&options, &env).unwrap();
        assert!(!settings.processing.skip_validation_errors);
        assert!(!settings.processing.persist_failures);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let env = env_from("CATALOG_BATCH_SIZE=lots\n");
        let err = Settings::resolve(&RunOptions::default(), &env).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));

        let options = RunOptions {
            batch_size: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(&options, &env_from("")).is_err());

        let options = RunOptions {
            retry_delay: Some(-1.0),
            store: Some(StoreKind::Memory),
            ..Default::default()
        };
        assert!(Settings::resolve(&options, &env_from("")).is_err());
    }

    #[test]
    fn database_url_selects_postgres() {
        let env = env_from("DATABASE_URL=postgres://catalog@localhost/catalog\n");
        let settings = Settings::resolve(&RunOptions::default(), &env).unwrap();
        assert_eq!(settings.store, StoreKind::Postgres);
        assert_eq!(
            settings.database_url().unwrap(),
            "postgres://catalog@localhost/catalog"
        );
    }
}

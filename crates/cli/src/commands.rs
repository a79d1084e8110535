use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Import one bulk-data document
    Import {
        #[arg(long, help = "Record kind: sets or cards")]
        kind: String,

        #[arg(long, help = "Path to the JSON document")]
        file: PathBuf,

        #[arg(
            long,
            conflicts_with = "resume",
            help = "Skip batches numbered below this value"
        )]
        resume_from: Option<u64>,

        #[arg(long, help = "Continue after the last checkpointed batch of this run")]
        resume: bool,

        #[arg(long, help = "Run ID for checkpoints; derived from kind and file when omitted")]
        run_id: Option<String>,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: RunOptions,
    },
    /// Import a sets document and a cards document concurrently
    ImportAll {
        #[arg(long, help = "Path to the sets document")]
        sets: PathBuf,

        #[arg(long, help = "Path to the cards document")]
        cards: PathBuf,

        #[arg(long, help = "Continue each run after its last checkpointed batch")]
        resume: bool,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: RunOptions,
    },
    Progress {
        #[arg(long, help = "Run ID to inspect")]
        run: String,

        #[arg(
            long,
            help = "If set, prints the progress information as JSON instead of a table"
        )]
        json: bool,

        #[arg(long, help = "Directory of the checkpoint store")]
        state_dir: Option<PathBuf>,
    },
    /// Fetch one stored record from Postgres
    Inspect {
        #[arg(long, help = "Record kind: sets or cards")]
        kind: String,

        #[arg(long, help = "Record id")]
        id: String,

        #[arg(long, help = "Optional .env file to load DATABASE_URL from")]
        env_file: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    #[arg(long, value_enum, help = "Storage backend [default: postgres]")]
    pub store: Option<StoreKind>,

    #[arg(long, help = "Records per batch [env: CATALOG_BATCH_SIZE] [default: 500]")]
    pub batch_size: Option<usize>,

    #[arg(long, help = "Retries per batch [env: CATALOG_MAX_RETRIES] [default: 3]")]
    pub max_retries: Option<u32>,

    #[arg(
        long,
        help = "Seconds multiplied by the attempt number between retries [env: CATALOG_RETRY_DELAY_SECS] [default: 1]"
    )]
    pub retry_delay: Option<f64>,

    #[arg(long, help = "Abort on the first record that fails validation")]
    pub fail_fast: bool,

    #[arg(long, help = "Do not write failed-record or failed-batch files")]
    pub no_artifacts: bool,

    #[arg(long, help = "Directory for failure files [env: CATALOG_ARTIFACT_DIR] [default: .]")]
    pub artifact_dir: Option<PathBuf>,

    #[arg(long, help = "Checkpoint store directory [env: CATALOG_STATE_DIR]")]
    pub state_dir: Option<PathBuf>,

    #[arg(long, help = "Optional .env file layered over the process environment")]
    pub env_file: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Postgres,
}

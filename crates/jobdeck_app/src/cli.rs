use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jobdeck_core::JobId;

#[derive(Parser)]
#[command(name = "jobdeck")]
#[command(about = "Follow and control batch scraping jobs from the terminal")]
#[command(version)]
pub struct Cli {
    /// Server base URL (overrides the config file)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Settings file in RON format (defaults to ./jobdeck.ron when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Follow the event feed and keep the job list fresh until interrupted
    Watch,

    /// Upload a spreadsheet of items and create a job
    Upload {
        /// Spreadsheet to upload
        file: PathBuf,

        /// Parallel browser workers (server default when omitted)
        #[arg(short, long)]
        workers: Option<u32>,

        /// Use the stealth browser profile
        #[arg(long)]
        stealth: bool,

        /// Start the job right away and follow its progress
        #[arg(long)]
        start: bool,
    },

    /// Start a pending job and follow its progress
    Start { id: JobId },

    /// Stop a running job
    Stop { id: JobId },

    /// Retry the failed items of a job and follow its progress
    Retry { id: JobId },

    /// List jobs
    Jobs,

    /// Show item outcomes for one job
    Show { id: JobId },

    /// Show dashboard statistics
    Stats,

    /// Download the result spreadsheet of a completed job
    Download {
        id: JobId,

        /// Destination directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Close out jobs left in the running state
    FixStuck,
}

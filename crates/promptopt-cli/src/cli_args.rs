use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "promptopt", about = "Prompt-optimization engine CLI", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Runs the Loop Orchestrator to convergence or max_iterations.
    Optimize {
        #[arg(long)]
        epics_file: PathBuf,
        #[arg(long)]
        champion_file: PathBuf,
        #[arg(long)]
        max_iterations: Option<u64>,
    },
    /// Distributionally evaluates one prompt against a set of epics.
    Evaluate {
        #[arg(long)]
        epics_file: PathBuf,
        #[arg(long)]
        base_file: PathBuf,
        #[arg(long)]
        patch_file: Option<PathBuf>,
    },
    /// Mines contrastive good/bad pairs from an evaluation report.
    MinePairs {
        #[arg(long)]
        epics_file: PathBuf,
        #[arg(long)]
        base_file: PathBuf,
        #[arg(long)]
        patch_file: Option<PathBuf>,
    },
    /// Synthesizes candidate patches from mined pairs via the LLM.
    GeneratePatches {
        #[arg(long)]
        epics_file: PathBuf,
        #[arg(long)]
        base_file: PathBuf,
        #[arg(long)]
        patch_file: Option<PathBuf>,
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// Runs the champion/challenger tournament over synthesized candidates.
    Tournament {
        #[arg(long)]
        epics_file: PathBuf,
        #[arg(long)]
        base_file: PathBuf,
        #[arg(long)]
        champion_patch_file: Option<PathBuf>,
        #[arg(long)]
        candidates_file: PathBuf,
    },
}

//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::application::OutputFormat;
use crate::domain::{DenominatorPolicy, SignificanceMode};

/// Mean proportion of sites under positive selection per leaf, from aBSREL results
#[derive(Parser, Debug)]
#[command(name = "catfish")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Project directory holding .catfish.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute mean PSS per leaf for aBSREL result documents
    Pss(PssArgs),

    /// Show a result document's tree with resolved node names
    Tree {
        /// aBSREL result document (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        result: PathBuf,

        /// Partition key of the document (default: from config)
        #[arg(long)]
        partition: Option<String>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Flags override the configured values for one run.
#[derive(clap::Args, Debug, Default)]
pub struct PssArgs {
    /// aBSREL result documents (JSON)
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    pub results: Vec<PathBuf>,

    /// BH significance table (TSV: gene, tree, branch, rejected)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub bh_table: Option<PathBuf>,

    /// Functional category table (CSV)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub annotations: Option<PathBuf>,

    /// Gene name in the significance table (default: result file name)
    #[arg(long)]
    pub gene: Option<String>,

    /// Tree id in the significance table (default: the partition)
    #[arg(long)]
    pub tree: Option<String>,

    /// Partition key of the documents
    #[arg(long)]
    pub partition: Option<String>,

    /// Significance source: rejection-table | p-value-threshold
    #[arg(long)]
    pub mode: Option<SignificanceMode>,

    /// Corrected p-value cutoff for p-value-threshold mode
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Denominator: all-branches | significant-rate-categories
    #[arg(long)]
    pub denominator: Option<DenominatorPolicy>,

    /// Report shape: annotated | mean-only
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Output directory (default: from config)
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Print reports to stdout instead of writing files
    #[arg(long)]
    pub stdout: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,

    /// Print config template
    Template,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },
}

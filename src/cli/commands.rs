//! Command dispatch

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::application::services::PssJob;
use crate::application::report::REPORT_SUFFIX;
use crate::application::{ApplicationError, ApplicationResult, SelectionResult};
use crate::cli::args::{Cli, Commands, ConfigCommands, PssArgs};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{SignificanceMode, TreeDisplay};
use crate::infrastructure::{InfraError, ServiceContainer};
use crate::util::path::PathExt;

/// Execute the parsed command line.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("resolve current directory", e))?,
    };
    debug!("project_dir: {}", project_dir.display());

    match &cli.command {
        Some(Commands::Pss(args)) => {
            let container = ServiceContainer::new(Settings::load(Some(&project_dir))?);
            cmd_pss(&container, args)
        }
        Some(Commands::Tree { result, partition }) => {
            let container = ServiceContainer::new(Settings::load(Some(&project_dir))?);
            cmd_tree(&container, result, partition.as_deref())
        }
        Some(Commands::Config { command }) => cmd_config(command, &project_dir),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see 'catfish --help'".to_string(),
        )),
    }
}

/// Settings with the command-line flags of one `pss` run applied on top.
pub fn apply_pss_overrides(settings: &Settings, args: &PssArgs) -> CliResult<Settings> {
    let mut settings = settings.clone();
    if let Some(mode) = args.mode {
        settings.significance.mode = mode;
    }
    if let Some(threshold) = args.threshold {
        settings.significance.p_value_threshold = threshold;
    }
    if let Some(denominator) = args.denominator {
        settings.aggregation.denominator = denominator;
    }
    if let Some(partition) = &args.partition {
        settings.input.partition = partition.clone();
    }
    if let Some(path) = &args.bh_table {
        settings.input.bh_table = Some(path.clone());
    }
    if let Some(path) = &args.annotations {
        settings.input.annotation_table = Some(path.clone());
    }
    if let Some(dir) = &args.output_dir {
        settings.output.dir = dir.clone();
    }
    if let Some(format) = args.format {
        settings.output.format = format;
    }
    settings.validate()?;
    Ok(settings)
}

enum Delivered {
    Written(PathBuf),
    Printed(String),
}

#[instrument(level = "debug", skip(container, args))]
fn cmd_pss(container: &ServiceContainer, args: &PssArgs) -> CliResult<()> {
    check_batch(args)?;
    let settings = apply_pss_overrides(&container.settings, args)?;
    if settings.significance.mode == SignificanceMode::RejectionTable
        && settings.input.bh_table.is_none()
    {
        return Err(ApplicationError::Config {
            message: "rejection-table significance needs a significance table \
                      (--bh-table or input.bh_table)"
                .to_string(),
        }
        .into());
    }

    let options = settings.pss_options();
    let format = settings.output.format;
    let tables = container.pss.load_tables(
        settings.input.bh_table.as_deref(),
        settings.input.annotation_table.as_deref(),
    )?;

    let jobs: Vec<PssJob> = args
        .results
        .iter()
        .map(|path| PssJob {
            result_path: path.clone(),
            gene: args.gene.clone(),
            tree: args.tree.clone(),
        })
        .collect();

    let outcomes: Vec<ApplicationResult<Delivered>> = jobs
        .par_iter()
        .map(|job| -> ApplicationResult<Delivered> {
            let report = container.pss.compute(job, &options, &tables)?;
            if args.stdout {
                Ok(Delivered::Printed(report.to_json(format)?))
            } else {
                container
                    .pss
                    .write_report(&report, format, &settings.output.dir)
                    .map(Delivered::Written)
            }
        })
        .collect();

    let total = outcomes.len();
    let mut errors = Vec::new();
    for (job, outcome) in jobs.iter().zip(outcomes) {
        match outcome {
            Ok(Delivered::Printed(json)) => output::info(&json),
            Ok(Delivered::Written(path)) => output::action(
                "Wrote",
                &format!("{} -> {}", job.result_path.display(), path.display()),
            ),
            Err(e) => {
                output::error(&format!("{}: {}", job.result_path.display(), e));
                errors.push(e);
            }
        }
    }
    info!("{} of {} result documents processed", total - errors.len(), total);

    match errors.len() {
        0 => Ok(()),
        1 if total == 1 => Err(errors.remove(0).into()),
        failed => Err(CliError::Failed { failed, total }),
    }
}

/// Rejects batches whose results would be ambiguous or overwrite each other.
fn check_batch(args: &PssArgs) -> CliResult<()> {
    if args.results.len() > 1 {
        if args.gene.is_some() || args.tree.is_some() {
            return Err(CliError::Usage(
                "--gene and --tree need exactly one result document".to_string(),
            ));
        }
        if args.stdout {
            return Err(CliError::Usage(
                "--stdout needs exactly one result document".to_string(),
            ));
        }
    }

    let mut seen: HashMap<String, &Path> = HashMap::new();
    for path in &args.results {
        let key = path.result_key();
        if let Some(first) = seen.insert(key.clone(), path) {
            return Err(CliError::Usage(format!(
                "{} and {} would both write {}{}",
                first.display(),
                path.display(),
                key,
                REPORT_SUFFIX
            )));
        }
    }
    Ok(())
}

fn cmd_tree(
    container: &ServiceContainer,
    result: &Path,
    partition: Option<&str>,
) -> CliResult<()> {
    let partition = partition.unwrap_or(container.settings.input.partition.as_str());
    let document = SelectionResult::load(container.fs.as_ref(), result, partition)?;
    let tree = document.tree().map_err(ApplicationError::from)?;
    output::header(&format!(
        "{} (partition {}): {} nodes, {} leaves",
        result.display(),
        partition,
        tree.len(),
        tree.leaves().len()
    ));
    output::info(&tree.to_tree_string());
    Ok(())
}

fn cmd_config(command: &ConfigCommands, project_dir: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(Some(project_dir))?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::detail(&format!(
                    "global: {}{}",
                    path.display(),
                    exists_marker(&path)
                )),
                None => output::warning("global: cannot determine config directory"),
            }
            let local = local_config_path(project_dir);
            output::detail(&format!("local:  {}{}", local.display(), exists_marker(&local)));
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                local_config_path(project_dir)
            };
            if path.exists() {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
            }
            std::fs::write(&path, Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("Created {}", path.display()));
        }
    }
    Ok(())
}

fn exists_marker(path: &Path) -> &'static str {
    if path.exists() {
        ""
    } else {
        " (not found)"
    }
}

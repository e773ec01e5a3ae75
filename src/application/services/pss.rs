//! Mean PSS service
//!
//! Runs one (gene, tree) computation: result document → tree + branch attributes →
//! significance resolver → aggregation → annotated report → one atomic write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::document::{SelectionResult, DEFAULT_PARTITION};
use crate::application::error_ext::PathContextExt;
use crate::application::report::{OutputFormat, PssReport};
use crate::application::tables::{AnnotationTable, SignificanceTable};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    assemble, compute_mean_pss, Annotation, DenominatorPolicy, DomainError, PValueThreshold,
    RejectionTable, SignificanceMode, SignificanceResolver, DEFAULT_P_VALUE_THRESHOLD,
};
use crate::infrastructure::traits::FileSystem;
use crate::util::path::PathExt;

/// Knobs of one computation, resolved from settings and command-line flags.
#[derive(Debug, Clone, PartialEq)]
pub struct PssOptions {
    pub significance: SignificanceMode,
    pub p_value_threshold: f64,
    pub denominator: DenominatorPolicy,
    /// Partition of the result document holding the tree
    pub partition: String,
}

impl Default for PssOptions {
    fn default() -> Self {
        Self {
            significance: SignificanceMode::default(),
            p_value_threshold: DEFAULT_P_VALUE_THRESHOLD,
            denominator: DenominatorPolicy::default(),
            partition: DEFAULT_PARTITION.to_string(),
        }
    }
}

/// One result document to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PssJob {
    pub result_path: PathBuf,
    /// Gene name in the significance table (default: result file key)
    pub gene: Option<String>,
    /// Tree id in the significance table (default: the partition)
    pub tree: Option<String>,
}

impl PssJob {
    pub fn new(result_path: impl Into<PathBuf>) -> Self {
        Self {
            result_path: result_path.into(),
            gene: None,
            tree: None,
        }
    }
}

/// Tables shared by all jobs of one run. Loaded once.
#[derive(Debug, Clone, Default)]
pub struct PssTables {
    pub significance: Option<SignificanceTable>,
    pub annotations: Option<AnnotationTable>,
}

/// Service computing mean PSS reports.
pub struct PssService {
    fs: Arc<dyn FileSystem>,
}

impl PssService {
    /// Create a new PSS service.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Load the significance and annotation tables, when configured.
    pub fn load_tables(
        &self,
        significance: Option<&Path>,
        annotations: Option<&Path>,
    ) -> ApplicationResult<PssTables> {
        let significance = significance
            .map(|path| SignificanceTable::load(self.fs.as_ref(), path))
            .transpose()?;
        let annotations = annotations
            .map(|path| AnnotationTable::load(self.fs.as_ref(), path))
            .transpose()?;
        Ok(PssTables {
            significance,
            annotations,
        })
    }

    /// Compute the report for one result document.
    ///
    /// Fails as a whole: either every leaf has a record or an error names the gene and tree.
    #[instrument(level = "debug", skip(self, tables), fields(result = %job.result_path.display()))]
    pub fn compute(
        &self,
        job: &PssJob,
        options: &PssOptions,
        tables: &PssTables,
    ) -> ApplicationResult<PssReport> {
        let key = job.result_path.result_key();
        let gene = job.gene.clone().unwrap_or_else(|| key.clone());
        let tree_id = job.tree.clone().unwrap_or_else(|| options.partition.clone());
        let tree_failed = |source: DomainError| ApplicationError::TreeFailed {
            gene: gene.clone(),
            tree: tree_id.clone(),
            source,
        };

        let result = SelectionResult::load(self.fs.as_ref(), &job.result_path, &options.partition)?;
        let tree = result.tree().map_err(tree_failed)?;

        let rejections: RejectionTable;
        let threshold: PValueThreshold<'_>;
        let resolver: &dyn SignificanceResolver = match options.significance {
            SignificanceMode::RejectionTable => {
                let table =
                    tables
                        .significance
                        .as_ref()
                        .ok_or_else(|| ApplicationError::Config {
                            message: "rejection-table significance needs a significance table"
                                .to_string(),
                        })?;
                rejections = table.rejection_table(&gene, &tree_id);
                &rejections
            }
            SignificanceMode::PValueThreshold => {
                threshold =
                    PValueThreshold::new(&result.branch_attributes, options.p_value_threshold);
                &threshold
            }
        };

        let mean_pss = compute_mean_pss(
            &tree,
            &result.branch_attributes,
            resolver,
            options.denominator,
        )
        .map_err(tree_failed)?;

        let annotation = tables
            .annotations
            .as_ref()
            .map(|table| table.lookup(&key))
            .unwrap_or_else(Annotation::unknown);
        debug!(
            "annotation for {}: {:?}",
            key, annotation.functional_category
        );

        info!(
            "gene '{}', tree '{}': {} leaves ({}, {})",
            gene,
            tree_id,
            mean_pss.len(),
            options.significance,
            options.denominator
        );

        Ok(PssReport {
            source: job.result_path.clone(),
            key,
            records: assemble(&mean_pss, &annotation),
            gene,
            tree: tree_id,
        })
    }

    /// Write a report in one atomic step. Returns the written path.
    #[instrument(level = "debug", skip(self, report), fields(key = %report.key))]
    pub fn write_report(
        &self,
        report: &PssReport,
        format: OutputFormat,
        output_dir: &Path,
    ) -> ApplicationResult<PathBuf> {
        let json = report.to_json(format)?;
        self.fs
            .create_dir_all(output_dir)
            .with_path_context("create output directory", output_dir)?;
        let path = report.output_path(output_dir);
        self.fs
            .write_atomic(&path, &format!("{json}\n"))
            .with_path_context("write report", &path)?;
        debug!("wrote {}", path.display());
        Ok(path)
    }
}

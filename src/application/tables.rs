//! Significance (TSV) and functional-category (CSV) tables.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::application::error_ext::PathContextExt;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{Annotation, RejectionTable};
use crate::infrastructure::traits::FileSystem;

#[derive(Debug, Deserialize)]
struct SignificanceRow {
    gene: String,
    tree: String,
    branch: String,
    rejected: String,
}

/// Branch rejection flags for every gene, indexed gene → tree → branch.
#[derive(Debug, Clone, Default)]
pub struct SignificanceTable {
    genes: HashMap<String, HashMap<String, HashMap<String, bool>>>,
}

impl SignificanceTable {
    #[instrument(level = "debug", skip(fs))]
    pub fn load(fs: &dyn FileSystem, path: &Path) -> ApplicationResult<Self> {
        let content = fs
            .read_to_string(path)
            .with_path_context("read significance table", path)?;
        Self::parse(&content, path)
    }

    /// Parse tab-separated content with a `gene tree branch rejected` header.
    /// `rejected` is true only for the literal `True`.
    pub fn parse(content: &str, path: &Path) -> ApplicationResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut table = Self::default();
        let mut rows = 0usize;
        for row in reader.deserialize::<SignificanceRow>() {
            let row = row.map_err(|e| ApplicationError::InvalidTable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            table
                .genes
                .entry(row.gene)
                .or_default()
                .entry(row.tree)
                .or_default()
                .insert(row.branch, row.rejected == "True");
            rows += 1;
        }
        debug!("{} rows for {} genes", rows, table.genes.len());
        Ok(table)
    }

    pub fn contains_gene(&self, gene: &str) -> bool {
        self.genes.contains_key(gene)
    }

    pub fn gene_count(&self) -> usize {
        self.genes.len()
    }

    /// Rejection flags of one (gene, tree) pair. Unknown pairs give an empty table, in
    /// which every branch is non-significant.
    pub fn rejection_table(&self, gene: &str, tree: &str) -> RejectionTable {
        match self.genes.get(gene).and_then(|trees| trees.get(tree)) {
            Some(branches) => RejectionTable::new(branches.clone()),
            None => {
                warn!(
                    "no significance rows for gene '{}', tree '{}': all branches non-significant",
                    gene, tree
                );
                RejectionTable::default()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnnotationRow {
    #[serde(rename = "File name")]
    file_name: String,
    #[serde(rename = "Functional Category")]
    functional_category: String,
    #[serde(rename = "Functional Category Analyses")]
    functional_category_analyses: String,
}

/// Functional-category annotations keyed by result file name (no directory, no extension).
#[derive(Debug, Clone, Default)]
pub struct AnnotationTable {
    rows: HashMap<String, Annotation>,
}

impl AnnotationTable {
    #[instrument(level = "debug", skip(fs))]
    pub fn load(fs: &dyn FileSystem, path: &Path) -> ApplicationResult<Self> {
        let content = fs
            .read_to_string(path)
            .with_path_context("read annotation table", path)?;
        Self::parse(&content, path)
    }

    /// Parse comma-separated content. Extra columns are ignored; the first row for a file
    /// name wins.
    pub fn parse(content: &str, path: &Path) -> ApplicationResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut rows = HashMap::new();
        for row in reader.deserialize::<AnnotationRow>() {
            let row = row.map_err(|e| ApplicationError::InvalidTable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            rows.entry(row.file_name).or_insert_with(|| {
                Annotation::new(row.functional_category, row.functional_category_analyses)
            });
        }
        debug!("{} annotated result files", rows.len());
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Annotation for `key`, or the UNKNOWN pair when no row matches.
    pub fn lookup(&self, key: &str) -> Annotation {
        self.rows.get(key).cloned().unwrap_or_else(|| {
            debug!("no annotation for '{}'", key);
            Annotation::unknown()
        })
    }
}

// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! Transcript-to-gene mapping.

use crate::artifacts::{ArtifactKey, ArtifactResult};
use anyhow::{ensure, Context, Result};
use std::path::Path;
use transcriptome::extract::INTRON_SUFFIX;
use transcriptome::gtf::{Gtf, GtfRecord};

/// One `(transcript, gene, gene_name)` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct T2gRow {
    pub transcript: String,
    pub gene: String,
    pub gene_name: String,
}

impl T2gRow {
    fn from_record(rec: &GtfRecord) -> Result<T2gRow> {
        let row = T2gRow {
            transcript: rec.transcript()?,
            gene: rec.gene()?,
            gene_name: rec.get("gene_name").unwrap_or_default().to_string(),
        };
        ensure!(
            !row.transcript.is_empty() && !row.gene.is_empty(),
            "GTF line {}: transcript and gene ids must not be empty",
            rec.line_num
        );
        Ok(row)
    }

    /// The row mapping the intronic sequence of this transcript to the same gene.
    fn intron(&self) -> T2gRow {
        T2gRow {
            transcript: format!("{}{INTRON_SUFFIX}", self.transcript),
            ..self.clone()
        }
    }
}

/// Write a tab-separated transcript-to-gene mapping for every `transcript` row of the GTF at
/// `gtf_path`, in file order.
///
/// With `intron`, each row is followed by a `<transcript>-I` row for the same gene.
pub fn create_t2g_from_gtf(
    gtf_path: &Path,
    t2g_path: &Path,
    intron: bool,
) -> Result<ArtifactResult> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(t2g_path)
        .with_context(|| t2g_path.display().to_string())?;

    let mut write_row = |row: &T2gRow| -> Result<()> {
        writer
            .write_record([&row.transcript, &row.gene, &row.gene_name])
            .with_context(|| t2g_path.display().to_string())
    };

    for rec in Gtf::new(gtf_path).entries()? {
        let rec = rec?;
        if rec.feature != "transcript" {
            continue;
        }
        let row = T2gRow::from_record(&rec)?;
        write_row(&row)?;
        if intron {
            write_row(&row.intron())?;
        }
    }
    writer
        .flush()
        .with_context(|| t2g_path.display().to_string())?;

    Ok(ArtifactResult::single(ArtifactKey::T2g, t2g_path))
}

// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! Sorted copies of the genome and annotation, as expected by the extraction steps.

use anyhow::Result;
use std::path::{Path, PathBuf};
use transcriptome::fasta::Fasta;
use transcriptome::gtf::Gtf;

/// Sort the FASTA at `fasta_path` by sequence id into `out_path`.
pub fn sort_fasta(fasta_path: &Path, out_path: &Path) -> Result<PathBuf> {
    Fasta::new(fasta_path).sort(out_path)?;
    Ok(out_path.to_path_buf())
}

/// Sort the GTF at `gtf_path` by position into `out_path`.
pub fn sort_gtf(gtf_path: &Path, out_path: &Path) -> Result<PathBuf> {
    Gtf::new(gtf_path).sort(out_path)?;
    Ok(out_path.to_path_buf())
}

// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! Transcripts-to-capture lists.

use crate::artifacts::{ArtifactKey, ArtifactResult};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use transcriptome::fasta::Fasta;

/// Write the id of every sequence in the FASTA at `fasta_path`, one per line, in file order.
pub fn create_t2c(fasta_path: &Path, t2c_path: &Path) -> Result<ArtifactResult> {
    let mut writer =
        BufWriter::new(File::create(t2c_path).with_context(|| t2c_path.display().to_string())?);
    for id in Fasta::new(fasta_path).ids()? {
        writeln!(writer, "{}", id?).with_context(|| t2c_path.display().to_string())?;
    }
    writer
        .flush()
        .with_context(|| t2c_path.display().to_string())?;
    Ok(ArtifactResult::single(ArtifactKey::T2c, t2c_path))
}

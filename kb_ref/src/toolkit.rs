// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! The collaborators the pipelines delegate to.

use crate::artifacts::ArtifactResult;
use crate::kallisto::kallisto_index;
use crate::sort::{sort_fasta, sort_gtf};
use anyhow::Result;
use std::path::{Path, PathBuf};
use transcriptome::concat::concatenate_files;
use transcriptome::extract::{generate_cdna_fasta, generate_intron_fasta};

/// Every step of a reference build other than the t2g and t2c writers.
pub trait Toolkit {
    fn sort_fasta(&self, fasta_path: &Path, out_path: &Path) -> Result<PathBuf>;

    fn sort_gtf(&self, gtf_path: &Path, out_path: &Path) -> Result<PathBuf>;

    fn generate_cdna_fasta(
        &self,
        fasta_path: &Path,
        gtf_path: &Path,
        out_path: &Path,
    ) -> Result<PathBuf>;

    fn generate_intron_fasta(
        &self,
        fasta_path: &Path,
        gtf_path: &Path,
        out_path: &Path,
    ) -> Result<PathBuf>;

    fn concatenate_files(
        &self,
        path_a: &Path,
        path_b: &Path,
        out_path: &Path,
        temp_dir: &Path,
    ) -> Result<PathBuf>;

    /// Build the index of `fasta_path` at `index_path`; the result is keyed `index`.
    fn index(&self, fasta_path: &Path, index_path: &Path) -> Result<ArtifactResult>;
}

/// The in-process implementations, plus the external `kallisto` for indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeToolkit {
    /// Overrides the configured `kallisto`. Resolved only when indexing.
    pub kallisto: Option<PathBuf>,
    pub kmer_size: usize,
    pub intron_flank: u64,
}

impl NativeToolkit {
    /// A toolkit using the values of parameters.toml.
    pub fn from_parameters() -> Result<NativeToolkit> {
        Ok(NativeToolkit {
            kallisto: None,
            kmer_size: *parameters_toml::kmer_size()?,
            intron_flank: *parameters_toml::intron_flank()?,
        })
    }

    /// Resolve the `kallisto` binary to run.
    pub fn kallisto_binary(&self) -> Result<PathBuf> {
        parameters_toml::kallisto_binary_path(self.kallisto.as_deref())
    }
}

impl Toolkit for NativeToolkit {
    fn sort_fasta(&self, fasta_path: &Path, out_path: &Path) -> Result<PathBuf> {
        sort_fasta(fasta_path, out_path)
    }

    fn sort_gtf(&self, gtf_path: &Path, out_path: &Path) -> Result<PathBuf> {
        sort_gtf(gtf_path, out_path)
    }

    fn generate_cdna_fasta(
        &self,
        fasta_path: &Path,
        gtf_path: &Path,
        out_path: &Path,
    ) -> Result<PathBuf> {
        generate_cdna_fasta(fasta_path, gtf_path, out_path)
    }

    fn generate_intron_fasta(
        &self,
        fasta_path: &Path,
        gtf_path: &Path,
        out_path: &Path,
    ) -> Result<PathBuf> {
        generate_intron_fasta(fasta_path, gtf_path, out_path, self.intron_flank)
    }

    fn concatenate_files(
        &self,
        path_a: &Path,
        path_b: &Path,
        out_path: &Path,
        temp_dir: &Path,
    ) -> Result<PathBuf> {
        concatenate_files(path_a, path_b, out_path, temp_dir)
    }

    fn index(&self, fasta_path: &Path, index_path: &Path) -> Result<ArtifactResult> {
        kallisto_index(&self.kallisto_binary()?, fasta_path, index_path, self.kmer_size)
    }
}

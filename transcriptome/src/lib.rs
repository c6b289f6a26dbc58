// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! Annotation and sequence sources for building a pseudoalignment reference,
//! and the file-to-file transforms that derive transcript sequences from them.

pub mod concat;
pub mod extract;
pub mod fasta;
pub mod gtf;
mod io;
pub mod parse_gtf;
mod transcript_sequence;
mod transcriptome;
pub use crate::transcriptome::*;

// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! Building kallisto | bustools reference artifacts from a genome FASTA and a GTF annotation.
//!
//! `ref_standard` indexes spliced transcripts; `ref_velocity` additionally indexes intronic
//! sequence and writes a capture list per sequence class. Both return an [`ArtifactResult`]
//! naming every file they produced.

pub mod artifacts;
pub mod cache;
pub mod events;
pub mod kallisto;
pub mod pipeline;
pub mod sort;
pub mod t2c;
pub mod t2g;
pub mod toolkit;

pub use artifacts::{ArtifactKey, ArtifactResult};
pub use pipeline::{ref_standard, ref_standard_with, ref_velocity, ref_velocity_with};
pub use pipeline::{StandardRef, VelocityRef};

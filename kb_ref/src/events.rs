// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! Progress notifications emitted by the pipelines.

use log::info;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    CreatingT2g(PathBuf),
    SortingFasta,
    SortingGtf,
    SplittingCdna(PathBuf),
    CreatingCdnaT2c(PathBuf),
    SplittingIntrons(PathBuf),
    CreatingIntronT2c(PathBuf),
    Concatenating,
    Indexing(PathBuf),
    /// The index already exists and overwriting was not requested.
    SkippedIndex(PathBuf),
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineEvent::CreatingT2g(p) => {
                write!(f, "Creating transcript-to-gene mapping at {}", p.display())
            }
            PipelineEvent::SortingFasta => write!(f, "Sorting FASTA"),
            PipelineEvent::SortingGtf => write!(f, "Sorting GTF"),
            PipelineEvent::SplittingCdna(p) => {
                write!(f, "Splitting genome into cDNA at {}", p.display())
            }
            PipelineEvent::CreatingCdnaT2c(p) => {
                write!(f, "Creating cDNA transcripts-to-capture at {}", p.display())
            }
            PipelineEvent::SplittingIntrons(p) => {
                write!(f, "Splitting genome into introns at {}", p.display())
            }
            PipelineEvent::CreatingIntronT2c(p) => {
                write!(f, "Creating intron transcripts-to-capture at {}", p.display())
            }
            PipelineEvent::Concatenating => write!(f, "Concatenating cDNA and intron FASTAs"),
            PipelineEvent::Indexing(p) => write!(f, "Indexing to {}", p.display()),
            PipelineEvent::SkippedIndex(p) => write!(
                f,
                "Skipping kallisto index because {} already exists. Use the --overwrite flag to overwrite.",
                p.display()
            ),
        }
    }
}

/// Receives pipeline progress.
pub trait EventSink {
    fn emit(&mut self, event: PipelineEvent);
}

/// Forwards every event to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: PipelineEvent) {
        info!("{event}");
    }
}

/// Collects events, in order.
impl EventSink for Vec<PipelineEvent> {
    fn emit(&mut self, event: PipelineEvent) {
        self.push(event);
    }
}

// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! Annotation source over a GTF file.

use crate::io::open_maybe_gz;
use crate::parse_gtf::{parse_gtf_line, validate_gtf_line, Record};
use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};

/// A required attribute was absent from a GTF row.
#[derive(Debug, thiserror::Error)]
#[error("GTF line {line_num}: {feature} entry is missing the required attribute \"{key}\"")]
pub struct MissingAttribute {
    pub key: String,
    pub feature: String,
    pub line_num: usize,
}

/// Append `.{version}` to `id` when a non-empty version is present.
///
/// Any non-empty string counts, so `"0"` is appended; an empty string is not.
pub fn versioned_id(id: &str, version: Option<&str>) -> String {
    match version {
        Some(v) if !v.is_empty() => format!("{id}.{v}"),
        _ => id.to_string(),
    }
}

/// One row of gene annotation, owning its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct GtfRecord {
    pub seqname: String,
    pub source: String,
    pub feature: String,
    /// 1-based, inclusive, as written in the file.
    pub start: u64,
    pub end: u64,
    pub score: Option<f64>,
    pub strand: String,
    pub frame: String,
    /// Attribute name/value pairs in file order.
    pub group: Vec<(String, String)>,
    /// 1-based line number in the source file.
    pub line_num: usize,
}

impl GtfRecord {
    fn from_record(rec: &Record<'_>, line_num: usize) -> GtfRecord {
        GtfRecord {
            seqname: rec.seqname.to_string(),
            source: rec.source.to_string(),
            feature: rec.feature_type.to_string(),
            start: rec.start,
            end: rec.end,
            score: rec.score,
            strand: rec.strand.to_string(),
            frame: rec.frame.to_string(),
            group: rec
                .attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            line_num,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.group
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Like `get`, but a missing key is a `MissingAttribute` error.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| {
            anyhow!(MissingAttribute {
                key: key.to_string(),
                feature: self.feature.clone(),
                line_num: self.line_num,
            })
        })
    }

    /// `transcript_id`, suffixed with `transcript_version` when present.
    pub fn transcript(&self) -> Result<String> {
        Ok(versioned_id(
            self.require("transcript_id")?,
            self.get("transcript_version"),
        ))
    }

    /// `gene_id`, suffixed with `gene_version` when present.
    pub fn gene(&self) -> Result<String> {
        Ok(versioned_id(self.require("gene_id")?, self.get("gene_version")))
    }
}

/// A GTF file on disk. Every call to `entries` re-opens the file.
#[derive(Debug, Clone)]
pub struct Gtf {
    path: PathBuf,
}

impl Gtf {
    pub fn new(path: impl Into<PathBuf>) -> Gtf {
        Gtf { path: path.into() }
    }

    /// Lazily parse the records of the file, skipping comments and blank lines.
    pub fn entries(&self) -> Result<GtfEntries> {
        Ok(GtfEntries {
            lines: open_maybe_gz(&self.path)?.lines(),
            line_num: 0,
            path: self.path.clone(),
        })
    }

    /// Write a copy of the file sorted by seqname, start, end and feature.
    /// Comments are dropped; ties keep their input order.
    pub fn sort(&self, out_path: &Path) -> Result<()> {
        let mut lines = Vec::new();
        for (line_num, line) in open_maybe_gz(&self.path)?.lines().enumerate() {
            let line = line.with_context(|| self.path.display().to_string())?;
            if is_skipped(&line) {
                continue;
            }
            // Validate now so that a bad line fails the sort rather than a later step.
            parse_line(&line, line_num + 1)?;
            lines.push(line);
        }

        let mut keyed: Vec<_> = lines
            .iter()
            .filter_map(|line| {
                parse_gtf_line(line)
                    .ok()
                    .map(|(_, rec)| (rec.sort_key(), line))
            })
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let mut writer = BufWriter::new(
            File::create(out_path).with_context(|| out_path.display().to_string())?,
        );
        for (_, line) in keyed {
            writeln!(writer, "{line}")?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn is_skipped(line: &str) -> bool {
    line.starts_with('#') || line.trim().is_empty()
}

fn parse_line(line: &str, line_num: usize) -> Result<GtfRecord> {
    match parse_gtf_line(line) {
        Ok((_, rec)) => Ok(GtfRecord::from_record(&rec, line_num)),
        Err(_) => {
            let reason = match validate_gtf_line(line) {
                Ok(()) => anyhow!("please check this line of your GTF file for formatting errors"),
                Err(err) => err,
            };
            bail!("Parsing GTF on line {line_num}: {reason}\nLine = '{line}'")
        }
    }
}

/// Iterator returned by `Gtf::entries`.
pub struct GtfEntries {
    lines: Lines<Box<dyn BufRead>>,
    line_num: usize,
    path: PathBuf,
}

impl Iterator for GtfEntries {
    type Item = Result<GtfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => {
                    return Some(Err(err).with_context(|| self.path.display().to_string()))
                }
            };
            self.line_num += 1;
            if is_skipped(&line) {
                continue;
            }
            return Some(parse_line(&line, self.line_num));
        }
    }
}

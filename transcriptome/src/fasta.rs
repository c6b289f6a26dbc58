// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! Sequence source over a FASTA file.

use crate::io::open_maybe_gz;
use anyhow::{ensure, Context, Result};
use bio::io::fasta;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// One FASTA record. `id` is the first whitespace-delimited token of the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaEntry {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

/// A FASTA file on disk. Every call to `entries` re-opens the file.
#[derive(Debug, Clone)]
pub struct Fasta {
    path: PathBuf,
}

impl Fasta {
    pub fn new(path: impl Into<PathBuf>) -> Fasta {
        Fasta { path: path.into() }
    }

    /// Lazily read the records of the file in order.
    pub fn entries(&self) -> Result<impl Iterator<Item = Result<FastaEntry>>> {
        let path = self.path.clone();
        let records = fasta::Reader::new(open_maybe_gz(&self.path)?).records();
        Ok(records.map(move |rec| {
            let rec = rec.with_context(|| path.display().to_string())?;
            Ok(FastaEntry {
                id: rec.id().to_string(),
                desc: rec.desc().map(str::to_string),
                seq: rec.seq().to_vec(),
            })
        }))
    }

    /// Only the sequence ids, in file order.
    pub fn ids(&self) -> Result<impl Iterator<Item = Result<String>>> {
        Ok(self.entries()?.map(|entry| entry.map(|e| e.id)))
    }

    /// Write a copy of the file sorted by sequence id. Ties keep their input order.
    ///
    /// Only ids and byte ranges are held in memory; records are copied verbatim from the input.
    /// A gzipped input is first decompressed into a temporary file next to `out_path`.
    pub fn sort(&self, out_path: &Path) -> Result<()> {
        let decompressed;
        let source = if self.path.extension().is_some_and(|ext| ext == "gz") {
            decompressed = self.decompress_near(out_path)?;
            decompressed.path()
        } else {
            self.path.as_path()
        };

        let mut records = index_records(source)?;
        records.sort_by(|a, b| a.id.cmp(&b.id));

        let mut input = File::open(source).with_context(|| source.display().to_string())?;
        let mut writer = BufWriter::new(
            File::create(out_path).with_context(|| out_path.display().to_string())?,
        );
        for rec in &records {
            input.seek(SeekFrom::Start(rec.start))?;
            io::copy(&mut (&mut input).take(rec.end - rec.start), &mut writer)
                .with_context(|| source.display().to_string())?;
            if !rec.ends_with_newline {
                writer.write_all(b"\n")?;
            }
        }
        writer.flush().with_context(|| out_path.display().to_string())
    }

    fn decompress_near(&self, out_path: &Path) -> Result<tempfile::NamedTempFile> {
        let dir = match out_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temporary file in {}", dir.display()))?;
        io::copy(&mut open_maybe_gz(&self.path)?, &mut staged)
            .with_context(|| self.path.display().to_string())?;
        staged.flush()?;
        Ok(staged)
    }
}

/// Location of one record, header line included, within an uncompressed FASTA file.
struct RecordSpan {
    id: String,
    start: u64,
    end: u64,
    ends_with_newline: bool,
}

fn index_records(path: &Path) -> Result<Vec<RecordSpan>> {
    let mut reader =
        BufReader::new(File::open(path).with_context(|| path.display().to_string())?);
    let mut records: Vec<RecordSpan> = Vec::new();
    let mut line = Vec::new();
    let mut offset = 0;
    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .with_context(|| path.display().to_string())?;
        if n == 0 {
            break;
        }
        if let Some(header) = line.strip_prefix(b">") {
            let id = String::from_utf8_lossy(header)
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
            records.push(RecordSpan {
                id,
                start: offset,
                end: offset,
                ends_with_newline: true,
            });
        } else if records.is_empty() {
            // Blank lines before the first header are tolerated, anything else is not FASTA.
            ensure!(
                line.iter().all(u8::is_ascii_whitespace),
                "{}: expected a FASTA header at byte {offset}",
                path.display()
            );
        }
        offset += n as u64;
        if let Some(rec) = records.last_mut() {
            rec.end = offset;
            rec.ends_with_newline = line.ends_with(b"\n");
        }
    }
    Ok(records)
}

/// FASTA writer that remembers its path for error messages.
pub struct FastaWriter {
    inner: fasta::Writer<File>,
    path: PathBuf,
}

impl FastaWriter {
    pub fn create(path: &Path) -> Result<FastaWriter> {
        let file = File::create(path).with_context(|| path.display().to_string())?;
        Ok(FastaWriter {
            inner: fasta::Writer::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn write(&mut self, id: &str, desc: Option<&str>, seq: &[u8]) -> Result<()> {
        self.inner
            .write(id, desc, seq)
            .with_context(|| self.path.display().to_string())
    }

    pub fn finish(mut self) -> Result<()> {
        self.inner
            .flush()
            .with_context(|| self.path.display().to_string())
    }
}

/// Read only the ids of the FASTA at `path`, in order.
pub fn read_ids(path: &Path) -> Result<Vec<String>> {
    Fasta::new(path).ids()?.collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use pretty_assertions::assert_eq;

    const FA: &str = ">chr2 second contig\nGGGG\nCC\n>chr1\nAAAA\n>chrM\nTT\n";

    #[test]
    fn test_entries() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("genome.fa");
        std::fs::write(&path, FA)?;
        let entries: Vec<_> = Fasta::new(&path).entries()?.collect::<Result<_>>()?;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, "chr2");
        assert_eq!(entries[0].desc.as_deref(), Some("second contig"));
        assert_eq!(entries[0].seq, b"GGGGCC");
        assert_eq!(read_ids(&path)?, vec!["chr2", "chr1", "chrM"]);
        Ok(())
    }

    #[test]
    fn test_sort() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("genome.fa");
        std::fs::write(&path, FA)?;
        let out = dir.path().join("sorted.fa");
        Fasta::new(&path).sort(&out)?;
        assert_eq!(
            std::fs::read_to_string(&out)?,
            ">chr1\nAAAA\n>chr2 second contig\nGGGG\nCC\n>chrM\nTT\n"
        );
        Ok(())
    }

    #[test]
    fn test_sort_gzip_without_final_newline() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("genome.fa.gz");
        let mut enc = GzEncoder::new(File::create(&path)?, Compression::default());
        enc.write_all(b">b\nCC\n>a dup\nGG\n>a\nTT")?;
        enc.finish()?;
        let out = dir.path().join("sorted.fa");
        Fasta::new(&path).sort(&out)?;
        assert_eq!(
            std::fs::read_to_string(&out)?,
            ">a dup\nGG\n>a\nTT\n>b\nCC\n"
        );
        // Only the output remains next to the input.
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 2);
        Ok(())
    }

    #[test]
    fn test_sort_rejects_non_fasta() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("genes.gtf");
        std::fs::write(&path, "chr1\tsrc\texon\n")?;
        let err = Fasta::new(&path).sort(&dir.path().join("sorted.fa")).unwrap_err();
        assert!(err.to_string().ends_with("expected a FASTA header at byte 0"));
        Ok(())
    }
}

// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

use crate::gtf::{Gtf, GtfRecord};
use anyhow::{bail, ensure, Result};
use bio_types::strand::ReqStrand;
use log::warn;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Hash, Eq, PartialEq, Debug, Clone, Ord, PartialOrd, Copy)]
pub struct GeneIdx(pub u32);

#[derive(Hash, Eq, PartialEq, Debug, Clone, Ord, PartialOrd, Copy)]
pub struct TranscriptIdx(pub u32);

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct TranscriptomeGene {
    pub idx: GeneIdx,
    /// `gene_id`, with `gene_version` appended when present.
    pub id: String,
    /// `gene_name`, or empty when the GTF has none.
    pub name: String,
}

#[derive(Debug)]
pub struct Transcript {
    pub idx: TranscriptIdx,
    pub gene_idx: GeneIdx,
    /// `transcript_id`, with `transcript_version` appended when present.
    pub id: String,
    pub chrom: String,
    pub strand: ReqStrand,
    /// Sorted by genomic coordinate.
    pub exons: Vec<Exon>,
}

impl Transcript {
    pub fn len(&self) -> u64 {
        self.exons.iter().map(Exon::len).sum()
    }

    pub fn start(&self) -> u64 {
        self.exons.first().map_or(0, |e| e.start)
    }

    pub fn end(&self) -> u64 {
        self.exons.last().map_or(0, |e| e.end)
    }

    /// The gaps between consecutive exons. Overlapping or abutting exons leave no intron.
    pub fn introns(&self) -> Vec<Exon> {
        self.exons
            .windows(2)
            .filter(|w| w[0].end < w[1].start)
            .map(|w| Exon {
                start: w[0].end,
                end: w[1].start,
            })
            .collect()
    }

    pub fn strand_str(&self) -> &'static str {
        match self.strand {
            ReqStrand::Forward => "+",
            ReqStrand::Reverse => "-",
        }
    }
}

/// A half-open, 0-based interval on a chromosome.
#[derive(Hash, Eq, PartialEq, Debug, Clone, Ord, PartialOrd)]
pub struct Exon {
    pub start: u64,
    pub end: u64,
}

impl Exon {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Transcriptome {
    pub genes: Vec<TranscriptomeGene>,
    pub transcripts: Vec<Transcript>,
}

impl Transcriptome {
    pub fn from_gtf_path(path: &Path) -> Result<Transcriptome> {
        Transcriptome::from_records(Gtf::new(path).entries()?)
    }

    /// Build from GTF records. Handles `gene`, `transcript` and `exon` entries, in any order.
    ///
    /// A repeated `gene` row is merged into the first one. A transcript id that reappears on
    /// another chromosome or strand keeps its first location; the later rows are skipped.
    pub fn from_records(
        records: impl IntoIterator<Item = Result<GtfRecord>>,
    ) -> Result<Transcriptome> {
        let mut builder = Builder::default();
        for rec in records {
            let rec = rec?;
            match rec.feature.as_str() {
                "gene" => builder.add_gene(&rec)?,
                "transcript" => builder.add_transcript(&rec)?,
                "exon" => builder.add_exon(&rec)?,
                _ => {}
            }
        }
        Ok(builder.finish())
    }

    pub fn gene(&self, tx: &Transcript) -> &TranscriptomeGene {
        &self.genes[tx.gene_idx.0 as usize]
    }

    /// Transcripts grouped by chromosome, each group in GTF order.
    pub fn transcripts_by_chrom(&self) -> HashMap<&str, Vec<&Transcript>> {
        let mut by_chrom: HashMap<&str, Vec<&Transcript>> = HashMap::new();
        for tx in &self.transcripts {
            by_chrom.entry(tx.chrom.as_str()).or_default().push(tx);
        }
        by_chrom
    }
}

fn parse_strand(rec: &GtfRecord) -> Result<ReqStrand> {
    Ok(match rec.strand.as_str() {
        "+" => ReqStrand::Forward,
        "-" => ReqStrand::Reverse,
        other => bail!("GTF line {}: unknown strand '{other}'", rec.line_num),
    })
}

#[derive(Default)]
struct Builder {
    genes: Vec<TranscriptomeGene>,
    gene_id_to_idx: HashMap<String, GeneIdx>,
    transcripts: Vec<Transcript>,
    transcript_id_to_idx: HashMap<String, TranscriptIdx>,
    // Genes created from a transcript or exon row, before their own `gene` row was seen.
    placeholder_genes: Vec<String>,
    // (transcript_id, chrom, strand) already reported as conflicting with an earlier location.
    conflicts: HashSet<(String, String, String)>,
}

impl Builder {
    fn add_gene(&mut self, rec: &GtfRecord) -> Result<()> {
        let id = rec.gene()?;
        let name = rec.get("gene_name").unwrap_or_default().to_string();
        match self.gene_id_to_idx.entry(id) {
            Entry::Occupied(entry) => {
                let gene = &mut self.genes[entry.get().0 as usize];
                match self.placeholder_genes.iter().position(|g| g == entry.key()) {
                    Some(pos) => {
                        self.placeholder_genes.swap_remove(pos);
                        gene.name = name;
                    }
                    None => {
                        warn!(
                            "GTF line {}: gene_id {} appears more than once, merging",
                            rec.line_num,
                            entry.key()
                        );
                        if gene.name.is_empty() {
                            gene.name = name;
                        }
                    }
                }
            }
            Entry::Vacant(entry) => {
                let idx = GeneIdx(self.genes.len() as u32);
                self.genes.push(TranscriptomeGene {
                    idx,
                    id: entry.key().clone(),
                    name,
                });
                entry.insert(idx);
            }
        }
        Ok(())
    }

    fn gene_for(&mut self, rec: &GtfRecord) -> Result<GeneIdx> {
        let id = rec.gene()?;
        if let Some(idx) = self.gene_id_to_idx.get(&id) {
            return Ok(*idx);
        }
        let idx = GeneIdx(self.genes.len() as u32);
        self.genes.push(TranscriptomeGene {
            idx,
            id: id.clone(),
            name: rec.get("gene_name").unwrap_or_default().to_string(),
        });
        self.placeholder_genes.push(id.clone());
        self.gene_id_to_idx.insert(id, idx);
        Ok(idx)
    }

    /// The transcript `rec` belongs to, or None when the record contradicts the chrom or strand
    /// the transcript was first seen on.
    fn transcript_for(&mut self, rec: &GtfRecord) -> Result<Option<TranscriptIdx>> {
        let id = rec.transcript()?;
        let chrom = rec.seqname.as_str();
        let strand = parse_strand(rec)?;

        if let Some(idx) = self.transcript_id_to_idx.get(&id) {
            let tx = &self.transcripts[idx.0 as usize];
            if tx.chrom == chrom && tx.strand == strand {
                return Ok(Some(*idx));
            }
            let first_seen = format!("{}:{}", tx.chrom, tx.strand_str());
            let key = (id, chrom.to_string(), rec.strand.clone());
            if !self.conflicts.contains(&key) {
                warn!(
                    "GTF line {}: transcript_id {} was previously seen on {first_seen}, \
                     skipping its rows on {}:{}",
                    rec.line_num, key.0, chrom, rec.strand
                );
                self.conflicts.insert(key);
            }
            return Ok(None);
        }

        let gene_idx = self.gene_for(rec)?;
        let idx = TranscriptIdx(self.transcripts.len() as u32);
        self.transcripts.push(Transcript {
            idx,
            gene_idx,
            id: id.clone(),
            chrom: chrom.to_string(),
            strand,
            exons: Vec::new(),
        });
        self.transcript_id_to_idx.insert(id, idx);
        Ok(Some(idx))
    }

    fn add_transcript(&mut self, rec: &GtfRecord) -> Result<()> {
        self.transcript_for(rec)?;
        Ok(())
    }

    fn add_exon(&mut self, rec: &GtfRecord) -> Result<()> {
        ensure!(
            rec.start >= 1 && rec.start <= rec.end,
            "GTF line {}: invalid exon coordinates {}-{}",
            rec.line_num,
            rec.start,
            rec.end
        );
        let Some(tx_idx) = self.transcript_for(rec)? else {
            return Ok(());
        };
        // GTF start is 1-based; end is 1-based inclusive, which equals 0-based exclusive.
        self.transcripts[tx_idx.0 as usize].exons.push(Exon {
            start: rec.start - 1,
            end: rec.end,
        });
        Ok(())
    }

    fn finish(mut self) -> Transcriptome {
        for tx in &mut self.transcripts {
            tx.exons.sort();
        }
        Transcriptome {
            genes: self.genes,
            transcripts: self.transcripts,
        }
    }
}

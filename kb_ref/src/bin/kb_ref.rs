// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! Command line entry point: `kb_ref ref [options] <fasta> <gtf>`.

use anyhow::{ensure, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use itertools::Itertools;
use kb_ref::cache::FsIndexCache;
use kb_ref::events::LogSink;
use kb_ref::toolkit::NativeToolkit;
use kb_ref::{ref_standard_with, ref_velocity_with, ArtifactResult, StandardRef, VelocityRef};
use log::{debug, LevelFilter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[clap(name = "kb_ref", about = "Build kallisto | bustools reference indices")]
struct Cli {
    /// Print debugging information.
    #[clap(long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a kallisto index and transcript-to-gene mapping.
    Ref(RefArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Workflow {
    /// cDNA only.
    Standard,
    /// cDNA and introns, for RNA velocity.
    Lamanno,
    /// cDNA and introns, for single-nucleus RNA-seq.
    Nucleus,
}

#[derive(Parser, Debug)]
struct RefArgs {
    /// Path to the kallisto index to be constructed.
    #[clap(short = 'i')]
    index: PathBuf,

    /// Path to the transcript-to-gene mapping to be generated.
    #[clap(short = 'g')]
    t2g: PathBuf,

    /// Path to the cDNA FASTA to be generated.
    #[clap(long = "f1")]
    cdna: PathBuf,

    /// Type of index to create.
    #[clap(long, value_enum, default_value_t = Workflow::Standard)]
    workflow: Workflow,

    /// Path to the intron FASTA to be generated. Required for lamanno and nucleus.
    #[clap(long = "f2")]
    intron: Option<PathBuf>,

    /// Path to generate the cDNA transcripts-to-capture. Required for lamanno and nucleus.
    #[clap(long = "c1")]
    cdna_t2c: Option<PathBuf>,

    /// Path to generate the intron transcripts-to-capture. Required for lamanno and nucleus.
    #[clap(long = "c2")]
    intron_t2c: Option<PathBuf>,

    /// Scratch directory. Must not exist; it is created and removed by this run.
    #[clap(long = "tmp", default_value = "tmp")]
    temp_dir: PathBuf,

    /// Keep the scratch directory.
    #[clap(long)]
    keep_tmp: bool,

    /// Overwrite an existing kallisto index.
    #[clap(long)]
    overwrite: bool,

    /// Path to the kallisto binary to use.
    #[clap(long)]
    kallisto: Option<PathBuf>,

    /// k-mer length of the index. Defaults to `kmer_size` of parameters.toml.
    #[clap(short = 'k')]
    kmer_size: Option<usize>,

    /// Genomic FASTA file.
    fasta: PathBuf,

    /// Reference GTF file.
    gtf: PathBuf,
}

fn init_log(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(level)
        .try_init();
}

/// Print an error chain.
fn print_error_chain(err: &anyhow::Error) {
    let error_chain = err.chain().join("\n\tCaused by: ");
    eprintln!("ERROR: {error_chain}");
}

fn required<'a>(value: &'a Option<PathBuf>, flag: &str, workflow: Workflow) -> Result<&'a Path> {
    value
        .as_deref()
        .with_context(|| format!("--{flag} is required for the {workflow:?} workflow"))
}

fn build(args: &RefArgs) -> Result<ArtifactResult> {
    let mut toolkit = NativeToolkit::from_parameters()?;
    toolkit.kallisto.clone_from(&args.kallisto);
    if let Some(k) = args.kmer_size {
        toolkit.kmer_size = k;
    }
    debug!("{toolkit:?}");

    match args.workflow {
        Workflow::Standard => ref_standard_with(
            &StandardRef {
                fasta_path: &args.fasta,
                gtf_path: &args.gtf,
                cdna_path: &args.cdna,
                index_path: &args.index,
                t2g_path: &args.t2g,
                temp_dir: &args.temp_dir,
                overwrite: args.overwrite,
            },
            &toolkit,
            &FsIndexCache,
            &mut LogSink,
        ),
        workflow @ (Workflow::Lamanno | Workflow::Nucleus) => ref_velocity_with(
            &VelocityRef {
                fasta_path: &args.fasta,
                gtf_path: &args.gtf,
                cdna_path: &args.cdna,
                intron_path: required(&args.intron, "f2", workflow)?,
                index_path: &args.index,
                t2g_path: &args.t2g,
                cdna_t2c_path: required(&args.cdna_t2c, "c1", workflow)?,
                intron_t2c_path: required(&args.intron_t2c, "c2", workflow)?,
                temp_dir: &args.temp_dir,
                overwrite: args.overwrite,
            },
            &toolkit,
            &FsIndexCache,
            &mut LogSink,
        ),
    }
}

fn run_ref(args: &RefArgs) -> Result<()> {
    ensure!(
        !args.temp_dir.exists(),
        "temporary directory {} already exists. Is another process running? Please specify a \
         different temporary directory with the --tmp option, or remove the one that already exists.",
        args.temp_dir.display()
    );
    std::fs::create_dir_all(&args.temp_dir)
        .with_context(|| args.temp_dir.display().to_string())?;

    let result = build(args);
    let cleanup = if args.keep_tmp {
        Ok(())
    } else {
        std::fs::remove_dir_all(&args.temp_dir)
            .with_context(|| args.temp_dir.display().to_string())
    };
    let result = result?;
    cleanup?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_log(cli.verbose);
    let result = match &cli.command {
        Command::Ref(args) => run_ref(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error_chain(&err);
            ExitCode::FAILURE
        }
    }
}

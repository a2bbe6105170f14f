//! biotable CLI entry point
//!
//! Converts VCF/BCF, BED and SAM/BAM/CRAM files into CSV/TSV tables and
//! decodes CIGAR/MD strings.

use anyhow::{bail, Context};
use biotable::core::{load_sam_region, write_bam, Cigar, LoadOptions, RegionMode, WriteOptions};
use biotable::{bed, load_path, sam, vcf, RecordTable};
use clap::{Args, Parser, Subcommand};
use log::{debug, info, LevelFilter};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "biotable")]
#[command(about = "Typed tables for VCF, BED and SAM files")]
#[command(version)]
struct Cli {
    /// Show debug messages
    #[arg(long, global = true)]
    debug: bool,

    /// Show info messages
    #[arg(long, global = true)]
    info: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every *2csv command
#[derive(Args)]
struct TableArgs {
    /// Output CSV/TSV file
    output: PathBuf,
    /// Use tab instead of comma as the field delimiter
    #[arg(long)]
    tsv: bool,
    /// Write the header lines into this text file
    #[arg(long, value_name = "TXT")]
    header: Option<PathBuf>,
    /// Sort records in genome order before writing
    #[arg(long)]
    sort: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a VCF/BCF file to a CSV file
    Vcf2csv {
        /// Input VCF file (BCF requires bcftools)
        input: PathBuf,
        #[command(flatten)]
        table: TableArgs,
        /// Expand INFO into INFO_<key> columns
        #[arg(long)]
        expand_info: bool,
        /// Expand FORMAT and samples into <sample>_<key> columns
        #[arg(long)]
        expand_samples: bool,
        /// Path to the bcftools executable
        #[arg(long, value_name = "PATH")]
        bcftools: Option<PathBuf>,
        /// Threads for bcftools (default: number of CPUs)
        #[arg(short = 't', long)]
        threads: Option<usize>,
    },
    /// Convert a BED file to a CSV file
    Bed2csv {
        /// Input BED file
        input: PathBuf,
        #[command(flatten)]
        table: TableArgs,
        /// Names of the optional columns after chromEnd
        #[arg(long = "opt-cols", value_delimiter = ',')]
        opt_cols: Vec<String>,
    },
    /// Convert a SAM/BAM/CRAM file to a CSV file
    Sam2csv {
        /// Input SAM file (BAM/CRAM require samtools)
        input: PathBuf,
        #[command(flatten)]
        table: TableArgs,
        /// Replace OPT<n> columns by one column per tag
        #[arg(long)]
        expand_tags: bool,
        /// Append a column holding the value of one tag
        #[arg(long, value_name = "TAG")]
        tag: Option<String>,
        /// Append a MATCH column from CIGAR and MD
        #[arg(long = "match")]
        annotate: bool,
        /// Path to the samtools executable
        #[arg(long, value_name = "PATH")]
        samtools: Option<PathBuf>,
        /// Region to load (rname[:start[-end]]), may be repeated
        #[arg(long)]
        region: Vec<String>,
        /// Load only alignments covering both ends of this region (rname:start-end)
        #[arg(long, value_name = "REGION", conflicts_with = "region")]
        span: Option<String>,
        /// Also write the loaded alignments into this BAM file
        #[arg(long, value_name = "BAM")]
        bam: Option<PathBuf>,
        /// Threads for samtools (default: number of CPUs)
        #[arg(short = 't', long)]
        threads: Option<usize>,
    },
    /// Decode a CIGAR string, optionally against an MD tag
    Cigar {
        /// CIGAR string
        cigar: String,
        /// MD tag value
        #[arg(long)]
        md: Option<String>,
    },
}

fn init_logging(debug: bool, info: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else if info {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
}

fn load_options(threads: Option<usize>) -> LoadOptions {
    let mut options = LoadOptions::default();
    if let Some(threads) = threads {
        options.threads = threads.max(1);
    }
    options
}

/// Sort if requested, write the table and the optional header file
fn write_outputs(table: RecordTable, args: &TableArgs, start: Instant) -> anyhow::Result<()> {
    let table = if args.sort {
        info!("Sort the table in genome order");
        table.sorted()?
    } else {
        table
    };

    let options = if args.tsv { WriteOptions::tsv() } else { WriteOptions::csv() };
    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create output file: {}", args.output.display()))?;
    table.write_delimited(BufWriter::new(file), &options)?;

    if let Some(path) = &args.header {
        if !table.header().is_empty() {
            write_header_file(&table, path)?;
        }
    }

    let width = table.schema().map_or(0, |s| s.width());
    eprintln!("\n=== Conversion Statistics ===");
    eprintln!("Header lines:    {}", table.header().len());
    eprintln!("Columns:         {}", width);
    eprintln!("Records:         {}", table.len());
    eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn write_header_file(table: &RecordTable, path: &Path) -> anyhow::Result<()> {
    info!("Write header lines: {}", path.display());
    let file = File::create(path).with_context(|| format!("Failed to create header file: {}", path.display()))?;
    table.write_header_lines(BufWriter::new(file))?;
    Ok(())
}

/// Split `rname:start-end`
fn parse_span(text: &str) -> anyhow::Result<(String, u64, u64)> {
    let Some((rname, range)) = text.rsplit_once(':') else {
        bail!("Region must be rname:start-end: {}", text);
    };
    let Some((start, end)) = range.split_once('-') else {
        bail!("Region must be rname:start-end: {}", text);
    };
    let start: u64 = start.parse().with_context(|| format!("Invalid region start: {}", text))?;
    let end: u64 = end.parse().with_context(|| format!("Invalid region end: {}", text))?;
    if rname.is_empty() || start > end {
        bail!("Invalid region: {}", text);
    }
    Ok((rname.to_string(), start, end))
}

fn print_cigar(text: &str, md: Option<&str>) -> anyhow::Result<()> {
    let cigar = Cigar::parse(text)?;
    let totals: Vec<String> = cigar
        .op_lengths()
        .iter()
        .map(|(op, n)| format!("{}={}", op, n))
        .collect();

    println!("CIGAR:            {}", cigar);
    println!("Reference length: {}", cigar.reference_length());
    println!("Query length:     {}", cigar.query_length());
    println!("Operations:       {}", totals.join(" "));
    println!("Aligned range:    {:?}", cigar.aligned_range());
    println!("Aligned bases:    {}", cigar.aligned_per_base());
    if let Some(md) = md {
        println!("Match:            {}", cigar.match_annotation(md)?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug, cli.info);
    let start = Instant::now();

    match cli.command {
        Commands::Vcf2csv { input, table, expand_info, expand_samples, bcftools, threads } => {
            let mut options = load_options(threads);
            options.bcftools = bcftools;

            eprintln!("Converting VCF file: {:?} -> {:?}", input, table.output);
            let mut loaded = load_path(vcf::descriptor(), &input, &options)
                .with_context(|| format!("Failed to load VCF file: {}", input.display()))?;
            debug!("Samples: {:?}", vcf::sample_names(&loaded));

            if expand_samples {
                info!("Expand the columns of samples");
                loaded = vcf::expand_samples(&loaded)?;
            }
            if expand_info {
                info!("Expand the INFO column");
                loaded = vcf::expand_info(&loaded)?;
            }
            write_outputs(loaded, &table, start)?;
        }

        Commands::Bed2csv { input, table, opt_cols } => {
            let descriptor = if opt_cols.is_empty() {
                bed::descriptor()
            } else {
                bed::descriptor_with_optional(opt_cols)
            };

            eprintln!("Converting BED file: {:?} -> {:?}", input, table.output);
            let loaded = load_path(descriptor, &input, &LoadOptions::default())
                .with_context(|| format!("Failed to load BED file: {}", input.display()))?;
            write_outputs(loaded, &table, start)?;
        }

        Commands::Sam2csv { input, table, expand_tags, tag, annotate, samtools, region, span, bam, threads } => {
            let mut options = load_options(threads);
            options.samtools = samtools;
            options.regions = region;

            eprintln!("Converting SAM file: {:?} -> {:?}", input, table.output);
            let mut loaded = match &span {
                Some(span) => {
                    let (rname, start, end) = parse_span(span)?;
                    load_sam_region(&input, &rname, start, end, RegionMode::Spanning, &options)
                }
                None => load_path(sam::descriptor(), &input, &options),
            }
            .with_context(|| format!("Failed to load SAM file: {}", input.display()))?;

            if let Some(path) = &bam {
                info!("Write BAM file: {}", path.display());
                write_bam(&loaded, path, &options)
                    .with_context(|| format!("Failed to write BAM file: {}", path.display()))?;
            }

            if expand_tags {
                info!("Expand the optional fields");
                loaded = sam::expand_tags(&loaded)?;
            }
            if let Some(tag) = &tag {
                info!("Extract the {} tag", tag);
                loaded = sam::extract_tag(&loaded, tag)?;
            }
            if annotate {
                info!("Annotate matches from CIGAR and MD");
                loaded = sam::annotate_matches(&loaded)?;
            }
            write_outputs(loaded, &table, start)?;
        }

        Commands::Cigar { cigar, md } => {
            print_cigar(&cigar, md.as_deref())?;
        }
    }

    Ok(())
}

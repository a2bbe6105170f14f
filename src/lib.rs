//! biotable - typed tables for VCF, BED and SAM text files
//!
//! Loads a genomics text format into a [`RecordTable`] whose schema is
//! detected once from the file, sorts it in genome order, expands composite
//! columns (VCF INFO and samples, SAM optional tags), decodes CIGAR/MD
//! alignment strings and writes the result back as delimited text.
//!
//! # Features
//!
//! - One generic engine driven by a per-format [`FormatDescriptor`]
//! - Stable genome-order sort (`chr1 < chr2 < chr10 < chrX < chrY < chrM`)
//! - Transparent gzip/bzip2 input, samtools/bcftools for BAM, CRAM and BCF
//!
//! # Example
//!
//! ```
//! use biotable::core::WriteOptions;
//! use biotable::{vcf, RecordTable};
//!
//! let text = "##fileformat=VCFv4.2\n\
//! #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
//! chr10\t5\t.\tA\tC\t.\tPASS\tDP=3\tGT\t0/1\n\
//! chr2\t9\t.\tG\tT\t.\tPASS\tDP=8;DB\tGT\t1/1\n";
//!
//! let table = RecordTable::from_text(vcf::descriptor(), text)?.sorted()?;
//! let expanded = vcf::expand_samples(&vcf::expand_info(&table)?)?;
//! let csv = expanded.to_text(&WriteOptions::csv())?;
//! assert!(csv.starts_with("#CHROM,POS,ID,REF,ALT,QUAL,FILTER,INFO_DP,INFO_DB,S1_GT\nchr2,9,"));
//! # Ok::<(), biotable::BioTableError>(())
//! ```

pub mod core;
pub mod formats;

// Re-export commonly used types
pub use core::{
    chrom_sort_key, load_path, match_annotation, BioTableError, Cigar, CigarError, ChromKey, FormatDescriptor,
    LoadOptions, Record, RecordTable, RowRef, Schema, TableResult, Value, WriteOptions,
};
pub use formats::{bed, sam, vcf, Format};

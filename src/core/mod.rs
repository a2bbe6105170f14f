//! Core table engine
//!
//! This module contains schema detection, typed line parsing, the record
//! table with genome-order sorting, delimited output, the CIGAR/MD decoder
//! and the line-source I/O wrappers.

mod chrom;
mod cigar;
mod error;
pub mod io;
mod parser;
mod record;
mod schema;
mod table;
mod writer;

pub use chrom::{chrom_sort_key, compare_chroms, strip_chr_prefix, ChromKey};
pub use cigar::{
    cigar_chars, cigar_op_lengths, cigar_query_length, cigar_ref_length, match_annotation, md_chars,
    Cigar, CigarOp, CIGAR_OPERATIONS,
};
pub use error::{BioTableError, CigarError, CigarResult, ErrorClass, TableResult};
pub use io::{load_path, load_sam_region, write_bam, BamWriter, IoStrategy, LineSource, LoadOptions, RegionMode};
pub use parser::{split_fields, LineKind, LineParser};
pub use record::{Record, RowRef, Value};
pub use schema::{count_fields, Column, DynamicColumns, FormatDescriptor, HeaderRule, ScalarType, Schema, SchemaDetector};
pub use table::{RecordTable, Rows, SchemaState};
pub use writer::{write_table, WriteOptions};

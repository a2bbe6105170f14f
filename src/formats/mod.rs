//! Format descriptors and field expanders
//!
//! Each format is a [`FormatDescriptor`](crate::core::FormatDescriptor)
//! value driving the generic table engine, plus the expanders for its
//! composite columns (VCF INFO and samples, SAM optional tags).

pub mod bed;
pub mod sam;
pub mod vcf;

use crate::core::FormatDescriptor;

/// Text formats handled by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Vcf,
    Bed,
    Sam,
}

impl Format {
    /// Default descriptor of the format
    pub fn descriptor(&self) -> FormatDescriptor {
        match self {
            Format::Vcf => vcf::descriptor(),
            Format::Bed => bed::descriptor(),
            Format::Sam => sam::descriptor(),
        }
    }

    /// Text file extensions accepted for the format, before compression
    pub fn text_extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Vcf => &[".vcf", ".txt", ".tsv"],
            Format::Bed => &[".bed", ".txt", ".tsv"],
            Format::Sam => &[".sam", ".txt", ".tsv"],
        }
    }

    /// Binary extensions read through an external tool
    pub fn binary_extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Vcf => &[".bcf"],
            Format::Bed => &[],
            Format::Sam => &[".bam", ".cram"],
        }
    }
}

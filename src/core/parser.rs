//! Line classification and typed record parsing
//!
//! Splits tab-delimited lines with `memchr` and coerces each field to the
//! type its column declares.

use crate::core::error::{BioTableError, TableResult};
use crate::core::record::{Record, Value};
use crate::core::schema::{FormatDescriptor, HeaderRule, Schema};
use memchr::memchr;

/// Role of one input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Verbatim header/comment line
    Header,
    /// Column declaration line (VCF `#CHROM`)
    Schema,
    /// Data record
    Data,
    /// Empty line, ignored
    Blank,
}

/// Split a line on tabs without allocating the fields themselves
///
/// # Examples
/// ```
/// use biotable::core::split_fields;
///
/// assert_eq!(split_fields("a\tb\t"), vec!["a", "b", ""]);
/// ```
pub fn split_fields(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut fields = Vec::with_capacity(16);
    let mut start = 0;

    while let Some(offset) = memchr(b'\t', &bytes[start..]) {
        let end = start + offset;
        fields.push(&line[start..end]);
        start = end + 1;
    }
    fields.push(&line[start..]);
    fields
}

/// Strip the line terminator (`\n` or `\r\n`), leaving tabs intact
pub fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(&['\n', '\r'][..])
}

/// Parses lines of one format against a locked schema
pub struct LineParser<'a> {
    descriptor: &'a FormatDescriptor,
}

impl<'a> LineParser<'a> {
    pub fn new(descriptor: &'a FormatDescriptor) -> Self {
        Self { descriptor }
    }

    /// Decide what role a line plays in its file
    pub fn classify(&self, line: &str) -> LineKind {
        if line.is_empty() {
            return LineKind::Blank;
        }
        match &self.descriptor.header_rule {
            HeaderRule::Declared {
                meta_prefix,
                schema_prefix,
            } => {
                if line.starts_with(meta_prefix.as_str()) {
                    LineKind::Header
                } else if line.starts_with(schema_prefix.as_str()) {
                    LineKind::Schema
                } else {
                    LineKind::Data
                }
            }
            HeaderRule::Prefixes(prefixes) => {
                if prefixes.iter().any(|p| line.starts_with(p.as_str())) {
                    LineKind::Header
                } else {
                    LineKind::Data
                }
            }
            HeaderRule::AtUppercase => {
                let bytes = line.as_bytes();
                if bytes.len() >= 2 && bytes[0] == b'@' && bytes[1].is_ascii_uppercase() {
                    LineKind::Header
                } else {
                    LineKind::Data
                }
            }
        }
    }

    /// Parse a data line into a typed record
    ///
    /// The field count must equal the schema width. Formats that allow it
    /// accept a row exactly one field short, padding it with an absent value.
    pub fn parse_record(&self, line: &str, schema: &Schema, line_number: usize) -> TableResult<Record> {
        let mut fields = split_fields(line);
        let width = schema.width();

        if self.descriptor.pad_short_rows && fields.len() + 1 == width {
            fields.push("");
        }
        if fields.len() != width {
            return Err(BioTableError::SchemaViolation {
                line: line_number,
                expected: width,
                found: fields.len(),
            });
        }

        let values = fields
            .iter()
            .zip(schema.columns())
            .map(|(token, column)| {
                Value::coerce(token, column.ty).ok_or_else(|| BioTableError::TypeCoercion {
                    line: line_number,
                    column: column.name.clone(),
                    value: token.to_string(),
                    expected: column.ty,
                })
            })
            .collect::<TableResult<Vec<_>>>()?;

        Ok(Record::new(values))
    }
}

//! Schemas and schema detection
//!
//! A [`Schema`] is the ordered list of typed columns governing every record
//! of a table. It is detected exactly once per table, either from a declared
//! column header line (VCF `#CHROM ...`) or from the field count of the first
//! data line (BED, SAM), and never changes afterwards.

use crate::core::error::{BioTableError, TableResult};
use memchr::memchr_iter;
use std::fmt;

/// Scalar type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScalarType {
    #[default]
    Text,
    Integer,
    Float,
}

impl ScalarType {
    /// Narrowest type holding values of both types
    ///
    /// Integer and Float widen to Float; anything mixed with Text is Text.
    pub fn widen(self, other: ScalarType) -> ScalarType {
        match (self, other) {
            (a, b) if a == b => a,
            (ScalarType::Integer, ScalarType::Float) | (ScalarType::Float, ScalarType::Integer) => ScalarType::Float,
            _ => ScalarType::Text,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Text => write!(f, "Text"),
            ScalarType::Integer => write!(f, "Integer"),
            ScalarType::Float => write!(f, "Float"),
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    pub name: String,
    pub ty: ScalarType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ScalarType) -> Self {
        Self { name: name.into(), ty }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::Text)
    }
}

/// Ordered column set of a table
///
/// The first `n_fixed` columns are the ones mandated by the format; the
/// remainder were discovered from the data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<Column>,
    n_fixed: usize,
}

impl Schema {
    pub fn new(columns: Vec<Column>, n_fixed: usize) -> Self {
        let n_fixed = n_fixed.min(columns.len());
        Self { columns, n_fixed }
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn n_fixed(&self) -> usize {
        self.n_fixed
    }

    pub fn fixed_columns(&self) -> &[Column] {
        &self.columns[..self.n_fixed]
    }

    pub fn dynamic_columns(&self) -> &[Column] {
        &self.columns[self.n_fixed..]
    }

    /// Position of a column by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// How header lines are recognised for a format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderRule {
    /// Lines starting with `meta_prefix` are header lines; the line starting
    /// with `schema_prefix` declares the columns (VCF `##` / `#CHROM`)
    Declared {
        meta_prefix: String,
        schema_prefix: String,
    },
    /// Lines starting with any of these words are header lines (BED)
    Prefixes(Vec<String>),
    /// `@` followed by an uppercase ASCII letter (SAM)
    AtUppercase,
}

/// Naming rule for columns beyond the fixed and named optional ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DynamicColumns {
    /// Names come from the declared header line, verbatim
    FromHeader,
    /// Positional names `{prefix}0`, `{prefix}1`, ...
    Synthesized(String),
    /// No columns allowed beyond the named ones
    Forbidden,
}

/// Everything the generic engine needs to know about one text format
///
/// # Examples
/// ```
/// use biotable::formats::sam;
///
/// let descriptor = sam::descriptor();
/// assert_eq!(descriptor.chrom_column, "RNAME");
/// assert_eq!(descriptor.fixed_columns.len(), 11);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Format name used in error messages
    pub name: &'static str,
    /// Columns every record must have, in order
    pub fixed_columns: Vec<String>,
    /// Named columns that may follow the fixed ones, in order
    pub optional_columns: Vec<String>,
    /// Static column type table; unlisted columns are Text
    pub column_types: Vec<(String, ScalarType)>,
    pub dynamic_columns: DynamicColumns,
    pub header_rule: HeaderRule,
    /// Column holding the chromosome label
    pub chrom_column: String,
    /// Numeric columns ordering records within a chromosome
    pub position_columns: Vec<String>,
    /// Whether serialized output carries a column header line
    pub column_header: bool,
    /// Accept rows exactly one field short by appending an empty field
    pub pad_short_rows: bool,
}

impl FormatDescriptor {
    /// Declared type of a column, Text when unlisted
    pub fn column_type(&self, name: &str) -> ScalarType {
        self.column_types
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
            .unwrap_or_default()
    }

    /// Whether the schema comes from a declared header line
    pub fn has_declared_header(&self) -> bool {
        matches!(self.header_rule, HeaderRule::Declared { .. })
    }

    fn named_columns(&self) -> impl Iterator<Item = &String> {
        self.fixed_columns.iter().chain(self.optional_columns.iter())
    }
}

/// Count tab-delimited fields in a line
pub fn count_fields(line: &str) -> usize {
    memchr_iter(b'\t', line.as_bytes()).count() + 1
}

/// Detects the schema of a table from its first qualifying line
pub struct SchemaDetector<'a> {
    descriptor: &'a FormatDescriptor,
}

impl<'a> SchemaDetector<'a> {
    pub fn new(descriptor: &'a FormatDescriptor) -> Self {
        Self { descriptor }
    }

    /// Detect a schema using whichever strategy the format calls for
    ///
    /// Declared-header formats require `declared_header`; the others require
    /// `first_data_line`.
    pub fn detect(
        &self,
        first_data_line: Option<&str>,
        declared_header: Option<&[&str]>,
        line_number: usize,
    ) -> TableResult<Schema> {
        match (self.descriptor.has_declared_header(), declared_header, first_data_line) {
            (true, Some(tokens), _) => self.from_declared_header(tokens, line_number),
            (true, None, _) => Err(BioTableError::structural(
                self.descriptor.name,
                line_number,
                "data line found before the column header line",
            )),
            (false, _, Some(line)) => self.from_first_line(line, line_number),
            (false, _, None) => Err(BioTableError::structural(
                self.descriptor.name,
                line_number,
                "no data line to infer columns from",
            )),
        }
    }

    /// Build the schema from a declared column header
    ///
    /// The leading tokens must equal the fixed columns, then the named
    /// optional columns, exactly and in order. A header may stop after the
    /// fixed columns; anything past the named columns is kept verbatim.
    pub fn from_declared_header(&self, tokens: &[&str], line_number: usize) -> TableResult<Schema> {
        let d = self.descriptor;
        if tokens.len() < d.fixed_columns.len() {
            return Err(BioTableError::structural(
                d.name,
                line_number,
                format!(
                    "column header has {} columns, expected at least {}",
                    tokens.len(),
                    d.fixed_columns.len()
                ),
            ));
        }

        for (i, (token, expected)) in tokens.iter().zip(d.named_columns()).enumerate() {
            if *token != expected.as_str() {
                return Err(BioTableError::structural(
                    d.name,
                    line_number,
                    format!("column {} is '{}', expected '{}'", i + 1, token, expected),
                ));
            }
        }

        let n_named = d.fixed_columns.len() + d.optional_columns.len();
        if tokens.len() > n_named && d.dynamic_columns == DynamicColumns::Forbidden {
            return Err(BioTableError::structural(
                d.name,
                line_number,
                format!("column header has {} columns, expected at most {}", tokens.len(), n_named),
            ));
        }

        let columns = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| match &d.dynamic_columns {
                DynamicColumns::Synthesized(prefix) if i >= n_named => {
                    Column::text(format!("{}{}", prefix, i - n_named))
                }
                _ => Column::new(*token, d.column_type(token)),
            })
            .collect();

        Ok(Schema::new(columns, d.fixed_columns.len()))
    }

    /// Infer the schema from the field count of the first data line
    ///
    /// A line narrower than the fixed columns still yields the fixed schema;
    /// the row itself is then rejected by the width check.
    pub fn from_first_line(&self, line: &str, line_number: usize) -> TableResult<Schema> {
        let d = self.descriptor;
        let n_fields = count_fields(line);
        let n_named = d.fixed_columns.len() + d.optional_columns.len();

        let mut columns: Vec<Column> = d
            .named_columns()
            .take(n_fields.max(d.fixed_columns.len()))
            .map(|name| Column::new(name.as_str(), d.column_type(name)))
            .collect();

        if n_fields > n_named {
            match &d.dynamic_columns {
                DynamicColumns::Synthesized(prefix) => {
                    columns.extend(
                        (0..n_fields - n_named).map(|i| Column::text(format!("{}{}", prefix, i))),
                    );
                }
                DynamicColumns::FromHeader | DynamicColumns::Forbidden => {
                    return Err(BioTableError::structural(
                        d.name,
                        line_number,
                        format!("{} fields found, expected at most {}", n_fields, n_named),
                    ));
                }
            }
        }

        Ok(Schema::new(columns, d.fixed_columns.len()))
    }
}

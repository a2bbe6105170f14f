//! Record tables
//!
//! A [`RecordTable`] owns the header lines, the schema and the records of
//! one parsed file. The schema is locked once, by the declared column header
//! or by the first data line, and every later record must match its width.

use crate::core::chrom::{chrom_sort_key, ChromKey};
use crate::core::error::{BioTableError, TableResult};
use crate::core::parser::{split_fields, trim_line_end, LineKind, LineParser};
use crate::core::record::{Record, RowRef, Value};
use crate::core::schema::{FormatDescriptor, Schema, SchemaDetector};
use crate::core::writer::{write_table, WriteOptions};
use std::io::{self, Write};

/// Schema lifecycle of a table
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SchemaState {
    #[default]
    Unlocked,
    Locked(Schema),
}

/// Parsed table of one VCF/BED/SAM source
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable {
    descriptor: FormatDescriptor,
    state: SchemaState,
    header: Vec<String>,
    records: Vec<Record>,
}

impl RecordTable {
    /// Create an empty, unlocked table
    pub fn new(descriptor: FormatDescriptor) -> Self {
        Self {
            descriptor,
            state: SchemaState::Unlocked,
            header: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Create an empty table with an already locked schema
    pub fn with_schema(descriptor: FormatDescriptor, schema: Schema) -> Self {
        Self {
            descriptor,
            state: SchemaState::Locked(schema),
            header: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Build a table by pulling every line from a line source
    ///
    /// The source is any iterator of lines, such as a file reader or the
    /// stdout of an external tool. Lines may still carry their terminator.
    pub fn load<I, S>(descriptor: FormatDescriptor, lines: I) -> TableResult<Self>
    where
        I: IntoIterator<Item = io::Result<S>>,
        S: AsRef<str>,
    {
        let mut table = Self::new(descriptor);
        for (i, line) in lines.into_iter().enumerate() {
            let line = line?;
            table.push_line(line.as_ref(), i + 1)?;
        }
        Ok(table)
    }

    /// Build a table from in-memory text
    ///
    /// # Examples
    /// ```
    /// use biotable::core::RecordTable;
    /// use biotable::formats::bed;
    ///
    /// let table = RecordTable::from_text(bed::descriptor(), "track name=x\nchr1\t10\t20\n").unwrap();
    /// assert_eq!(table.header(), &["track name=x".to_string()]);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn from_text(descriptor: FormatDescriptor, text: &str) -> TableResult<Self> {
        Self::load(descriptor, text.lines().map(Ok::<_, io::Error>))
    }

    /// Feed one source line into the table
    pub fn push_line(&mut self, line: &str, line_number: usize) -> TableResult<()> {
        let line = trim_line_end(line);
        let parser = LineParser::new(&self.descriptor);

        match parser.classify(line) {
            LineKind::Blank => Ok(()),
            LineKind::Header => {
                self.header.push(line.to_string());
                Ok(())
            }
            LineKind::Schema => {
                if self.is_locked() {
                    return Err(BioTableError::structural(
                        self.descriptor.name,
                        line_number,
                        "column header line repeated after the schema was locked",
                    ));
                }
                let tokens = split_fields(line);
                let schema = SchemaDetector::new(&self.descriptor).detect(None, Some(&tokens), line_number)?;
                self.state = SchemaState::Locked(schema);
                Ok(())
            }
            LineKind::Data => {
                if let SchemaState::Unlocked = self.state {
                    let schema = SchemaDetector::new(&self.descriptor).detect(Some(line), None, line_number)?;
                    self.state = SchemaState::Locked(schema);
                }
                let record = match &self.state {
                    SchemaState::Locked(schema) => parser.parse_record(line, schema, line_number)?,
                    SchemaState::Unlocked => return Err(BioTableError::SchemaNotLocked),
                };
                self.records.push(record);
                Ok(())
            }
        }
    }

    /// Append a record built elsewhere
    pub fn append(&mut self, record: Record) -> TableResult<()> {
        let schema = self.schema().ok_or(BioTableError::SchemaNotLocked)?;
        if record.len() != schema.width() {
            return Err(BioTableError::WidthMismatch {
                row: self.records.len() + 1,
                expected: schema.width(),
                found: record.len(),
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Append a verbatim header line
    pub fn push_header_line(&mut self, line: impl Into<String>) {
        self.header.push(line.into());
    }

    pub fn descriptor(&self) -> &FormatDescriptor {
        &self.descriptor
    }

    pub fn schema(&self) -> Option<&Schema> {
        match &self.state {
            SchemaState::Locked(schema) => Some(schema),
            SchemaState::Unlocked => None,
        }
    }

    pub fn state(&self) -> &SchemaState {
        &self.state
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, SchemaState::Locked(_))
    }

    /// Header lines in source order
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Walk the records in table order; each call starts from the first row
    pub fn iter(&self) -> Rows<'_> {
        Rows {
            schema: self.schema(),
            inner: self.records.iter(),
        }
    }

    /// Values of one column in table order
    pub fn column(&self, name: &str) -> TableResult<impl Iterator<Item = &Value> + '_> {
        let index = self.column_index(name)?;
        Ok(self.records.iter().filter_map(move |r| r.get(index)))
    }

    pub(crate) fn column_index(&self, name: &str) -> TableResult<usize> {
        self.schema()
            .and_then(|s| s.index_of(name))
            .ok_or_else(|| BioTableError::MissingColumn(name.to_string()))
    }

    /// Sort by the format's chromosome and position columns
    pub fn sort(&mut self) -> TableResult<()> {
        let chrom = self.descriptor.chrom_column.clone();
        let positions = self.descriptor.position_columns.clone();
        self.sort_by_columns(&chrom, &positions)
    }

    /// Sort by genome order of `chrom_column`, then ascending numeric
    /// `position_columns`, keeping insertion order among equal keys
    ///
    /// Sort keys are computed once per record. Absent positions order first.
    pub fn sort_by_columns(&mut self, chrom_column: &str, position_columns: &[String]) -> TableResult<()> {
        if self.records.is_empty() {
            return Ok(());
        }
        let chrom_index = self.column_index(chrom_column)?;
        let position_indices = position_columns
            .iter()
            .map(|name| self.column_index(name))
            .collect::<TableResult<Vec<_>>>()?;

        let keys: Vec<(ChromKey, Vec<Option<i64>>)> = self
            .records
            .iter()
            .map(|record| {
                let chrom = match record.get(chrom_index) {
                    Some(Value::Text(label)) => chrom_sort_key(label),
                    Some(other) => chrom_sort_key(&other.to_string()),
                    None => chrom_sort_key(""),
                };
                let positions = position_indices
                    .iter()
                    .map(|&i| record.get(i).and_then(Value::as_i64))
                    .collect();
                (chrom, positions)
            })
            .collect();

        // Stable: equal keys keep insertion order
        let mut order: Vec<usize> = (0..self.records.len()).collect();
        order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

        let mut slots = std::mem::take(&mut self.records);
        self.records = order.into_iter().map(|i| std::mem::take(&mut slots[i])).collect();
        Ok(())
    }

    /// Consume the table and return it sorted
    pub fn sorted(mut self) -> TableResult<Self> {
        self.sort()?;
        Ok(self)
    }

    /// Serialize header lines, column header and rows as delimited text
    pub fn write_delimited<W: Write>(&self, writer: W, options: &WriteOptions) -> io::Result<()> {
        write_table(self, writer, options)
    }

    /// Write only the header lines, one per line
    pub fn write_header_lines<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for line in &self.header {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()
    }

    /// Serialize to a string
    pub fn to_text(&self, options: &WriteOptions) -> TableResult<String> {
        let mut buf = Vec::new();
        self.write_delimited(&mut buf, options)?;
        String::from_utf8(buf).map_err(|e| BioTableError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Serialize in the format's own layout (tab-delimited, header lines first)
    pub fn to_native_text(&self) -> TableResult<String> {
        self.to_text(&WriteOptions::native(&self.descriptor))
    }

    /// Replace the header lines wholesale (used by derived tables)
    pub(crate) fn set_header(&mut self, header: Vec<String>) {
        self.header = header;
    }
}

impl<'a> IntoIterator for &'a RecordTable {
    type Item = RowRef<'a>;
    type IntoIter = Rows<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the rows of a table
pub struct Rows<'a> {
    schema: Option<&'a Schema>,
    inner: std::slice::Iter<'a, Record>,
}

impl<'a> Iterator for Rows<'a> {
    type Item = RowRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let schema = self.schema?;
        self.inner.next().map(|record| RowRef::new(schema, record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

//! Delimited text output
//!
//! Header lines are written verbatim first, then the column header (when
//! requested), then one row per record in table order. Rows go through a
//! `csv` writer so comma output is quoted where a field needs it.

use crate::core::schema::FormatDescriptor;
use crate::core::table::RecordTable;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::io::{self, BufWriter, Write};

/// Output layout options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Field delimiter
    pub delimiter: u8,
    /// Emit the table's header lines before anything else
    pub header_lines: bool,
    /// Emit a line with the column names
    pub column_header: bool,
}

impl WriteOptions {
    /// The format's own layout: tab-delimited, header lines kept, column
    /// header only where the format declares one
    pub fn native(descriptor: &FormatDescriptor) -> Self {
        Self {
            delimiter: b'\t',
            header_lines: true,
            column_header: descriptor.column_header,
        }
    }

    /// Comma-separated table with a column header and no header lines
    pub fn csv() -> Self {
        Self {
            delimiter: b',',
            header_lines: false,
            column_header: true,
        }
    }

    /// Tab-separated table with a column header and no header lines
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::csv()
        }
    }

    /// Tab-delimited output is written verbatim so it re-parses as the
    /// native format; any other delimiter quotes fields that need it
    pub fn quote_style(&self) -> QuoteStyle {
        if self.delimiter == b'\t' {
            QuoteStyle::Never
        } else {
            QuoteStyle::Necessary
        }
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::csv()
    }
}

/// Write a whole table
pub fn write_table<W: Write>(table: &RecordTable, writer: W, options: &WriteOptions) -> io::Result<()> {
    let mut out = BufWriter::with_capacity(128 * 1024, writer);

    if options.header_lines {
        for line in table.header() {
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
        }
    }

    let Some(schema) = table.schema() else {
        return out.flush();
    };

    let mut rows = WriterBuilder::new()
        .delimiter(options.delimiter)
        .quote_style(options.quote_style())
        .terminator(Terminator::Any(b'\n'))
        .from_writer(&mut out);

    if options.column_header {
        rows.write_record(schema.names())?;
    }
    for record in table.records() {
        rows.write_record(record.values().iter().map(|value| value.to_string()))?;
    }
    rows.flush()?;
    drop(rows);

    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{bed, sam};

    #[test]
    fn test_bed_native_has_no_column_header() {
        let table = RecordTable::from_text(bed::descriptor(), "track name=t\nchr1\t10\t20\tn1\n").unwrap();
        assert_eq!(table.to_native_text().unwrap(), "track name=t\nchr1\t10\t20\tn1\n");
    }

    #[test]
    fn test_csv_output() {
        let table = RecordTable::from_text(bed::descriptor(), "track name=t\nchr1\t10\t20\ta,b\n").unwrap();
        assert_eq!(
            table.to_text(&WriteOptions::csv()).unwrap(),
            "chrom,chromStart,chromEnd,name\nchr1,10,20,\"a,b\"\n"
        );
    }

    #[test]
    fn test_tsv_output_with_absent_value() {
        let text = "r1\t4\t*\t0\t0\t*\t*\t0\t0\tACGT";
        let table = RecordTable::from_text(sam::descriptor(), text).unwrap();
        let out = table.to_text(&WriteOptions::tsv()).unwrap();
        let data = out.lines().nth(1).unwrap();
        assert_eq!(data, "r1\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\t");
    }

    #[test]
    fn test_csv_quotes_only_where_needed() {
        let text = "chr1\t10\t20\tsay \"hi\"\nchr1\t30\t40\tplain\n";
        let table = RecordTable::from_text(bed::descriptor(), text).unwrap();
        assert_eq!(
            table.to_text(&WriteOptions::csv()).unwrap(),
            "chrom,chromStart,chromEnd,name\nchr1,10,20,\"say \"\"hi\"\"\"\nchr1,30,40,plain\n"
        );
    }

    #[test]
    fn test_tab_output_is_verbatim() {
        let text = "track name=\"quoted, track\"\nchr1\t10\t20\tsay \"hi\",x\n";
        let table = RecordTable::from_text(bed::descriptor(), text).unwrap();
        assert_eq!(table.to_native_text().unwrap(), text);
        assert!(matches!(WriteOptions::tsv().quote_style(), QuoteStyle::Never));
    }

    #[test]
    fn test_header_lines_only_for_unlocked_table() {
        let table = RecordTable::from_text(sam::descriptor(), "@HD\tVN:1.6\n").unwrap();
        assert_eq!(table.to_native_text().unwrap(), "@HD\tVN:1.6\n");
    }
}

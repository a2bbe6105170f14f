//! Typed values and records

use crate::core::schema::{ScalarType, Schema};
use std::fmt;

/// One typed cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing field (empty token, or key not present after expansion)
    #[default]
    Absent,
    Text(String),
    Integer(i64),
    Float(f64),
}

impl Value {
    /// Convert a raw token to the given type
    ///
    /// Empty tokens become [`Value::Absent`] regardless of type. Returns
    /// `None` when a non-empty token does not parse as the requested number.
    ///
    /// # Examples
    /// ```
    /// use biotable::core::{ScalarType, Value};
    ///
    /// assert_eq!(Value::coerce("42", ScalarType::Integer), Some(Value::Integer(42)));
    /// assert_eq!(Value::coerce("", ScalarType::Integer), Some(Value::Absent));
    /// assert_eq!(Value::coerce("4x", ScalarType::Integer), None);
    /// ```
    pub fn coerce(token: &str, ty: ScalarType) -> Option<Value> {
        if token.is_empty() {
            return Some(Value::Absent);
        }
        match ty {
            ScalarType::Text => Some(Value::Text(token.to_string())),
            ScalarType::Integer => token.parse().ok().map(Value::Integer),
            ScalarType::Float => token.parse().ok().map(Value::Float),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Borrow the text payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view; text that parses as an integer is accepted
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Integer(n) => Some(*n as f64),
            Value::Text(s) => s.parse().ok(),
            Value::Absent => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

/// One row of a table, as wide as the table's schema
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

/// A record viewed through its table's schema, for access by column name
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    schema: &'a Schema,
    record: &'a Record,
}

impl<'a> RowRef<'a> {
    pub fn new(schema: &'a Schema, record: &'a Record) -> Self {
        Self { schema, record }
    }

    /// Value of a named column; `None` if the column does not exist
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.schema.index_of(name).and_then(|i| self.record.get(i))
    }

    /// Text value of a named column
    pub fn get_str(&self, name: &str) -> Option<&'a str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn record(&self) -> &'a Record {
        self.record
    }

    /// `(column name, value)` pairs in schema order
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.schema.names().zip(self.record.values().iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::Column;

    #[test]
    fn test_coerce() {
        assert_eq!(Value::coerce("abc", ScalarType::Text), Some(Value::from("abc")));
        assert_eq!(Value::coerce("-3", ScalarType::Integer), Some(Value::Integer(-3)));
        assert_eq!(Value::coerce("0.25", ScalarType::Float), Some(Value::Float(0.25)));
        assert_eq!(Value::coerce("0.25", ScalarType::Integer), None);
        assert_eq!(Value::coerce("", ScalarType::Text), Some(Value::Absent));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Absent.to_string(), "");
        assert_eq!(Value::Integer(12).to_string(), "12");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::from("PASS").to_string(), "PASS");
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::from("17").as_i64(), Some(17));
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Absent.as_i64(), None);
        assert_eq!(Value::Integer(3).as_str(), None);
    }

    #[test]
    fn test_row_ref_lookup() {
        let schema = Schema::new(
            vec![Column::text("chrom"), Column::new("start", ScalarType::Integer)],
            2,
        );
        let record = Record::new(vec![Value::from("chr1"), Value::Integer(10)]);
        let row = RowRef::new(&schema, &record);

        assert_eq!(row.get_str("chrom"), Some("chr1"));
        assert_eq!(row.get("start"), Some(&Value::Integer(10)));
        assert_eq!(row.get("end"), None);
        assert_eq!(row.fields().count(), 2);
    }
}

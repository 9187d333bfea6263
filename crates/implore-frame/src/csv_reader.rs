//! CSV materialization with type inference

use std::io::Read;

use crate::error::{FrameError, FrameResult};
use crate::frame::DataFrame;
use crate::schema::{Column, ColumnType};

/// Options controlling how a CSV stream is parsed
#[derive(Debug, Clone, PartialEq)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub has_headers: bool,
    /// Stop after this many data records
    pub nrows: Option<usize>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
            nrows: None,
        }
    }
}

impl CsvOptions {
    pub fn with_nrows(mut self, nrows: usize) -> Self {
        self.nrows = Some(nrows);
        self
    }
}

/// Parse a CSV byte stream into a frame
pub fn read_csv<R: Read>(source: R, options: &CsvOptions) -> FrameResult<DataFrame> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.has_headers)
        .from_reader(source);

    let mut headers: Vec<String> = if options.has_headers {
        reader
            .headers()
            .map_err(|e| FrameError::Csv {
                record: 0,
                message: e.to_string(),
            })?
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        Vec::new()
    };

    let mut values: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    let mut num_records = 0;

    for result in reader.records() {
        if options.nrows.is_some_and(|n| num_records >= n) {
            break;
        }
        let record = result.map_err(|e| FrameError::Csv {
            record: num_records + 1,
            message: e.to_string(),
        })?;

        // Without a header row the first record decides the width
        if headers.is_empty() && !options.has_headers {
            headers = (0..record.len()).map(|i| i.to_string()).collect();
            values = vec![Vec::new(); headers.len()];
        }
        if record.len() != headers.len() {
            return Err(FrameError::Csv {
                record: num_records + 1,
                message: format!("expected {} fields, found {}", headers.len(), record.len()),
            });
        }
        for (i, value) in record.iter().enumerate() {
            values[i].push(value.to_string());
        }
        num_records += 1;
    }

    tracing::debug!(
        columns = headers.len(),
        records = num_records,
        "materialized CSV stream"
    );

    let columns = headers
        .into_iter()
        .zip(values)
        .map(|(name, raw)| {
            let dtype = infer_type(&raw);
            (name, parse_column(&raw, dtype))
        })
        .collect();

    DataFrame::new(columns)
}

/// Infer column type from sample values
fn infer_type(values: &[String]) -> ColumnType {
    let non_empty: Vec<&str> = values
        .iter()
        .map(|s| s.as_str())
        .filter(|s| !s.is_empty())
        .collect();
    if non_empty.is_empty() {
        return ColumnType::String;
    }
    let has_missing = non_empty.len() != values.len();

    // Try parsing as integers; missing values force floats
    if non_empty.iter().all(|s| s.parse::<i64>().is_ok()) {
        return if has_missing {
            ColumnType::Float64
        } else {
            ColumnType::Int64
        };
    }

    if non_empty.iter().all(|s| s.parse::<f64>().is_ok()) {
        return ColumnType::Float64;
    }

    if !has_missing
        && non_empty
            .iter()
            .all(|s| matches!(s.to_lowercase().as_str(), "true" | "false"))
    {
        return ColumnType::Bool;
    }

    ColumnType::String
}

/// Parse column values into a Column
fn parse_column(values: &[String], dtype: ColumnType) -> Column {
    match dtype {
        ColumnType::Float64 => Column::Float64(
            values
                .iter()
                .map(|s| s.parse().unwrap_or(f64::NAN))
                .collect(),
        ),
        ColumnType::Int64 => Column::Int64(values.iter().map(|s| s.parse().unwrap_or(0)).collect()),
        ColumnType::Bool => Column::Bool(
            values
                .iter()
                .map(|s| s.eq_ignore_ascii_case("true"))
                .collect(),
        ),
        ColumnType::String => Column::String(values.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Scalar;
    use rstest::rstest;

    const DATA: &[u8] = b"apple,beet,carrot\na,1,0.1\nb,2,0.2\nc,3,0.3\n";

    #[rstest]
    #[case(&["1", "2", "3"], ColumnType::Int64)]
    #[case(&["1.5", "2.7", "3.14"], ColumnType::Float64)]
    #[case(&["1", "", "3"], ColumnType::Float64)]
    #[case(&["true", "False"], ColumnType::Bool)]
    #[case(&["hello", "world"], ColumnType::String)]
    #[case(&["", ""], ColumnType::String)]
    fn test_infer_type(#[case] raw: &[&str], #[case] expected: ColumnType) {
        let values: Vec<String> = raw.iter().map(|s| s.to_string()).collect();
        assert_eq!(infer_type(&values), expected);
    }

    #[test]
    fn test_read_csv_infers_columns() {
        let df = read_csv(DATA, &CsvOptions::default()).unwrap();
        assert_eq!(df.column_names(), vec!["apple", "beet", "carrot"]);
        assert_eq!(df.num_rows(), 3);
        let beet = df.column("beet").unwrap();
        assert_eq!(beet.values.dtype(), ColumnType::Int64);
        assert_eq!(beet.values.get(2), Some(Scalar::Int(3)));
    }

    #[test]
    fn test_read_csv_row_limit() {
        let df = read_csv(DATA, &CsvOptions::default().with_nrows(2)).unwrap();
        assert_eq!(df.num_rows(), 2);
    }

    #[test]
    fn test_read_csv_without_headers() {
        let options = CsvOptions {
            has_headers: false,
            ..CsvOptions::default()
        };
        let df = read_csv(&b"1;2\n3;4\n"[..], &CsvOptions {
            delimiter: b';',
            ..options
        })
        .unwrap();
        assert_eq!(df.column_names(), vec!["0", "1"]);
        assert_eq!(df.num_rows(), 2);
    }

    #[test]
    fn test_read_csv_ragged_record() {
        let result = read_csv(&b"a,b\n1,2\n3\n"[..], &CsvOptions::default());
        assert!(result.is_err());
    }
}

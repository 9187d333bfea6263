//! In-memory tabular values: `DataFrame` and `Series`

use crate::error::{FrameError, FrameResult};
use crate::schema::{Column, Scalar};

/// Row labels promoted from a column by `set_index`
#[derive(Debug, Clone)]
pub struct Index {
    pub name: String,
    pub values: Column,
}

impl Index {
    pub fn new(name: impl Into<String>, values: Column) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    fn slice(&self, start: usize, end: usize) -> Index {
        Index::new(self.name.clone(), self.values.slice(start, end))
    }

    pub fn equals(&self, other: &Index) -> bool {
        self.name == other.name && self.values.equals(&other.values)
    }
}

fn index_equals(a: &Option<Index>, b: &Option<Index>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.equals(b),
        (None, None) => true,
        _ => false,
    }
}

/// A named column together with the index of the frame it came from
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub values: Column,
    pub index: Option<Index>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Column) -> Self {
        Self {
            name: name.into(),
            values,
            index: None,
        }
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.index = Some(index);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value by label when indexed, otherwise by position
    pub fn get(&self, key: &Scalar) -> Option<Scalar> {
        match (&self.index, key) {
            (Some(index), _) => index.values.position(key).and_then(|i| self.values.get(i)),
            (None, Scalar::Int(i)) if *i >= 0 => self.values.get(*i as usize),
            _ => None,
        }
    }

    pub fn head(&self, n: usize) -> Series {
        self.slice(0, n)
    }

    pub fn tail(&self, n: usize) -> Series {
        let len = self.len();
        self.slice(len.saturating_sub(n), len)
    }

    fn slice(&self, start: usize, end: usize) -> Series {
        Series {
            name: self.name.clone(),
            values: self.values.slice(start, end),
            index: self.index.as_ref().map(|i| i.slice(start, end)),
        }
    }

    pub fn equals(&self, other: &Series) -> bool {
        self.name == other.name
            && self.values.equals(&other.values)
            && index_equals(&self.index, &other.index)
    }
}

/// Ordered collection of equally long named columns
#[derive(Debug, Clone, Default)]
pub struct DataFrame {
    columns: Vec<(String, Column)>,
    index: Option<Index>,
    num_rows: usize,
}

impl DataFrame {
    /// Create a frame, checking that every column has the same length
    pub fn new(columns: Vec<(String, Column)>) -> FrameResult<Self> {
        let num_rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        if let Some((_, bad)) = columns.iter().find(|(_, c)| c.len() != num_rows) {
            return Err(FrameError::LengthMismatch {
                expected: num_rows,
                actual: bad.len(),
            });
        }
        Ok(Self {
            columns,
            index: None,
            num_rows,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn index(&self) -> Option<&Index> {
        self.index.as_ref()
    }

    fn find(&self, name: &str) -> FrameResult<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or_else(|| FrameError::ColumnNotFound(name.to_string()))
    }

    /// A single column as a series carrying this frame's index
    pub fn column(&self, name: &str) -> FrameResult<Series> {
        let values = self.find(name)?.clone();
        Ok(Series {
            name: name.to_string(),
            values,
            index: self.index.clone(),
        })
    }

    /// A new frame with only `names`, in the given order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> FrameResult<DataFrame> {
        let columns = names
            .iter()
            .map(|n| {
                let n = n.as_ref();
                self.find(n).map(|c| (n.to_string(), c.clone()))
            })
            .collect::<FrameResult<Vec<_>>>()?;
        Ok(DataFrame {
            columns,
            index: self.index.clone(),
            num_rows: self.num_rows,
        })
    }

    /// Promote a column to the index, replacing any existing one
    pub fn set_index(&self, key: &str) -> FrameResult<DataFrame> {
        let values = self.find(key)?.clone();
        let columns = self
            .columns
            .iter()
            .filter(|(n, _)| n != key)
            .cloned()
            .collect();
        Ok(DataFrame {
            columns,
            index: Some(Index::new(key, values)),
            num_rows: self.num_rows,
        })
    }

    /// Move the index back to the front of the columns
    pub fn reset_index(&self) -> FrameResult<DataFrame> {
        let index = self.index.as_ref().ok_or(FrameError::NoIndex)?;
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push((index.name.clone(), index.values.clone()));
        columns.extend(self.columns.iter().cloned());
        Ok(DataFrame {
            columns,
            index: None,
            num_rows: self.num_rows,
        })
    }

    pub fn drop<S: AsRef<str>>(&self, names: &[S]) -> FrameResult<DataFrame> {
        for n in names {
            self.find(n.as_ref())?;
        }
        let columns = self
            .columns
            .iter()
            .filter(|(n, _)| !names.iter().any(|d| d.as_ref() == n))
            .cloned()
            .collect();
        Ok(DataFrame {
            columns,
            index: self.index.clone(),
            num_rows: self.num_rows,
        })
    }

    pub fn head(&self, n: usize) -> DataFrame {
        self.slice(0, n)
    }

    pub fn tail(&self, n: usize) -> DataFrame {
        self.slice(self.num_rows.saturating_sub(n), self.num_rows)
    }

    /// Rows in `start..end`, clamped to the frame
    pub fn slice(&self, start: usize, end: usize) -> DataFrame {
        let end = end.min(self.num_rows);
        let start = start.min(end);
        DataFrame {
            columns: self
                .columns
                .iter()
                .map(|(n, c)| (n.clone(), c.slice(start, end)))
                .collect(),
            index: self.index.as_ref().map(|i| i.slice(start, end)),
            num_rows: end - start,
        }
    }

    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Same shape, column names, dtypes, values and index
    pub fn equals(&self, other: &DataFrame) -> bool {
        self.num_rows == other.num_rows
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|((n1, c1), (n2, c2))| n1 == n2 && c1.equals(c2))
            && index_equals(&self.index, &other.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        DataFrame::new(vec![
            (
                "apple".to_string(),
                Column::String(vec!["a".into(), "b".into(), "c".into()]),
            ),
            ("beet".to_string(), Column::Int64(vec![1, 2, 3])),
            ("carrot".to_string(), Column::Float64(vec![0.1, 0.2, 0.3])),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let result = DataFrame::new(vec![
            ("a".to_string(), Column::Int64(vec![1, 2])),
            ("b".to_string(), Column::Int64(vec![1])),
        ]);
        assert!(matches!(
            result,
            Err(FrameError::LengthMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_select_and_set_index() {
        let df = sample().select(&["apple", "beet"]).unwrap();
        assert_eq!(df.column_names(), vec!["apple", "beet"]);

        let indexed = df.set_index("beet").unwrap();
        assert_eq!(indexed.column_names(), vec!["apple"]);
        assert_eq!(indexed.index().unwrap().name, "beet");
        assert_eq!(
            indexed.column("apple").unwrap().get(&Scalar::Int(2)),
            Some(Scalar::Str("b".into()))
        );
    }

    #[test]
    fn test_select_missing_column() {
        assert!(matches!(
            sample().select(&["nope"]),
            Err(FrameError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_reset_index_round_trip() {
        let df = sample();
        let back = df.set_index("apple").unwrap().reset_index().unwrap();
        assert_eq!(back.column_names(), vec!["apple", "beet", "carrot"]);
        assert!(back.equals(&df));
        assert!(matches!(df.reset_index(), Err(FrameError::NoIndex)));
    }

    #[test]
    fn test_head_tail() {
        let df = sample();
        assert_eq!(df.head(2).num_rows(), 2);
        assert_eq!(df.head(10).num_rows(), 3);
        let tail = df.tail(1);
        assert_eq!(
            tail.column("beet").unwrap().values.get(0),
            Some(Scalar::Int(3))
        );
    }

    #[test]
    fn test_equals_considers_index() {
        let df = sample();
        assert!(df.equals(&df.clone()));
        assert!(!df.equals(&df.set_index("beet").unwrap()));
        assert!(!df.equals(&df.head(2)));
    }

    #[test]
    fn test_drop() {
        let df = sample().drop(&["carrot"]).unwrap();
        assert_eq!(df.column_names(), vec!["apple", "beet"]);
    }
}

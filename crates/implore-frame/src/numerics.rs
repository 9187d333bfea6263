//! Numerics namespace: reductions over frames, series and scalars
//!
//! Reducing a frame yields a series indexed by column name; reducing a series
//! yields a scalar; reducing a scalar returns it unchanged (except `count`).

use crate::error::{FrameError, FrameResult};
use crate::frame::{DataFrame, Index, Series};
use crate::schema::{Column, Scalar};

/// Reductions offered by the numerics namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Max,
    Min,
    Sum,
    Mean,
    Count,
}

impl Reduction {
    pub fn from_name(name: &str) -> FrameResult<Self> {
        match name {
            "max" | "amax" => Ok(Reduction::Max),
            "min" | "amin" => Ok(Reduction::Min),
            "sum" => Ok(Reduction::Sum),
            "mean" => Ok(Reduction::Mean),
            "count" | "size" => Ok(Reduction::Count),
            other => Err(FrameError::UnknownReduction(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Reduction::Max => "max",
            Reduction::Min => "min",
            Reduction::Sum => "sum",
            Reduction::Mean => "mean",
            Reduction::Count => "count",
        }
    }
}

/// Which way a frame is reduced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Axis {
    /// One result per column (`axis=0`)
    #[default]
    Columns,
    /// One result per row (`axis=1`)
    Rows,
}

impl Axis {
    pub fn from_number(axis: i64) -> FrameResult<Self> {
        match axis {
            0 => Ok(Axis::Columns),
            1 => Ok(Axis::Rows),
            other => Err(FrameError::InvalidAxis(other)),
        }
    }
}

fn count(n: usize) -> Scalar {
    i64::try_from(n).map_or(Scalar::Float(n as f64), Scalar::Int)
}

/// Integer sum, widened to a float when it leaves the `i64` range
fn sum_ints(values: &[i64]) -> Scalar {
    match values.iter().try_fold(0i64, |acc, &x| acc.checked_add(x)) {
        Some(total) => Scalar::Int(total),
        None => {
            tracing::debug!(len = values.len(), "integer sum overflowed, widening to float");
            Scalar::Float(values.iter().map(|&x| x as f64).sum())
        }
    }
}

fn non_nan(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|x| !x.is_nan())
}

/// Reduce one column to a scalar
pub fn reduce_column(column: &Column, reduction: Reduction) -> FrameResult<Scalar> {
    if reduction == Reduction::Count {
        return Ok(count(column.len()));
    }
    if column.is_empty() {
        return Ok(Scalar::Null);
    }
    match (column, reduction) {
        (Column::Int64(v), Reduction::Max) => {
            Ok(v.iter().max().map_or(Scalar::Null, |&x| Scalar::Int(x)))
        }
        (Column::Int64(v), Reduction::Min) => {
            Ok(v.iter().min().map_or(Scalar::Null, |&x| Scalar::Int(x)))
        }
        (Column::Int64(v), Reduction::Sum) => Ok(sum_ints(v)),
        (Column::Float64(v), Reduction::Max) => Ok(Scalar::Float(
            non_nan(v).fold(f64::NEG_INFINITY, f64::max),
        )),
        (Column::Float64(v), Reduction::Min) => {
            Ok(Scalar::Float(non_nan(v).fold(f64::INFINITY, f64::min)))
        }
        (Column::Float64(v), Reduction::Sum) => Ok(Scalar::Float(non_nan(v).sum())),
        (Column::Bool(v), Reduction::Max) => Ok(Scalar::Bool(v.iter().any(|&x| x))),
        (Column::Bool(v), Reduction::Min) => Ok(Scalar::Bool(v.iter().all(|&x| x))),
        (Column::Bool(v), Reduction::Sum) => Ok(count(v.iter().filter(|&&x| x).count())),
        (Column::String(v), Reduction::Max) => {
            Ok(v.iter().max().map_or(Scalar::Null, |x| Scalar::Str(x.clone())))
        }
        (Column::String(v), Reduction::Min) => {
            Ok(v.iter().min().map_or(Scalar::Null, |x| Scalar::Str(x.clone())))
        }
        (_, Reduction::Mean) => {
            let values = column.to_f64()?;
            let valid: Vec<f64> = non_nan(&values).collect();
            if valid.is_empty() {
                return Ok(Scalar::Null);
            }
            Ok(Scalar::Float(valid.iter().sum::<f64>() / valid.len() as f64))
        }
        (column, reduction) => Err(FrameError::unsupported(reduction.name(), column.dtype())),
    }
}

pub fn reduce_series(series: &Series, reduction: Reduction) -> FrameResult<Scalar> {
    reduce_column(&series.values, reduction)
}

/// Reduce a frame along `axis`
///
/// Reducing columns yields a series indexed by column name. Reducing rows
/// yields a series carrying the frame's own index.
pub fn reduce_frame(frame: &DataFrame, reduction: Reduction, axis: Axis) -> FrameResult<Series> {
    match axis {
        Axis::Columns => {
            let mut names = Vec::with_capacity(frame.num_columns());
            let mut results = Vec::with_capacity(frame.num_columns());
            for (name, column) in frame.iter_columns() {
                names.push(name.to_string());
                results.push(reduce_column(column, reduction)?);
            }
            Ok(Series::new(reduction.name(), scalars_to_column(&results))
                .with_index(Index::new("", Column::String(names))))
        }
        Axis::Rows => {
            let mut results = Vec::with_capacity(frame.num_rows());
            for row in 0..frame.num_rows() {
                let cells: Vec<Scalar> = frame
                    .iter_columns()
                    .map(|(_, column)| column.get(row).unwrap_or(Scalar::Null))
                    .collect();
                results.push(reduce_column(&scalars_to_column(&cells), reduction)?);
            }
            let series = Series::new(reduction.name(), scalars_to_column(&results));
            Ok(match frame.index() {
                Some(index) => series.with_index(index.clone()),
                None => series,
            })
        }
    }
}

pub fn reduce_scalar(value: &Scalar, reduction: Reduction) -> FrameResult<Scalar> {
    match (value, reduction) {
        (_, Reduction::Count) => Ok(Scalar::Int(1)),
        (Scalar::Int(v), Reduction::Mean) => Ok(Scalar::Float(*v as f64)),
        (Scalar::Str(_), Reduction::Mean | Reduction::Sum) => {
            Err(FrameError::unsupported(reduction.name(), "String"))
        }
        (v, _) => Ok(v.clone()),
    }
}

/// Pack reduction results into a column, widening ints to floats when mixed
fn scalars_to_column(values: &[Scalar]) -> Column {
    if values.iter().all(|v| matches!(v, Scalar::Int(_))) {
        let ints = values
            .iter()
            .filter_map(|v| match v {
                Scalar::Int(x) => Some(*x),
                _ => None,
            })
            .collect();
        return Column::Int64(ints);
    }
    if values.iter().all(|v| v.as_f64().is_some() || v.is_null()) {
        return Column::Float64(values.iter().map(|v| v.as_f64().unwrap_or(f64::NAN)).collect());
    }
    if values.iter().all(|v| matches!(v, Scalar::Bool(_))) {
        return Column::Bool(values.iter().filter_map(Scalar::as_bool).collect());
    }
    Column::String(values.iter().map(|v| v.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Reduction::Max, Scalar::Int(3))]
    #[case(Reduction::Min, Scalar::Int(1))]
    #[case(Reduction::Sum, Scalar::Int(6))]
    #[case(Reduction::Mean, Scalar::Float(2.0))]
    #[case(Reduction::Count, Scalar::Int(3))]
    fn test_reduce_int_column(#[case] reduction: Reduction, #[case] expected: Scalar) {
        let col = Column::Int64(vec![1, 2, 3]);
        assert_eq!(reduce_column(&col, reduction).unwrap(), expected);
    }

    #[test]
    fn test_float_max_skips_nan() {
        let col = Column::Float64(vec![0.1, f64::NAN, 0.3]);
        assert_eq!(reduce_column(&col, Reduction::Max).unwrap(), Scalar::Float(0.3));
    }

    #[test]
    fn test_string_mean_unsupported() {
        let col = Column::String(vec!["a".into()]);
        assert!(reduce_column(&col, Reduction::Mean).is_err());
        assert_eq!(
            reduce_column(&col, Reduction::Max).unwrap(),
            Scalar::Str("a".into())
        );
    }

    #[test]
    fn test_reduce_frame_indexed_by_column() {
        let df = DataFrame::new(vec![
            ("a".to_string(), Column::Int64(vec![1, 5])),
            ("b".to_string(), Column::Float64(vec![0.5, 0.25])),
        ])
        .unwrap();
        let out = reduce_frame(&df, Reduction::Max, Axis::Columns).unwrap();
        assert_eq!(out.get(&Scalar::Str("a".into())), Some(Scalar::Float(5.0)));
        assert_eq!(out.get(&Scalar::Str("b".into())), Some(Scalar::Float(0.5)));
    }

    #[test]
    fn test_reduce_frame_rows_keeps_index() {
        let df = DataFrame::new(vec![
            ("a".to_string(), Column::Int64(vec![1, 5])),
            ("b".to_string(), Column::Int64(vec![2, 6])),
            ("key".to_string(), Column::String(vec!["x".into(), "y".into()])),
        ])
        .unwrap()
        .set_index("key")
        .unwrap();
        let out = reduce_frame(&df, Reduction::Max, Axis::Rows).unwrap();
        assert!(out.values.equals(&Column::Int64(vec![2, 6])));
        assert_eq!(out.get(&Scalar::Str("y".into())), Some(Scalar::Int(6)));
    }

    #[test]
    fn test_int_sum_overflow_widens() {
        let col = Column::Int64(vec![i64::MAX, 1]);
        assert_eq!(
            reduce_column(&col, Reduction::Sum).unwrap(),
            Scalar::Float(i64::MAX as f64 + 1.0)
        );
        let col = Column::Int64(vec![i64::MAX, -1]);
        assert_eq!(reduce_column(&col, Reduction::Sum).unwrap(), Scalar::Int(i64::MAX - 1));
    }

    #[test]
    fn test_axis_from_number() {
        assert_eq!(Axis::from_number(0).unwrap(), Axis::Columns);
        assert_eq!(Axis::from_number(1).unwrap(), Axis::Rows);
        assert!(matches!(Axis::from_number(2), Err(FrameError::InvalidAxis(2))));
    }

    #[test]
    fn test_unknown_reduction() {
        assert!(matches!(
            Reduction::from_name("median"),
            Err(FrameError::UnknownReduction(_))
        ));
    }
}

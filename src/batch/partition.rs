//! Batch partitioner.

use crate::row::Row;
use std::ops::Range;

/// Largest batch the Comprehend batch operations accept.
pub const MAX_BATCH_SIZE: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// The target operation accepts several texts per call.
    pub batch_support: bool,
    pub batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_support: false,
            batch_size: 10,
        }
    }
}

impl BatchConfig {
    /// One row per unit.
    pub fn single_rows() -> Self {
        Self::default()
    }

    /// Batches of `batch_size` rows (minimum 1).
    pub fn batched(batch_size: usize) -> Self {
        Self {
            batch_support: true,
            batch_size: batch_size.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Row,
    Batch,
}

/// A contiguous slice of the input submitted as one task.
///
/// `index` is the unit's position in submission order; `start..start + len`
/// are the positions of its rows in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchUnit {
    pub index: usize,
    pub start: usize,
    pub len: usize,
    pub kind: UnitKind,
}

impl DispatchUnit {
    pub fn row_range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    pub fn rows<'a>(&self, rows: &'a [Row]) -> &'a [Row] {
        &rows[self.row_range()]
    }
}

/// Cuts `total_rows` rows into dispatch units, preserving order across and within units.
pub fn partition(total_rows: usize, config: &BatchConfig) -> Vec<DispatchUnit> {
    if !config.batch_support {
        return (0..total_rows)
            .map(|i| DispatchUnit {
                index: i,
                start: i,
                len: 1,
                kind: UnitKind::Row,
            })
            .collect();
    }
    let size = config.batch_size.max(1);
    (0..total_rows)
        .step_by(size)
        .enumerate()
        .map(|(index, start)| DispatchUnit {
            index,
            start,
            len: size.min(total_rows - start),
            kind: UnitKind::Batch,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_rows() {
        let units = partition(4, &BatchConfig::single_rows());
        assert_eq!(units.len(), 4);
        assert!(units.iter().all(|u| u.len == 1 && u.kind == UnitKind::Row));
        assert_eq!(units[3].start, 3);
    }

    #[test]
    fn test_batches_cover_rows_in_order() {
        for total in [0usize, 1, 9, 10, 11, 57] {
            for size in [1usize, 3, 10, 25] {
                let units = partition(total, &BatchConfig::batched(size));
                let covered: Vec<usize> = units.iter().flat_map(|u| u.row_range()).collect();
                assert_eq!(covered, (0..total).collect::<Vec<_>>());
                assert!(units.iter().all(|u| u.len <= size && u.len > 0));
                assert!(units.iter().enumerate().all(|(i, u)| u.index == i));
            }
        }
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let units = partition(
            3,
            &BatchConfig {
                batch_support: true,
                batch_size: 0,
            },
        );
        assert_eq!(units.len(), 3);
    }

    #[test]
    fn test_unit_rows_slice() {
        let rows: Vec<Row> = (0..5)
            .map(|i| {
                let mut r = Row::new();
                r.insert("i".into(), i.into());
                r
            })
            .collect();
        let units = partition(rows.len(), &BatchConfig::batched(2));
        assert_eq!(units[2].rows(&rows).len(), 1);
        assert_eq!(units[1].rows(&rows)[0]["i"], 2);
    }
}

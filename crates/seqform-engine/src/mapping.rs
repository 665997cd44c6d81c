//! Generic mapping primitives for repeating row blocks.
//!
//! A [`BlockSpec`] describes one row-repeating region of the template: where
//! it starts, how many source rows it admits, and which source field lands in
//! which column. The projection itself is generic over the source row type,
//! so the sample sheet and the comparison groups share one code path.

use seqform_model::{CellRef, CellValue};
use seqform_xlsx::SheetEdits;

/// Row budget of a repeating block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RowCap {
    /// Project every source row, however many there are.
    Unbounded,
    /// Project at most this many source rows; the rest are silently dropped.
    Limit(u32),
}

impl RowCap {
    /// Whether the 0-based source row `index` is within the budget.
    pub fn admits(self, index: usize) -> bool {
        match self {
            RowCap::Unbounded => true,
            RowCap::Limit(cap) => (index as u64) < u64::from(cap),
        }
    }
}

/// One column of a repeating block: a field selector paired with the column
/// it lands in.
#[derive(Copy, Clone, Debug)]
pub struct BlockColumn<F: 'static> {
    pub field: F,
    pub col: u32,
}

/// A repeating row region of the template.
#[derive(Copy, Clone, Debug)]
pub struct BlockSpec<F: 'static> {
    /// 1-based row the first source row lands on.
    pub start_row: u32,
    pub row_cap: RowCap,
    pub columns: &'static [BlockColumn<F>],
}

impl<F: Copy> BlockSpec<F> {
    /// Target row for the i-th source row (0-based).
    pub fn target_row(&self, index: usize) -> u32 {
        self.start_row + index as u32
    }

    /// Project `rows` onto the block.
    ///
    /// For each source row the cap admits, every field `extract` reports as
    /// present is written at `start_row + i`. Rows beyond the cap produce no
    /// writes and no error.
    pub fn project<T>(
        &self,
        edits: &mut SheetEdits,
        rows: &[T],
        extract: impl Fn(&T, F) -> Option<&str>,
    ) {
        for (index, row) in rows.iter().enumerate() {
            if !self.row_cap.admits(index) {
                break;
            }
            let target = self.target_row(index);
            for column in self.columns {
                if let Some(text) = extract(row, column.field) {
                    edits.set(CellRef::at_row(target, column.col), CellValue::text(text));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TWO_COLS: BlockSpec<usize> = BlockSpec {
        start_row: 10,
        row_cap: RowCap::Limit(3),
        columns: &[
            BlockColumn { field: 0, col: 1 },
            BlockColumn { field: 1, col: 2 },
        ],
    };

    #[test]
    fn row_cap_admits_up_to_limit() {
        assert!(RowCap::Limit(100).admits(0));
        assert!(RowCap::Limit(100).admits(99));
        assert!(!RowCap::Limit(100).admits(100));
        assert!(RowCap::Unbounded.admits(usize::MAX));
    }

    #[test]
    fn projects_rows_onto_consecutive_target_rows() {
        let rows = vec![
            [Some("a"), Some("b")],
            [None, Some("d")],
        ];
        let mut edits = SheetEdits::new();
        TWO_COLS.project(&mut edits, &rows, |row, field| row[field]);

        let written: Vec<(String, String)> = edits
            .iter()
            .map(|(cell, value)| {
                let CellValue::Text(text) = value else {
                    panic!("unexpected value {value:?}")
                };
                (cell.to_a1(), text.clone())
            })
            .collect();
        assert_eq!(
            written,
            vec![
                ("B10".to_string(), "a".to_string()),
                ("C10".to_string(), "b".to_string()),
                ("C11".to_string(), "d".to_string()),
            ]
        );
    }

    #[test]
    fn rows_beyond_the_cap_are_dropped_silently() {
        let rows: Vec<[Option<&str>; 2]> = (0..10).map(|_| [Some("x"), None]).collect();
        let mut edits = SheetEdits::new();
        TWO_COLS.project(&mut edits, &rows, |row, field| row[field]);

        assert_eq!(edits.len(), 3);
        let last = edits.iter().last().unwrap().0;
        assert_eq!(last.to_a1(), "B12");
    }
}

//! Optional conversion of per-state tables into `ndarray` matrices for
//! plotting and numeric post-processing.
//!
//! Gated behind the `ndarray` feature. Rows are `y`, columns are `x`, so the
//! matrix reads the same way as the text render.

#[cfg(feature = "ndarray")]
pub mod ndarray_impl {
    use ndarray::Array2;

    use crate::spaces::GridSpace;
    use crate::tables::{ValueTable, VisitCounts};

    /// Values as a `size × size` matrix; states absent from the table
    /// (solid cells) become `NaN`.
    pub fn values_to_array(space: &GridSpace, values: &ValueTable) -> Array2<f64> {
        let n = space.size();
        let mut out = Array2::from_elem((n, n), f64::NAN);
        for pos in space.positions() {
            if let Some(&v) = values.get(&pos) {
                out[[pos.y as usize, pos.x as usize]] = v;
            }
        }
        out
    }

    /// Visit counts as a matrix; absent states count zero.
    pub fn visits_to_array(space: &GridSpace, visits: &VisitCounts) -> Array2<u64> {
        let n = space.size();
        Array2::from_shape_fn((n, n), |(row, col)| {
            let pos = crate::envs::Position::new(col as i32, row as i32);
            visits.get(&pos).copied().unwrap_or(0)
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::envs::Position;

        #[test]
        fn rows_follow_y() {
            let space = GridSpace::new(2);
            let values = ValueTable::from([
                (Position::new(0, 0), 1.0),
                (Position::new(1, 0), 2.0),
                (Position::new(0, 1), 3.0),
            ]);
            let arr = values_to_array(&space, &values);
            assert_eq!(arr[[0, 1]], 2.0);
            assert_eq!(arr[[1, 0]], 3.0);
            assert!(arr[[1, 1]].is_nan());

            let visits = VisitCounts::from([(Position::new(1, 1), 4)]);
            let arr = visits_to_array(&space, &visits);
            assert_eq!(arr.sum(), 4);
            assert_eq!(arr[[1, 1]], 4);
        }
    }
}

#[cfg(feature = "ndarray")]
pub use ndarray_impl::{values_to_array, visits_to_array};

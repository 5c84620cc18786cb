use nalgebra::{DMatrix, DVector, SymmetricEigen};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Create a symmetric, square matrix from its rows. `row(i)` has to return the entries
/// `(i, i)..(i, n)` of the upper triangle. With the `rayon` feature, rows are evaluated
/// in parallel.
pub(super) fn symmetric_matrix_by_rows<F>(n: usize, row: F) -> DMatrix<f64>
where
    F: Fn(usize) -> Vec<f64> + Sync,
{
    #[cfg(feature = "rayon")]
    let rows = (0..n).into_par_iter().map(&row).collect::<Vec<_>>();
    #[cfg(not(feature = "rayon"))]
    let rows = (0..n).map(&row).collect::<Vec<_>>();

    let mut matrix = DMatrix::zeros(n, n);
    for (i, row) in rows.into_iter().enumerate() {
        debug_assert_eq!(row.len(), n - i);
        for (offset, value) in row.into_iter().enumerate() {
            matrix[(i, i + offset)] = value;
            matrix[(i + offset, i)] = value;
        }
    }
    matrix
}

pub(super) fn eigs(matrix: DMatrix<f64>) -> (DMatrix<f64>, DVector<f64>) {
    let eigs = SymmetricEigen::new(matrix);
    (eigs.eigenvectors, eigs.eigenvalues)
}

/// Eigenvectors (as columns) and eigenvalues of a symmetric matrix, in ascending order of
/// the eigenvalues
pub(super) fn sorted_eigs(matrix: DMatrix<f64>) -> (DMatrix<f64>, DVector<f64>) {
    let (eigenvectors, eigenvalues) = eigs(matrix);

    let mut val_vec_pairs = eigenvalues
        .into_iter()
        .zip(eigenvectors.column_iter())
        .collect::<Vec<_>>();

    val_vec_pairs.sort_unstable_by(|(a, _), (b, _)| a.total_cmp(b));

    let (values, vectors): (Vec<_>, Vec<_>) = val_vec_pairs.into_iter().unzip();

    (
        DMatrix::from_columns(&vectors),
        DVector::from_column_slice(&values),
    )
}

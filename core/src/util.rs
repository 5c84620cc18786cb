use std::f64::consts::PI;

use itertools::Itertools;
use nalgebra::{DMatrix, DVector, Vector3};

use crate::{Error, Result};

/// Flattens positions into `(x1, y1, z1, x2, ...)`
pub fn coords_to_flat(positions: &[Vector3<f64>]) -> DVector<f64> {
    DVector::from_iterator(
        3 * positions.len(),
        positions.iter().flat_map(|p| p.iter().copied()),
    )
}

/// Inverse of [`coords_to_flat`]. Trailing entries that don't make up a full atom are
/// ignored.
pub fn flat_to_coords(flat: &DVector<f64>) -> Vec<Vector3<f64>> {
    (0..flat.len() / 3).map(|i| position(flat, i)).collect()
}

#[inline(always)]
pub(crate) fn position(flat: &DVector<f64>, atom: usize) -> Vector3<f64> {
    flat.fixed_rows::<3>(3 * atom).into_owned()
}

#[inline(always)]
pub(crate) fn add_to_atom(flat: &mut DVector<f64>, atom: usize, value: &Vector3<f64>) {
    let mut rows = flat.fixed_rows_mut::<3>(3 * atom);
    rows += value;
}

/// Condensed pairwise distance vector in the order (0,1), (0,2), ..., (1,2), ...
pub fn distance_vector(positions: &[Vector3<f64>]) -> DVector<f64> {
    let n = positions.len();
    let distances = (0..n)
        .tuple_combinations::<(usize, usize)>()
        .map(|(i, j)| (positions[j] - positions[i]).norm());
    DVector::from_iterator(n * n.saturating_sub(1) / 2, distances)
}

/// Expands a condensed distance vector back into the symmetric square matrix.
pub fn distance_matrix_from_vector(distances: &DVector<f64>) -> Result<DMatrix<f64>> {
    let m = distances.len();
    let n = ((1.0 + (1.0 + 8.0 * m as f64).sqrt()) / 2.0).round() as usize;
    if n * (n - 1) / 2 != m {
        return Err(Error::DimensionMismatch {
            expected: n * (n - 1) / 2,
            found: m,
        });
    }

    let mut matrix = DMatrix::zeros(n, n);
    let mut k = 0;
    for i in 0..n {
        for j in i + 1..n {
            matrix[(i, j)] = distances[k];
            matrix[(j, i)] = distances[k];
            k += 1;
        }
    }
    Ok(matrix)
}

/// Angle between two vectors in radians. Rounding can push the cosine slightly outside
/// of `[-1, 1]`; in that case the angle snaps to 0 for (nearly) parallel and pi for
/// antiparallel vectors.
///
/// The angle is undefined when one of the vectors has zero length (an atom sitting on the
/// vertex). It is reported as pi with a warning.
pub fn compute_angle(u: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    if u.norm() == 0.0 || v.norm() == 0.0 {
        log::warn!("angle with a zero-length arm ({u:?}, {v:?}), using pi");
        return PI;
    }

    let cos_theta = u.dot(v) / (u.norm() * v.norm());
    let theta = cos_theta.acos();

    if theta.is_nan() {
        if cos_theta > 0.0 {
            0.0
        } else {
            PI
        }
    } else {
        theta
    }
}

pub fn deg2rad(angle: f64) -> f64 {
    angle.to_radians()
}

pub fn rad2deg(angle: f64) -> f64 {
    angle.to_degrees()
}

/// Central-difference gradient of `func` at `x`.
pub fn numerical_gradient(
    func: impl Fn(&DVector<f64>) -> f64,
    x: &DVector<f64>,
    step: f64,
) -> DVector<f64> {
    let mut displaced = x.clone();
    DVector::from_fn(x.len(), |i, _| {
        let original = displaced[i];
        displaced[i] = original + step;
        let forward = func(&displaced);
        displaced[i] = original - step;
        let backward = func(&displaced);
        displaced[i] = original;
        (forward - backward) / (2.0 * step)
    })
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;
    use nalgebra::{DVector, Vector3};

    #[test]
    fn distance_matrix_is_correct() {
        let positions = [-2.0, -1.0, 0.0, 4.0].map(|x| Vector3::new(x, 0.0, 0.0));

        let condensed = super::distance_vector(&positions);
        assert_eq!(condensed.len(), 6);

        let matrix = super::distance_matrix_from_vector(&condensed).unwrap();
        for i in 0..4 {
            assert_eq!(matrix[(i, i)], 0.0);
            for j in 0..4 {
                assert_relative_eq!(matrix[(i, j)], (positions[i] - positions[j]).norm());
                assert_eq!(matrix[(i, j)], matrix[(j, i)]);
            }
        }
    }

    #[test]
    fn condensed_vector_length_must_be_triangular() {
        assert!(super::distance_matrix_from_vector(&DVector::zeros(4)).is_err());
    }

    #[test]
    fn angle_handles_degenerate_vectors() {
        let x = Vector3::x();
        assert_relative_eq!(super::compute_angle(&x, &Vector3::y()), PI / 2.0);
        assert_eq!(super::compute_angle(&x, &(3.0 * x)), 0.0);
        assert_relative_eq!(super::compute_angle(&x, &-x), PI);
        assert_eq!(super::compute_angle(&x, &Vector3::zeros()), PI);
        assert_eq!(super::compute_angle(&Vector3::zeros(), &x), PI);
        assert_relative_eq!(super::rad2deg(super::deg2rad(109.5)), 109.5);
    }

    #[test]
    fn flat_coordinates_round_trip() {
        let positions = vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)];
        let flat = super::coords_to_flat(&positions);

        assert_eq!(flat.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(super::flat_to_coords(&flat), positions);
    }

    #[test]
    fn numerical_gradient_of_quadratic() {
        let x = DVector::from_vec(vec![1.0, -2.0]);
        let gradient = super::numerical_gradient(|x| x.dot(x), &x, 1e-3);

        assert_relative_eq!(gradient[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(gradient[1], -4.0, epsilon = 1e-8);
    }
}

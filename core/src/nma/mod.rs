//! Normal-mode analysis: numerical Hessian, mass weighting, diagonalization and mode
//! animation.

mod utils;

use std::{f64::consts::PI, fmt::Write};

use nalgebra::{DMatrix, DVector, DVectorView};

use crate::{
    energy::EnergyTerm,
    trajectory::{Frame, Trajectory},
    util, Error, Result,
};

/// Default finite difference step of the Hessian, in Ångström
pub const DEFAULT_HESSIAN_STEP: f64 = 1e-4;

/// Number of rigid-body modes (translations and rotations) of a non-linear molecule
const RIGID_BODY_MODES: usize = 6;

/// Converts `sqrt(eigenvalue)` in `kcal/mol/Å²/amu` to wavenumbers (cm^-1)
pub const WAVENUMBER_CONVERSION: f64 = 108.5913;

/// Finite difference steps have to be positive and finite.
pub(crate) fn check_step(step: f64) -> Result<()> {
    if step.is_finite() && step > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidSetting {
            setting: "hessian step",
            value: step,
        })
    }
}

/// Numerical Hessian of `energy` with respect to the flat coordinates `coords`, using
/// central differences of the energy with step `step`.
pub fn compute_hessian(
    energy: &dyn EnergyTerm,
    coords: &DVector<f64>,
    step: f64,
) -> Result<DMatrix<f64>> {
    check_step(step)?;
    let n = coords.len();
    let center = energy.energy(coords);
    let h2 = step * step;

    let hessian = utils::symmetric_matrix_by_rows(n, |i| {
        let mut x = coords.clone();
        let mut displaced = |displacements: &[(usize, f64)]| {
            for &(index, delta) in displacements {
                x[index] = coords[index] + delta;
            }
            let value = energy.energy(&x);
            for &(index, _) in displacements {
                x[index] = coords[index];
            }
            value
        };

        (i..n)
            .map(|j| {
                if i == j {
                    let forward = displaced(&[(i, step)]);
                    let backward = displaced(&[(i, -step)]);
                    (forward - 2.0 * center + backward) / h2
                } else {
                    let pp = displaced(&[(i, step), (j, step)]);
                    let pm = displaced(&[(i, step), (j, -step)]);
                    let mp = displaced(&[(i, -step), (j, step)]);
                    let mm = displaced(&[(i, -step), (j, -step)]);
                    (pp - pm - mp + mm) / (4.0 * h2)
                }
            })
            .collect()
    });

    log::debug!("hessian: {hessian:0.4}");
    Ok(hessian)
}

/// Numerical Hessian from central differences of the analytic gradient, symmetrized.
/// Needs `2 * 3N` gradient evaluations instead of `O((3N)^2)` energy evaluations.
pub fn compute_hessian_from_gradient(
    energy: &dyn EnergyTerm,
    coords: &DVector<f64>,
    step: f64,
) -> Result<DMatrix<f64>> {
    check_step(step)?;
    let n = coords.len();
    let mut hessian = DMatrix::zeros(n, n);
    let mut x = coords.clone();

    for i in 0..n {
        x[i] = coords[i] + step;
        let forward = energy.gradient(&x);
        x[i] = coords[i] - step;
        let backward = energy.gradient(&x);
        x[i] = coords[i];

        hessian.set_column(i, &((forward - backward) / (2.0 * step)));
    }

    let hessian = (&hessian + hessian.transpose()) * 0.5;
    log::debug!("hessian: {hessian:0.4}");
    Ok(hessian)
}

/// Mass-weights the Hessian: `F = M H M` with `M` the inverse square root mass matrix.
pub fn compute_force_constant_matrix(
    hessian: &DMatrix<f64>,
    inv_sqrt_mass: &DMatrix<f64>,
) -> Result<DMatrix<f64>> {
    let n = hessian.nrows();
    for (rows, cols) in [hessian.shape(), inv_sqrt_mass.shape()] {
        if rows != n || cols != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: if rows != n { rows } else { cols },
            });
        }
    }

    Ok(inv_sqrt_mass * hessian * inv_sqrt_mass)
}

/// Eigen-decomposition of a force-constant matrix.
#[derive(Clone, Debug)]
pub struct NormalModes {
    eigenvalues: DVector<f64>,
    /// mass-weighted eigenvectors as columns
    eigenvectors: DMatrix<f64>,
}

/// Diagonalizes the force constant matrix. The modes are sorted by ascending eigenvalue;
/// with `discard_trans_and_rot` the six lowest ones are dropped. Matrices with NaN or
/// infinite entries are rejected.
pub fn compute_normal_modes(
    force_constants: DMatrix<f64>,
    discard_trans_and_rot: bool,
) -> Result<NormalModes> {
    let (rows, cols) = force_constants.shape();
    if rows != cols {
        return Err(Error::DimensionMismatch {
            expected: rows,
            found: cols,
        });
    }
    if force_constants.iter().any(|value| !value.is_finite()) {
        return Err(Error::NonFinite("force constant matrix"));
    }
    if rows == 0 {
        return Ok(NormalModes {
            eigenvalues: DVector::zeros(0),
            eigenvectors: DMatrix::zeros(0, 0),
        });
    }

    let (eigenvectors, eigenvalues) = utils::sorted_eigs(force_constants);
    let skip = if discard_trans_and_rot {
        RIGID_BODY_MODES.min(rows)
    } else {
        0
    };
    log::debug!("eigenvalues: {:?}", eigenvalues.as_slice());

    Ok(NormalModes {
        eigenvalues: eigenvalues.rows(skip, rows - skip).into_owned(),
        eigenvectors: eigenvectors.columns(skip, rows - skip).into_owned(),
    })
}

impl NormalModes {
    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }

    /// The eigenvalues of the force constant matrix (squared angular frequencies), in
    /// ascending order
    pub fn frequencies(&self) -> &DVector<f64> {
        &self.eigenvalues
    }

    /// `sqrt` of the eigenvalues, negative eigenvalues are clamped to zero
    pub fn angular_frequencies(&self) -> DVector<f64> {
        self.eigenvalues.map(|value| value.max(0.0).sqrt())
    }

    /// Frequencies in cm^-1 assuming kcal/mol, Ångström and amu. Negative eigenvalues
    /// (imaginary frequencies) are reported as negative wavenumbers.
    pub fn wavenumbers(&self) -> DVector<f64> {
        self.eigenvalues
            .map(|value| value.signum() * value.abs().sqrt() * WAVENUMBER_CONVERSION)
    }

    /// The mass-weighted eigenvector of mode `mode`
    pub fn mode(&self, mode: usize) -> Result<DVectorView<'_, f64>> {
        if mode >= self.len() {
            return Err(Error::ModeOutOfRange {
                mode,
                n_modes: self.len(),
            });
        }
        Ok(self.eigenvectors.column(mode))
    }

    /// One line per mode: the 1-based mode number and its eigenvalue
    pub fn freq_to_str(&self) -> String {
        let mut output = String::new();
        for (index, value) in self.eigenvalues.iter().enumerate() {
            // writing to a String can't fail
            let _ = writeln!(output, "{:4} {value:20.10}", index + 1);
        }
        output
    }

    /// Cartesian displacement of mode `mode`, normalized so that the atom moving the
    /// most is displaced by 1.
    pub fn cartesian_displacement(
        &self,
        mode: usize,
        inv_sqrt_mass: &DMatrix<f64>,
    ) -> Result<DVector<f64>> {
        let vector = self.mode(mode)?;
        if inv_sqrt_mass.shape() != (vector.len(), vector.len()) {
            return Err(Error::DimensionMismatch {
                expected: vector.len(),
                found: inv_sqrt_mass.nrows(),
            });
        }

        let displacement = inv_sqrt_mass * vector;
        let largest = util::flat_to_coords(&displacement)
            .iter()
            .map(|d| d.norm())
            .fold(0.0, f64::max);

        Ok(if largest > 0.0 {
            displacement / largest
        } else {
            displacement
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ModeTrajectoryOptions {
    /// number of frames of one full oscillation
    pub num_frames: usize,
    /// displacement of the atom moving the most at the turning points, in Ångström
    pub peak_scale_factor: f64,
}

impl ModeTrajectoryOptions {
    pub fn validate(&self) -> Result<()> {
        if self.num_frames == 0 {
            return Err(Error::InvalidSetting {
                setting: "number of frames",
                value: 0.0,
            });
        }
        if !self.peak_scale_factor.is_finite() {
            return Err(Error::InvalidSetting {
                setting: "peak scale factor",
                value: self.peak_scale_factor,
            });
        }
        Ok(())
    }
}

impl Default for ModeTrajectoryOptions {
    fn default() -> Self {
        Self {
            num_frames: 20,
            peak_scale_factor: 1.0,
        }
    }
}

/// Animates one oscillation of mode `mode_number` around `initial_coords`: frame `t` is
/// `x0 + sin(2 pi t / num_frames) * peak_scale_factor * d` with `d` the normalized
/// Cartesian displacement of the mode.
pub fn generate_mode_trajectory(
    normal_modes: &NormalModes,
    inv_sqrt_mass: &DMatrix<f64>,
    initial_coords: &DVector<f64>,
    mode_number: usize,
    options: &ModeTrajectoryOptions,
) -> Result<Trajectory> {
    options.validate()?;
    let displacement = normal_modes.cartesian_displacement(mode_number, inv_sqrt_mass)?;
    if initial_coords.len() != displacement.len() {
        return Err(Error::DimensionMismatch {
            expected: displacement.len(),
            found: initial_coords.len(),
        });
    }

    let displacement = displacement * options.peak_scale_factor;
    let trajectory = (0..options.num_frames)
        .map(|t| {
            let phase = (2.0 * PI * t as f64 / options.num_frames as f64).sin();
            Frame::from_flat(&(initial_coords + &displacement * phase))
        })
        .collect();

    Ok(trajectory)
}

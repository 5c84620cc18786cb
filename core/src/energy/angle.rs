use nalgebra::DVector;

use super::EnergyTerm;
use crate::{
    terms::{atom_index, Angle},
    util, Result,
};

/// Below this, `sin(theta)` is treated as zero and the angle contributes no gradient.
const DEGENERATE_SIN: f64 = 1e-8;

#[derive(Clone, Debug)]
struct AngleTerm {
    i: usize,
    vertex: usize,
    k: usize,
    force_constant: f64,
    theta_0: f64,
}

/// Harmonic angle bending, `E = 1/2 k (theta - theta_0)^2`
#[derive(Clone, Debug)]
pub struct AngleEnergy {
    terms: Vec<AngleTerm>,
}

impl AngleEnergy {
    pub fn new(angles: impl IntoIterator<Item = Angle>, num_atoms: usize) -> Result<Self> {
        let terms = angles
            .into_iter()
            .map(|angle| {
                Ok(AngleTerm {
                    i: atom_index(angle.serial_1, num_atoms)?,
                    vertex: atom_index(angle.serial_2, num_atoms)?,
                    k: atom_index(angle.serial_3, num_atoms)?,
                    force_constant: angle.force_constant,
                    theta_0: angle.theta_0,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { terms })
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl AngleTerm {
    fn theta(&self, coords: &DVector<f64>) -> f64 {
        let vertex = util::position(coords, self.vertex);
        util::compute_angle(
            &(util::position(coords, self.i) - vertex),
            &(util::position(coords, self.k) - vertex),
        )
    }
}

impl EnergyTerm for AngleEnergy {
    fn name(&self) -> &str {
        "angles"
    }

    fn energy(&self, coords: &DVector<f64>) -> f64 {
        self.terms
            .iter()
            .map(|term| 0.5 * term.force_constant * (term.theta(coords) - term.theta_0).powi(2))
            .sum()
    }

    fn gradient(&self, coords: &DVector<f64>) -> DVector<f64> {
        let mut gradient = DVector::zeros(coords.len());

        for term in &self.terms {
            let vertex = util::position(coords, term.vertex);
            let a = util::position(coords, term.i) - vertex;
            let b = util::position(coords, term.k) - vertex;
            let (length_a, length_b) = (a.norm(), b.norm());
            if length_a == 0.0 || length_b == 0.0 {
                continue;
            }

            let (a, b) = (a / length_a, b / length_b);
            let theta = util::compute_angle(&a, &b);
            let sin_theta = theta.sin();
            if sin_theta < DEGENERATE_SIN {
                continue;
            }
            let cos_theta = theta.cos();

            let prefactor = -term.force_constant * (theta - term.theta_0) / sin_theta;
            let g_i = prefactor * (b - cos_theta * a) / length_a;
            let g_k = prefactor * (a - cos_theta * b) / length_b;

            util::add_to_atom(&mut gradient, term.i, &g_i);
            util::add_to_atom(&mut gradient, term.k, &g_k);
            util::add_to_atom(&mut gradient, term.vertex, &-(g_i + g_k));
        }

        gradient
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;
    use nalgebra::DVector;

    use super::AngleEnergy;
    use crate::{energy::EnergyTerm, terms::Angle, util};

    const FORCE_CONSTANT: f64 = 64.71;

    fn water_like(theta_0: f64) -> AngleEnergy {
        AngleEnergy::new(
            vec![Angle {
                serial_1: 1,
                serial_2: 2,
                serial_3: 3,
                force_constant: FORCE_CONSTANT,
                theta_0: util::deg2rad(theta_0),
            }],
            3,
        )
        .unwrap()
    }

    /// atom 1 at -x, vertex at the origin, atom 3 at unit distance enclosing `theta`
    fn coords_for(theta: f64) -> DVector<f64> {
        DVector::from_vec(vec![
            -1.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            (PI - theta).cos(),
            (PI - theta).sin(),
            0.0,
        ])
    }

    #[test]
    fn computes_correct_energy() {
        let theta = util::deg2rad(112.0);
        let expected = 0.5 * FORCE_CONSTANT * (theta - util::deg2rad(109.5)).powi(2);

        assert_relative_eq!(
            water_like(109.5).energy(&coords_for(theta)),
            expected,
            epsilon = 1e-12
        );
        assert_relative_eq!(water_like(112.0).energy(&coords_for(theta)), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn computes_correct_gradient() {
        let energy = water_like(109.5);
        let coords = coords_for(util::deg2rad(112.0));

        let gradient = energy.gradient(&coords);
        // the angle is too wide, moving atom 1 toward +y closes it
        assert!(gradient[1] < 0.0);
        // translation invariance
        for dim in 0..3 {
            assert_relative_eq!(
                gradient[dim] + gradient[dim + 3] + gradient[dim + 6],
                0.0,
                epsilon = 1e-12
            );
        }

        crate::energy::tests::check_gradient(&energy, &coords);
    }

    #[test]
    fn collinear_angle_has_no_gradient() {
        let energy = water_like(109.5);
        let coords = coords_for(PI);

        assert_relative_eq!(
            energy.energy(&coords),
            0.5 * FORCE_CONSTANT * (PI - util::deg2rad(109.5)).powi(2),
            epsilon = 1e-9
        );
        assert!(energy.gradient(&coords).iter().all(|&g| g == 0.0));
    }
}

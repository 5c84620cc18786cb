use itertools::Itertools;
use nalgebra::DVector;

use super::EnergyTerm;
use crate::{terms::VdwParameters, util};

/// Lennard-Jones 12-6 potential over every atom pair,
/// `E = eps [ (r_m / r)^12 - 2 (r_m / r)^6 ]`
#[derive(Clone, Debug)]
pub struct VdwEnergy {
    parameters: VdwParameters,
}

impl VdwEnergy {
    pub fn new(parameters: VdwParameters) -> Self {
        Self { parameters }
    }

    pub fn set_well_distance(&mut self, well_distance: f64) {
        self.parameters.well_distance = well_distance;
    }

    pub fn set_well_depth(&mut self, well_depth: f64) {
        self.parameters.well_depth = well_depth;
    }

    fn pairs(n_atoms: usize) -> impl Iterator<Item = (usize, usize)> {
        (0..n_atoms).tuple_combinations()
    }
}

impl EnergyTerm for VdwEnergy {
    fn name(&self) -> &str {
        "vdw"
    }

    fn energy(&self, coords: &DVector<f64>) -> f64 {
        let VdwParameters {
            well_distance,
            well_depth,
        } = self.parameters;

        Self::pairs(coords.len() / 3)
            .map(|(i, j)| {
                let r = (util::position(coords, j) - util::position(coords, i)).norm();
                let ratio6 = (well_distance / r).powi(6);
                well_depth * (ratio6 * ratio6 - 2.0 * ratio6)
            })
            .sum()
    }

    fn gradient(&self, coords: &DVector<f64>) -> DVector<f64> {
        let VdwParameters {
            well_distance,
            well_depth,
        } = self.parameters;
        let mut gradient = DVector::zeros(coords.len());

        for (i, j) in Self::pairs(coords.len() / 3) {
            let separation = util::position(coords, j) - util::position(coords, i);
            let r = separation.norm();
            let ratio6 = (well_distance / r).powi(6);

            let de_dr = 12.0 * well_depth / r * (ratio6 - ratio6 * ratio6);
            let g_j = de_dr / r * separation;
            util::add_to_atom(&mut gradient, j, &g_j);
            util::add_to_atom(&mut gradient, i, &-g_j);
        }

        gradient
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    use super::VdwEnergy;
    use crate::{energy::EnergyTerm, terms::VdwParameters};

    const WELL_DISTANCE: f64 = 2.6;
    const WELL_DEPTH: f64 = 0.1;

    fn vdw() -> VdwEnergy {
        let mut vdw = VdwEnergy::new(VdwParameters {
            well_distance: 1.0,
            well_depth: 1.0,
        });
        vdw.set_well_distance(WELL_DISTANCE);
        vdw.set_well_depth(WELL_DEPTH);
        vdw
    }

    fn dimer(distance: f64) -> DVector<f64> {
        DVector::from_vec(vec![0.0, 0.0, 0.0, distance, 0.0, 0.0])
    }

    #[test]
    fn energy_minimum_at_well_distance() {
        assert_relative_eq!(vdw().energy(&dimer(WELL_DISTANCE)), -WELL_DEPTH);
        assert!(vdw().energy(&dimer(2.0)) > -WELL_DEPTH);
        assert!(vdw().energy(&dimer(3.5)) > -WELL_DEPTH);
    }

    #[test]
    fn gradient_vanishes_at_well_distance() {
        let gradient = vdw().gradient(&dimer(WELL_DISTANCE));
        for g in gradient.iter() {
            assert_relative_eq!(*g, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let coords = DVector::from_vec(vec![
            0.0, 0.0, 0.0, 2.9, 0.1, 0.0, 1.2, 2.4, 0.3, -1.0, 1.5, 2.2,
        ]);
        crate::energy::tests::check_gradient(&vdw(), &coords);
    }
}

use nalgebra::DVector;

use super::EnergyTerm;
use crate::{
    terms::{atom_index, Bond},
    util, Result,
};

#[derive(Clone, Debug)]
struct BondTerm {
    i: usize,
    j: usize,
    force_constant: f64,
    r_0: f64,
}

/// Harmonic bond stretching, `E = 1/2 k (r - r_0)^2`
#[derive(Clone, Debug)]
pub struct BondEnergy {
    terms: Vec<BondTerm>,
}

impl BondEnergy {
    pub fn new(bonds: impl IntoIterator<Item = Bond>, num_atoms: usize) -> Result<Self> {
        let terms = bonds
            .into_iter()
            .map(|bond| {
                Ok(BondTerm {
                    i: atom_index(bond.serial_1, num_atoms)?,
                    j: atom_index(bond.serial_2, num_atoms)?,
                    force_constant: bond.force_constant,
                    r_0: bond.r_0,
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

impl EnergyTerm for BondEnergy {
    fn name(&self) -> &str {
        "bonds"
    }

    fn energy(&self, coords: &DVector<f64>) -> f64 {
        self.terms
            .iter()
            .map(|term| {
                let r = (util::position(coords, term.j) - util::position(coords, term.i)).norm();
                0.5 * term.force_constant * (r - term.r_0).powi(2)
            })
            .sum()
    }

    fn gradient(&self, coords: &DVector<f64>) -> DVector<f64> {
        let mut gradient = DVector::zeros(coords.len());

        for term in &self.terms {
            let bond_vector = util::position(coords, term.j) - util::position(coords, term.i);
            let r = bond_vector.norm();
            if r == 0.0 {
                continue;
            }

            // dE/dx_j; atom i gets the opposite
            let g_j = term.force_constant * (r - term.r_0) / r * bond_vector;
            util::add_to_atom(&mut gradient, term.j, &g_j);
            util::add_to_atom(&mut gradient, term.i, &-g_j);
        }

        gradient
    }
}

use std::path::Path;

use nalgebra::{DMatrix, DVector, Vector3};

use crate::{atom::Atom, error::Error, parsers, util, Result};

/// An ordered collection of atoms. The order defines the layout of the flat `3N`
/// coordinate vectors used throughout the crate.
#[derive(Clone, Debug)]
pub struct Universe {
    pub(crate) atoms: Vec<Atom>,
}

impl Universe {
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// `N x 3` coordinate matrix, one row per atom
    pub fn coords(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.len(), 3, |i, j| self.atoms[i].position[j])
    }

    /// Coordinates flattened to `(x1, y1, z1, x2, ...)`
    pub fn flat_coords(&self) -> DVector<f64> {
        let positions = self.atoms.iter().map(|atom| atom.position).collect::<Vec<_>>();
        util::coords_to_flat(&positions)
    }

    pub fn masses(&self) -> DVector<f64> {
        DVector::from_iterator(self.len(), self.atoms.iter().map(|atom| atom.mass))
    }

    /// The `3N x 3N` diagonal matrix holding `1 / sqrt(m)` three times per atom.
    pub fn inv_sqrt_mass_matrix(&self) -> DMatrix<f64> {
        let diagonal = DVector::from_iterator(
            3 * self.len(),
            self.atoms
                .iter()
                .flat_map(|atom| std::iter::repeat(atom.mass.sqrt().recip()).take(3)),
        );
        DMatrix::from_diagonal(&diagonal)
    }
}

/// Collects atoms one by one (or from a PDB file) before freezing them into a [`Universe`].
#[derive(Default)]
pub struct UniverseBuilder {
    atoms: Vec<Atom>,
}

impl UniverseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an atom with default residue information. Serial numbers start at 1 and
    /// follow insertion order.
    pub fn add_atom(&mut self, position: Vector3<f64>, mass: f64, charge: f64, radius: f64) {
        let serial = self.atoms.len() + 1;
        self.atoms
            .push(Atom::new(position, mass, charge, radius).with_serial(serial));
    }

    /// Adds fully specified atoms; a serial number of 0 is replaced by the running index.
    pub fn add_atoms(&mut self, atoms: impl IntoIterator<Item = Atom>) {
        for mut atom in atoms {
            if atom.serial == 0 {
                atom.serial = self.atoms.len() + 1;
            }
            self.atoms.push(atom);
        }
    }

    pub fn load_atoms_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let atoms = parsers::load_pdb_atoms(path)?;
        self.add_atoms(atoms);
        Ok(())
    }

    pub fn build(self) -> Result<Universe> {
        if let Some(atom) = self
            .atoms
            .iter()
            .find(|atom| atom.mass.is_nan() || atom.mass <= 0.0)
        {
            return Err(Error::InvalidMass {
                serial: atom.serial,
                mass: atom.mass,
            });
        }

        log::debug!("built universe with {} atoms", self.atoms.len());
        Ok(Universe { atoms: self.atoms })
    }
}

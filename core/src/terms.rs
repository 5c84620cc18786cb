//! Parameter records for the terms of the potential energy surface, as read from a
//! structure file. Atoms are referred to by their 1-based serial number.

use crate::{Error, Result};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bond {
    pub serial_1: usize,
    pub serial_2: usize,
    pub force_constant: f64,
    /// equilibrium bond length
    pub r_0: f64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Angle {
    pub serial_1: usize,
    /// the vertex of the angle
    pub serial_2: usize,
    pub serial_3: usize,
    pub force_constant: f64,
    /// equilibrium angle in radians
    pub theta_0: f64,
}

/// Lennard-Jones parameters shared by every atom pair.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VdwParameters {
    /// distance of the potential minimum
    pub well_distance: f64,
    pub well_depth: f64,
}

/// Converts a serial number into an index into the universe
pub(crate) fn atom_index(serial: usize, n_atoms: usize) -> Result<usize> {
    if (1..=n_atoms).contains(&serial) {
        Ok(serial - 1)
    } else {
        Err(Error::SerialOutOfRange { serial, n_atoms })
    }
}

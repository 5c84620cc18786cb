use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use nalgebra::{DVector, Vector3};

use crate::{terms::Bond, universe::Universe, util, Error, Result};

/// Coordinates of every atom at one point of a trajectory.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub coords: Vec<Vector3<f64>>,
}

impl Frame {
    pub fn from_flat(flat: &DVector<f64>) -> Self {
        Self {
            coords: util::flat_to_coords(flat),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Trajectory {
    frames: Vec<Frame>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn add_frame(&mut self, coords: Vec<Vector3<f64>>) {
        self.frames.push(Frame { coords });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl FromIterator<Frame> for Trajectory {
    fn from_iter<T: IntoIterator<Item = Frame>>(iter: T) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

/// Writes `trajectory` as a multi-model PDB file. `CONNECT` records for `bonds` are only
/// written for the first frame.
pub fn save_trajectory_to_pdb(
    path: impl AsRef<Path>,
    trajectory: &Trajectory,
    universe: &Universe,
    bonds: &[Bond],
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| Error::io(path, source))?;
    let mut writer = BufWriter::new(file);

    write_trajectory_to_pdb(&mut writer, trajectory, universe, bonds)?;
    writer.flush().map_err(|source| Error::io(path, source))?;

    log::info!("wrote {} frames to {}", trajectory.len(), path.display());
    Ok(())
}

/// Writes fixed-width `ATOM` records. Coordinates must fit `%8.3f`, so they have to stay
/// within `-999.999..=9999.999`.
pub fn write_trajectory_to_pdb(
    writer: &mut impl Write,
    trajectory: &Trajectory,
    universe: &Universe,
    bonds: &[Bond],
) -> Result<()> {
    for (frame_number, frame) in trajectory.iter().enumerate() {
        if frame.coords.len() != universe.len() {
            return Err(Error::DimensionMismatch {
                expected: universe.len(),
                found: frame.coords.len(),
            });
        }

        writeln!(writer, "HEADER Coordinates at Frame {frame_number}")?;
        for (atom, position) in universe.atoms().iter().zip(&frame.coords) {
            writeln!(
                writer,
                "ATOM  {:5} {:>4} {:>3} {}{:4}    {:8.3}{:8.3}{:8.3}{:6.2}{:6.2}{:6.1}{:6.2}{:6.2} ",
                atom.serial(),
                atom.name(),
                atom.residue_name(),
                atom.chain_id(),
                atom.residue_number(),
                position.x,
                position.y,
                position.z,
                atom.charge(),
                0.0,
                atom.mass(),
                atom.radius(),
                atom.charge(),
            )?;
        }
        if frame_number == 0 {
            for bond in bonds {
                writeln!(writer, "CONNECT {} {}", bond.serial_1, bond.serial_2)?;
            }
        }
        writeln!(writer, "END")?;
    }

    Ok(())
}

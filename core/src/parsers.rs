//! Readers for the two whitespace separated input formats: a PDB-like atom file and the
//! structure file (SF) holding force field parameters.

use std::{fs, ops::Range, path::Path, str::FromStr};

use nalgebra::Vector3;

use crate::{
    atom::Atom,
    terms::{Angle, Bond, VdwParameters},
    util, Error, Result,
};

/// Columns of the fixed-width `ATOM` records written by
/// [`write_trajectory_to_pdb`](crate::trajectory::write_trajectory_to_pdb)
mod columns {
    use std::ops::Range;

    pub const SERIAL: Range<usize> = 6..11;
    pub const NAME: Range<usize> = 12..16;
    pub const RESIDUE_NAME: Range<usize> = 17..20;
    pub const CHAIN_ID: Range<usize> = 21..22;
    pub const RESIDUE_NUMBER: Range<usize> = 22..26;
    pub const X: Range<usize> = 30..38;
    pub const Y: Range<usize> = 38..46;
    pub const Z: Range<usize> = 46..54;
    pub const MASS: Range<usize> = 66..72;
    pub const RADIUS: Range<usize> = 72..78;
    pub const CHARGE: Range<usize> = 78..84;
}

const ATOM_FIELDS: usize = 14;

/// Parses every `ATOM` record of a PDB-like file. The expected layout is
///
/// ```text
/// ATOM serial name res_name chain_id res_num x y z _ _ mass radius charge
/// ATOM 1 C A A 1 -0.002 0.000 0.000 0.00 1.00 12.0 1.75 0.00
/// ```
///
/// Records with fewer fields are read by column instead, as written by
/// [`write_trajectory_to_pdb`](crate::trajectory::write_trajectory_to_pdb). There,
/// values that fill their column (`-150.000`, residue numbers above 999) run into
/// their neighbors.
pub fn parse_pdb_atoms(source: &str) -> Result<Vec<Atom>> {
    let mut atoms = Vec::new();

    for (line_number, line) in source.lines().enumerate() {
        let line_number = line_number + 1;
        let fields = line.split_whitespace().collect::<Vec<_>>();
        if fields.first() != Some(&"ATOM") {
            continue;
        }

        let atom = if fields.len() >= ATOM_FIELDS {
            whitespace_atom(&fields, line_number)?
        } else if line.len() >= columns::CHARGE.end {
            fixed_width_atom(line, line_number)?
        } else {
            return Err(Error::parse(
                line_number,
                format!("ATOM record needs {ATOM_FIELDS} fields, found {}", fields.len()),
            ));
        };
        atoms.push(atom);
    }

    log::debug!("parsed {} atoms", atoms.len());
    Ok(atoms)
}

fn whitespace_atom(fields: &[&str], line_number: usize) -> Result<Atom> {
    let position = Vector3::new(
        field(fields, 6, line_number)?,
        field(fields, 7, line_number)?,
        field(fields, 8, line_number)?,
    );
    let atom = Atom::new(
        position,
        field(fields, 11, line_number)?,
        field(fields, 13, line_number)?,
        field(fields, 12, line_number)?,
    )
    .with_serial(field(fields, 1, line_number)?)
    .with_name(fields[2])
    .with_residue(
        fields[3],
        field(fields, 5, line_number)?,
        fields[4].chars().next().unwrap_or(Atom::DEFAULT_CHAIN),
    );

    Ok(atom)
}

fn fixed_width_atom(line: &str, line_number: usize) -> Result<Atom> {
    let text = move |range: Range<usize>| {
        line.get(range.clone())
            .map(str::trim)
            .ok_or_else(|| Error::parse(line_number, format!("no ATOM column {range:?}")))
    };
    let value = move |range: Range<usize>| -> Result<f64> {
        let text = text(range)?;
        text.parse()
            .map_err(|_| Error::parse(line_number, format!("can't parse '{text}' of ATOM record")))
    };

    let serial = text(columns::SERIAL)?;
    let residue_number = text(columns::RESIDUE_NUMBER)?;
    let atom = Atom::new(
        Vector3::new(value(columns::X)?, value(columns::Y)?, value(columns::Z)?),
        value(columns::MASS)?,
        value(columns::CHARGE)?,
        value(columns::RADIUS)?,
    )
    .with_serial(serial.parse().map_err(|_| {
        Error::parse(line_number, format!("can't parse serial '{serial}' of ATOM record"))
    })?)
    .with_name(text(columns::NAME)?)
    .with_residue(
        text(columns::RESIDUE_NAME)?,
        residue_number.parse().map_err(|_| {
            Error::parse(
                line_number,
                format!("can't parse residue number '{residue_number}' of ATOM record"),
            )
        })?,
        text(columns::CHAIN_ID)?
            .chars()
            .next()
            .unwrap_or(Atom::DEFAULT_CHAIN),
    );

    Ok(atom)
}

pub fn load_pdb_atoms(path: impl AsRef<Path>) -> Result<Vec<Atom>> {
    parse_pdb_atoms(&read(path.as_ref())?)
}

/// The force field parameters of a structure file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructureFile {
    pub bonds: Vec<Bond>,
    pub angles: Vec<Angle>,
    /// Only the first `VDW` record of a file is used
    pub vdw: Option<VdwParameters>,
}

impl StructureFile {
    /// Parses `BOND i j k r_0`, `ANGLE i j k k_theta theta_0` (degrees) and
    /// `VDW well_distance well_depth` records. Anything else is ignored.
    pub fn parse(source: &str) -> Result<Self> {
        let mut structure = Self::default();

        for (line_number, fields) in records(source) {
            match fields[0] {
                "BOND" => {
                    expect_fields(&fields, 5, line_number)?;
                    structure.bonds.push(Bond {
                        serial_1: field(&fields, 1, line_number)?,
                        serial_2: field(&fields, 2, line_number)?,
                        force_constant: field(&fields, 3, line_number)?,
                        r_0: field(&fields, 4, line_number)?,
                    });
                }
                "ANGLE" => {
                    expect_fields(&fields, 6, line_number)?;
                    structure.angles.push(Angle {
                        serial_1: field(&fields, 1, line_number)?,
                        serial_2: field(&fields, 2, line_number)?,
                        serial_3: field(&fields, 3, line_number)?,
                        force_constant: field(&fields, 4, line_number)?,
                        theta_0: util::deg2rad(field(&fields, 5, line_number)?),
                    });
                }
                "VDW" if structure.vdw.is_none() => {
                    expect_fields(&fields, 3, line_number)?;
                    structure.vdw = Some(VdwParameters {
                        well_distance: field(&fields, 1, line_number)?,
                        well_depth: field(&fields, 2, line_number)?,
                    });
                }
                _ => {}
            }
        }

        log::debug!(
            "parsed {} bonds, {} angles, vdw parameters: {:?}",
            structure.bonds.len(),
            structure.angles.len(),
            structure.vdw
        );
        Ok(structure)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(&read(path.as_ref())?)
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::io(path, source))
}

/// Non-empty, non-comment lines split on whitespace, with 1-based line numbers
fn records(source: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    source
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.split_whitespace().collect::<Vec<_>>()))
        .filter(|(_, fields)| fields.first().is_some_and(|first| !first.starts_with('#')))
}

fn expect_fields(fields: &[&str], count: usize, line: usize) -> Result<()> {
    if fields.len() < count {
        return Err(Error::parse(
            line,
            format!("{} record needs {count} fields, found {}", fields[0], fields.len()),
        ));
    }
    Ok(())
}

fn field<T: FromStr>(fields: &[&str], index: usize, line: usize) -> Result<T> {
    fields[index].parse().map_err(|_| {
        Error::parse(
            line,
            format!("can't parse field {index} ('{}') of {} record", fields[index], fields[0]),
        )
    })
}

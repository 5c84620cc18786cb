use nalgebra::Vector3;

/// Represents a single atom of a [`Universe`](crate::universe::Universe), including the
/// bookkeeping fields needed to write it back out as a PDB record.
#[derive(Clone, Debug, PartialEq)]
pub struct Atom {
    pub(crate) position: Vector3<f64>,
    pub(crate) mass: f64,
    pub(crate) charge: f64,
    pub(crate) radius: f64,
    pub(crate) serial: usize,
    pub(crate) residue_number: i32,
    pub(crate) name: String,
    pub(crate) residue_name: String,
    pub(crate) chain_id: char,
}

impl Atom {
    pub const DEFAULT_NAME: &'static str = "LJ";
    pub const DEFAULT_RESIDUE: &'static str = "A";
    pub const DEFAULT_CHAIN: char = 'A';

    /// Creates an atom with default residue information. The serial number is filled in
    /// by the [`UniverseBuilder`](crate::universe::UniverseBuilder) if not set explicitly.
    pub fn new(position: Vector3<f64>, mass: f64, charge: f64, radius: f64) -> Self {
        Self {
            position,
            mass,
            charge,
            radius,
            serial: 0,
            residue_number: 1,
            name: Self::DEFAULT_NAME.to_owned(),
            residue_name: Self::DEFAULT_RESIDUE.to_owned(),
            chain_id: Self::DEFAULT_CHAIN,
        }
    }

    pub fn with_serial(mut self, serial: usize) -> Self {
        self.serial = serial;
        self
    }

    pub fn with_residue(mut self, name: impl Into<String>, number: i32, chain_id: char) -> Self {
        self.residue_name = name.into();
        self.residue_number = number;
        self.chain_id = chain_id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn serial(&self) -> usize {
        self.serial
    }

    pub fn residue_number(&self) -> i32 {
        self.residue_number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn residue_name(&self) -> &str {
        &self.residue_name
    }

    pub fn chain_id(&self) -> char {
        self.chain_id
    }
}

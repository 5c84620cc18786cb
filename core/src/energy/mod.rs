mod angle;
mod bond;
mod vdw;

use std::collections::HashMap;

use nalgebra::DVector;

pub use angle::AngleEnergy;
pub use bond::BondEnergy;
pub use vdw::VdwEnergy;

use crate::{Error, Result};

/// One additive contribution to the potential energy surface. Coordinates are always the
/// flat `3N` vector of a [`Universe`](crate::universe::Universe).
pub trait EnergyTerm: Send + Sync {
    fn name(&self) -> &str;

    fn energy(&self, coords: &DVector<f64>) -> f64;

    /// Analytic gradient of [`EnergyTerm::energy`] with respect to the coordinates
    fn gradient(&self, coords: &DVector<f64>) -> DVector<f64>;
}

/// Collects named energy terms so that several energy functions can be assembled from
/// different subsets of them.
#[derive(Default)]
pub struct EnergyFunctionBuilder {
    terms: HashMap<String, Box<dyn EnergyTerm>>,
}

impl EnergyFunctionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `term` under `name`, replacing any term previously registered under it.
    pub fn add_term(
        &mut self,
        name: impl Into<String>,
        term: impl EnergyTerm + 'static,
    ) -> &mut Self {
        self.terms.insert(name.into(), Box::new(term));
        self
    }

    pub fn has_term(&self, name: &str) -> bool {
        self.terms.contains_key(name)
    }

    /// Consumes the builder, keeping only the terms in `names` (in that order).
    pub fn build<S: AsRef<str>>(mut self, names: &[S]) -> Result<EnergyFunction> {
        let mut terms = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let term = self
                .terms
                .remove(name)
                .ok_or_else(|| Error::UnknownTerm(name.to_owned()))?;
            terms.push((name.to_owned(), term));
        }

        log::debug!(
            "energy function with terms {:?}",
            terms.iter().map(|(name, _)| name).collect::<Vec<_>>()
        );
        Ok(EnergyFunction { terms })
    }
}

/// The sum of a set of energy terms.
pub struct EnergyFunction {
    terms: Vec<(String, Box<dyn EnergyTerm>)>,
}

impl EnergyFunction {
    pub fn term_names(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(name, _)| name.as_str())
    }

    /// Energy of every term on its own, in selection order
    pub fn energy_breakdown(&self, coords: &DVector<f64>) -> Vec<(&str, f64)> {
        self.terms
            .iter()
            .map(|(name, term)| (name.as_str(), term.energy(coords)))
            .collect()
    }
}

impl EnergyTerm for EnergyFunction {
    fn name(&self) -> &str {
        "total"
    }

    fn energy(&self, coords: &DVector<f64>) -> f64 {
        self.terms.iter().map(|(_, term)| term.energy(coords)).sum()
    }

    fn gradient(&self, coords: &DVector<f64>) -> DVector<f64> {
        self.terms
            .iter()
            .fold(DVector::zeros(coords.len()), |sum, (_, term)| {
                sum + term.gradient(coords)
            })
    }
}

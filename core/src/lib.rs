//! Classical molecular-mechanics normal-mode analysis.
//!
//! A [`Universe`] of atoms and the force field parameters of a structure file are turned
//! into an [`EnergyFunction`](energy::EnergyFunction). The structure can be relaxed with
//! the [`BfgsMinimizer`], after which [`nma`] computes the numerical Hessian, mass-weights
//! it and diagonalizes the resulting force constant matrix. Every normal mode can be
//! animated and written out as a PDB trajectory.

pub mod atom;
pub mod config;
pub mod energy;
mod error;
pub mod job;
pub mod minimize;
pub mod nma;
pub mod parsers;
pub mod terms;
pub mod trajectory;
pub mod universe;
pub mod util;

pub use error::{Error, Result};
pub use minimize::BfgsMinimizer;
pub use universe::{Universe, UniverseBuilder};

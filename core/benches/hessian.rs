use std::{error::Error, path::Path};

use criterion::{criterion_group, criterion_main, Criterion};
use sardine::{
    energy::{AngleEnergy, BondEnergy, EnergyFunction, EnergyFunctionBuilder, VdwEnergy},
    nma,
    parsers::StructureFile,
    Universe, UniverseBuilder,
};

fn ethane() -> Result<(Universe, EnergyFunction), Box<dyn Error>> {
    let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("../data/ethane");

    let mut builder = UniverseBuilder::new();
    builder.load_atoms_from_file(data.join("C2H6.pdb"))?;
    let universe = builder.build()?;

    let structure = StructureFile::load(data.join("C2H6.sf"))?;
    let mut terms = EnergyFunctionBuilder::new();
    terms
        .add_term("bonds", BondEnergy::new(structure.bonds, universe.len())?)
        .add_term("angles", AngleEnergy::new(structure.angles, universe.len())?)
        .add_term("vdw", VdwEnergy::new(structure.vdw.ok_or("no vdw parameters")?));

    Ok((universe, terms.build(&["bonds", "angles", "vdw"])?))
}

fn bench_hessian(c: &mut Criterion) {
    let (universe, energy) = ethane().unwrap();
    let coords = universe.flat_coords();

    c.bench_function("Hessian from energy (ethane)", |b| {
        b.iter(|| nma::compute_hessian(&energy, &coords, nma::DEFAULT_HESSIAN_STEP))
    });
    c.bench_function("Hessian from gradient (ethane)", |b| {
        b.iter(|| nma::compute_hessian_from_gradient(&energy, &coords, nma::DEFAULT_HESSIAN_STEP))
    });
}

fn bench_normal_modes(c: &mut Criterion) {
    let (universe, energy) = ethane().unwrap();
    let hessian =
        nma::compute_hessian(&energy, &universe.flat_coords(), nma::DEFAULT_HESSIAN_STEP).unwrap();
    let force_constants =
        nma::compute_force_constant_matrix(&hessian, &universe.inv_sqrt_mass_matrix()).unwrap();

    c.bench_function("Normal modes (ethane)", |b| {
        b.iter(|| nma::compute_normal_modes(force_constants.clone(), true))
    });
}

criterion_group!(benches, bench_hessian, bench_normal_modes);
criterion_main!(benches);

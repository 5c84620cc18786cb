use std::{fs, path::PathBuf};

use nalgebra::DVector;

use crate::{
    config::{HessianMethod, JobConfig, MinimizeConfig},
    energy::{AngleEnergy, BondEnergy, EnergyFunction, EnergyFunctionBuilder, VdwEnergy},
    minimize::{BfgsMinimizer, MinimizationOutput},
    nma::{self, ModeTrajectoryOptions, NormalModes},
    parsers::StructureFile,
    trajectory,
    universe::{Universe, UniverseBuilder},
    Error, Result,
};

pub const MINIMIZATION_FILE: &str = "minimization.pdb";
pub const EIGENVALUES_FILE: &str = "eigen_values.txt";

/// A loaded job: the universe, its force field parameters and the selected energy function.
pub struct Job {
    config: JobConfig,
    universe: Universe,
    structure: StructureFile,
    energy: EnergyFunction,
}

#[derive(Debug)]
#[non_exhaustive]
pub struct JobOutput {
    pub minimization: Option<MinimizationOutput>,
    pub normal_modes: NormalModes,
    /// every file written by the job
    pub files: Vec<PathBuf>,
}

impl Job {
    pub fn load(config: JobConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = UniverseBuilder::new();
        builder.load_atoms_from_file(&config.structure)?;
        let universe = builder.build()?;
        let structure = StructureFile::load(&config.parameters)?;

        let energy = build_energy_function(&structure, universe.len(), &config.terms)?;
        log::info!(
            "loaded {} atoms, {} bonds, {} angles from {} and {}",
            universe.len(),
            structure.bonds.len(),
            structure.angles.len(),
            config.structure.display(),
            config.parameters.display()
        );

        Ok(Self {
            config,
            universe,
            structure,
            energy,
        })
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn energy(&self) -> &EnergyFunction {
        &self.energy
    }

    /// Minimizes the input structure. With `save_trajectory` the path is written to
    /// `minimization.pdb` in the output directory.
    pub fn minimize(
        &self,
        settings: &MinimizeConfig,
    ) -> Result<(MinimizationOutput, Option<PathBuf>)> {
        let minimizer = BfgsMinimizer::from(settings);
        let output = minimizer.run_minimization(
            &self.energy,
            &self.universe.flat_coords(),
            settings.save_trajectory,
        );

        let file = match &output.trajectory {
            Some(frames) => {
                let path = self.output_path(MINIMIZATION_FILE)?;
                trajectory::save_trajectory_to_pdb(
                    &path,
                    frames,
                    &self.universe,
                    &self.structure.bonds,
                )?;
                Some(path)
            }
            None => None,
        };

        Ok((output, file))
    }

    /// Hessian, force constant matrix and normal modes at `coords`
    pub fn normal_modes(&self, coords: &DVector<f64>) -> Result<NormalModes> {
        let step = self.config.hessian.step;
        let hessian = match self.config.hessian.method {
            HessianMethod::Energy => nma::compute_hessian(&self.energy, coords, step)?,
            HessianMethod::Gradient => {
                nma::compute_hessian_from_gradient(&self.energy, coords, step)?
            }
        };
        let force_constants =
            nma::compute_force_constant_matrix(&hessian, &self.universe.inv_sqrt_mass_matrix())?;

        nma::compute_normal_modes(force_constants, self.config.modes.discard_trans_and_rot)
    }

    /// Writes the eigenvalue listing and, if enabled, one trajectory per mode.
    pub fn write_modes(
        &self,
        normal_modes: &NormalModes,
        coords: &DVector<f64>,
    ) -> Result<Vec<PathBuf>> {
        let eigenvalues = self.output_path(EIGENVALUES_FILE)?;
        fs::write(&eigenvalues, normal_modes.freq_to_str())
            .map_err(|source| Error::io(&eigenvalues, source))?;
        let mut files = vec![eigenvalues];

        if self.config.modes.write_trajectories {
            let options = ModeTrajectoryOptions::from(&self.config.modes);
            let inv_sqrt_mass = self.universe.inv_sqrt_mass_matrix();

            for mode in 0..normal_modes.len() {
                let frames = nma::generate_mode_trajectory(
                    normal_modes,
                    &inv_sqrt_mass,
                    coords,
                    mode,
                    &options,
                )?;
                let file_name = format!("{}_mode{:02}.pdb", self.config.prefix, mode + 1);
                let path = self.output_path(&file_name)?;
                trajectory::save_trajectory_to_pdb(
                    &path,
                    &frames,
                    &self.universe,
                    &self.structure.bonds,
                )?;
                files.push(path);
            }
        }

        Ok(files)
    }

    /// Optional minimization followed by the normal-mode analysis of the resulting structure.
    pub fn run(&self) -> Result<JobOutput> {
        let mut files = Vec::new();

        let (minimization, coords) = match &self.config.minimize {
            Some(settings) => {
                let (output, file) = self.minimize(settings)?;
                files.extend(file);
                let coords = output.coords.clone();
                (Some(output), coords)
            }
            None => (None, self.universe.flat_coords()),
        };

        let normal_modes = self.normal_modes(&coords)?;
        log::info!(
            "computed {} normal modes, eigenvalues {:?}",
            normal_modes.len(),
            normal_modes.frequencies().as_slice()
        );
        files.extend(self.write_modes(&normal_modes, &coords)?);

        Ok(JobOutput {
            minimization,
            normal_modes,
            files,
        })
    }

    fn output_path(&self, file_name: &str) -> Result<PathBuf> {
        let dir = &self.config.output_dir;
        fs::create_dir_all(dir).map_err(|source| Error::io(dir, source))?;
        Ok(dir.join(file_name))
    }
}

fn build_energy_function<S: AsRef<str>>(
    structure: &StructureFile,
    n_atoms: usize,
    terms: &[S],
) -> Result<EnergyFunction> {
    let mut builder = EnergyFunctionBuilder::new();
    let mut selected = Vec::with_capacity(terms.len());

    for term in terms {
        let term = term.as_ref();
        if builder.has_term(term) {
            continue;
        }
        selected.push(term);

        match term {
            "bonds" => {
                let bonds = BondEnergy::new(structure.bonds.iter().copied(), n_atoms)?;
                builder.add_term(term, bonds);
            }
            "angles" => {
                let angles = AngleEnergy::new(structure.angles.iter().copied(), n_atoms)?;
                builder.add_term(term, angles);
            }
            "vdw" => {
                let parameters = structure
                    .vdw
                    .ok_or_else(|| Error::MissingParameters(term.to_owned()))?;
                builder.add_term(term, VdwEnergy::new(parameters));
            }
            _ => return Err(Error::UnknownTerm(term.to_owned())),
        }
    }

    builder.build(&selected)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use approx::assert_relative_eq;

    use super::{Job, EIGENVALUES_FILE, MINIMIZATION_FILE};
    use crate::{
        config::{HessianMethod, JobConfig, MinimizeConfig},
        parsers, util, Error,
    };

    fn data(file: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../data").join(file)
    }

    fn triatomic_job(structure: &str, output_dir: &Path) -> JobConfig {
        let mut config = JobConfig::new(data(structure), data("triatomic/triatomic.sf"));
        config.terms = vec!["bonds".to_owned()];
        config.output_dir = output_dir.to_owned();
        config.prefix = "triatomic".to_owned();
        config
    }

    #[test]
    fn minimizes_and_writes_mode_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = triatomic_job("triatomic/triatomic_stretched.pdb", dir.path());
        config.minimize = Some(MinimizeConfig::default());
        config.modes.peak_scale_factor = 0.5;

        let output = Job::load(config).unwrap().run().unwrap();

        let minimization = output.minimization.unwrap();
        assert!(minimization.converged);
        assert_relative_eq!(minimization.energy, 0.0, epsilon = 1e-10);

        let frequencies = output.normal_modes.frequencies();
        assert_eq!(frequencies.len(), 3);
        assert_relative_eq!(frequencies[1], 0.1, epsilon = 1e-5);
        assert_relative_eq!(frequencies[2], 0.3, epsilon = 1e-5);

        let names = output
            .files
            .iter()
            .map(|path| path.file_name().unwrap().to_str().unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                MINIMIZATION_FILE,
                EIGENVALUES_FILE,
                "triatomic_mode01.pdb",
                "triatomic_mode02.pdb",
                "triatomic_mode03.pdb",
            ]
        );

        let eigenvalues = std::fs::read_to_string(dir.path().join(EIGENVALUES_FILE)).unwrap();
        assert_eq!(eigenvalues.lines().count(), 3);

        // every frame of a mode trajectory is a complete set of atoms
        let mode = std::fs::read_to_string(dir.path().join("triatomic_mode03.pdb")).unwrap();
        assert_eq!(mode.matches("HEADER").count(), 20);
        assert_eq!(parsers::parse_pdb_atoms(&mode).unwrap().len(), 3 * 20);
        assert_eq!(mode.matches("CONNECT").count(), 2);
    }

    #[test]
    fn gradient_hessian_gives_same_modes() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = triatomic_job("triatomic/triatomic.pdb", dir.path());
        config.hessian.method = HessianMethod::Gradient;
        config.hessian.step = 1e-5;
        config.modes.write_trajectories = false;

        let output = Job::load(config).unwrap().run().unwrap();

        assert!(output.minimization.is_none());
        assert_eq!(output.files.len(), 1);
        assert_relative_eq!(output.normal_modes.frequencies()[2], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn ethane_has_one_free_torsion() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = JobConfig::new(data("ethane/C2H6.pdb"), data("ethane/C2H6.sf"));
        config.terms = vec!["bonds".to_owned(), "angles".to_owned()];
        config.output_dir = dir.path().to_owned();
        config.minimize = Some(MinimizeConfig {
            save_trajectory: false,
            ..Default::default()
        });
        config.modes.write_trajectories = false;

        let job = Job::load(config).unwrap();
        assert_eq!(job.universe().len(), 8);

        let output = job.run().unwrap();
        assert!(output.minimization.unwrap().energy < 1e-8);

        // 3N - 6 vibrations; without a torsion term, rotating one methyl group is free
        let frequencies = output.normal_modes.frequencies();
        assert_eq!(frequencies.len(), 18);
        assert!(frequencies[0].abs() < 1e-2, "{frequencies}");
        assert!(frequencies.iter().skip(1).all(|&f| f > 1.0), "{frequencies}");
    }

    #[test]
    fn lennard_jones_trimer_relaxes_to_well_distance() {
        let dir = tempfile::tempdir().unwrap();
        let mut config =
            JobConfig::new(data("lennard_jones/LJ3.pdb"), data("lennard_jones/LJ3.sf"));
        config.terms = vec!["vdw".to_owned()];
        config.output_dir = dir.path().to_owned();
        config.minimize = Some(MinimizeConfig {
            max_iterations: 1000,
            ..Default::default()
        });

        let output = Job::load(config).unwrap().run().unwrap();

        let minimization = output.minimization.unwrap();
        assert!(minimization.converged);
        // every pair sits in the well of an equilateral triangle
        let positions = util::flat_to_coords(&minimization.coords);
        for distance in util::distance_vector(&positions).iter() {
            assert_relative_eq!(*distance, 2.6, epsilon = 1e-4);
        }
        assert_relative_eq!(minimization.energy, -0.3, epsilon = 1e-8);

        // three stretching modes of the triangle
        let frequencies = output.normal_modes.frequencies();
        assert_eq!(frequencies.len(), 3);
        assert!(frequencies.iter().all(|&f| f > 1e-3), "{frequencies}");
        assert_eq!(output.files.len(), 2 + 3);
    }

    #[test]
    fn bent_triatomic_opens_to_reference_angle() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = JobConfig::new(
            data("triatomic/triatomic_angle.pdb"),
            data("triatomic/triatomic_angle.sf"),
        );
        config.terms = vec!["bonds".to_owned(), "angles".to_owned()];
        config.output_dir = dir.path().to_owned();
        config.minimize = Some(MinimizeConfig::default());
        config.modes.write_trajectories = false;

        let output = Job::load(config).unwrap().run().unwrap();

        let minimization = output.minimization.unwrap();
        assert!(minimization.converged);
        let positions = util::flat_to_coords(&minimization.coords);
        let theta = util::compute_angle(
            &(positions[0] - positions[1]),
            &(positions[2] - positions[1]),
        );
        assert_relative_eq!(util::rad2deg(theta), 120.0, epsilon = 1e-3);
        assert_relative_eq!((positions[0] - positions[1]).norm(), 1.0, epsilon = 1e-4);
        assert_relative_eq!((positions[2] - positions[1]).norm(), 1.0, epsilon = 1e-4);

        // a bent molecule has 3N - 6 = 3 vibrations, all of them real
        let frequencies = output.normal_modes.frequencies();
        assert_eq!(frequencies.len(), 3);
        assert!(frequencies.iter().all(|&f| f > 1e-3), "{frequencies}");
    }

    #[test]
    fn zero_hessian_step_fails_before_writing_files() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("modes");
        let mut config = triatomic_job("triatomic/triatomic.pdb", &output_dir);
        config.hessian.step = 0.0;

        assert!(matches!(Job::load(config), Err(Error::InvalidSetting { .. })));
        assert!(!output_dir.exists());
    }

    #[test]
    fn vdw_term_needs_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = triatomic_job("triatomic/triatomic.pdb", dir.path());
        config.terms = vec!["bonds".to_owned(), "vdw".to_owned()];

        assert!(matches!(
            Job::load(config),
            Err(Error::MissingParameters(term)) if term == "vdw"
        ));
    }

    #[test]
    fn duplicate_terms_are_counted_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = triatomic_job("triatomic/triatomic.pdb", dir.path());
        config.terms = vec!["bonds".to_owned(), "bonds".to_owned()];

        let job = Job::load(config).unwrap();
        assert_eq!(job.energy().term_names().count(), 1);
    }

    #[test]
    fn unknown_term_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = triatomic_job("triatomic/triatomic.pdb", dir.path());
        config.terms = vec!["torsions".to_owned()];

        assert!(matches!(Job::load(config), Err(Error::UnknownTerm(_))));
    }
}

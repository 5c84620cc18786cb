//! JSON job files.
//!
//! ```json
//! {
//!     "structure": "C2H6.pdb",
//!     "parameters": "C2H6.sf",
//!     "terms": ["bonds", "angles"],
//!     "minimize": { "max_iterations": 200 },
//!     "modes": { "peak_scale_factor": 0.5 },
//!     "output_dir": "modes",
//!     "prefix": "ethane"
//! }
//! ```
//!
//! Relative paths are resolved against the directory of the job file.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    minimize::{BfgsMinimizer, GradientMethod},
    nma::{self, ModeTrajectoryOptions, DEFAULT_HESSIAN_STEP},
    Error, Result,
};

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// PDB-like atom file
    pub structure: PathBuf,
    /// structure file with the force field parameters
    pub parameters: PathBuf,
    #[serde(default = "default_terms")]
    pub terms: Vec<String>,
    /// minimize the structure before the normal-mode analysis
    #[serde(default)]
    pub minimize: Option<MinimizeConfig>,
    #[serde(default)]
    pub hessian: HessianConfig,
    #[serde(default)]
    pub modes: ModesConfig,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// file name prefix of the mode trajectories, `<prefix>_modeNN.pdb`
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MinimizeConfig {
    pub max_iterations: usize,
    pub gtol: f64,
    pub epsilon: f64,
    /// use finite differences with step `epsilon` instead of analytic gradients
    pub numerical_gradient: bool,
    /// write every iteration to `minimization.pdb`
    pub save_trajectory: bool,
}

#[derive(Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HessianMethod {
    /// second differences of the energy
    #[default]
    Energy,
    /// first differences of the analytic gradient
    Gradient,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HessianConfig {
    pub method: HessianMethod,
    pub step: f64,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ModesConfig {
    pub discard_trans_and_rot: bool,
    pub num_frames: usize,
    pub peak_scale_factor: f64,
    /// write one animated trajectory per mode
    pub write_trajectories: bool,
}

fn default_terms() -> Vec<String> {
    vec!["bonds".to_owned(), "angles".to_owned(), "vdw".to_owned()]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("modes")
}

fn default_prefix() -> String {
    "nma".to_owned()
}

impl Default for MinimizeConfig {
    fn default() -> Self {
        let BfgsMinimizer {
            gtol,
            epsilon,
            max_iterations,
            ..
        } = BfgsMinimizer::default();

        Self {
            max_iterations,
            gtol,
            epsilon,
            numerical_gradient: false,
            save_trajectory: true,
        }
    }
}

impl From<&MinimizeConfig> for BfgsMinimizer {
    fn from(config: &MinimizeConfig) -> Self {
        Self {
            gtol: config.gtol,
            epsilon: config.epsilon,
            max_iterations: config.max_iterations,
            gradient: if config.numerical_gradient {
                GradientMethod::Numerical
            } else {
                GradientMethod::Analytic
            },
        }
    }
}

impl Default for HessianConfig {
    fn default() -> Self {
        Self {
            method: HessianMethod::default(),
            step: DEFAULT_HESSIAN_STEP,
        }
    }
}

impl Default for ModesConfig {
    fn default() -> Self {
        let ModeTrajectoryOptions {
            num_frames,
            peak_scale_factor,
        } = ModeTrajectoryOptions::default();

        Self {
            discard_trans_and_rot: true,
            num_frames,
            peak_scale_factor,
            write_trajectories: true,
        }
    }
}

impl From<&ModesConfig> for ModeTrajectoryOptions {
    fn from(config: &ModesConfig) -> Self {
        Self {
            num_frames: config.num_frames,
            peak_scale_factor: config.peak_scale_factor,
        }
    }
}

impl JobConfig {
    /// A job with default settings for everything but the two input files
    pub fn new(structure: impl Into<PathBuf>, parameters: impl Into<PathBuf>) -> Self {
        Self {
            structure: structure.into(),
            parameters: parameters.into(),
            terms: default_terms(),
            minimize: None,
            hessian: HessianConfig::default(),
            modes: ModesConfig::default(),
            output_dir: default_output_dir(),
            prefix: default_prefix(),
        }
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Reads a job file, resolving relative paths against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::io(path, source))?;
        let mut config: Self = serde_json::from_reader(BufReader::new(file))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Rejects settings that would make the analysis produce NaNs instead of failing.
    pub fn validate(&self) -> Result<()> {
        nma::check_step(self.hessian.step)?;
        ModeTrajectoryOptions::from(&self.modes).validate()?;

        if let Some(minimize) = &self.minimize {
            let epsilon = minimize.epsilon;
            if minimize.numerical_gradient && !(epsilon.is_finite() && epsilon > 0.0) {
                return Err(Error::InvalidSetting {
                    setting: "numerical gradient step",
                    value: epsilon,
                });
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.structure,
            &mut self.parameters,
            &mut self.output_dir,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{HessianMethod, JobConfig};
    use crate::{minimize::BfgsMinimizer, Error};

    #[test]
    fn fills_in_defaults() {
        let config =
            JobConfig::from_json(r#"{"structure": "a.pdb", "parameters": "a.sf"}"#).unwrap();

        assert_eq!(config, JobConfig::new("a.pdb", "a.sf"));
        assert_eq!(config.terms, vec!["bonds", "angles", "vdw"]);
        assert!(config.minimize.is_none());
        assert_eq!(config.hessian.method, HessianMethod::Energy);
        assert!(config.modes.discard_trans_and_rot);
        assert_eq!(config.modes.num_frames, 20);
        assert_eq!(config.output_dir, Path::new("modes"));
    }

    #[test]
    fn parses_nested_settings() {
        let config = JobConfig::from_json(
            r#"{
                "structure": "a.pdb",
                "parameters": "a.sf",
                "terms": ["bonds"],
                "minimize": {"max_iterations": 50, "numerical_gradient": true},
                "hessian": {"method": "gradient", "step": 1e-5},
                "modes": {"peak_scale_factor": 0.5, "write_trajectories": false},
                "prefix": "triatomic"
            }"#,
        )
        .unwrap();

        let minimize = config.minimize.as_ref().unwrap();
        assert_eq!(minimize.max_iterations, 50);
        assert_eq!(minimize.gtol, 1e-6);
        let minimizer = BfgsMinimizer::from(minimize);
        assert_eq!(minimizer.max_iterations, 50);
        assert_eq!(minimizer.gradient, crate::minimize::GradientMethod::Numerical);

        assert_eq!(config.hessian.method, HessianMethod::Gradient);
        assert_eq!(config.hessian.step, 1e-5);
        assert_eq!(config.modes.peak_scale_factor, 0.5);
        assert!(!config.modes.write_trajectories);
        assert_eq!(config.prefix, "triatomic");
    }

    #[test]
    fn validates_numerical_settings() {
        assert!(JobConfig::new("a.pdb", "a.sf").validate().is_ok());

        let mut config = JobConfig::new("a.pdb", "a.sf");
        config.hessian.step = 0.0;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidSetting { setting: "hessian step", .. })
        ));

        let mut config = JobConfig::new("a.pdb", "a.sf");
        config.modes.num_frames = 0;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidSetting { setting: "number of frames", .. })
        ));

        let mut config = JobConfig::from_json(
            r#"{"structure": "a.pdb", "parameters": "a.sf",
                "minimize": {"numerical_gradient": true, "epsilon": -0.01}}"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
        config.minimize = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(matches!(
            JobConfig::from_json(r#"{"structure": "a", "parameters": "b", "temperature": 300}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn resolves_paths_relative_to_job_file() {
        let dir = tempfile::tempdir().unwrap();
        let job = dir.path().join("job.json");
        std::fs::write(
            &job,
            r#"{"structure": "in/a.pdb", "parameters": "/abs/a.sf", "output_dir": "out"}"#,
        )
        .unwrap();

        let config = JobConfig::load(&job).unwrap();
        assert_eq!(config.structure, dir.path().join("in/a.pdb"));
        assert_eq!(config.parameters, Path::new("/abs/a.sf"));
        assert_eq!(config.output_dir, dir.path().join("out"));
    }
}

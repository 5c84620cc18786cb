use std::{path::PathBuf, time::Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sardine::{
    config::{HessianMethod, JobConfig, MinimizeConfig},
    job::{Job, JobOutput},
    minimize::MinimizationOutput,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: NmaCommand,
    /// Print the results as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Serialize, Debug)]
struct MinimizationSummary {
    initial_energy: f64,
    energy: f64,
    iterations: usize,
    converged: bool,
}

#[derive(Serialize, Debug)]
struct ModesSummary {
    minimization: Option<MinimizationSummary>,
    eigenvalues: Vec<f64>,
    wavenumbers: Vec<f64>,
    files: Vec<PathBuf>,
}

impl From<&MinimizationOutput> for MinimizationSummary {
    fn from(output: &MinimizationOutput) -> Self {
        Self {
            initial_energy: output.initial_energy,
            energy: output.energy,
            iterations: output.iterations,
            converged: output.converged,
        }
    }
}

#[derive(Subcommand, Debug)]
enum NmaCommand {
    /// Minimize a structure and write the minimization trajectory
    Minimize {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        minimizer: MinimizerArgs,
        /// Where to write minimization.pdb
        #[arg(long, short, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Compute normal modes, optionally after minimizing the structure
    Modes {
        #[command(flatten)]
        input: InputArgs,
        /// Minimize the structure before computing the normal modes
        #[arg(long)]
        minimize: bool,
        #[command(flatten)]
        minimizer: MinimizerArgs,
        /// Directory for the eigenvalues and the mode trajectories
        #[arg(long, short, default_value = "modes")]
        output_dir: PathBuf,
        /// Mode trajectories are written to <PREFIX>_modeNN.pdb
        #[arg(long, default_value = "nma")]
        prefix: String,
        /// Keep the six lowest (translational and rotational) modes
        #[arg(long)]
        keep_rigid_body: bool,
        /// Number of frames per mode trajectory
        #[arg(long, default_value_t = 20)]
        frames: usize,
        /// Largest atomic displacement in the mode trajectories, in Ångström
        #[arg(long, default_value_t = 1.0)]
        peak_scale: f64,
        /// Finite difference step of the Hessian
        #[arg(long, default_value_t = sardine::nma::DEFAULT_HESSIAN_STEP)]
        hessian_step: f64,
        /// Differentiate the analytic gradient instead of the energy
        #[arg(long)]
        gradient_hessian: bool,
        /// Only write the eigenvalues
        #[arg(long)]
        no_trajectories: bool,
    },
    /// Run a JSON job file
    Run {
        /// Path to the job file
        job: PathBuf,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// The PDB-like atom file
    #[arg(long, short)]
    structure: PathBuf,
    /// The structure file with bond, angle and vdw parameters
    #[arg(long, short)]
    parameters: PathBuf,
    /// Energy terms to include
    #[arg(long, short, value_delimiter = ',', default_values_t = ["bonds".to_owned(), "angles".to_owned(), "vdw".to_owned()])]
    terms: Vec<String>,
}

#[derive(Args, Debug)]
struct MinimizerArgs {
    /// The maximum number of BFGS iterations
    #[arg(long, default_value_t = 200)]
    max_iterations: usize,
    /// The minimization is converged once the largest gradient component drops below this
    #[arg(long, default_value_t = 1e-6)]
    gtol: f64,
    /// Use finite difference gradients with this step instead of analytic ones
    #[arg(long)]
    numerical_gradient: Option<f64>,
}

impl InputArgs {
    fn into_config(self, output_dir: PathBuf) -> JobConfig {
        let mut config = JobConfig::new(self.structure, self.parameters);
        config.terms = self.terms;
        config.output_dir = output_dir;
        config
    }
}

impl From<MinimizerArgs> for MinimizeConfig {
    fn from(args: MinimizerArgs) -> Self {
        let defaults = MinimizeConfig::default();
        Self {
            max_iterations: args.max_iterations,
            gtol: args.gtol,
            epsilon: args.numerical_gradient.unwrap_or(defaults.epsilon),
            numerical_gradient: args.numerical_gradient.is_some(),
            ..defaults
        }
    }
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let args = Cli::parse();
    let json = args.json;

    match args.command {
        NmaCommand::Minimize {
            input,
            minimizer,
            output_dir,
        } => {
            let config = input.into_config(output_dir);
            let job = Job::load(config).context("failed to load the job")?;

            let start = Instant::now();
            let (output, file) = job.minimize(&minimizer.into())?;
            log::info!("minimization finished after {:0.2?}", start.elapsed());

            if json {
                let summary = MinimizationSummary::from(&output);
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_minimization(&output);
                if let Some(file) = file {
                    println!("wrote {}", file.display());
                }
            }
        }

        NmaCommand::Modes {
            input,
            minimize,
            minimizer,
            output_dir,
            prefix,
            keep_rigid_body,
            frames,
            peak_scale,
            hessian_step,
            gradient_hessian,
            no_trajectories,
        } => {
            let mut config = input.into_config(output_dir);
            config.prefix = prefix;
            config.minimize = minimize.then(|| minimizer.into());
            config.hessian.step = hessian_step;
            if gradient_hessian {
                config.hessian.method = HessianMethod::Gradient;
            }
            config.modes.discard_trans_and_rot = !keep_rigid_body;
            config.modes.num_frames = frames;
            config.modes.peak_scale_factor = peak_scale;
            config.modes.write_trajectories = !no_trajectories;

            run(config, json)?;
        }

        NmaCommand::Run { job } => {
            let config = JobConfig::load(&job)
                .with_context(|| format!("failed to read job file {}", job.display()))?;
            run(config, json)?;
        }
    }

    Ok(())
}

fn run(config: JobConfig, json: bool) -> anyhow::Result<()> {
    log::debug!("{config:#?}");
    let job = Job::load(config).context("failed to load the job")?;

    let start = Instant::now();
    let JobOutput {
        minimization,
        normal_modes,
        files,
        ..
    } = job.run()?;
    log::info!("normal-mode analysis finished after {:0.2?}", start.elapsed());

    let wavenumbers = normal_modes.wavenumbers();

    if json {
        let summary = ModesSummary {
            minimization: minimization.as_ref().map(MinimizationSummary::from),
            eigenvalues: normal_modes.frequencies().iter().copied().collect(),
            wavenumbers: wavenumbers.iter().copied().collect(),
            files,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if let Some(output) = &minimization {
        print_minimization(output);
    }

    println!("{:>4} {:>16} {:>12}", "mode", "eigenvalue", "cm^-1");
    for (index, (eigenvalue, wavenumber)) in normal_modes
        .frequencies()
        .iter()
        .zip(wavenumbers.iter())
        .enumerate()
    {
        println!("{:4} {eigenvalue:16.6} {wavenumber:12.2}", index + 1);
    }

    for file in files {
        println!("wrote {}", file.display());
    }
    Ok(())
}

fn print_minimization(output: &MinimizationOutput) {
    if output.converged {
        println!("minimization converged after {} iterations", output.iterations);
    } else {
        println!(
            "minimization did NOT converge within {} iterations",
            output.iterations
        );
    }
    println!("initial energy: {:3.6}", output.initial_energy);
    println!("final energy:   {:3.6}", output.energy);
}

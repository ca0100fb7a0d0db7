use super::CliError;
use super::helpers::{load_controls, load_json_input, write_json_output};
use anyhow::Context;
use rat_inputs_core::custom::ModelRegistry;
use rat_inputs_core::inputs::{
    append_data_background, check_indices, InputError, ProblemDefinition,
};
use rat_inputs_core::project::Project;
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct MakeInputArgs {
    /// Project JSON path
    #[arg(long)]
    project: PathBuf,

    /// Controls JSON path; every option takes its default when omitted
    #[arg(long)]
    controls: Option<PathBuf>,

    /// Output directory for the five solver input files
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct CheckArgs {
    /// Problem definition JSON path
    #[arg(long)]
    problem: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct AppendBackgroundArgs {
    /// Contrast data matrix JSON path
    #[arg(long)]
    data: PathBuf,

    /// Background data matrix JSON path
    #[arg(long)]
    background: PathBuf,
}

/// Writes `problem.json`, `limits.json`, `priors.json`, `checks.json` and
/// `controls.json` into the output directory. Nothing is written unless the
/// whole translation succeeds.
pub(super) fn make_input(args: MakeInputArgs) -> Result<(), CliError> {
    let project: Project = load_json_input(&args.project, "INPUT.PROJECT_PARSE")?;
    let controls = load_controls(args.controls.as_deref())?;

    // Rust models are only available to in-process callers; from the command
    // line every custom file is handed on by path.
    let inputs = rat_inputs_core::make_input(&project, &controls, &ModelRegistry::new())?;

    std::fs::create_dir_all(&args.out).with_context(|| {
        format!("failed to create output directory '{}'", args.out.display())
    })?;
    let out = |name: &str| args.out.join(name);
    write_json_output(&out("problem.json"), &inputs.problem)?;
    write_json_output(&out("limits.json"), &inputs.limits)?;
    write_json_output(&out("priors.json"), &inputs.priors)?;
    write_json_output(&out("checks.json"), &inputs.checks)?;
    write_json_output(&out("controls.json"), &inputs.controls)?;

    println!(
        "Wrote solver inputs for {} contrast(s) to {}",
        inputs.problem.number_of_contrasts,
        args.out.display()
    );
    Ok(())
}

pub(super) fn check(args: CheckArgs) -> Result<(), CliError> {
    let problem: ProblemDefinition = load_json_input(&args.problem, "INPUT.PROBLEM_PARSE")?;
    check_indices(&problem).map_err(InputError::from)?;
    println!(
        "All indices in range for {} contrast(s)",
        problem.number_of_contrasts
    );
    Ok(())
}

/// Prints the joined matrix to stdout as JSON.
pub(super) fn append_background(args: AppendBackgroundArgs) -> Result<(), CliError> {
    let data: Vec<Vec<f64>> = load_json_input(&args.data, "INPUT.MATRIX_PARSE")?;
    let background: Vec<Vec<f64>> = load_json_input(&args.background, "INPUT.MATRIX_PARSE")?;
    let rows = append_data_background(&data, &background).map_err(InputError::from)?;
    println!(
        "{}",
        serde_json::to_string(&rows).context("failed to encode joined matrix")?
    );
    Ok(())
}

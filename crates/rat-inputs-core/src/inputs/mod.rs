//! Translation of a [`Project`] into the flat, index-based inputs of the
//! reflectivity engine.
//!
//! The pipeline runs in one direction: the parameter classes are flattened
//! into a canonical ordering, bounds, priors and fit flags are built off
//! that ordering, contrasts are resolved into 1-based indices, and the
//! assembled problem is index-checked before anything is returned.

pub mod background;
pub mod contrast;
pub mod controls;
pub mod flatten;
pub mod lookup;
pub mod parallel;
pub mod problem;
pub mod validate;

pub use background::{append_data_background, BackgroundShapeError};
pub use contrast::{ContrastResolver, ResolvedContrasts};
pub use controls::{make_controls, Control, ControlsConfig, ControlsError};
pub use flatten::{CanonicalOrdering, ClassArrays};
pub use lookup::{NameIndex, ReferenceError};
pub use parallel::{
    make_checks, make_limits, make_priors, split_fitted, Bound, Checks, ChecksLengthError,
    FitSplit, Limits, PriorRecord, PriorValue, Priors,
};
pub use problem::{BackgroundComposition, LayerDetails, Names, ProblemDefinition};
pub use validate::{check_indices, IndexError};

use crate::custom::{CustomFileRecord, FileHandles, ModelLoader, ResolveError};
use crate::domain::{LayerModel, RatError, SourceType};
use crate::project::Project;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    BackgroundShape(#[from] BackgroundShapeError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Controls(#[from] ControlsError),
    #[error(transparent)]
    Checks(#[from] ChecksLengthError),
}

impl From<InputError> for RatError {
    fn from(error: InputError) -> Self {
        let message = error.to_string();
        match error {
            InputError::Reference(ReferenceError::UnknownName { .. }) => {
                RatError::input_validation("PROJECT.UNKNOWN_NAME", message)
            }
            InputError::Reference(ReferenceError::Missing { .. }) => {
                RatError::input_validation("PROJECT.MISSING_REFERENCE", message)
            }
            InputError::Reference(ReferenceError::Unsupported { .. }) => {
                RatError::input_validation("PROJECT.UNSUPPORTED_SOURCE", message)
            }
            InputError::Reference(ReferenceError::TooManyValues { .. }) => {
                RatError::input_validation("PROJECT.TOO_MANY_VALUES", message)
            }
            InputError::Index(error) => RatError::reference(index_placeholder(&error), message),
            InputError::BackgroundShape(BackgroundShapeError::QMismatch) => {
                RatError::shape("BACKGROUND.Q_MISMATCH", message)
            }
            InputError::BackgroundShape(BackgroundShapeError::ShortRow { .. }) => {
                RatError::shape("BACKGROUND.SHORT_ROW", message)
            }
            InputError::Resolve(ResolveError::FileNotLoaded { .. }) => {
                RatError::resolution("CUSTOM.FILE_NOT_LOADED", message)
            }
            InputError::Resolve(ResolveError::EntryPointMissing { .. }) => {
                RatError::resolution("CUSTOM.ENTRY_POINT_MISSING", message)
            }
            InputError::Controls(ControlsError::Parse { .. }) => {
                RatError::input_validation("CONTROLS.PARSE", message)
            }
            InputError::Controls(ControlsError::OutOfRange { .. }) => {
                RatError::input_validation("CONTROLS.OUT_OF_RANGE", message)
            }
            InputError::Controls(ControlsError::NotApplicable { .. }) => {
                RatError::input_validation("CONTROLS.NOT_APPLICABLE", message)
            }
            InputError::Checks(_) => RatError::shape("CHECKS.LENGTH", message),
        }
    }
}

fn index_placeholder(error: &IndexError) -> &'static str {
    match error.field() {
        "contrastBulkIns" => "INDEX.CONTRAST_BULK_INS",
        "contrastBulkOuts" => "INDEX.CONTRAST_BULK_OUTS",
        "contrastScalefactors" => "INDEX.CONTRAST_SCALEFACTORS",
        "contrastDomainRatios" => "INDEX.CONTRAST_DOMAIN_RATIOS",
        "contrastResolutionParams" => "INDEX.CONTRAST_RESOLUTION_PARAMS",
        "contrastBackgroundParams" => "INDEX.CONTRAST_BACKGROUND_PARAMS",
        "contrastQzshifts" => "INDEX.CONTRAST_QZSHIFTS",
        "contrastCustomFiles" => "INDEX.CONTRAST_CUSTOM_FILES",
        "contrastLayers" => "INDEX.CONTRAST_LAYERS",
        "domainContrastLayers" => "INDEX.DOMAIN_CONTRAST_LAYERS",
        "layersDetails" => "INDEX.LAYERS_DETAILS",
        _ => "INDEX.OUT_OF_RANGE",
    }
}

/// The five engine inputs plus the handles of every custom model file the
/// problem names.
#[derive(Debug, Clone)]
pub struct SolverInputs {
    pub problem: ProblemDefinition,
    pub limits: Limits,
    pub priors: Priors,
    pub checks: Checks,
    pub controls: Control,
    pub file_handles: FileHandles,
}

pub fn make_input(
    project: &Project,
    config: &ControlsConfig,
    loader: &dyn ModelLoader,
) -> Result<SolverInputs, InputError> {
    let mut controls = make_controls(config)?;
    if project.model == LayerModel::CustomXY {
        controls.calc_sld_during_fit = true;
    }

    let ordering = CanonicalOrdering::new(project);
    let checks = make_checks(&ordering);
    let limits = make_limits(&ordering);
    let priors = make_priors(&ordering);
    let problem = build_problem(project, &ordering, &checks, &limits)?;
    let file_handles = FileHandles::resolve(&problem.custom_files, loader)?;

    debug!(
        parameters = ordering.len(),
        priors = priors.prior_names.len(),
        custom_files = file_handles.len(),
        "built solver inputs"
    );
    Ok(SolverInputs {
        problem,
        limits,
        priors,
        checks,
        controls,
        file_handles,
    })
}

/// Builds and index-checks the problem for `project`. `checks` decide the
/// fit/other split class by class: a missing flag leaves its parameter
/// fixed, a flag past the end of its class is an error.
pub fn make_problem(project: &Project, checks: &Checks) -> Result<ProblemDefinition, InputError> {
    let ordering = CanonicalOrdering::new(project);
    build_problem(project, &ordering, checks, &make_limits(&ordering))
}

fn build_problem(
    project: &Project,
    ordering: &CanonicalOrdering<'_>,
    checks: &Checks,
    limits: &Limits,
) -> Result<ProblemDefinition, InputError> {
    let resolver = ContrastResolver::new(project, ordering);
    let layers_details = resolver.layer_details()?;
    let domain_contrast_layers = resolver.domain_contrast_layers()?;
    let ResolvedContrasts {
        names: contrast_names,
        bulk_ins,
        bulk_outs,
        scalefactors,
        qzshifts,
        domain_ratios,
        resolution_params,
        backgrounds,
        background_actions,
        custom_files: contrast_custom_files,
        layers,
        repeat_layers,
        resample,
        data,
        data_present,
        data_limits,
        simulation_limits,
    } = resolver.contrasts()?;

    // Custom files travel with the problem whenever something can invoke
    // them: a custom model type or a function background.
    let custom_files = if project.model != LayerModel::StandardLayers
        || backgrounds
            .iter()
            .any(|background| background.kind == SourceType::Function)
    {
        project
            .custom_files
            .iter()
            .map(CustomFileRecord::from)
            .collect()
    } else {
        Vec::new()
    };

    let values = ordering.values();
    let fit = split_fitted(&values, limits, checks)?;
    let number_of_contrasts = contrast_names.len();
    let names = Names {
        classes: ordering.map(|parameter| parameter.name.clone()),
        data: project.data.iter().map(|entry| entry.name.clone()).collect(),
        contrasts: contrast_names,
    };

    let problem = ProblemDefinition {
        calculation: project.calculation,
        model_type: project.model,
        geometry: project.geometry,
        use_imaginary: project.absorption,
        values,
        contrast_bulk_ins: bulk_ins,
        contrast_bulk_outs: bulk_outs,
        contrast_scalefactors: scalefactors,
        contrast_qzshifts: qzshifts,
        contrast_domain_ratios: domain_ratios,
        contrast_resolution_params: resolution_params,
        contrast_background_params: backgrounds,
        contrast_background_actions: background_actions,
        contrast_custom_files,
        contrast_layers: layers,
        number_of_domain_contrasts: domain_contrast_layers.len(),
        domain_contrast_layers,
        number_of_layers: layers_details.len(),
        layers_details,
        repeat_layers,
        resample,
        data,
        data_present,
        data_limits,
        simulation_limits,
        oil_chi_data_present: vec![false; number_of_contrasts],
        number_of_contrasts,
        fit,
        names,
        custom_files,
    };

    check_indices(&problem)?;
    debug!(
        contrasts = problem.number_of_contrasts,
        layers = problem.number_of_layers,
        fitted = problem.fit.fit_params.len(),
        "built problem definition"
    );
    Ok(problem)
}

//! Solver controls: a sparse, validated configuration in, the complete
//! control record out.

use crate::domain::{BoundHandling, DisplayMode, Parallel, Procedure, Strategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControlsError {
    #[error("invalid controls: {message}")]
    Parse { message: String },
    #[error("\"{option}\" must be {expected}, got {value}")]
    OutOfRange {
        option: &'static str,
        value: f64,
        expected: &'static str,
    },
    #[error("\"{option}\" is not a {procedure} option; it applies to: {applies_to}")]
    NotApplicable {
        option: &'static str,
        procedure: Procedure,
        applies_to: String,
    },
}

impl ControlsError {
    pub fn option(&self) -> Option<&'static str> {
        match self {
            Self::Parse { .. } => None,
            Self::OutOfRange { option, .. } | Self::NotApplicable { option, .. } => Some(*option),
        }
    }
}

/// Controls as the user states them. Unset options take the defaults of
/// [`Control::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ControlsConfig {
    #[serde(default)]
    pub procedure: Procedure,
    #[serde(default)]
    pub parallel: Parallel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calc_sld_during_fit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resample_min_angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resample_n_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<DisplayMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func_tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_func_evals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_freq: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_plot_freq: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crossover_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_generations: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_live: Option<u32>,
    #[serde(rename = "nMCMC", default, skip_serializing_if = "Option::is_none")]
    pub n_mcmc: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ns_tolerance: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_samples: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_chains: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_unit_gamma: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_handling: Option<BoundHandling>,
    #[serde(rename = "adaptPCR", default, skip_serializing_if = "Option::is_none")]
    pub adapt_pcr: Option<bool>,
}

const SIMPLEX: &[Procedure] = &[Procedure::Simplex];
const SIMPLEX_DE: &[Procedure] = &[Procedure::Simplex, Procedure::DE];
const DE: &[Procedure] = &[Procedure::DE];
const NS: &[Procedure] = &[Procedure::NS];
const DREAM: &[Procedure] = &[Procedure::Dream];

enum Range {
    Positive,
    NonNegative,
    AtLeastOne,
    Unit,
    UnitOpenBelow,
}

impl Range {
    fn contains(&self, value: f64) -> bool {
        match self {
            Self::Positive => value > 0.0,
            Self::NonNegative => value >= 0.0,
            Self::AtLeastOne => value >= 1.0,
            Self::Unit => (0.0..=1.0).contains(&value),
            Self::UnitOpenBelow => value > 0.0 && value <= 1.0,
        }
    }

    const fn expected(&self) -> &'static str {
        match self {
            Self::Positive => "greater than 0",
            Self::NonNegative => "at least 0",
            Self::AtLeastOne => "at least 1",
            Self::Unit => "between 0 and 1",
            Self::UnitOpenBelow => "greater than 0 and at most 1",
        }
    }
}

impl ControlsConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ControlsError> {
        let config: Self = serde_json::from_str(text).map_err(|error| ControlsError::Parse {
            message: error.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Procedure-specific options that are set, with the procedures they
    /// belong to.
    fn specific_options(&self) -> [(&'static str, bool, &'static [Procedure]); 22] {
        [
            ("xTolerance", self.x_tolerance.is_some(), SIMPLEX),
            ("funcTolerance", self.func_tolerance.is_some(), SIMPLEX),
            ("maxFuncEvals", self.max_func_evals.is_some(), SIMPLEX),
            ("maxIterations", self.max_iterations.is_some(), SIMPLEX),
            ("updateFreq", self.update_freq.is_some(), SIMPLEX_DE),
            ("updatePlotFreq", self.update_plot_freq.is_some(), SIMPLEX_DE),
            ("populationSize", self.population_size.is_some(), DE),
            ("fWeight", self.f_weight.is_some(), DE),
            ("crossoverProbability", self.crossover_probability.is_some(), DE),
            ("strategy", self.strategy.is_some(), DE),
            ("targetValue", self.target_value.is_some(), DE),
            ("numGenerations", self.num_generations.is_some(), DE),
            ("nLive", self.n_live.is_some(), NS),
            ("nMCMC", self.n_mcmc.is_some(), NS),
            ("propScale", self.prop_scale.is_some(), NS),
            ("nsTolerance", self.ns_tolerance.is_some(), NS),
            ("nSamples", self.n_samples.is_some(), DREAM),
            ("nChains", self.n_chains.is_some(), DREAM),
            ("jumpProbability", self.jump_probability.is_some(), DREAM),
            ("pUnitGamma", self.p_unit_gamma.is_some(), DREAM),
            ("boundHandling", self.bound_handling.is_some(), DREAM),
            ("adaptPCR", self.adapt_pcr.is_some(), DREAM),
        ]
    }

    fn ranged_options(&self) -> [(&'static str, Option<f64>, Range); 20] {
        let count = |value: Option<u32>| value.map(f64::from);
        [
            ("resampleMinAngle", self.resample_min_angle, Range::UnitOpenBelow),
            ("resampleNPoints", count(self.resample_n_points), Range::AtLeastOne),
            ("xTolerance", self.x_tolerance, Range::Positive),
            ("funcTolerance", self.func_tolerance, Range::Positive),
            ("maxFuncEvals", count(self.max_func_evals), Range::AtLeastOne),
            ("maxIterations", count(self.max_iterations), Range::AtLeastOne),
            ("updateFreq", count(self.update_freq), Range::AtLeastOne),
            ("updatePlotFreq", count(self.update_plot_freq), Range::AtLeastOne),
            ("populationSize", count(self.population_size), Range::AtLeastOne),
            ("fWeight", self.f_weight, Range::Positive),
            ("crossoverProbability", self.crossover_probability, Range::Unit),
            ("targetValue", self.target_value, Range::AtLeastOne),
            ("numGenerations", count(self.num_generations), Range::AtLeastOne),
            ("nLive", count(self.n_live), Range::AtLeastOne),
            ("propScale", self.prop_scale, Range::Unit),
            ("nsTolerance", self.ns_tolerance, Range::NonNegative),
            ("nSamples", count(self.n_samples), Range::NonNegative),
            ("nChains", count(self.n_chains), Range::AtLeastOne),
            ("jumpProbability", self.jump_probability, Range::Unit),
            ("pUnitGamma", self.p_unit_gamma, Range::Unit),
        ]
    }

    pub fn validate(&self) -> Result<(), ControlsError> {
        for (option, set, procedures) in self.specific_options() {
            if set && !procedures.contains(&self.procedure) {
                return Err(ControlsError::NotApplicable {
                    option,
                    procedure: self.procedure,
                    applies_to: procedures
                        .iter()
                        .map(|procedure| procedure.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        }

        for (option, value, range) in self.ranged_options() {
            if let Some(value) = value.filter(|value| !range.contains(*value)) {
                return Err(ControlsError::OutOfRange {
                    option,
                    value,
                    expected: range.expected(),
                });
            }
        }
        Ok(())
    }
}

/// The complete control record handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    pub procedure: Procedure,
    pub parallel: Parallel,
    pub calc_sld_during_fit: bool,
    pub resample_min_angle: f64,
    pub resample_n_points: u32,
    pub display: DisplayMode,
    pub x_tolerance: f64,
    pub func_tolerance: f64,
    pub max_func_evals: u32,
    pub max_iterations: u32,
    pub update_freq: u32,
    pub update_plot_freq: u32,
    pub population_size: u32,
    pub f_weight: f64,
    pub crossover_probability: f64,
    pub strategy: Strategy,
    pub target_value: f64,
    pub num_generations: u32,
    pub n_live: u32,
    #[serde(rename = "nMCMC")]
    pub n_mcmc: u32,
    pub prop_scale: f64,
    pub ns_tolerance: f64,
    pub n_samples: u32,
    pub n_chains: u32,
    pub jump_probability: f64,
    pub p_unit_gamma: f64,
    pub bound_handling: BoundHandling,
    #[serde(rename = "adaptPCR")]
    pub adapt_pcr: bool,
}

impl Default for Control {
    fn default() -> Self {
        Self {
            procedure: Procedure::Calculate,
            parallel: Parallel::Single,
            calc_sld_during_fit: false,
            resample_min_angle: 0.9,
            resample_n_points: 50,
            display: DisplayMode::Iter,
            x_tolerance: 1e-6,
            func_tolerance: 1e-6,
            max_func_evals: 10_000,
            max_iterations: 1_000,
            update_freq: 1,
            update_plot_freq: 20,
            population_size: 20,
            f_weight: 0.5,
            crossover_probability: 0.8,
            strategy: Strategy::RandomWithPerVectorDither,
            target_value: 1.0,
            num_generations: 500,
            n_live: 150,
            n_mcmc: 0,
            prop_scale: 0.1,
            ns_tolerance: 0.1,
            n_samples: 20_000,
            n_chains: 10,
            jump_probability: 0.5,
            p_unit_gamma: 0.2,
            bound_handling: BoundHandling::Reflect,
            adapt_pcr: true,
        }
    }
}

pub fn make_controls(config: &ControlsConfig) -> Result<Control, ControlsError> {
    config.validate()?;
    let defaults = Control::default();
    let control = Control {
        procedure: config.procedure,
        parallel: config.parallel,
        calc_sld_during_fit: config
            .calc_sld_during_fit
            .unwrap_or(defaults.calc_sld_during_fit),
        resample_min_angle: config
            .resample_min_angle
            .unwrap_or(defaults.resample_min_angle),
        resample_n_points: config.resample_n_points.unwrap_or(defaults.resample_n_points),
        display: config.display.unwrap_or(defaults.display),
        x_tolerance: config.x_tolerance.unwrap_or(defaults.x_tolerance),
        func_tolerance: config.func_tolerance.unwrap_or(defaults.func_tolerance),
        max_func_evals: config.max_func_evals.unwrap_or(defaults.max_func_evals),
        max_iterations: config.max_iterations.unwrap_or(defaults.max_iterations),
        update_freq: config.update_freq.unwrap_or(defaults.update_freq),
        update_plot_freq: config.update_plot_freq.unwrap_or(defaults.update_plot_freq),
        population_size: config.population_size.unwrap_or(defaults.population_size),
        f_weight: config.f_weight.unwrap_or(defaults.f_weight),
        crossover_probability: config
            .crossover_probability
            .unwrap_or(defaults.crossover_probability),
        strategy: config.strategy.unwrap_or(defaults.strategy),
        target_value: config.target_value.unwrap_or(defaults.target_value),
        num_generations: config.num_generations.unwrap_or(defaults.num_generations),
        n_live: config.n_live.unwrap_or(defaults.n_live),
        n_mcmc: config.n_mcmc.unwrap_or(defaults.n_mcmc),
        prop_scale: config.prop_scale.unwrap_or(defaults.prop_scale),
        ns_tolerance: config.ns_tolerance.unwrap_or(defaults.ns_tolerance),
        n_samples: config.n_samples.unwrap_or(defaults.n_samples),
        n_chains: config.n_chains.unwrap_or(defaults.n_chains),
        jump_probability: config.jump_probability.unwrap_or(defaults.jump_probability),
        p_unit_gamma: config.p_unit_gamma.unwrap_or(defaults.p_unit_gamma),
        bound_handling: config.bound_handling.unwrap_or(defaults.bound_handling),
        adapt_pcr: config.adapt_pcr.unwrap_or(defaults.adapt_pcr),
    };

    debug!(
        procedure = %control.procedure,
        parallel = %control.parallel,
        "built solver controls"
    );
    Ok(control)
}

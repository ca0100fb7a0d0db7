//! Structured project model consumed by the translation pipeline.
//!
//! Entities reference each other by name. Names are unique within each
//! collection; that is a construction invariant of whoever builds the
//! project and is not re-checked here.

use crate::domain::{
    BackgroundAction, Calculation, Geometry, HydrateWith, Language, LayerModel, ParameterClass,
    PriorType, SourceType,
};
use crate::serialization::non_finite;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SIMULATION_RANGE: [f64; 2] = [0.005, 0.7];

fn default_sigma() -> f64 {
    f64::INFINITY
}

fn default_repeat_layers() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub max: f64,
    #[serde(default)]
    pub fit: bool,
    #[serde(default)]
    pub prior_type: PriorType,
    #[serde(default, with = "non_finite")]
    pub mu: f64,
    #[serde(default = "default_sigma", with = "non_finite")]
    pub sigma: f64,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min: 0.0,
            value: 0.0,
            max: 0.0,
            fit: false,
            prior_type: PriorType::Uniform,
            mu: 0.0,
            sigma: default_sigma(),
        }
    }

    pub fn with_bounds(mut self, min: f64, value: f64, max: f64) -> Self {
        self.min = min;
        self.value = value;
        self.max = max;
        self
    }

    pub fn fitted(mut self) -> Self {
        self.fit = true;
        self
    }

    pub fn with_prior(mut self, prior_type: PriorType, mu: f64, sigma: f64) -> Self {
        self.prior_type = prior_type;
        self.mu = mu;
        self.sigma = sigma;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layer {
    pub name: String,
    pub thickness: String,
    pub sld: String,
    /// Only read when the project models absorption.
    #[serde(default)]
    pub sld_imaginary: Option<String>,
    pub roughness: String,
    #[serde(default)]
    pub hydration: Option<String>,
    #[serde(default)]
    pub hydrate_with: HydrateWith,
}

impl Layer {
    pub fn new(
        name: impl Into<String>,
        thickness: impl Into<String>,
        sld: impl Into<String>,
        roughness: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            thickness: thickness.into(),
            sld: sld.into(),
            sld_imaginary: None,
            roughness: roughness.into(),
            hydration: None,
            hydrate_with: HydrateWith::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Background {
    pub name: String,
    #[serde(rename = "type", default)]
    pub source_type: SourceType,
    /// Background parameter, data entry or custom file, depending on type.
    pub source: String,
    /// Extra background parameters: the offset for data backgrounds, the
    /// function arguments for function backgrounds.
    #[serde(default)]
    pub values: Vec<String>,
}

impl Background {
    pub fn new(name: impl Into<String>, source_type: SourceType, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_type,
            source: source.into(),
            values: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Resolution {
    pub name: String,
    #[serde(rename = "type", default)]
    pub source_type: SourceType,
    /// Resolution parameter name; ignored for data resolutions.
    #[serde(default)]
    pub source: String,
}

impl Resolution {
    pub fn new(name: impl Into<String>, source_type: SourceType, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_type,
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Data {
    pub name: String,
    /// Rows of (q, reflectivity, error[, resolution]).
    #[serde(default)]
    pub data: Vec<Vec<f64>>,
    #[serde(default)]
    pub data_range: Option<[f64; 2]>,
    #[serde(default)]
    pub simulation_range: Option<[f64; 2]>,
}

impl Data {
    pub fn new(name: impl Into<String>, data: Vec<Vec<f64>>) -> Self {
        Self {
            name: name.into(),
            data,
            data_range: None,
            simulation_range: None,
        }
    }

    pub fn is_present(&self) -> bool {
        !self.data.is_empty()
    }

    /// Explicit range, else the q span of the data, else `[0, 0]`.
    pub fn effective_data_range(&self) -> [f64; 2] {
        self.data_range
            .or_else(|| self.q_span())
            .unwrap_or([0.0, 0.0])
    }

    /// Explicit range, else the q span of the data, else the default
    /// simulation window.
    pub fn effective_simulation_range(&self) -> [f64; 2] {
        self.simulation_range
            .or_else(|| self.q_span())
            .unwrap_or(DEFAULT_SIMULATION_RANGE)
    }

    fn q_span(&self) -> Option<[f64; 2]> {
        let mut q_values = self.data.iter().filter_map(|row| row.first().copied());
        let first = q_values.next()?;
        Some(q_values.fold([first, first], |[low, high], q| [low.min(q), high.max(q)]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomFile {
    pub name: String,
    pub filename: String,
    #[serde(default)]
    pub function_name: String,
    pub language: Language,
    /// Directory holding `filename`.
    #[serde(default)]
    pub path: PathBuf,
}

impl CustomFile {
    pub fn new(name: impl Into<String>, filename: impl Into<String>, language: Language) -> Self {
        Self {
            name: name.into(),
            filename: filename.into(),
            function_name: String::new(),
            language,
            path: PathBuf::new(),
        }
    }

    pub fn with_function(mut self, function_name: impl Into<String>) -> Self {
        self.function_name = function_name.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainContrast {
    pub name: String,
    #[serde(default)]
    pub model: Vec<String>,
}

impl DomainContrast {
    pub fn new(name: impl Into<String>, model: Vec<String>) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Contrast {
    pub name: String,
    pub data: String,
    pub background: String,
    #[serde(default)]
    pub background_action: BackgroundAction,
    pub bulk_in: String,
    pub bulk_out: String,
    pub scalefactor: String,
    pub resolution: String,
    #[serde(default)]
    pub qz_shift: Option<String>,
    #[serde(default)]
    pub resample: bool,
    /// Only meaningful for domains calculations.
    #[serde(default)]
    pub domain_ratio: Option<String>,
    #[serde(default = "default_repeat_layers")]
    pub repeat_layers: usize,
    /// Layer names, domain contrast names (domains with standard layers) or
    /// a single custom file name (custom models).
    #[serde(default)]
    pub model: Vec<String>,
}

impl Contrast {
    /// Contrast wired to the default background, resolution, bulk phases and
    /// scalefactor of [`Project::new`].
    pub fn new(name: impl Into<String>, data: impl Into<String>, model: Vec<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            background: "Background 1".to_string(),
            background_action: BackgroundAction::Add,
            bulk_in: "SLD Air".to_string(),
            bulk_out: "SLD D2O".to_string(),
            scalefactor: "Scalefactor 1".to_string(),
            resolution: "Resolution 1".to_string(),
            qz_shift: None,
            resample: false,
            domain_ratio: None,
            repeat_layers: default_repeat_layers(),
            model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub calculation: Calculation,
    #[serde(default)]
    pub model: LayerModel,
    #[serde(default)]
    pub geometry: Geometry,
    #[serde(default)]
    pub absorption: bool,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub bulk_in: Vec<Parameter>,
    #[serde(default)]
    pub bulk_out: Vec<Parameter>,
    #[serde(default)]
    pub scalefactors: Vec<Parameter>,
    #[serde(default)]
    pub qz_shifts: Vec<Parameter>,
    #[serde(default)]
    pub domain_ratios: Vec<Parameter>,
    #[serde(default)]
    pub background_parameters: Vec<Parameter>,
    #[serde(default)]
    pub backgrounds: Vec<Background>,
    #[serde(default)]
    pub resolution_parameters: Vec<Parameter>,
    #[serde(default)]
    pub resolutions: Vec<Resolution>,
    #[serde(default)]
    pub custom_files: Vec<CustomFile>,
    #[serde(default)]
    pub data: Vec<Data>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub domain_contrasts: Vec<DomainContrast>,
    #[serde(default)]
    pub contrasts: Vec<Contrast>,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(Calculation::Normal, LayerModel::StandardLayers)
    }
}

impl Project {
    /// A project seeded with the default substrate roughness, background,
    /// scalefactor, bulk phases, resolution, domain ratio and an empty
    /// simulation data entry.
    pub fn new(calculation: Calculation, model: LayerModel) -> Self {
        Self {
            name: String::new(),
            calculation,
            model,
            geometry: Geometry::AirSubstrate,
            absorption: false,
            parameters: vec![
                Parameter::new("Substrate Roughness")
                    .with_bounds(1.0, 3.0, 5.0)
                    .fitted(),
            ],
            bulk_in: vec![Parameter::new("SLD Air")],
            bulk_out: vec![Parameter::new("SLD D2O").with_bounds(6.2e-6, 6.35e-6, 6.35e-6)],
            scalefactors: vec![Parameter::new("Scalefactor 1").with_bounds(0.02, 0.23, 0.25)],
            qz_shifts: Vec::new(),
            domain_ratios: vec![Parameter::new("Domain Ratio 1").with_bounds(0.4, 0.5, 0.6)],
            background_parameters: vec![
                Parameter::new("Background Param 1").with_bounds(1e-7, 1e-6, 1e-5),
            ],
            backgrounds: vec![Background::new(
                "Background 1",
                SourceType::Constant,
                "Background Param 1",
            )],
            resolution_parameters: vec![
                Parameter::new("Resolution Param 1").with_bounds(0.01, 0.03, 0.05),
            ],
            resolutions: vec![Resolution::new(
                "Resolution 1",
                SourceType::Constant,
                "Resolution Param 1",
            )],
            custom_files: Vec::new(),
            data: vec![Data::new("Simulation", Vec::new())],
            layers: Vec::new(),
            domain_contrasts: Vec::new(),
            contrasts: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Vec<Data>) -> Self {
        self.data = data;
        self
    }

    /// The stored collection for a parameter class, in insertion order.
    pub fn parameter_class(&self, class: ParameterClass) -> &[Parameter] {
        match class {
            ParameterClass::Params => &self.parameters,
            ParameterClass::BackgroundParams => &self.background_parameters,
            ParameterClass::Scalefactors => &self.scalefactors,
            ParameterClass::Qzshifts => &self.qz_shifts,
            ParameterClass::BulkIns => &self.bulk_in,
            ParameterClass::BulkOuts => &self.bulk_out,
            ParameterClass::ResolutionParams => &self.resolution_parameters,
            ParameterClass::DomainRatios => &self.domain_ratios,
        }
    }

    /// Classes that take part in a translation; domain ratios only count
    /// for domains calculations.
    pub fn active_classes(&self) -> impl Iterator<Item = ParameterClass> + '_ {
        ParameterClass::PROJECTION_ORDER
            .into_iter()
            .filter(|class| {
                *class != ParameterClass::DomainRatios
                    || self.calculation == Calculation::Domains
            })
    }
}

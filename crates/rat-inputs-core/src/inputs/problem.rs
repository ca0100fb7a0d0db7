use super::flatten::ClassArrays;
use super::parallel::FitSplit;
use crate::custom::CustomFileRecord;
use crate::domain::{BackgroundAction, Calculation, Geometry, HydrateWith, LayerModel, SourceType};
use serde::{Deserialize, Serialize};

/// Resolved background of one contrast. `source` indexes the array named by
/// `kind` (`backgroundParams`, `data` or `customFiles`); `values` always
/// index `backgroundParams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundComposition {
    #[serde(rename = "type")]
    pub kind: SourceType,
    pub source: usize,
    #[serde(default)]
    pub values: Vec<usize>,
}

impl BackgroundComposition {
    /// Name of the array `source` points into.
    pub const fn source_target(&self) -> &'static str {
        match self.kind {
            SourceType::Constant => "backgroundParams",
            SourceType::Data => "data",
            SourceType::Function => "customFiles",
        }
    }
}

/// `params` indices of one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDetails {
    pub thickness: usize,
    pub sld: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sld_imaginary: Option<usize>,
    pub roughness: usize,
    #[serde(default)]
    pub hydration: Option<usize>,
    #[serde(with = "hydrate_code")]
    pub hydrate_with: HydrateWith,
}

/// `hydrateWith` travels as its engine code (1 = bulk in, 2 = bulk out).
mod hydrate_code {
    use crate::domain::HydrateWith;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &HydrateWith,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(value.id())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HydrateWith, D::Error> {
        let code = u8::deserialize(deserializer)?;
        HydrateWith::from_id(code).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "hydrateWith code {code} is not 1 (bulk in) or 2 (bulk out)"
            ))
        })
    }
}

impl LayerDetails {
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        [
            Some(self.thickness),
            Some(self.sld),
            self.sld_imaginary,
            Some(self.roughness),
            self.hydration,
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Names {
    #[serde(flatten)]
    pub classes: ClassArrays<String>,
    pub data: Vec<String>,
    pub contrasts: Vec<String>,
}

/// Everything the engine needs to describe the experiment. Every
/// `contrast*` index is 1-based; `None` marks a field that does not apply to
/// the calculation or model type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDefinition {
    #[serde(rename = "TF")]
    pub calculation: Calculation,
    pub model_type: LayerModel,
    pub geometry: Geometry,
    pub use_imaginary: bool,

    #[serde(flatten)]
    pub values: ClassArrays<f64>,

    pub contrast_bulk_ins: Vec<usize>,
    pub contrast_bulk_outs: Vec<usize>,
    pub contrast_scalefactors: Vec<usize>,
    pub contrast_qzshifts: Vec<Option<usize>>,
    pub contrast_domain_ratios: Vec<Option<usize>>,
    pub contrast_resolution_params: Vec<Option<usize>>,
    pub contrast_background_params: Vec<BackgroundComposition>,
    pub contrast_background_actions: Vec<BackgroundAction>,
    pub contrast_custom_files: Vec<Option<usize>>,
    pub contrast_layers: Vec<Vec<usize>>,
    pub domain_contrast_layers: Vec<Vec<usize>>,
    pub layers_details: Vec<LayerDetails>,

    pub repeat_layers: Vec<usize>,
    pub resample: Vec<bool>,
    pub data: Vec<Vec<Vec<f64>>>,
    pub data_present: Vec<bool>,
    pub data_limits: Vec<[f64; 2]>,
    pub simulation_limits: Vec<[f64; 2]>,
    pub oil_chi_data_present: Vec<bool>,

    pub number_of_contrasts: usize,
    pub number_of_layers: usize,
    pub number_of_domain_contrasts: usize,

    #[serde(flatten)]
    pub fit: FitSplit,

    pub names: Names,
    pub custom_files: Vec<CustomFileRecord>,
}

impl ProblemDefinition {
    /// Length of the array a `contrastLayers` entry indexes: domain
    /// contrasts under domains with standard layers, layers otherwise.
    pub fn contrast_layer_target(&self) -> (&'static str, usize) {
        if self.calculation == Calculation::Domains
            && self.model_type == LayerModel::StandardLayers
        {
            ("domainContrastLayers", self.domain_contrast_layers.len())
        } else {
            ("layersDetails", self.layers_details.len())
        }
    }
}

use super::background::append_data_background;
use super::flatten::CanonicalOrdering;
use super::lookup::{NameIndex, ReferenceError};
use super::problem::{BackgroundComposition, LayerDetails};
use super::InputError;
use crate::domain::{BackgroundAction, Calculation, LayerModel, ParameterClass, SourceType};
use crate::project::{Background, Contrast, Data, Project};
use tracing::{debug, trace};

/// Offset parameters a data background may name.
const MAX_DATA_OFFSETS: usize = 1;
/// Value parameters passed to a background function.
const MAX_FUNCTION_VALUES: usize = 5;

/// Per-contrast columns of the problem, one entry per contrast in project
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedContrasts {
    pub names: Vec<String>,
    pub bulk_ins: Vec<usize>,
    pub bulk_outs: Vec<usize>,
    pub scalefactors: Vec<usize>,
    pub qzshifts: Vec<Option<usize>>,
    pub domain_ratios: Vec<Option<usize>>,
    pub resolution_params: Vec<Option<usize>>,
    pub backgrounds: Vec<BackgroundComposition>,
    pub background_actions: Vec<BackgroundAction>,
    pub custom_files: Vec<Option<usize>>,
    pub layers: Vec<Vec<usize>>,
    pub repeat_layers: Vec<usize>,
    pub resample: Vec<bool>,
    pub data: Vec<Vec<Vec<f64>>>,
    pub data_present: Vec<bool>,
    pub data_limits: Vec<[f64; 2]>,
    pub simulation_limits: Vec<[f64; 2]>,
}

impl ResolvedContrasts {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Turns name references into 1-based indices. The lookup tables are built
/// once in [`ContrastResolver::new`] and shared by every step.
#[derive(Debug)]
pub struct ContrastResolver<'a> {
    project: &'a Project,
    params: NameIndex<'a>,
    background_params: NameIndex<'a>,
    scalefactors: NameIndex<'a>,
    qzshifts: NameIndex<'a>,
    bulk_ins: NameIndex<'a>,
    bulk_outs: NameIndex<'a>,
    resolution_params: NameIndex<'a>,
    domain_ratios: NameIndex<'a>,
    backgrounds: NameIndex<'a>,
    resolutions: NameIndex<'a>,
    data: NameIndex<'a>,
    custom_files: NameIndex<'a>,
    layers: NameIndex<'a>,
    domain_contrasts: NameIndex<'a>,
}

impl<'a> ContrastResolver<'a> {
    pub fn new(project: &'a Project, ordering: &CanonicalOrdering<'a>) -> Self {
        let class = |class: ParameterClass, kind: &'static str| {
            NameIndex::new(kind, ordering.names(class))
        };

        Self {
            project,
            params: class(ParameterClass::Params, "parameter"),
            background_params: class(ParameterClass::BackgroundParams, "background parameter"),
            scalefactors: class(ParameterClass::Scalefactors, "scalefactor"),
            qzshifts: class(ParameterClass::Qzshifts, "qz shift"),
            bulk_ins: class(ParameterClass::BulkIns, "bulk in"),
            bulk_outs: class(ParameterClass::BulkOuts, "bulk out"),
            resolution_params: class(ParameterClass::ResolutionParams, "resolution parameter"),
            domain_ratios: class(ParameterClass::DomainRatios, "domain ratio"),
            backgrounds: NameIndex::new(
                "background",
                project.backgrounds.iter().map(|entry| entry.name.as_str()),
            ),
            resolutions: NameIndex::new(
                "resolution",
                project.resolutions.iter().map(|entry| entry.name.as_str()),
            ),
            data: NameIndex::new("data", project.data.iter().map(|entry| entry.name.as_str())),
            custom_files: NameIndex::new(
                "custom file",
                project.custom_files.iter().map(|entry| entry.name.as_str()),
            ),
            layers: NameIndex::new("layer", project.layers.iter().map(|entry| entry.name.as_str())),
            domain_contrasts: NameIndex::new(
                "domain contrast",
                project.domain_contrasts.iter().map(|entry| entry.name.as_str()),
            ),
        }
    }

    fn domains(&self) -> bool {
        self.project.calculation == Calculation::Domains
    }

    /// Contrast models name domain contrasts instead of layers.
    fn layered_domains(&self) -> bool {
        self.domains() && self.project.model == LayerModel::StandardLayers
    }

    /// `params` indices of every layer. Only standard layer models carry
    /// layers.
    pub fn layer_details(&self) -> Result<Vec<LayerDetails>, ReferenceError> {
        if self.project.model != LayerModel::StandardLayers {
            return Ok(Vec::new());
        }

        let details = self
            .project
            .layers
            .iter()
            .map(|layer| -> Result<LayerDetails, ReferenceError> {
                let owner = format!("layer \"{}\"", layer.name);
                let sld_imaginary = if self.project.absorption {
                    let name = layer.sld_imaginary.as_deref().ok_or_else(|| {
                        ReferenceError::Missing {
                            owner: owner.clone(),
                            field: "sld_imaginary",
                        }
                    })?;
                    Some(self.params.resolve(&owner, "sld_imaginary", name)?)
                } else {
                    None
                };
                let hydration = layer
                    .hydration
                    .as_deref()
                    .filter(|name| !name.is_empty())
                    .map(|name| self.params.resolve(&owner, "hydration", name))
                    .transpose()?;

                Ok(LayerDetails {
                    thickness: self.params.resolve(&owner, "thickness", &layer.thickness)?,
                    sld: self.params.resolve(&owner, "sld", &layer.sld)?,
                    sld_imaginary,
                    roughness: self.params.resolve(&owner, "roughness", &layer.roughness)?,
                    hydration,
                    hydrate_with: layer.hydrate_with,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(layers = details.len(), "resolved layer details");
        Ok(details)
    }

    /// Layer indices of every domain contrast, domains with standard layers
    /// only.
    pub fn domain_contrast_layers(&self) -> Result<Vec<Vec<usize>>, ReferenceError> {
        if !self.layered_domains() {
            return Ok(Vec::new());
        }
        self.project
            .domain_contrasts
            .iter()
            .map(|domain| {
                let owner = format!("domain contrast \"{}\"", domain.name);
                resolve_all(&self.layers, &owner, "model", &domain.model)
            })
            .collect()
    }

    pub fn contrasts(&self) -> Result<ResolvedContrasts, InputError> {
        let mut resolved = ResolvedContrasts::default();
        for contrast in &self.project.contrasts {
            self.resolve_contrast(contrast, &mut resolved)?;
        }
        debug!(contrasts = resolved.len(), "resolved contrast references");
        Ok(resolved)
    }

    fn resolve_contrast(
        &self,
        contrast: &Contrast,
        out: &mut ResolvedContrasts,
    ) -> Result<(), InputError> {
        let owner = format!("contrast \"{}\"", contrast.name);

        let bulk_in = self.bulk_ins.resolve(&owner, "bulk_in", &contrast.bulk_in)?;
        let bulk_out = self.bulk_outs.resolve(&owner, "bulk_out", &contrast.bulk_out)?;
        let scalefactor = self
            .scalefactors
            .resolve(&owner, "scalefactor", &contrast.scalefactor)?;
        let qzshift = contrast
            .qz_shift
            .as_deref()
            .map(|name| self.qzshifts.resolve(&owner, "qz_shift", name))
            .transpose()?;

        let domain_ratio = if self.domains() {
            let name = contrast
                .domain_ratio
                .as_deref()
                .ok_or_else(|| ReferenceError::Missing {
                    owner: owner.clone(),
                    field: "domain_ratio",
                })?;
            Some(self.domain_ratios.resolve(&owner, "domain_ratio", name)?)
        } else {
            None
        };

        let resolution = self.resolutions.lookup(
            &self.project.resolutions,
            &owner,
            "resolution",
            &contrast.resolution,
        )?;
        let resolution_param = match resolution.source_type {
            SourceType::Constant => Some(self.resolution_params.resolve(
                &format!("resolution \"{}\"", resolution.name),
                "source",
                &resolution.source,
            )?),
            SourceType::Data => None,
            SourceType::Function => {
                return Err(ReferenceError::Unsupported {
                    owner,
                    field: "resolution",
                    source_type: SourceType::Function,
                }
                .into());
            }
        };

        let data = self
            .data
            .lookup(&self.project.data, &owner, "data", &contrast.data)?;
        let background = self.backgrounds.lookup(
            &self.project.backgrounds,
            &owner,
            "background",
            &contrast.background,
        )?;
        let (composition, rows) = self.resolve_background(background, data)?;
        let (layers, custom_file) = self.resolve_model(&owner, contrast)?;

        trace!(
            contrast = %contrast.name,
            bulk_in,
            bulk_out,
            scalefactor,
            background = %composition.kind,
            layers = layers.len(),
            "resolved contrast"
        );

        out.names.push(contrast.name.clone());
        out.bulk_ins.push(bulk_in);
        out.bulk_outs.push(bulk_out);
        out.scalefactors.push(scalefactor);
        out.qzshifts.push(qzshift);
        out.domain_ratios.push(domain_ratio);
        out.resolution_params.push(resolution_param);
        out.backgrounds.push(composition);
        out.background_actions.push(contrast.background_action);
        out.custom_files.push(custom_file);
        out.layers.push(layers);
        out.repeat_layers.push(contrast.repeat_layers);
        out.resample.push(contrast.resample);
        out.data_present.push(data.is_present());
        out.data_limits.push(data.effective_data_range());
        out.simulation_limits.push(data.effective_simulation_range());
        out.data.push(rows);
        Ok(())
    }

    /// The background record plus the contrast's data rows, with the
    /// background data joined on for data backgrounds.
    fn resolve_background(
        &self,
        background: &Background,
        data: &Data,
    ) -> Result<(BackgroundComposition, Vec<Vec<f64>>), InputError> {
        let owner = format!("background \"{}\"", background.name);
        let values = |limit: usize| -> Result<Vec<usize>, ReferenceError> {
            let names: Vec<&String> = background
                .values
                .iter()
                .filter(|name| !name.is_empty())
                .collect();
            if names.len() > limit {
                return Err(ReferenceError::TooManyValues {
                    owner: owner.clone(),
                    field: "values",
                    found: names.len(),
                    limit,
                });
            }
            names
                .into_iter()
                .map(|name| self.background_params.resolve(&owner, "values", name))
                .collect()
        };

        let (source, values, rows) = match background.source_type {
            SourceType::Constant => (
                self.background_params
                    .resolve(&owner, "source", &background.source)?,
                Vec::new(),
                data.data.clone(),
            ),
            SourceType::Data => {
                let source = self.data.resolve(&owner, "source", &background.source)?;
                let background_data =
                    self.data
                        .lookup(&self.project.data, &owner, "source", &background.source)?;
                let offset = values(MAX_DATA_OFFSETS)?;
                let rows = append_data_background(&data.data, &background_data.data)?;
                (source, offset, rows)
            }
            SourceType::Function => (
                self.custom_files.resolve(&owner, "source", &background.source)?,
                values(MAX_FUNCTION_VALUES)?,
                data.data.clone(),
            ),
        };

        Ok((
            BackgroundComposition {
                kind: background.source_type,
                source,
                values,
            },
            rows,
        ))
    }

    fn resolve_model(
        &self,
        owner: &str,
        contrast: &Contrast,
    ) -> Result<(Vec<usize>, Option<usize>), ReferenceError> {
        match self.project.model {
            LayerModel::StandardLayers if self.layered_domains() => Ok((
                resolve_all(&self.domain_contrasts, owner, "model", &contrast.model)?,
                None,
            )),
            LayerModel::StandardLayers => Ok((
                resolve_all(&self.layers, owner, "model", &contrast.model)?,
                None,
            )),
            LayerModel::CustomLayers | LayerModel::CustomXY => {
                let name = contrast
                    .model
                    .first()
                    .ok_or_else(|| ReferenceError::Missing {
                        owner: owner.to_string(),
                        field: "model",
                    })?;
                let file = self.custom_files.resolve(owner, "model", name)?;
                Ok((Vec::new(), Some(file)))
            }
        }
    }
}

fn resolve_all(
    index: &NameIndex<'_>,
    owner: &str,
    field: &'static str,
    names: &[String],
) -> Result<Vec<usize>, ReferenceError> {
    names
        .iter()
        .map(|name| index.resolve(owner, field, name))
        .collect()
}

use super::problem::ProblemDefinition;
use crate::domain::SourceType;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error(
        "The problem field \"{field}\" contains: {value}, which lies outside of the range of \"{target}\""
    )]
    ContrastField {
        field: &'static str,
        value: usize,
        target: &'static str,
    },
    #[error(
        "Entry {entry} of contrastBackgroundParams has type \"{kind}\" and source index {value}, which is outside the range of \"{target}\"."
    )]
    BackgroundSource {
        entry: usize,
        kind: SourceType,
        value: usize,
        target: &'static str,
    },
    #[error(
        "Entry {entry} of contrastBackgroundParams contains: {value}, which lies outside of the range of \"backgroundParams\""
    )]
    BackgroundValue { entry: usize, value: usize },
}

impl IndexError {
    /// The problem field holding the offending index.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::ContrastField { field, .. } => *field,
            Self::BackgroundSource { .. } | Self::BackgroundValue { .. } => {
                "contrastBackgroundParams"
            }
        }
    }
}

fn check_field<I>(
    field: &'static str,
    indices: I,
    target: &'static str,
    len: usize,
) -> Result<(), IndexError>
where
    I: IntoIterator<Item = Option<usize>>,
{
    match indices
        .into_iter()
        .flatten()
        .find(|index| !(1..=len).contains(index))
    {
        Some(value) => Err(IndexError::ContrastField {
            field,
            value,
            target,
        }),
        None => Ok(()),
    }
}

/// Checks every index of a resolved problem against the array it points
/// into and reports the first one out of range. Indices are 1-based; absent
/// indices always pass.
pub fn check_indices(problem: &ProblemDefinition) -> Result<(), IndexError> {
    let values = &problem.values;

    check_field(
        "contrastBulkIns",
        problem.contrast_bulk_ins.iter().copied().map(Some),
        "bulkIns",
        values.bulk_ins.len(),
    )?;
    check_field(
        "contrastBulkOuts",
        problem.contrast_bulk_outs.iter().copied().map(Some),
        "bulkOuts",
        values.bulk_outs.len(),
    )?;
    check_field(
        "contrastScalefactors",
        problem.contrast_scalefactors.iter().copied().map(Some),
        "scalefactors",
        values.scalefactors.len(),
    )?;
    check_field(
        "contrastDomainRatios",
        problem.contrast_domain_ratios.iter().copied(),
        "domainRatios",
        values.domain_ratios.len(),
    )?;
    check_field(
        "contrastResolutionParams",
        problem.contrast_resolution_params.iter().copied(),
        "resolutionParams",
        values.resolution_params.len(),
    )?;

    for (entry, record) in problem.contrast_background_params.iter().enumerate() {
        let source_len = match record.kind {
            SourceType::Constant => values.background_params.len(),
            SourceType::Data => problem.names.data.len(),
            SourceType::Function => problem.custom_files.len(),
        };
        if !(1..=source_len).contains(&record.source) {
            return Err(IndexError::BackgroundSource {
                entry,
                kind: record.kind,
                value: record.source,
                target: record.source_target(),
            });
        }
        if let Some(value) = record
            .values
            .iter()
            .copied()
            .find(|value| !(1..=values.background_params.len()).contains(value))
        {
            return Err(IndexError::BackgroundValue { entry, value });
        }
    }

    check_field(
        "contrastQzshifts",
        problem.contrast_qzshifts.iter().copied(),
        "qzshifts",
        values.qzshifts.len(),
    )?;
    check_field(
        "contrastCustomFiles",
        problem.contrast_custom_files.iter().copied(),
        "customFiles",
        problem.custom_files.len(),
    )?;
    let (layer_target, layer_len) = problem.contrast_layer_target();
    check_field(
        "contrastLayers",
        problem.contrast_layers.iter().flatten().copied().map(Some),
        layer_target,
        layer_len,
    )?;
    check_field(
        "domainContrastLayers",
        problem.domain_contrast_layers.iter().flatten().copied().map(Some),
        "layersDetails",
        problem.layers_details.len(),
    )?;
    check_field(
        "layersDetails",
        problem
            .layers_details
            .iter()
            .flat_map(|details| details.indices())
            .map(Some),
        "params",
        values.params.len(),
    )?;

    debug!(
        contrasts = problem.number_of_contrasts,
        "problem indices are in range"
    );
    Ok(())
}

//! Bounds, priors and fit flags built off the canonical ordering. Each
//! per-class output has exactly the length and order of the class's
//! flattened value array.

use super::flatten::{CanonicalOrdering, ClassArrays};
use crate::domain::{ParameterClass, PriorType};
use crate::project::Parameter;
use crate::serialization::non_finite;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoundRepr", into = "BoundRepr")]
pub struct Bound {
    pub min: f64,
    pub max: f64,
}

/// `[min, max]` on the wire.
#[derive(Serialize, Deserialize)]
struct BoundRepr(
    #[serde(with = "non_finite")] f64,
    #[serde(with = "non_finite")] f64,
);

impl From<BoundRepr> for Bound {
    fn from(BoundRepr(min, max): BoundRepr) -> Self {
        Self { min, max }
    }
}

impl From<Bound> for BoundRepr {
    fn from(bound: Bound) -> Self {
        Self(bound.min, bound.max)
    }
}

impl From<&Parameter> for Bound {
    fn from(parameter: &Parameter) -> Self {
        Self {
            min: parameter.min,
            max: parameter.max,
        }
    }
}

pub type Limits = ClassArrays<Bound>;

/// 1 = fitted, 0 = fixed.
pub type Checks = ClassArrays<u8>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PriorRecordRepr", into = "PriorRecordRepr")]
pub struct PriorRecord {
    pub name: String,
    pub prior_type: PriorType,
    pub mu: f64,
    pub sigma: f64,
}

/// `[name, priorType, mu, sigma]` on the wire.
#[derive(Serialize, Deserialize)]
struct PriorRecordRepr(
    String,
    PriorType,
    #[serde(with = "non_finite")] f64,
    #[serde(with = "non_finite")] f64,
);

impl From<PriorRecordRepr> for PriorRecord {
    fn from(PriorRecordRepr(name, prior_type, mu, sigma): PriorRecordRepr) -> Self {
        Self {
            name,
            prior_type,
            mu,
            sigma,
        }
    }
}

impl From<PriorRecord> for PriorRecordRepr {
    fn from(record: PriorRecord) -> Self {
        Self(record.name, record.prior_type, record.mu, record.sigma)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "PriorValueRepr", into = "PriorValueRepr")]
pub struct PriorValue {
    pub id: u8,
    pub mu: f64,
    pub sigma: f64,
}

/// `[id, mu, sigma]` on the wire.
#[derive(Serialize, Deserialize)]
struct PriorValueRepr(
    u8,
    #[serde(with = "non_finite")] f64,
    #[serde(with = "non_finite")] f64,
);

impl From<PriorValueRepr> for PriorValue {
    fn from(PriorValueRepr(id, mu, sigma): PriorValueRepr) -> Self {
        Self { id, mu, sigma }
    }
}

impl From<PriorValue> for PriorValueRepr {
    fn from(value: PriorValue) -> Self {
        Self(value.id, value.mu, value.sigma)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Priors {
    #[serde(flatten)]
    pub classes: ClassArrays<PriorRecord>,
    pub prior_names: Vec<String>,
    pub prior_values: Vec<PriorValue>,
}

pub fn make_limits(ordering: &CanonicalOrdering<'_>) -> Limits {
    ordering.map(|parameter| Bound::from(parameter))
}

pub fn make_checks(ordering: &CanonicalOrdering<'_>) -> Checks {
    ordering.map(|parameter| u8::from(parameter.fit))
}

pub fn make_priors(ordering: &CanonicalOrdering<'_>) -> Priors {
    let classes = ordering.map(|parameter| PriorRecord {
        name: parameter.name.clone(),
        prior_type: parameter.prior_type,
        mu: parameter.mu,
        sigma: parameter.sigma,
    });
    let prior_names = classes.projection().map(|record| record.name.clone()).collect();
    let prior_values = classes
        .projection()
        .map(|record| PriorValue {
            id: record.prior_type.id(),
            mu: record.mu,
            sigma: record.sigma,
        })
        .collect();

    Priors {
        classes,
        prior_names,
        prior_values,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("checks for \"{class}\" hold {found} flags, but the class has {expected} parameters")]
pub struct ChecksLengthError {
    pub class: ParameterClass,
    pub found: usize,
    pub expected: usize,
}

/// Values and limits of every class concatenated in projection order, then
/// partitioned by fit flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitSplit {
    pub fit_params: Vec<f64>,
    pub other_params: Vec<f64>,
    pub fit_limits: Vec<Bound>,
    pub other_limits: Vec<Bound>,
}

/// Splits class by class. A class with fewer flags than parameters keeps
/// its unflagged tail fixed; more flags than parameters is an error.
pub fn split_fitted(
    values: &ClassArrays<f64>,
    limits: &Limits,
    checks: &Checks,
) -> Result<FitSplit, ChecksLengthError> {
    let mut split = FitSplit::default();
    for (class, class_values) in values.iter() {
        let flags = checks.get(class);
        if flags.len() > class_values.len() {
            return Err(ChecksLengthError {
                class,
                found: flags.len(),
                expected: class_values.len(),
            });
        }
        for (slot, (value, bound)) in class_values.iter().zip(limits.get(class)).enumerate() {
            if flags.get(slot) == Some(&1) {
                split.fit_params.push(*value);
                split.fit_limits.push(*bound);
            } else {
                split.other_params.push(*value);
                split.other_limits.push(*bound);
            }
        }
    }
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::{
        make_checks, make_limits, make_priors, split_fitted, Bound, ChecksLengthError, PriorValue,
    };
    use crate::domain::{Calculation, LayerModel, ParameterClass, PriorType};
    use crate::inputs::flatten::CanonicalOrdering;
    use crate::project::{Parameter, Project};

    fn project() -> Project {
        let mut project = Project::new(Calculation::Domains, LayerModel::StandardLayers);
        project.parameters.push(
            Parameter::new("Thickness")
                .with_bounds(10.0, 20.0, 30.0)
                .fitted()
                .with_prior(PriorType::Gaussian, 20.0, 2.5),
        );
        project.scalefactors[0].fit = true;
        project
    }

    #[test]
    fn every_class_output_matches_the_value_array_length() {
        let project = project();
        let ordering = CanonicalOrdering::new(&project);
        let values = ordering.values();
        let limits = make_limits(&ordering);
        let checks = make_checks(&ordering);
        let priors = make_priors(&ordering);

        for (class, class_values) in values.iter() {
            assert_eq!(limits.get(class).len(), class_values.len(), "{class}");
            assert_eq!(checks.get(class).len(), class_values.len(), "{class}");
            assert_eq!(priors.classes.get(class).len(), class_values.len(), "{class}");
        }
        assert_eq!(priors.prior_names.len(), priors.classes.total_len());
        assert_eq!(priors.prior_values.len(), priors.classes.total_len());
    }

    #[test]
    fn projection_follows_class_order() {
        let project = project();
        let priors = make_priors(&CanonicalOrdering::new(&project));
        assert_eq!(
            priors.prior_names,
            [
                "Substrate Roughness",
                "Thickness",
                "Background Param 1",
                "Scalefactor 1",
                "SLD Air",
                "SLD D2O",
                "Resolution Param 1",
                "Domain Ratio 1"
            ]
        );
        assert_eq!(
            priors.prior_values[1],
            PriorValue {
                id: 2,
                mu: 20.0,
                sigma: 2.5
            }
        );
        assert_eq!(priors.prior_values[0].id, 1);
        assert!(priors.prior_values[0].sigma.is_infinite());
    }

    #[test]
    fn fit_split_partitions_by_check() {
        let project = project();
        let ordering = CanonicalOrdering::new(&project);
        let split = split_fitted(
            &ordering.values(),
            &make_limits(&ordering),
            &make_checks(&ordering),
        )
        .expect("checks match the ordering");
        assert_eq!(split.fit_params, [3.0, 20.0, 0.23]);
        assert_eq!(split.fit_limits[1], Bound { min: 10.0, max: 30.0 });
        assert_eq!(split.other_params.len(), 5);
        assert_eq!(split.other_limits.len(), 5);
    }

    #[test]
    fn short_checks_leave_the_rest_of_their_class_fixed() {
        let project = project();
        let ordering = CanonicalOrdering::new(&project);
        let mut checks = make_checks(&ordering);
        checks.params = vec![0];
        checks.background_params = vec![1];
        checks.domain_ratios = Vec::new();

        let split = split_fitted(&ordering.values(), &make_limits(&ordering), &checks)
            .expect("short checks are allowed");
        assert_eq!(split.fit_params, [1e-6, 0.23]);
        assert_eq!(
            split.other_params,
            [3.0, 20.0, 0.0, 6.35e-6, 0.03, 0.5]
        );
        assert_eq!(split.other_limits.last(), Some(&Bound { min: 0.4, max: 0.6 }));
        assert_eq!(
            split.fit_params.len() + split.other_params.len(),
            ordering.len()
        );
    }

    #[test]
    fn extra_checks_are_rejected() {
        let project = project();
        let ordering = CanonicalOrdering::new(&project);
        let mut checks = make_checks(&ordering);
        checks.scalefactors = vec![1, 0];

        let error = split_fitted(&ordering.values(), &make_limits(&ordering), &checks)
            .expect_err("scalefactors only has one parameter");
        assert_eq!(
            error,
            ChecksLengthError {
                class: ParameterClass::Scalefactors,
                found: 2,
                expected: 1,
            }
        );
        assert_eq!(
            error.to_string(),
            "checks for \"scalefactors\" hold 2 flags, but the class has 1 parameters"
        );
    }

    #[test]
    fn priors_serialize_as_tuples() {
        let priors = make_priors(&CanonicalOrdering::new(&project()));
        let json = serde_json::to_value(&priors).expect("priors should serialize");
        assert_eq!(json["priorValues"][0], serde_json::json!([1, 0.0, "inf"]));
        assert_eq!(json["priorValues"][1], serde_json::json!([2, 20.0, 2.5]));
        assert_eq!(
            json["params"][1],
            serde_json::json!(["Thickness", "gaussian", 20.0, 2.5])
        );
    }

    #[test]
    fn bounds_serialize_as_pairs() {
        let json = serde_json::to_string(&Bound {
            min: f64::NEG_INFINITY,
            max: 2.0,
        })
        .expect("bound should serialize");
        assert_eq!(json, r#"["-inf",2.0]"#);

        let priors = make_priors(&CanonicalOrdering::new(&Project::default()));
        let text = serde_json::to_string(&priors).expect("priors should serialize");
        let parsed: super::Priors = serde_json::from_str(&text).expect("priors should parse");
        assert_eq!(parsed, priors);
    }
}

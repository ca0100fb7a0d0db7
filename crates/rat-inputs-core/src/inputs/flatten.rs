use crate::domain::ParameterClass;
use crate::project::{Parameter, Project};
use serde::{Deserialize, Serialize};

/// One array per parameter class, keyed by the class's wire name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassArrays<T> {
    pub params: Vec<T>,
    pub background_params: Vec<T>,
    pub scalefactors: Vec<T>,
    pub qzshifts: Vec<T>,
    pub bulk_ins: Vec<T>,
    pub bulk_outs: Vec<T>,
    pub resolution_params: Vec<T>,
    pub domain_ratios: Vec<T>,
}

impl<T> ClassArrays<T> {
    pub fn from_fn(mut build: impl FnMut(ParameterClass) -> Vec<T>) -> Self {
        Self {
            params: build(ParameterClass::Params),
            background_params: build(ParameterClass::BackgroundParams),
            scalefactors: build(ParameterClass::Scalefactors),
            qzshifts: build(ParameterClass::Qzshifts),
            bulk_ins: build(ParameterClass::BulkIns),
            bulk_outs: build(ParameterClass::BulkOuts),
            resolution_params: build(ParameterClass::ResolutionParams),
            domain_ratios: build(ParameterClass::DomainRatios),
        }
    }

    pub fn get(&self, class: ParameterClass) -> &[T] {
        match class {
            ParameterClass::Params => &self.params,
            ParameterClass::BackgroundParams => &self.background_params,
            ParameterClass::Scalefactors => &self.scalefactors,
            ParameterClass::Qzshifts => &self.qzshifts,
            ParameterClass::BulkIns => &self.bulk_ins,
            ParameterClass::BulkOuts => &self.bulk_outs,
            ParameterClass::ResolutionParams => &self.resolution_params,
            ParameterClass::DomainRatios => &self.domain_ratios,
        }
    }

    /// Classes with their arrays, in projection order.
    pub fn iter(&self) -> impl Iterator<Item = (ParameterClass, &[T])> + '_ {
        ParameterClass::PROJECTION_ORDER
            .into_iter()
            .map(move |class| (class, self.get(class)))
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> ClassArrays<U> {
        ClassArrays::from_fn(|class| self.get(class).iter().map(&mut f).collect())
    }

    /// Every class concatenated in projection order.
    pub fn projection(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter().flat_map(|(_, values)| values.iter())
    }

    pub fn total_len(&self) -> usize {
        self.iter().map(|(_, values)| values.len()).sum()
    }
}

/// Borrowed view of the project's parameters in canonical order. Every
/// array handed to the solver is derived from this one ordering.
#[derive(Debug, Clone)]
pub struct CanonicalOrdering<'a> {
    classes: ClassArrays<&'a Parameter>,
}

impl<'a> CanonicalOrdering<'a> {
    pub fn new(project: &'a Project) -> Self {
        let active: Vec<ParameterClass> = project.active_classes().collect();
        let classes = ClassArrays::from_fn(|class| {
            if !active.contains(&class) {
                return Vec::new();
            }
            project.parameter_class(class).iter().collect()
        });
        Self { classes }
    }

    pub fn class(&self, class: ParameterClass) -> &[&'a Parameter] {
        self.classes.get(class)
    }

    pub fn names(&self, class: ParameterClass) -> impl Iterator<Item = &'a str> + '_ {
        self.class(class).iter().map(|parameter| parameter.name.as_str())
    }

    pub fn map<U>(&self, mut f: impl FnMut(&Parameter) -> U) -> ClassArrays<U> {
        self.classes.map(|parameter| f(parameter))
    }

    /// The flattened value arrays.
    pub fn values(&self) -> ClassArrays<f64> {
        self.map(|parameter| parameter.value)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &'a Parameter> + '_ {
        self.classes.projection().copied()
    }

    pub fn len(&self) -> usize {
        self.classes.total_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{CanonicalOrdering, ClassArrays};
    use crate::domain::{Calculation, LayerModel, ParameterClass};
    use crate::project::{Parameter, Project};

    #[test]
    fn values_keep_insertion_order() {
        let mut project = Project::default();
        project.parameters.extend([
            Parameter::new("Zeta").with_bounds(0.0, 9.0, 10.0),
            Parameter::new("Alpha").with_bounds(0.0, 1.0, 10.0),
            Parameter::new("Zeta").with_bounds(0.0, 4.0, 10.0),
        ]);

        let ordering = CanonicalOrdering::new(&project);
        let values = ordering.values();
        assert_eq!(values.params, [3.0, 9.0, 1.0, 4.0]);
        assert_eq!(values.bulk_outs, [6.35e-6]);
        assert!(values.qzshifts.is_empty());
    }

    #[test]
    fn domain_ratios_only_flatten_for_domains() {
        let normal = Project::new(Calculation::Normal, LayerModel::StandardLayers);
        let ordering = CanonicalOrdering::new(&normal);
        assert!(ordering.class(ParameterClass::DomainRatios).is_empty());
        for class in ParameterClass::PROJECTION_ORDER {
            let active = normal.active_classes().any(|candidate| candidate == class);
            assert_eq!(
                ordering.class(class).len(),
                if active { normal.parameter_class(class).len() } else { 0 },
                "{class}"
            );
        }

        let domains = Project::new(Calculation::Domains, LayerModel::StandardLayers);
        let ordering = CanonicalOrdering::new(&domains);
        assert_eq!(ordering.values().domain_ratios, [0.5]);
        assert_eq!(ordering.parameters().last().map(|p| p.name.as_str()), Some("Domain Ratio 1"));
    }

    #[test]
    fn class_arrays_serialize_with_wire_names() {
        let arrays: ClassArrays<u8> = ClassArrays::from_fn(|class| match class {
            ParameterClass::BulkIns => vec![1],
            ParameterClass::DomainRatios => vec![0, 1],
            _ => Vec::new(),
        });
        assert_eq!(arrays.total_len(), 3);
        assert_eq!(arrays.projection().copied().collect::<Vec<_>>(), [1, 0, 1]);

        let json = serde_json::to_value(&arrays).expect("arrays should serialize");
        assert_eq!(json["bulkIns"], serde_json::json!([1]));
        assert_eq!(json["domainRatios"], serde_json::json!([0, 1]));
        assert_eq!(json["backgroundParams"], serde_json::json!([]));
    }
}

pub mod errors;

pub use errors::{RatError, RatErrorCategory, RatResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Raised when a string option does not name any variant of its enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{value}\" is not a valid {option}; expected one of: {expected}")]
pub struct UnknownOptionError {
    pub option: &'static str,
    pub value: String,
    pub expected: String,
}

/// String-valued option enums. Parsing is case-insensitive and serde goes
/// through the same parser so JSON input gets identical diagnostics.
macro_rules! option_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str((*self).as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownOptionError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let trimmed = value.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| UnknownOptionError {
                        option: $label,
                        value: value.to_string(),
                        expected: Self::ALL
                            .iter()
                            .map(|candidate| format!("\"{}\"", candidate.as_str()))
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownOptionError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.as_str()
            }
        }
    };
}

option_enum! {
    #[derive(Default)]
    Calculation("calculation") {
        #[default]
        Normal => "normal",
        Domains => "domains",
    }
}

option_enum! {
    #[derive(Default)]
    LayerModel("model type") {
        #[default]
        StandardLayers => "standard layers",
        CustomLayers => "custom layers",
        CustomXY => "custom xy",
    }
}

option_enum! {
    #[derive(Default)]
    Geometry("geometry") {
        #[default]
        AirSubstrate => "air/substrate",
        SubstrateLiquid => "substrate/liquid",
    }
}

option_enum! {
    #[derive(Default)]
    PriorType("prior type") {
        #[default]
        Uniform => "uniform",
        Gaussian => "gaussian",
        Jeffreys => "jeffreys",
    }
}

impl PriorType {
    /// Numeric code used in the flattened `priorValues` projection.
    pub const fn id(self) -> u8 {
        match self {
            Self::Uniform => 1,
            Self::Gaussian => 2,
            Self::Jeffreys => 3,
        }
    }
}

option_enum! {
    /// Where a background or resolution takes its values from.
    #[derive(Default)]
    SourceType("source type") {
        #[default]
        Constant => "constant",
        Data => "data",
        Function => "function",
    }
}

option_enum! {
    #[derive(Default)]
    BackgroundAction("background action") {
        #[default]
        Add => "add",
        Subtract => "subtract",
    }
}

option_enum! {
    #[derive(Default)]
    HydrateWith("hydrate with") {
        BulkIn => "bulk in",
        #[default]
        BulkOut => "bulk out",
    }
}

/// Engine code carried by `layersDetails`: 1 hydrates with the bulk in
/// phase, 2 with the bulk out phase.
impl HydrateWith {
    pub const fn id(self) -> u8 {
        match self {
            Self::BulkIn => 1,
            Self::BulkOut => 2,
        }
    }

    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::BulkIn),
            2 => Some(Self::BulkOut),
            _ => None,
        }
    }
}

option_enum! {
    /// Source language of a custom model file. Only `Rust` models resolve to
    /// in-process handles; the rest are handed to the engine by path.
    Language("language") {
        Rust => "rust",
        Cpp => "cpp",
        Matlab => "matlab",
        Python => "python",
    }
}

option_enum! {
    #[derive(Default)]
    Procedure("procedure") {
        #[default]
        Calculate => "calculate",
        Simplex => "simplex",
        DE => "de",
        NS => "ns",
        Dream => "dream",
    }
}

option_enum! {
    #[derive(Default)]
    Parallel("parallel mode") {
        #[default]
        Single => "single",
        Points => "points",
        Contrasts => "contrasts",
    }
}

option_enum! {
    #[derive(Default)]
    DisplayMode("display") {
        Off => "off",
        #[default]
        Iter => "iter",
        Notify => "notify",
        Final => "final",
    }
}

option_enum! {
    #[derive(Default)]
    BoundHandling("bound handling") {
        Off => "off",
        #[default]
        Reflect => "reflect",
        Bound => "bound",
        Fold => "fold",
    }
}

/// Differential-evolution mutation strategy, carried as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Strategy {
    Random,
    LocalToBest,
    BestWithJitter,
    #[default]
    RandomWithPerVectorDither,
    RandomWithPerGenerationDither,
    RandomEitherOrAlgorithm,
}

impl Strategy {
    pub const fn code(self) -> u8 {
        match self {
            Self::Random => 1,
            Self::LocalToBest => 2,
            Self::BestWithJitter => 3,
            Self::RandomWithPerVectorDither => 4,
            Self::RandomWithPerGenerationDither => 5,
            Self::RandomEitherOrAlgorithm => 6,
        }
    }
}

impl TryFrom<u8> for Strategy {
    type Error = UnknownOptionError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Random),
            2 => Ok(Self::LocalToBest),
            3 => Ok(Self::BestWithJitter),
            4 => Ok(Self::RandomWithPerVectorDither),
            5 => Ok(Self::RandomWithPerGenerationDither),
            6 => Ok(Self::RandomEitherOrAlgorithm),
            _ => Err(UnknownOptionError {
                option: "strategy",
                value: code.to_string(),
                expected: "1, 2, 3, 4, 5, 6".to_string(),
            }),
        }
    }
}

impl From<Strategy> for u8 {
    fn from(value: Strategy) -> Self {
        value.code()
    }
}

/// The eight parameter classes, each flattened into its own array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterClass {
    Params,
    BackgroundParams,
    Scalefactors,
    Qzshifts,
    BulkIns,
    BulkOuts,
    ResolutionParams,
    DomainRatios,
}

impl ParameterClass {
    /// Class order of every global projection handed to the solver
    /// (`priorNames`, `priorValues`, `fitParams`, `otherParams`, ...).
    pub const PROJECTION_ORDER: [Self; 8] = [
        Self::Params,
        Self::BackgroundParams,
        Self::Scalefactors,
        Self::Qzshifts,
        Self::BulkIns,
        Self::BulkOuts,
        Self::ResolutionParams,
        Self::DomainRatios,
    ];

    /// Wire name of the flattened array.
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Params => "params",
            Self::BackgroundParams => "backgroundParams",
            Self::Scalefactors => "scalefactors",
            Self::Qzshifts => "qzshifts",
            Self::BulkIns => "bulkIns",
            Self::BulkOuts => "bulkOuts",
            Self::ResolutionParams => "resolutionParams",
            Self::DomainRatios => "domainRatios",
        }
    }
}

impl Display for ParameterClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).field_name())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BoundHandling, Calculation, LayerModel, ParameterClass, PriorType, Procedure, Strategy,
    };

    #[test]
    fn option_parsing_is_case_insensitive() {
        assert_eq!("Domains".parse::<Calculation>(), Ok(Calculation::Domains));
        assert_eq!("custom XY".parse::<LayerModel>(), Ok(LayerModel::CustomXY));
        assert_eq!(" DREAM ".parse::<Procedure>(), Ok(Procedure::Dream));
    }

    #[test]
    fn unknown_option_names_the_choices() {
        let error = "wrap".parse::<BoundHandling>().expect_err("should be rejected");
        assert_eq!(error.option, "bound handling");
        assert_eq!(
            error.to_string(),
            "\"wrap\" is not a valid bound handling; expected one of: \"off\", \"reflect\", \"bound\", \"fold\""
        );
    }

    #[test]
    fn serde_uses_option_names() {
        let json = serde_json::to_string(&LayerModel::StandardLayers).expect("serialize");
        assert_eq!(json, "\"standard layers\"");
        let parsed: PriorType = serde_json::from_str("\"Gaussian\"").expect("deserialize");
        assert_eq!(parsed, PriorType::Gaussian);
        assert!(serde_json::from_str::<PriorType>("\"cauchy\"").is_err());
    }

    #[test]
    fn strategy_round_trips_through_its_code() {
        assert_eq!(Strategy::default().code(), 4);
        assert_eq!(Strategy::try_from(1), Ok(Strategy::Random));
        assert!(Strategy::try_from(7).is_err());
        let json = serde_json::to_string(&Strategy::BestWithJitter).expect("serialize");
        assert_eq!(json, "3");
    }

    #[test]
    fn projection_order_matches_solver_convention() {
        let names: Vec<_> = ParameterClass::PROJECTION_ORDER
            .iter()
            .map(|class| class.field_name())
            .collect();
        assert_eq!(
            names,
            [
                "params",
                "backgroundParams",
                "scalefactors",
                "qzshifts",
                "bulkIns",
                "bulkOuts",
                "resolutionParams",
                "domainRatios"
            ]
        );
        assert_eq!(PriorType::Jeffreys.id(), 3);
    }
}

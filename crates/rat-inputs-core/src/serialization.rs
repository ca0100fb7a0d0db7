use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};

/// JSON has no literal for infinities or NaN; these tokens stand in for them.
pub fn format_non_finite(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("NaN")
    } else if value == f64::INFINITY {
        Some("inf")
    } else if value == f64::NEG_INFINITY {
        Some("-inf")
    } else {
        None
    }
}

pub fn parse_non_finite(token: &str) -> Option<f64> {
    match token.trim().to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TokenFloat(f64);

impl Serialize for TokenFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match format_non_finite(self.0) {
            Some(token) => serializer.serialize_str(token),
            None => serializer.serialize_f64(self.0),
        }
    }
}

impl<'de> Deserialize<'de> for TokenFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Token(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(Self(value)),
            Repr::Token(token) => parse_non_finite(&token).map(Self).ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "expected a number or one of \"inf\", \"-inf\", \"NaN\", got \"{token}\""
                ))
            }),
        }
    }
}

/// `#[serde(with = "non_finite")]` for a single `f64`.
pub mod non_finite {
    use super::TokenFloat;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        TokenFloat(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        TokenFloat::deserialize(deserializer).map(|value| value.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JsonFileError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode '{}': {source}", path.display())]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, JsonFileError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| JsonFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| JsonFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty-printed JSON with a trailing newline, so repeated writes of the
/// same value produce identical bytes.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), JsonFileError> {
    let path = path.as_ref();
    let mut content =
        serde_json::to_string_pretty(value).map_err(|source| JsonFileError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    content.push('\n');
    fs::write(path, content).map_err(|source| JsonFileError::Write {
        path: path.to_path_buf(),
        source,
    })
}

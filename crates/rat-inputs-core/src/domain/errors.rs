use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RatResult<T> = Result<T, RatError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatErrorCategory {
    InputValidationError,
    ReferenceError,
    ShapeError,
    ResolutionError,
    IoSystemError,
    InternalError,
}

impl RatErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::ReferenceError => 3,
            Self::ShapeError => 4,
            Self::ResolutionError => 5,
            Self::IoSystemError => 6,
            Self::InternalError => 7,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::ReferenceError => "ReferenceError",
            Self::ShapeError => "ShapeError",
            Self::ResolutionError => "ResolutionError",
            Self::IoSystemError => "IoSystemError",
            Self::InternalError => "InternalError",
        }
    }
}

impl Display for RatErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Caller-facing error: a category, a stable placeholder code and the
/// component's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatError {
    category: RatErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl RatError {
    pub fn new(
        category: RatErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(RatErrorCategory::InputValidationError, placeholder, message)
    }

    pub fn reference(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(RatErrorCategory::ReferenceError, placeholder, message)
    }

    pub fn shape(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(RatErrorCategory::ShapeError, placeholder, message)
    }

    pub fn resolution(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(RatErrorCategory::ResolutionError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(RatErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(RatErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> RatErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for RatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category, self.placeholder, self.message
        )
    }
}

impl Error for RatError {}

use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, EpochErr>;

/// The softmax regression error type.
///
/// Every variant is detected before the parameters are touched, so an `Err` leaves `theta`
/// exactly as the caller passed it.
#[derive(Debug, Clone, PartialEq)]
pub enum EpochErr {
    /// A dimension is zero or a buffer disagrees with its declared shape.
    InvalidShape {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// Some label is not a valid class index.
    LabelOutOfRange {
        index: usize,
        label: u8,
        num_classes: usize,
    },
    /// A required buffer pointer is null.
    NullBuffer { what: &'static str },
    /// A hyperparameter is invalid for reasons other than shape.
    InvalidInput(&'static str),
    /// A configuration document could not be parsed.
    InvalidConfig(String),
}

impl EpochErr {
    /// Returns the status code reported through the C boundary for this error.
    pub fn code(&self) -> i32 {
        match self {
            EpochErr::InvalidShape { .. } => 1,
            EpochErr::LabelOutOfRange { .. } => 2,
            EpochErr::NullBuffer { .. } => 3,
            EpochErr::InvalidInput(_) => 4,
            EpochErr::InvalidConfig(_) => 5,
        }
    }
}

impl Display for EpochErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpochErr::InvalidShape {
                what,
                got,
                expected,
            } => write!(f, "invalid shape for {what}: got {got}, expected {expected}"),
            EpochErr::LabelOutOfRange {
                index,
                label,
                num_classes,
            } => write!(
                f,
                "label {label} at index {index} is out of range for {num_classes} classes"
            ),
            EpochErr::NullBuffer { what } => write!(f, "the {what} buffer is null"),
            EpochErr::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EpochErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl Error for EpochErr {}

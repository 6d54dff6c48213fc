//! Domain error types.
//!
//! Hard failures abort a single operation and are returned as typed values.
//! Soft failures raised while a strategy runs live in
//! [`crate::domain::context::StrategyError`] instead.

/// Why a lookup on a [`TimeSeries`](crate::domain::series::TimeSeries) failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("series is empty")]
    Empty,

    #[error("x = {x} is before the first sample at {first}")]
    BeforeStart { x: f64, first: f64 },

    #[error("x = {x} is after the last sample at {last}")]
    AfterEnd { x: f64, last: f64 },

    #[error("series has {len} samples, need at least {required}")]
    TooFewSamples { len: usize, required: usize },

    #[error("x = {x} is not a finite number")]
    NonFinite { x: f64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("kernel size must be odd, got {kernel_size}")]
    EvenKernelSize { kernel_size: usize },

    #[error("kernel size must be positive")]
    InvalidKernelSize,

    #[error("sigma must be positive and finite, got {sigma}")]
    InvalidSigma { sigma: f64 },

    #[error("sample frequency must be positive and finite, got {frequency}")]
    InvalidFrequency { frequency: f64 },

    #[error("input is not evenly spaced (average spacing {average_spacing})")]
    NotEvenlySpaced { average_spacing: f64 },

    #[error("x does not increase at index {index} (dx = {dx})")]
    NonIncreasingX { index: usize, dx: f64 },

    #[error("cannot resample a span of {span} every {frequency}s in at most {limit} points")]
    ResampleTooLarge { span: f64, frequency: f64, limit: usize },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

impl FilterError {
    /// Errors caused by filter parameters rather than by the data they see.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FilterError::EvenKernelSize { .. }
                | FilterError::InvalidKernelSize
                | FilterError::InvalidSigma { .. }
                | FilterError::InvalidFrequency { .. }
        )
    }
}

/// Failures decoding or editing an expression tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("expected a JSON object for a {namespace} node")]
    NotAnObject { namespace: &'static str },

    #[error("{namespace} node has no \"Id\"")]
    MissingId { namespace: &'static str },

    #[error("unknown {namespace} id \"{id}\"")]
    UnknownId { namespace: &'static str, id: String },

    #[error("{id} is missing field \"{field}\"")]
    MissingField { id: &'static str, field: &'static str },

    #[error("{id} has an invalid \"{field}\": {reason}")]
    InvalidField {
        id: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("{id} has {len} children, index {index} is out of range")]
    ChildIndexOutOfRange {
        id: &'static str,
        index: usize,
        len: usize,
    },

    #[error("{id} child {index} must be a {expected}, got a {found}")]
    ChildKindMismatch {
        id: &'static str,
        index: usize,
        expected: String,
        found: String,
    },
}

/// Top-level error type for strategist.
#[derive(Debug, thiserror::Error)]
pub enum StrategistError {
    #[error("cannot read series file {path}: {reason}")]
    SeriesFileRead { path: String, reason: String },

    #[error("malformed series file {path}: {reason}")]
    SeriesFileMalformed { path: String, reason: String },

    #[error("cannot write series file {path}: {reason}")]
    SeriesFileWrite { path: String, reason: String },

    #[error("cannot read strategy file {path}: {reason}")]
    StrategyFileRead { path: String, reason: String },

    #[error("malformed strategy file {path}: {reason}")]
    StrategyFileMalformed { path: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid strategy: {reason}")]
    StrategyInvalid { reason: String },

    #[error("no price history for {asset}: {reason}")]
    DataSource { asset: String, reason: String },

    #[error("cannot write report {path}: {reason}")]
    Report { path: String, reason: String },

    #[error("cannot start worker pool: {reason}")]
    WorkerPool { reason: String },

    #[error("parameter sweep finished {completed} of {total} combinations")]
    IncompleteSweep { completed: usize, total: usize },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StrategistError> for std::process::ExitCode {
    fn from(err: &StrategistError) -> Self {
        let code: u8 = match err {
            StrategistError::Io(_)
            | StrategistError::WorkerPool { .. }
            | StrategistError::SeriesFileWrite { .. } => 1,
            StrategistError::ConfigParse { .. } | StrategistError::ConfigInvalid { .. } => 2,
            StrategistError::SeriesFileRead { .. }
            | StrategistError::SeriesFileMalformed { .. }
            | StrategistError::DataSource { .. }
            | StrategistError::Series(_) => 3,
            StrategistError::StrategyFileRead { .. }
            | StrategistError::StrategyFileMalformed { .. }
            | StrategistError::StrategyInvalid { .. }
            | StrategistError::Filter(_)
            | StrategistError::Expression(_)
            | StrategistError::IncompleteSweep { .. } => 4,
            StrategistError::Report { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

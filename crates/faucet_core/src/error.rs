use thiserror::Error;

/// Structured detail carried by `NotFound`/driver errors so callers
/// (notably the MCP adapter) can render a helpful message without
/// re-parsing error text.
#[derive(Debug, Clone, Default)]
pub struct ErrorDetail {
    /// Driver-native error code, if any (e.g. a Postgres SQLSTATE).
    pub code: Option<String>,
    pub detail: Option<String>,
    /// Candidate names for `NotFound` errors (available services, tables, drivers).
    pub candidates: Vec<String>,
}

impl ErrorDetail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Core error taxonomy (§7). Every builder, parser, connector and registry
/// operation returns this type; nothing in the core retries internally.
#[derive(Debug, Error)]
pub enum FaucetError {
    /// Builder preconditions, parser errors, identifier-validation failures.
    /// Carries the 0-based position in the source text when one applies.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        message: String,
        position: Option<usize>,
    },

    /// Service/driver/table lookup failed. `detail.candidates` lists valid
    /// alternatives so the MCP adapter can self-correct.
    #[error("not found: {message}")]
    NotFound { message: String, detail: ErrorDetail },

    /// `Connect`/`Ping` failed against the underlying driver.
    #[error("connect failed: {message}")]
    ConnectFailure { message: String, detail: ErrorDetail },

    /// Query execution failed after a successful connect.
    #[error("driver execution error: {message}")]
    DriverExecution { message: String, detail: ErrorDetail },

    /// The caller's context/deadline was cancelled mid-operation.
    #[error("operation canceled")]
    Canceled,

    /// The caller's deadline elapsed before the operation completed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Advisory: produced by the schema contract differ, never raised as
    /// a hard failure by the core itself.
    #[error("contract drift detected: {message}")]
    ContractDrift { message: String },

    /// Capability queried on a dialect that doesn't support it.
    #[error("unsupported on this dialect: {0}")]
    Unsupported(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FaucetError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            position: None,
        }
    }

    pub fn invalid_argument_at(message: impl Into<String>, position: usize) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            position: Some(position),
        }
    }

    pub fn not_found(message: impl Into<String>, candidates: Vec<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            detail: ErrorDetail::with_candidates(candidates),
        }
    }

    pub fn connect_failure(message: impl Into<String>) -> Self {
        Self::ConnectFailure {
            message: message.into(),
            detail: ErrorDetail::new(),
        }
    }

    pub fn driver_execution(message: impl Into<String>) -> Self {
        Self::DriverExecution {
            message: message.into(),
            detail: ErrorDetail::new(),
        }
    }

    pub fn unsupported(capability: impl Into<String>) -> Self {
        Self::Unsupported(capability.into())
    }

    /// Position the error occurred at in the original source text, for
    /// filter/order/field parse errors.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::InvalidArgument { position, .. } => *position,
            _ => None,
        }
    }

    /// Whether this error kind is safe for a caller to retry unmodified.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Canceled | Self::DeadlineExceeded)
    }
}

pub type Result<T> = std::result::Result<T, FaucetError>;

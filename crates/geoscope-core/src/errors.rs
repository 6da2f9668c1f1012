use serde::Serialize;

/// Typed failures that boundaries (CLI, API adapters) need to tell apart.
///
/// Library code returns `anyhow::Result` and constructs one of these at the
/// point of failure; callers recover the classification with
/// [`try_map_error`]. Anything not covered here stays an untyped anyhow
/// error.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoreError {
    NotFound {
        entity: &'static str,
        id: String,
    },
    InvalidState {
        message: String,
    },
    Validation {
        field: String,
        message: String,
    },
    UpstreamTimeout {
        operation: String,
        budget_secs: u64,
    },
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        CoreError::InvalidState {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn upstream_timeout(operation: impl Into<String>, budget_secs: u64) -> Self {
        CoreError::UpstreamTimeout {
            operation: operation.into(),
            budget_secs,
        }
    }

    /// Analysis timeouts are worth retrying; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::UpstreamTimeout { .. })
    }
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::NotFound { entity, id } => write!(f, "{} {} not found", entity, id),
            CoreError::InvalidState { message } => write!(f, "invalid state: {}", message),
            CoreError::Validation { field, message } => {
                write!(f, "validation failed for '{}': {}", field, message)
            }
            CoreError::UpstreamTimeout {
                operation,
                budget_secs,
            } => write!(f, "{} timed out after {}s", operation, budget_secs),
        }
    }
}

impl std::error::Error for CoreError {}

/// Recover the typed classification from an anyhow chain, if present.
pub fn try_map_error(e: &anyhow::Error) -> Option<&CoreError> {
    e.downcast_ref::<CoreError>()
}

#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

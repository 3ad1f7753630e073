/// Convenience result type used across filterfx.
pub type FilterResult<T> = Result<T, FilterError>;

/// Benign conditions (degenerate clip, empty graph) surface as [`crate::RenderOutcome::Skipped`].
#[derive(thiserror::Error, Debug)]
pub enum FilterError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("resource error: {0}")]
    Resource(String),

    #[error("image bank is full: all {capacity} buffers are in use")]
    BankFull { capacity: usize },

    #[error("no data: {0}")]
    NoData(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FilterError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    pub fn bank_full(capacity: usize) -> Self {
        Self::BankFull { capacity }
    }

    pub fn no_data(msg: impl Into<String>) -> Self {
        Self::NoData(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// True for failures that abort a render pass (as opposed to construction-time errors).
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Resource(_) | Self::BankFull { .. })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

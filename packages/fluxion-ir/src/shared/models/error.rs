/*
 * Unified Error Type
 *
 * Internal recursive routines never catch errors; the top-level solver
 * entries are the only places where errors become result flags or are
 * surfaced to the caller. Nothing is silently swallowed.
 */

use thiserror::Error;

/// Structured analysis error.
#[derive(Debug, Error)]
pub enum FluxionError {
    /// Missing entry block, dangling operand, cross-function intra edge.
    #[error("malformed IR: {detail} (handle {handle})")]
    MalformedIr { detail: String, handle: String },

    /// Duplicate equation symbol or a hole bound to no equation.
    #[error("malformed equation system: {0}")]
    MalformedEquation(String),

    /// Iteration cap or step budget reached. The solver entry converts this
    /// into a partial result flagged `incomplete` instead of propagating.
    #[error("budget exhausted after {steps} steps")]
    BudgetExhausted { steps: u64 },

    /// Cooperative cancellation observed at a worklist-pop boundary.
    #[error("analysis cancelled after {steps} steps")]
    Cancelled { steps: u64 },

    /// Raised from a domain operation wrapper.
    #[error("domain error in equation '{equation}': {detail}")]
    Domain { equation: String, detail: String },

    /// Unknown option, unparseable taint spec, missing file.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("module parse error: {0}")]
    ModuleParse(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FluxionError {
    pub fn malformed_ir(detail: impl Into<String>, handle: impl std::fmt::Display) -> Self {
        Self::MalformedIr {
            detail: detail.into(),
            handle: handle.to_string(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config(detail.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, FluxionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ir_names_handle() {
        let err = FluxionError::malformed_ir("missing entry block", "fn f");
        let msg = err.to_string();
        assert!(msg.contains("missing entry block"));
        assert!(msg.contains("fn f"));
    }
}

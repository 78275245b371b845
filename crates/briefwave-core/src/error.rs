use thiserror::Error;

/// The six error kinds named in spec §7, shared by the clustering and
/// episode pipelines. Each kind has a fixed recovery policy; see the
/// call sites in `briefwave-domains` for how it's applied.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Benign: a unique-constraint race on URL/hash. Silently dropped.
    #[error("duplicate record")]
    Duplicate,

    /// One retry with jittered backoff, then surfaced.
    #[error("transient external failure: {0}")]
    TransientExternal(#[source] anyhow::Error),

    /// Surfaced immediately, no retry.
    #[error("permanent external failure: {0}")]
    PermanentExternal(#[source] anyhow::Error),

    /// Malformed LLM output; the declared fallback was already applied
    /// by the caller, this variant exists so failures that have no
    /// sensible fallback can still be reported distinctly.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Selection returned nothing: episode fails with a user-facing
    /// message.
    #[error("no new content: {0}")]
    NoContent(String),

    /// Client went away; episode fails, no uploads are retained.
    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Whether the clustering pipeline should continue after this error
    /// (spec §7: every kind but Duplicate is recoverable via fallback,
    /// and continues the pipeline — Duplicate itself halts this one
    /// insertion, but is not a system failure).
    pub fn is_recoverable_in_clustering(&self) -> bool {
        !matches!(self, PipelineError::Duplicate)
    }
}

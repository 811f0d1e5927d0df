use thiserror::Error;

/// Errors surfaced by the phasing core. Each variant is a stable discriminant
/// that callers map to exit codes; internal invariant violations are
/// assertions, not error values.
#[derive(Error, Debug, PartialEq)]
pub enum PhasingError {
    #[error("invalid input at variant index {variant_index}: {msg}")]
    InvalidInput { variant_index: usize, msg: String },
    #[error("unsupported operation: {msg}")]
    UnsupportedOperation { msg: String },
    #[error("input read source requires a reference sequence ({source_name})")]
    ReferenceRequired { source_name: String },
    #[error("no sample is present in all inputs")]
    NoCommonSample,
    #[error("inputs disagree on chromosomes: {chromosome_a} vs {chromosome_b}")]
    ChromosomeMismatch {
        chromosome_a: String,
        chromosome_b: String,
    },
    #[error("sample {sample}: observed genotype ploidy {observed} differs from declared ploidy {declared}")]
    PloidyError {
        sample: String,
        observed: usize,
        declared: usize,
    },
    #[error("phasing cancelled")]
    Cancelled,
}

impl PhasingError {
    pub fn invalid_input<S: Into<String>>(variant_index: usize, msg: S) -> PhasingError {
        PhasingError::InvalidInput {
            variant_index,
            msg: msg.into(),
        }
    }

    pub fn unsupported<S: Into<String>>(msg: S) -> PhasingError {
        PhasingError::UnsupportedOperation { msg: msg.into() }
    }
}

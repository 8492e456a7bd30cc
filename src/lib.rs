//! # kmul - multiplication-by-constant routine generator
//!
//! Synthesizes, for a given integer constant, a cheap sequence of shifts,
//! adds, subtracts and negations computing `constant * x` without a general
//! multiply instruction, and emits it as compilable source text.
//!
//! Two algorithms are available:
//!
//! | Algorithm | Strategy |
//! |-----------|----------|
//! | Bernstein-Briggs | memoized cost-bounded search over `makeOdd` shifts and `2^i ± 1` factors |
//! | Binary decomposition | one shift/add per set bit of the constant, no search |
//!
//! The chain only replaces the multiply when it beats the cost of the native
//! multiply instruction; otherwise the emitted routine falls back to one
//! explicit multiply.

pub mod chain;
pub mod dialect;
pub mod emit;
pub mod search;

use thiserror::Error;

use dialect::Dialect;
use search::ChainStep;

/// Invalid-request errors. The search itself has no failure mode: every
/// nonzero constant is resolvable, and "no chain under budget" is a normal
/// result, not an error.
#[derive(Error, Debug)]
pub enum KmulError {
    #[error("unsupported width {width}: {dialect} output supports 1 to {max} bits")]
    UnsupportedWidth { width: u32, dialect: Dialect, max: u32 },

    #[error("multiplier {value} must be non-negative for unsigned multiplication")]
    UnsignedNegative { value: i64 },
}

/// Result type for kmul operations
pub type Result<T> = std::result::Result<T, KmulError>;

/// Chain-construction algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    BernsteinBriggs,
    BinaryDecomposition,
}

impl Algorithm {
    /// Short tag used in routine names.
    pub fn tag(&self) -> &'static str {
        match self {
            Algorithm::BernsteinBriggs => "bb",
            Algorithm::BinaryDecomposition => "bd",
        }
    }
}

/// One synthesis request. Constants are signed 64-bit; the caller is
/// responsible for passing a constant that fits the declared width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub multiplier: i64,
    pub width: u32,
    pub signed: bool,
    pub algorithm: Algorithm,
    pub dialect: Dialect,
}

impl Request {
    /// Default output-file name, `kmul_<u|s><W>_<p|m>_<|C|>.<ext>`.
    pub fn default_file_name(&self) -> String {
        format!(
            "kmul_{}{}_{}_{}.{}",
            if self.signed { 's' } else { 'u' },
            self.width,
            if self.multiplier >= 0 { 'p' } else { 'm' },
            self.multiplier.unsigned_abs(),
            self.dialect.extension()
        )
    }
}

/// How the routine body was obtained, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanSummary {
    /// Zero constant: the routine loads a literal, no search ran.
    Zero,
    /// A chain cheaper than the native multiply, root-first.
    Chain { steps: Vec<ChainStep>, cost: i32 },
    /// Binary decomposition; total emitted instruction count.
    Binary { instructions: usize },
    /// No chain beat the budget; the body uses a native multiply.
    Native,
}

/// A finished synthesis: the rendered source plus the plan behind it.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub source: String,
    pub summary: PlanSummary,
}

/// Synthesize the routine for a validated set of parameters.
///
/// Fails fast on caller-precondition violations (width unsupported by the
/// dialect, negative constant for unsigned output); everything else always
/// produces a routine.
pub fn synthesize(request: &Request) -> Result<Synthesis> {
    dialect::validate_width(request.dialect, request.width)?;
    if !request.signed && request.multiplier < 0 {
        return Err(KmulError::UnsignedNegative { value: request.multiplier });
    }
    let (routine, summary) = emit::build_routine(request);
    let source = dialect::render(&routine, request.dialect);
    Ok(Synthesis { source, summary })
}

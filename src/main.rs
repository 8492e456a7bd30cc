//! kmul CLI
//!
//! Command-line front end for the constant-multiplication routine
//! generator: parses the request, runs the synthesis, and writes the
//! emitted routine to a file (named after the request by default) or to
//! stdout.

use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use kmul::dialect::Dialect;
use kmul::{synthesize, Algorithm, PlanSummary, Request};

#[derive(Parser)]
#[command(name = "kmul")]
#[command(version)]
#[command(about = "Generator for multiplication-by-integer-constant routines", long_about = None)]
struct Cli {
    /// Value of the multiplier constant
    #[arg(long = "mul", allow_hyphen_values = true, default_value_t = 1)]
    mul: i64,

    /// Bit width of multiplicand, multiplier and product
    #[arg(long, default_value_t = 32)]
    width: u32,

    /// Generate a signed multiplication routine
    #[arg(long, conflicts_with = "unsigned")]
    signed: bool,

    /// Generate an unsigned multiplication routine (default)
    #[arg(long)]
    unsigned: bool,

    /// Output dialect
    #[arg(long, value_enum, default_value_t = DialectArg::Nac)]
    dialect: DialectArg,

    /// Chain-construction algorithm
    #[arg(long, value_enum, default_value_t = AlgorithmArg::Briggs)]
    algorithm: AlgorithmArg,

    /// Output file; "-" writes to stdout. Defaults to a name derived
    /// from the request, e.g. kmul_u32_p_5.nac
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the discovered chain to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DialectArg {
    /// Generic assembly language
    Nac,
    /// ANSI C (widths up to 32 bits)
    Ansic,
    /// ANSI C with GNU extensions (widths up to 64 bits)
    Gnu89,
    /// C99 (widths up to 64 bits)
    C99,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Nac => Dialect::Nac,
            DialectArg::Ansic => Dialect::Ansi,
            DialectArg::Gnu89 => Dialect::Gnu89,
            DialectArg::C99 => Dialect::C99,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AlgorithmArg {
    /// Bernstein-Briggs cost-bounded search
    Briggs,
    /// Binary decomposition of the constant
    Binary,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Briggs => Algorithm::BernsteinBriggs,
            AlgorithmArg::Binary => Algorithm::BinaryDecomposition,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Unsigned is the default; the flags conflict, so this only honors an
    // explicit --signed.
    let signed = cli.signed && !cli.unsigned;

    let request = Request {
        multiplier: cli.mul,
        width: cli.width,
        signed,
        algorithm: cli.algorithm.into(),
        dialect: cli.dialect.into(),
    };

    let synthesis = match synthesize(&request) {
        Ok(synthesis) => synthesis,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    if cli.verbose {
        print_summary(&synthesis.summary);
    }

    match cli.output {
        Some(path) if path.as_os_str() == "-" => {
            print!("{}", synthesis.source);
        }
        output => {
            let path = output.unwrap_or_else(|| PathBuf::from(request.default_file_name()));
            if let Err(e) = fs::write(&path, &synthesis.source) {
                eprintln!(
                    "{}: could not write '{}': {}",
                    "error".red().bold(),
                    path.display(),
                    e
                );
                return ExitCode::FAILURE;
            }
            println!("{} {}", "Generated".green().bold(), path.display());
        }
    }
    ExitCode::SUCCESS
}

/// Describe how the routine body was obtained.
fn print_summary(summary: &PlanSummary) {
    match summary {
        PlanSummary::Zero => eprintln!("info: zero constant, literal load"),
        PlanSummary::Chain { steps, cost } => {
            for step in steps {
                match step.opcode {
                    None => eprintln!("info: {} (root, cost 0)", step.value),
                    Some(op) => {
                        eprintln!("info: {} via {} (cost {})", step.value, op, step.cost)
                    }
                }
            }
            eprintln!("info: chain cost {}", cost);
        }
        PlanSummary::Binary { instructions } => {
            eprintln!("info: binary decomposition, {} instructions", instructions)
        }
        PlanSummary::Native => {
            eprintln!("info: no chain beats the multiply budget, emitting native multiply")
        }
    }
}

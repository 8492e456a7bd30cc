//! Dialect rendering
//!
//! Renders an assembled [`Routine`](crate::emit::Routine) as compilable
//! source text: either the NAC assembly-like three-address form
//! (`tN <= op tM, operand;`) or a C-family function (`tN = tM op operand;`)
//! in one of three C standard spellings.

use std::fmt;

use crate::emit::{Ins, Operand, Routine};
use crate::{KmulError, Result};

/// Textual rendering convention for emitted routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Generic assembly language, three-address form.
    Nac,
    /// ANSI C (widths up to 32 bits).
    Ansi,
    /// ANSI C with GNU extensions (`long long`, widths up to 64 bits).
    Gnu89,
    /// C99 with `<stdint.h>` types (widths up to 64 bits).
    C99,
}

impl Dialect {
    pub fn is_c_family(&self) -> bool {
        !matches!(self, Dialect::Nac)
    }

    /// Default output-file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Dialect::Nac => "nac",
            Dialect::Ansi | Dialect::Gnu89 | Dialect::C99 => "c",
        }
    }

    /// Widest supported operand width.
    pub fn max_width(&self) -> u32 {
        match self {
            Dialect::Ansi => 32,
            Dialect::Nac | Dialect::Gnu89 | Dialect::C99 => 64,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::Nac => "nac",
            Dialect::Ansi => "ansic",
            Dialect::Gnu89 => "gnu89",
            Dialect::C99 => "c99",
        };
        write!(f, "{}", name)
    }
}

/// Reject widths the dialect cannot express.
pub fn validate_width(dialect: Dialect, width: u32) -> Result<()> {
    if width == 0 || width > dialect.max_width() {
        return Err(KmulError::UnsupportedWidth { width, dialect, max: dialect.max_width() });
    }
    Ok(())
}

/// Round a width up to the C storage width holding it.
fn effective_width(width: u32) -> u32 {
    match width {
        0..=8 => 8,
        9..=16 => 16,
        17..=32 => 32,
        _ => 64,
    }
}

/// The operand/declaration type name for the routine's signedness and width.
fn type_name(dialect: Dialect, signed: bool, width: u32) -> String {
    match dialect {
        // NAC types carry the exact requested width.
        Dialect::Nac => format!("{}{}", if signed { 's' } else { 'u' }, width),
        Dialect::C99 => {
            format!("{}int{}_t", if signed { "" } else { "u" }, effective_width(width))
        }
        Dialect::Ansi | Dialect::Gnu89 => {
            let base = match effective_width(width) {
                8 => "char",
                16 => "short",
                32 => "long",
                _ => "long long",
            };
            if signed {
                base.to_string()
            } else {
                format!("unsigned {}", base)
            }
        }
    }
}

fn operand(op: Operand) -> String {
    match op {
        Operand::Input => "x".to_string(),
        Operand::Temp(n) => format!("t{}", n),
    }
}

fn render_ins_nac(ins: &Ins) -> String {
    match ins {
        Ins::LoadInput { dst } => format!("t{} <= mov x;", dst),
        Ins::LoadConst { dst, value } => format!("t{} <= ldc {};", dst, value),
        Ins::Shl { dst, src, amount } => {
            format!("t{} <= shl {}, {};", dst, operand(*src), amount)
        }
        Ins::Add { dst, lhs, rhs } => {
            format!("t{} <= add {}, {};", dst, operand(*lhs), operand(*rhs))
        }
        Ins::Sub { dst, lhs, rhs } => {
            format!("t{} <= sub {}, {};", dst, operand(*lhs), operand(*rhs))
        }
        Ins::Neg { dst, src } => format!("t{} <= neg {};", dst, operand(*src)),
        Ins::MulConst { dst, src, value } => {
            format!("t{} <= mul {}, {};", dst, operand(*src), value)
        }
        Ins::Output { src } => format!("y <= mov {};", operand(*src)),
    }
}

fn render_ins_c(ins: &Ins) -> String {
    match ins {
        Ins::LoadInput { dst } => format!("t{} = x;", dst),
        Ins::LoadConst { dst, value } => format!("t{} = {};", dst, value),
        Ins::Shl { dst, src, amount } => {
            format!("t{} = {} << {};", dst, operand(*src), amount)
        }
        Ins::Add { dst, lhs, rhs } => {
            format!("t{} = {} + {};", dst, operand(*lhs), operand(*rhs))
        }
        Ins::Sub { dst, lhs, rhs } => {
            format!("t{} = {} - {};", dst, operand(*lhs), operand(*rhs))
        }
        Ins::Neg { dst, src } => format!("t{} = -{};", dst, operand(*src)),
        Ins::MulConst { dst, src, value } => {
            format!("t{} = {} * {};", dst, operand(*src), value)
        }
        Ins::Output { src } => format!("y = {};", operand(*src)),
    }
}

/// Render a routine in the requested dialect.
pub fn render(routine: &Routine, dialect: Dialect) -> String {
    if dialect.is_c_family() {
        render_c(routine, dialect)
    } else {
        render_nac(routine)
    }
}

fn render_nac(routine: &Routine) -> String {
    let ty = type_name(Dialect::Nac, routine.signed, routine.width);
    let mut out = String::new();
    out.push_str(&format!(
        "procedure {} (in {} x, out {} y)\n",
        routine.name, ty, ty
    ));
    out.push_str("{\n");
    for i in 0..routine.temps {
        out.push_str(&format!("  localvar {} t{};\n", ty, i));
    }
    out.push_str("S_1:\n");
    for ins in &routine.body {
        out.push_str(&format!("  {}\n", render_ins_nac(ins)));
    }
    out.push_str("}\n");
    out
}

fn render_c(routine: &Routine, dialect: Dialect) -> String {
    let ty = type_name(dialect, routine.signed, routine.width);
    let mut out = String::new();
    if dialect == Dialect::C99 {
        out.push_str("#include <stdint.h>\n");
    }
    out.push_str(&format!("{} {} ({} x)\n", ty, routine.name, ty));
    out.push_str("{\n");
    for i in 0..routine.temps {
        out.push_str(&format!("  {} t{};\n", ty, i));
    }
    out.push_str(&format!("  {} y;\n", ty));
    for ins in &routine.body {
        out.push_str(&format!("  {}\n", render_ins_c(ins)));
    }
    out.push_str("  return (y);\n");
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::build_routine;
    use crate::{Algorithm, Request};

    fn routine(multiplier: i64, signed: bool) -> Routine {
        let request = Request {
            multiplier,
            width: 32,
            signed,
            algorithm: Algorithm::BernsteinBriggs,
            dialect: Dialect::Nac,
        };
        build_routine(&request).0
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(Dialect::Nac, false, 32), "u32");
        assert_eq!(type_name(Dialect::Nac, true, 13), "s13");
        assert_eq!(type_name(Dialect::C99, false, 32), "uint32_t");
        assert_eq!(type_name(Dialect::C99, true, 12), "int16_t");
        assert_eq!(type_name(Dialect::C99, false, 64), "uint64_t");
        assert_eq!(type_name(Dialect::Ansi, false, 32), "unsigned long");
        assert_eq!(type_name(Dialect::Ansi, true, 8), "char");
        assert_eq!(type_name(Dialect::Gnu89, false, 48), "unsigned long long");
        assert_eq!(type_name(Dialect::Gnu89, true, 64), "long long");
    }

    #[test]
    fn test_effective_width_rounds_up() {
        assert_eq!(effective_width(1), 8);
        assert_eq!(effective_width(8), 8);
        assert_eq!(effective_width(9), 16);
        assert_eq!(effective_width(31), 32);
        assert_eq!(effective_width(33), 64);
    }

    #[test]
    fn test_width_validation() {
        assert!(validate_width(Dialect::Nac, 64).is_ok());
        assert!(validate_width(Dialect::Ansi, 32).is_ok());
        assert!(validate_width(Dialect::Ansi, 33).is_err());
        assert!(validate_width(Dialect::C99, 64).is_ok());
        assert!(validate_width(Dialect::C99, 65).is_err());
        assert!(validate_width(Dialect::Nac, 0).is_err());
    }

    #[test]
    fn test_render_nac_body() {
        let text = render(&routine(5, false), Dialect::Nac);
        assert!(text.starts_with("procedure kmul_bb_u32_p_5 (in u32 x, out u32 y)\n{\n"));
        assert!(text.contains("  localvar u32 t0;\n"));
        assert!(text.contains("  localvar u32 t15;\n"));
        assert!(text.contains("S_1:\n"));
        assert!(text.contains("  t0 <= mov x;\n"));
        assert!(text.contains("  t1 <= shl t0, 2;\n"));
        assert!(text.contains("  t2 <= add t1, x;\n"));
        assert!(text.contains("  y <= mov t2;\n"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_render_c99_body() {
        let text = render(&routine(5, false), Dialect::C99);
        assert!(text.starts_with("#include <stdint.h>\n"));
        assert!(text.contains("uint32_t kmul_bb_u32_p_5 (uint32_t x)\n{\n"));
        assert!(text.contains("  uint32_t t0;\n"));
        assert!(text.contains("  uint32_t y;\n"));
        assert!(text.contains("  t0 = x;\n"));
        assert!(text.contains("  t1 = t0 << 2;\n"));
        assert!(text.contains("  t2 = t1 + x;\n"));
        assert!(text.contains("  y = t2;\n"));
        assert!(text.contains("  return (y);\n"));
    }

    #[test]
    fn test_render_negate_signed() {
        let text = render(&routine(-1, true), Dialect::C99);
        assert!(text.contains("int32_t kmul_bb_s32_m_1 (int32_t x)"));
        assert!(text.contains("  t1 = -t0;\n"));
        assert!(text.contains("  y = t1;\n"));
    }

    #[test]
    fn test_render_zero_routine() {
        let text = render(&routine(0, false), Dialect::Nac);
        assert!(text.contains("  localvar u32 t0;\n"));
        assert!(!text.contains("t1"));
        assert!(text.contains("  t0 <= ldc 0;\n"));
        assert!(text.contains("  y <= mov t0;\n"));
    }

    #[test]
    fn test_ansi_has_no_include() {
        let text = render(&routine(3, false), Dialect::Ansi);
        assert!(!text.contains("#include"));
        assert!(text.starts_with("unsigned long kmul_bb_u32_p_3 (unsigned long x)\n"));
    }
}

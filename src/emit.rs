//! Instruction emission
//!
//! Turns a resolved chain (or the binary expansion of the constant) into a
//! flat three-address instruction list over freshly numbered temporaries.
//! The list is dialect-neutral; rendering to text lives in [`crate::dialect`].
//!
//! Shift amounts are never stored on chain nodes. They are reconstructed
//! here from the target/source ratio, which is always a positive power of
//! two by construction.

use crate::chain::{CostModel, MulOp, NodeId, NodeKind};
use crate::search::{Plan, Searcher};
use crate::{Algorithm, PlanSummary, Request};

/// Fixed temporary budget declared by Bernstein-Briggs routines. A chain
/// under the default multiply budget never needs more: at most 7 derived
/// nodes of at most 2 instructions each, plus `t0` and one trailing shift.
pub const MAX_STEPS: u32 = 16;

/// Instruction operand: the routine input `x` or a numbered temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Input,
    Temp(u32),
}

/// One emitted instruction. Destinations are always temporaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ins {
    /// `t{dst} = x`
    LoadInput { dst: u32 },
    /// `t{dst} = value`
    LoadConst { dst: u32, value: i64 },
    /// `t{dst} = src << amount`
    Shl { dst: u32, src: Operand, amount: u32 },
    /// `t{dst} = lhs + rhs`
    Add { dst: u32, lhs: Operand, rhs: Operand },
    /// `t{dst} = lhs - rhs`
    Sub { dst: u32, lhs: Operand, rhs: Operand },
    /// `t{dst} = -src`
    Neg { dst: u32, src: Operand },
    /// `t{dst} = src * value` (native-multiply fallback)
    MulConst { dst: u32, src: Operand, value: i64 },
    /// `y = src`
    Output { src: Operand },
}

/// A fully assembled routine, ready for dialect rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routine {
    pub name: String,
    pub multiplier: i64,
    pub width: u32,
    pub signed: bool,
    /// Number of temporaries to declare (may exceed the number used).
    pub temps: u32,
    pub body: Vec<Ins>,
}

/// Routine header name: algorithm tag, signedness, width, and the constant
/// with its sign folded into a letter.
fn routine_name(algorithm: Algorithm, signed: bool, width: u32, multiplier: i64) -> String {
    format!(
        "kmul_{}_{}{}_{}_{}",
        algorithm.tag(),
        if signed { 's' } else { 'u' },
        width,
        if multiplier >= 0 { 'p' } else { 'm' },
        multiplier.unsigned_abs()
    )
}

/// Emission state for one request: the instruction buffer and the shared
/// temporary counter.
struct Emitter {
    body: Vec<Ins>,
    next_temp: u32,
}

impl Emitter {
    fn new() -> Self {
        Emitter { body: Vec::new(), next_temp: 0 }
    }

    fn alloc(&mut self) -> u32 {
        let temp = self.next_temp;
        self.next_temp += 1;
        temp
    }

    /// Emit the shift turning `source` into `target` and return the
    /// temporary holding it. The ratio is a positive power of two, so the
    /// amount falls out of its trailing zeros.
    fn emit_shift(&mut self, target: i128, source: i128, src: Operand) -> Operand {
        let amount = (target / source).trailing_zeros();
        let dst = self.alloc();
        self.body.push(Ins::Shl { dst, src, amount });
        Operand::Temp(dst)
    }

    /// Post-order walk over a resolved chain. Returns the operand holding
    /// `node`'s value; the root contributes `t0` (the loaded input) without
    /// emitting anything.
    fn emit_chain(&mut self, searcher: &Searcher, id: NodeId) -> Operand {
        match searcher.node(id).kind {
            NodeKind::Root => Operand::Temp(0),
            NodeKind::Derived { parent, opcode } => {
                let src = self.emit_chain(searcher, parent);
                let source = searcher.node(parent).value;
                let target = searcher.node(id).value;
                match opcode {
                    MulOp::Negate => {
                        let dst = self.alloc();
                        self.body.push(Ins::Neg { dst, src });
                        Operand::Temp(dst)
                    }
                    MulOp::ShiftAdd => {
                        let shifted = self.emit_shift(target - 1, source, src);
                        let dst = self.alloc();
                        self.body.push(Ins::Add { dst, lhs: shifted, rhs: Operand::Input });
                        Operand::Temp(dst)
                    }
                    MulOp::ShiftSub => {
                        let shifted = self.emit_shift(target + 1, source, src);
                        let dst = self.alloc();
                        self.body.push(Ins::Sub { dst, lhs: shifted, rhs: Operand::Input });
                        Operand::Temp(dst)
                    }
                    MulOp::ShiftRev => {
                        let shifted = self.emit_shift(1 - target, source, src);
                        let dst = self.alloc();
                        self.body.push(Ins::Sub { dst, lhs: Operand::Input, rhs: shifted });
                        Operand::Temp(dst)
                    }
                    MulOp::FactorAdd => {
                        let shifted = self.emit_shift(target - source, source, src);
                        let dst = self.alloc();
                        self.body.push(Ins::Add { dst, lhs: shifted, rhs: src });
                        Operand::Temp(dst)
                    }
                    MulOp::FactorSub => {
                        let shifted = self.emit_shift(target + source, source, src);
                        let dst = self.alloc();
                        self.body.push(Ins::Sub { dst, lhs: shifted, rhs: src });
                        Operand::Temp(dst)
                    }
                    MulOp::FactorRev => {
                        let shifted = self.emit_shift(source - target, source, src);
                        let dst = self.alloc();
                        self.body.push(Ins::Sub { dst, lhs: src, rhs: shifted });
                        Operand::Temp(dst)
                    }
                }
            }
            NodeKind::Unresolved => unreachable!("emission requires a resolved chain"),
        }
    }

    /// Binary-decomposition baseline: one shift of the input per set bit of
    /// `|target|`, accumulated in place, with a final negation for negative
    /// targets. No search and no memoization.
    fn emit_binary(&mut self, target: i64) -> Operand {
        let magnitude = target.unsigned_abs();
        let low = magnitude.trailing_zeros();
        let mut acc = if low == 0 {
            Operand::Temp(0)
        } else {
            let dst = self.alloc();
            self.body.push(Ins::Shl { dst, src: Operand::Input, amount: low });
            Operand::Temp(dst)
        };
        for bit in low + 1..u64::BITS {
            if magnitude >> bit & 1 != 0 {
                let dst = self.alloc();
                self.body.push(Ins::Shl { dst, src: Operand::Input, amount: bit });
                self.body.push(Ins::Add { dst, lhs: Operand::Temp(dst), rhs: acc });
                acc = Operand::Temp(dst);
            }
        }
        if target < 0 {
            let dst = self.alloc();
            self.body.push(Ins::Neg { dst, src: acc });
            acc = Operand::Temp(dst);
        }
        acc
    }
}

/// Assemble the routine for one request.
///
/// The caller is expected to have validated the request (width, signedness);
/// this layer assumes valid parameters and always produces a routine, with
/// the native-multiply fallback standing in when no chain beats the budget.
pub fn build_routine(request: &Request) -> (Routine, PlanSummary) {
    let multiplier = request.multiplier;
    let mut emitter = Emitter::new();

    let summary = if multiplier == 0 {
        // No search for zero: load and return the literal.
        let dst = emitter.alloc();
        emitter.body.push(Ins::LoadConst { dst, value: 0 });
        emitter.body.push(Ins::Output { src: Operand::Temp(dst) });
        PlanSummary::Zero
    } else {
        let dst = emitter.alloc();
        emitter.body.push(Ins::LoadInput { dst });
        let summary = match request.algorithm {
            Algorithm::BernsteinBriggs => {
                let mut searcher = Searcher::new(CostModel::default());
                match searcher.plan(multiplier as i128) {
                    Plan::Chain { root, cost } => {
                        let mut result = emitter.emit_chain(&searcher, root);
                        let resolved = searcher.node(root).value;
                        if resolved != multiplier as i128 {
                            // Even target: restore the factor stripped by make_odd.
                            result = emitter.emit_shift(multiplier as i128, resolved, result);
                        }
                        emitter.body.push(Ins::Output { src: result });
                        PlanSummary::Chain { steps: searcher.chain_steps(root), cost }
                    }
                    Plan::Native => {
                        let dst = emitter.alloc();
                        emitter.body.push(Ins::MulConst {
                            dst,
                            src: Operand::Temp(0),
                            value: multiplier,
                        });
                        emitter.body.push(Ins::Output { src: Operand::Temp(dst) });
                        PlanSummary::Native
                    }
                }
            }
            Algorithm::BinaryDecomposition => {
                let result = emitter.emit_binary(multiplier);
                emitter.body.push(Ins::Output { src: result });
                PlanSummary::Binary { instructions: emitter.body.len() }
            }
        };
        summary
    };

    let temps = match (multiplier, request.algorithm) {
        (0, _) => 1,
        (_, Algorithm::BernsteinBriggs) => MAX_STEPS,
        // The final negation of a signed constant may need one past the width.
        (_, Algorithm::BinaryDecomposition) if request.signed => request.width + 1,
        (_, Algorithm::BinaryDecomposition) => request.width,
    };

    let routine = Routine {
        name: routine_name(request.algorithm, request.signed, request.width, multiplier),
        multiplier,
        width: request.width,
        signed: request.signed,
        temps: temps.max(emitter.next_temp),
        body: emitter.body,
    };
    (routine, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn request(multiplier: i64, algorithm: Algorithm) -> Request {
        Request {
            multiplier,
            width: 32,
            signed: multiplier < 0,
            algorithm,
            dialect: Dialect::Nac,
        }
    }

    fn body(multiplier: i64, algorithm: Algorithm) -> Vec<Ins> {
        build_routine(&request(multiplier, algorithm)).0.body
    }

    #[test]
    fn test_identity_routine() {
        // 1x: just move the input through.
        let body = body(1, Algorithm::BernsteinBriggs);
        assert_eq!(
            body,
            vec![Ins::LoadInput { dst: 0 }, Ins::Output { src: Operand::Temp(0) }]
        );
    }

    #[test]
    fn test_negate_routine() {
        let body = body(-1, Algorithm::BernsteinBriggs);
        assert_eq!(
            body,
            vec![
                Ins::LoadInput { dst: 0 },
                Ins::Neg { dst: 1, src: Operand::Temp(0) },
                Ins::Output { src: Operand::Temp(1) },
            ]
        );
    }

    #[test]
    fn test_shift_add_routine() {
        // 3x = (x << 1) + x
        let body = body(3, Algorithm::BernsteinBriggs);
        assert_eq!(
            body,
            vec![
                Ins::LoadInput { dst: 0 },
                Ins::Shl { dst: 1, src: Operand::Temp(0), amount: 1 },
                Ins::Add { dst: 2, lhs: Operand::Temp(1), rhs: Operand::Input },
                Ins::Output { src: Operand::Temp(2) },
            ]
        );
        // 5x = (x << 2) + x
        let body = self::body(5, Algorithm::BernsteinBriggs);
        assert_eq!(body[1], Ins::Shl { dst: 1, src: Operand::Temp(0), amount: 2 });
    }

    #[test]
    fn test_even_target_appends_trailing_shift() {
        // 10x = 5x << 1
        let body = body(10, Algorithm::BernsteinBriggs);
        assert_eq!(
            body,
            vec![
                Ins::LoadInput { dst: 0 },
                Ins::Shl { dst: 1, src: Operand::Temp(0), amount: 2 },
                Ins::Add { dst: 2, lhs: Operand::Temp(1), rhs: Operand::Input },
                Ins::Shl { dst: 3, src: Operand::Temp(2), amount: 1 },
                Ins::Output { src: Operand::Temp(3) },
            ]
        );
    }

    #[test]
    fn test_shift_rev_subtracts_from_input() {
        // -3x = x - (x << 2)
        let body = body(-3, Algorithm::BernsteinBriggs);
        assert_eq!(
            body,
            vec![
                Ins::LoadInput { dst: 0 },
                Ins::Shl { dst: 1, src: Operand::Temp(0), amount: 2 },
                Ins::Sub { dst: 2, lhs: Operand::Input, rhs: Operand::Temp(1) },
                Ins::Output { src: Operand::Temp(2) },
            ]
        );
    }

    #[test]
    fn test_binary_decomposition_shape() {
        // 5x: shift the input, accumulate in place.
        let body = body(5, Algorithm::BinaryDecomposition);
        assert_eq!(
            body,
            vec![
                Ins::LoadInput { dst: 0 },
                Ins::Shl { dst: 1, src: Operand::Input, amount: 2 },
                Ins::Add { dst: 1, lhs: Operand::Temp(1), rhs: Operand::Temp(0) },
                Ins::Output { src: Operand::Temp(1) },
            ]
        );
    }

    #[test]
    fn test_binary_decomposition_negative_appends_negate() {
        let body = body(-6, Algorithm::BinaryDecomposition);
        assert_eq!(
            body,
            vec![
                Ins::LoadInput { dst: 0 },
                Ins::Shl { dst: 1, src: Operand::Input, amount: 1 },
                Ins::Shl { dst: 2, src: Operand::Input, amount: 2 },
                Ins::Add { dst: 2, lhs: Operand::Temp(2), rhs: Operand::Temp(1) },
                Ins::Neg { dst: 3, src: Operand::Temp(2) },
                Ins::Output { src: Operand::Temp(3) },
            ]
        );
    }

    #[test]
    fn test_binary_power_of_two_is_one_shift() {
        let body = body(8, Algorithm::BinaryDecomposition);
        assert_eq!(
            body,
            vec![
                Ins::LoadInput { dst: 0 },
                Ins::Shl { dst: 1, src: Operand::Input, amount: 3 },
                Ins::Output { src: Operand::Temp(1) },
            ]
        );
    }

    #[test]
    fn test_zero_routine_loads_literal() {
        for algorithm in [Algorithm::BernsteinBriggs, Algorithm::BinaryDecomposition] {
            let (routine, summary) = build_routine(&request(0, algorithm));
            assert_eq!(summary, PlanSummary::Zero);
            assert_eq!(routine.temps, 1);
            assert_eq!(
                routine.body,
                vec![
                    Ins::LoadConst { dst: 0, value: 0 },
                    Ins::Output { src: Operand::Temp(0) },
                ]
            );
        }
    }

    #[test]
    fn test_routine_names() {
        let (routine, _) = build_routine(&request(5, Algorithm::BernsteinBriggs));
        assert_eq!(routine.name, "kmul_bb_u32_p_5");
        let (routine, _) = build_routine(&request(-3, Algorithm::BinaryDecomposition));
        assert_eq!(routine.name, "kmul_bd_s32_m_3");
    }

    #[test]
    fn test_temp_declarations() {
        let (routine, _) = build_routine(&request(5, Algorithm::BernsteinBriggs));
        assert_eq!(routine.temps, MAX_STEPS);
        let (routine, _) = build_routine(&request(5, Algorithm::BinaryDecomposition));
        assert_eq!(routine.temps, 32);
        let (routine, _) = build_routine(&request(-5, Algorithm::BinaryDecomposition));
        assert_eq!(routine.temps, 33);
    }
}

//! Operation-chain data model
//!
//! A multiplication by a constant is represented as a chain of nodes, each
//! describing how its constant is built from a smaller one: shift the parent
//! and add/subtract the input (`SHIFT_*`), or shift the parent and combine it
//! with itself (`FACTOR_*`). The chain bottoms out at the root constant 1
//! (and at -1, which is seeded as a negation of 1).

use std::fmt;

/// Operation combining a parent node's result into a new constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulOp {
    /// `n = -parent`, only used for the seeded -1 node
    Negate,
    /// `n` is odd, built from `makeOdd(n - 1)`: shift then add the input
    ShiftAdd,
    /// `n` is odd, built from `makeOdd(n + 1)`: shift then subtract the input
    ShiftSub,
    /// `n` is negative, built from `makeOdd(1 - n)`: input minus the shift
    ShiftRev,
    /// `n = parent * (2^i + 1)`: shift then add the parent itself
    FactorAdd,
    /// `n = parent * (2^i - 1)`: shift then subtract the parent itself
    FactorSub,
    /// `n = parent * (1 - 2^i)`: parent minus the shift
    FactorRev,
}

impl fmt::Display for MulOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MulOp::Negate => "negate",
            MulOp::ShiftAdd => "shift_add",
            MulOp::ShiftSub => "shift_sub",
            MulOp::ShiftRev => "shift_rev",
            MulOp::FactorAdd => "factor_add",
            MulOp::FactorSub => "factor_sub",
            MulOp::FactorRev => "factor_rev",
        };
        write!(f, "{}", name)
    }
}

/// Index of a node in the memoization store's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Resolution state of a node.
///
/// The root (constant 1) terminates emission without further recursion; a
/// derived node names the parent its constant is built from. An unresolved
/// node holds only a cost bound: either the initial shift-only baseline or,
/// after a failed search, the ceiling it could not beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Unresolved,
    Root,
    Derived { parent: NodeId, opcode: MulOp },
}

/// Best known way to synthesize one integer constant.
///
/// Values are kept as `i128` so candidate arithmetic (`c + 1`, `target +
/// source`, divisor scans) cannot overflow even for constants at the edges
/// of the 64-bit range.
#[derive(Debug, Clone)]
pub struct Node {
    pub value: i128,
    pub cost: i32,
    pub kind: NodeKind,
}

impl Node {
    /// A node is resolved once a chain has been committed for it; resolved
    /// nodes are never revisited, even under a looser budget.
    pub fn is_resolved(&self) -> bool {
        !matches!(self.kind, NodeKind::Unresolved)
    }
}

/// Per-operation cost table.
///
/// `mult` is the cost of a native multiply instruction: the budget any
/// synthesized chain has to beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostModel {
    pub add: i32,
    pub sub: i32,
    pub neg: i32,
    pub shift: i32,
    pub mult: i32,
}

impl Default for CostModel {
    fn default() -> Self {
        // Shifts are assumed free (fused with the following ALU op).
        CostModel { add: 1, sub: 1, neg: 1, shift: 0, mult: 8 }
    }
}

impl CostModel {
    /// Cost of one chain step.
    pub fn op_cost(&self, opcode: MulOp) -> i32 {
        match opcode {
            MulOp::Negate => self.neg,
            MulOp::ShiftAdd | MulOp::FactorAdd => self.shift + self.add,
            MulOp::ShiftSub | MulOp::ShiftRev | MulOp::FactorSub | MulOp::FactorRev => {
                self.shift + self.sub
            }
        }
    }
}

//! Cost-bounded search for multiplication chains
//!
//! A restricted variant of the Bernstein-Briggs algorithm: for each constant
//! the search tries the two `makeOdd` shift decompositions plus divisors of
//! the form `2^i ± 1`, memoizing results per request. The search is bounded
//! by a cost ceiling; a candidate is only accepted if it comes in strictly
//! below the budget remaining after its own step cost.
//!
//! Resolution is final: once a node has a committed chain it is never
//! improved, even if a later call passes a looser limit. A constant resolved
//! early under a tight limit can therefore block a cheaper chain from being
//! found later; this tie-breaking behavior is part of the output contract
//! and must not be "fixed".

use std::collections::HashMap;

use crate::chain::{CostModel, MulOp, Node, NodeId, NodeKind};

/// Strip factors of two from `c`, truncating toward zero.
///
/// `c` must be nonzero. The result is odd, and `c / make_odd(c)` is a power
/// of two (2^0 when `c` is already odd).
pub fn make_odd(mut c: i128) -> i128 {
    debug_assert!(c != 0);
    while c % 2 == 0 {
        c /= 2;
    }
    c
}

/// Outcome of planning one top-level constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// A chain cheaper than the native multiply was found. For even targets
    /// the root resolves `make_odd(target)`; the emitter appends the
    /// remaining shift.
    Chain { root: NodeId, cost: i32 },
    /// Nothing beat the budget; the caller should use a native multiply.
    Native,
}

/// One link of a committed chain, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    pub value: i128,
    /// `None` for the root constant 1.
    pub opcode: Option<MulOp>,
    pub cost: i32,
}

/// Request-scoped search engine: memoization store plus cost table.
///
/// Each synthesis request owns its own `Searcher`; nothing is shared, so
/// concurrent requests cannot observe each other's partial state.
pub struct Searcher {
    nodes: Vec<Node>,
    index: HashMap<i128, NodeId>,
    costs: CostModel,
}

impl Searcher {
    /// Create a fresh store and seed the two base cases: 1 resolves to the
    /// root at cost 0, -1 to a negation of it.
    pub fn new(costs: CostModel) -> Self {
        let mut searcher = Searcher { nodes: Vec::new(), index: HashMap::new(), costs };
        let one = searcher.lookup_or_create(1);
        searcher.nodes[one.0].kind = NodeKind::Root;
        searcher.nodes[one.0].cost = 0;
        let minus_one = searcher.lookup_or_create(-1);
        searcher.nodes[minus_one.0].kind =
            NodeKind::Derived { parent: one, opcode: MulOp::Negate };
        searcher.nodes[minus_one.0].cost = costs.neg;
        searcher
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Return the node for `c`, creating an unresolved one on first sight.
    /// New nodes start at the shift-only baseline cost, the cheapest
    /// conceivable result, so they compare as cheaper than any real limit
    /// until a search has run.
    fn lookup_or_create(&mut self, c: i128) -> NodeId {
        if let Some(&id) = self.index.get(&c) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { value: c, cost: self.costs.shift, kind: NodeKind::Unresolved });
        self.index.insert(c, id);
        id
    }

    /// Resolve `c` if a chain strictly cheaper than `limit` exists.
    ///
    /// Already-resolved nodes are returned unchanged regardless of `limit`.
    /// Otherwise the node's cost is raised to `limit` as a ceiling before
    /// the candidates run; each accepted candidate lowers it again. If none
    /// succeeds the cost stays at the ceiling, marking the dead end for
    /// this search level.
    pub fn find_sequence(&mut self, c: i128, limit: i32) -> NodeId {
        let id = self.lookup_or_create(c);
        if self.nodes[id.0].is_resolved() || self.nodes[id.0].cost >= limit {
            return id;
        }
        self.nodes[id.0].cost = limit;

        // Candidate order is significant: try_factor only replaces a
        // strictly cheaper chain, so ties go to the earliest candidate.
        if c > 0 {
            let edge = c >> 1;
            let mut power: i128 = 4;
            while power < edge {
                if c % (power - 1) == 0 {
                    self.try_factor(c / (power - 1), id, MulOp::FactorSub);
                }
                if c % (power + 1) == 0 {
                    self.try_factor(c / (power + 1), id, MulOp::FactorAdd);
                }
                power <<= 1;
            }
            self.try_factor(make_odd(c - 1), id, MulOp::ShiftAdd);
            self.try_factor(make_odd(c + 1), id, MulOp::ShiftSub);
        } else {
            let edge = (-c) >> 1;
            let mut power: i128 = 4;
            while power < edge {
                if c % (1 - power) == 0 {
                    self.try_factor(c / (1 - power), id, MulOp::FactorRev);
                }
                if c % (power + 1) == 0 {
                    self.try_factor(c / (power + 1), id, MulOp::FactorAdd);
                }
                power <<= 1;
            }
            self.try_factor(make_odd(1 - c), id, MulOp::ShiftRev);
            self.try_factor(make_odd(c + 1), id, MulOp::ShiftSub);
        }
        id
    }

    /// Try building `node` from `factor` via `opcode`: recurse with the
    /// budget left after this step's own cost, and commit only if the
    /// factor resolved strictly below that sub-limit.
    fn try_factor(&mut self, factor: i128, id: NodeId, opcode: MulOp) {
        let step = self.costs.op_cost(opcode);
        let limit = self.nodes[id.0].cost - step;
        let factor_id = self.find_sequence(factor, limit);
        let factor_node = &self.nodes[factor_id.0];
        if factor_node.is_resolved() && factor_node.cost < limit {
            let cost = factor_node.cost + step;
            let node = &mut self.nodes[id.0];
            node.kind = NodeKind::Derived { parent: factor_id, opcode };
            node.cost = cost;
        }
    }

    /// Plan the top-level constant against the native-multiply budget.
    ///
    /// Odd targets are resolved directly; even targets resolve their odd
    /// part against the budget minus one trailing shift. `target` must be
    /// nonzero (the zero routine never searches).
    pub fn plan(&mut self, target: i128) -> Plan {
        debug_assert!(target != 0);
        let budget = self.costs.mult;
        if target % 2 != 0 {
            let id = self.find_sequence(target, budget);
            let node = &self.nodes[id.0];
            if node.is_resolved() && node.cost < budget {
                Plan::Chain { root: id, cost: node.cost }
            } else {
                Plan::Native
            }
        } else {
            let id = self.find_sequence(make_odd(target), budget - self.costs.shift);
            let node = &self.nodes[id.0];
            if node.is_resolved() && node.cost + self.costs.shift < budget {
                Plan::Chain { root: id, cost: node.cost }
            } else {
                Plan::Native
            }
        }
    }

    /// Walk a resolved chain from the root outward, for diagnostics.
    pub fn chain_steps(&self, root: NodeId) -> Vec<ChainStep> {
        let mut steps = Vec::new();
        let mut id = root;
        loop {
            let node = &self.nodes[id.0];
            match node.kind {
                NodeKind::Root => {
                    steps.push(ChainStep { value: node.value, opcode: None, cost: node.cost });
                    break;
                }
                NodeKind::Derived { parent, opcode } => {
                    steps.push(ChainStep {
                        value: node.value,
                        opcode: Some(opcode),
                        cost: node.cost,
                    });
                    id = parent;
                }
                NodeKind::Unresolved => break,
            }
        }
        steps.reverse();
        steps
    }
}

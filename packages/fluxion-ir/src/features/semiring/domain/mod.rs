/*
 * Semiring Domain Interface
 *
 * The algebra every equation system is solved over. `combine` is the
 * additive join, `extend(a, b)` the multiplicative composition "apply a
 * after b". Domains are closed at compile time of each analysis
 * instantiation: solvers take `D: Semiring` as a generic parameter, so no
 * virtual dispatch sits on the evaluation hot path.
 *
 * Laws the solvers rely on:
 *   - combine is associative and commutative with zero as identity
 *   - extend distributes over combine on both sides
 *   - zero annihilates extend
 *   - combine is idempotent iff IDEMPOTENT
 *   - subtract is consulted only when IDEMPOTENT is false
 */

use std::fmt::Debug;

pub mod bool_domain;
pub mod counting;
pub mod gen_kill;
pub mod taint_transfer;
pub mod tropical;

pub use bool_domain::BoolDomain;
pub use counting::CountingDomain;
pub use gen_kill::{GenKillDomain, GenKillTransfer};
pub use taint_transfer::{TaintTransfer, TaintTransferDomain};
pub use tropical::TropicalDomain;

/// A partially-ordered, possibly non-idempotent semiring.
///
/// Methods take `&self` so a domain instance can carry configuration (the
/// gen/kill domain carries its bit width). Domain operations are total;
/// a domain that cannot represent an operation picks a safe
/// over-approximation rather than failing.
pub trait Semiring {
    type Value: Clone + Debug;
    type Test: Clone + Debug;

    /// Whether `combine(x, x) = x`. Idempotent domains let Newton replace
    /// the previous approximation instead of accumulating differences.
    const IDEMPOTENT: bool;

    fn zero(&self) -> Self::Value;
    fn one(&self) -> Self::Value;

    fn equal(&self, a: &Self::Value, b: &Self::Value) -> bool;

    fn combine(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// `extend(a, b)` applies `a` after `b`.
    fn extend(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// Linear extension used during linearization. Coincides with `extend`
    /// unless the domain exploits linearity (e.g. matrix forms).
    fn extend_lin(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        self.extend(a, b)
    }

    /// Nondeterministic choice. Defaults to `combine`; override to record
    /// provenance.
    fn ndet_combine(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        self.combine(a, b)
    }

    /// Guarded choice. The default collapses to `combine`, the safe
    /// over-approximation when the guard is abstract.
    fn cond_combine(&self, _test: &Self::Test, t: &Self::Value, e: &Self::Value) -> Self::Value {
        self.combine(t, e)
    }

    /// Difference, consulted only by non-idempotent Newton steps. The
    /// default returns the minuend unchanged, for domains without a
    /// meaningful difference.
    fn subtract(&self, a: &Self::Value, _b: &Self::Value) -> Self::Value {
        a.clone()
    }

    /// Human-readable rendering for reports.
    fn display(&self, v: &Self::Value) -> String {
        format!("{v:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Distributivity and annihilation spot-checks across the shipped
    // domains; each domain module carries its own specific tests.
    fn laws<D: Semiring>(dom: &D, samples: &[D::Value]) {
        let zero = dom.zero();
        for a in samples {
            for b in samples {
                for c in samples {
                    let lhs = dom.extend(a, &dom.combine(b, c));
                    let rhs = dom.combine(&dom.extend(a, b), &dom.extend(a, c));
                    assert!(dom.equal(&lhs, &rhs), "left distributivity violated");
                }
                assert!(dom.equal(&dom.combine(a, &zero), a));
            }
            assert!(dom.equal(&dom.extend(a, &zero), &zero));
            assert!(dom.equal(&dom.extend(&zero, a), &zero));
        }
    }

    #[test]
    fn bool_domain_laws() {
        let dom = BoolDomain;
        laws(&dom, &[false, true]);
    }

    #[test]
    fn tropical_domain_laws() {
        let dom = TropicalDomain;
        laws(
            &dom,
            &[dom.zero(), dom.one(), TropicalDomain::weight(3), TropicalDomain::weight(10)],
        );
    }
}

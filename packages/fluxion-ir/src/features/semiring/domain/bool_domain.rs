//! Boolean reachability semiring: `(⊥ ∨ ⊤, ∨, ∧)`, idempotent.

use super::Semiring;

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolDomain;

impl Semiring for BoolDomain {
    type Value = bool;
    type Test = bool;

    const IDEMPOTENT: bool = true;

    fn zero(&self) -> bool {
        false
    }

    fn one(&self) -> bool {
        true
    }

    fn equal(&self, a: &bool, b: &bool) -> bool {
        a == b
    }

    fn combine(&self, a: &bool, b: &bool) -> bool {
        *a || *b
    }

    fn extend(&self, a: &bool, b: &bool) -> bool {
        *a && *b
    }

    fn display(&self, v: &bool) -> String {
        if *v { "⊤".into() } else { "⊥".into() }
    }
}

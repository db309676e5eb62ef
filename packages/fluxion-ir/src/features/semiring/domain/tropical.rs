//! Tropical semiring: shortest-path weights with `min` as combine and
//! saturating `+` as extend. Idempotent; `zero` is unreachable (∞).

use super::Semiring;

/// Weight: `None` is ∞ (unreachable), `Some(n)` a finite path weight.
pub type Weight = Option<u64>;

#[derive(Debug, Clone, Copy, Default)]
pub struct TropicalDomain;

impl TropicalDomain {
    pub fn weight(n: u64) -> Weight {
        Some(n)
    }
}

impl Semiring for TropicalDomain {
    type Value = Weight;
    type Test = bool;

    const IDEMPOTENT: bool = true;

    fn zero(&self) -> Weight {
        None
    }

    fn one(&self) -> Weight {
        Some(0)
    }

    fn equal(&self, a: &Weight, b: &Weight) -> bool {
        a == b
    }

    fn combine(&self, a: &Weight, b: &Weight) -> Weight {
        match (a, b) {
            (None, w) | (w, None) => *w,
            (Some(x), Some(y)) => Some(*x.min(y)),
        }
    }

    fn extend(&self, a: &Weight, b: &Weight) -> Weight {
        match (a, b) {
            (Some(x), Some(y)) => Some(x.saturating_add(*y)),
            _ => None,
        }
    }

    fn display(&self, v: &Weight) -> String {
        match v {
            Some(n) => n.to_string(),
            None => "∞".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_takes_min() {
        let dom = TropicalDomain;
        assert_eq!(dom.combine(&Some(5), &Some(3)), Some(3));
        assert_eq!(dom.combine(&None, &Some(3)), Some(3));
    }

    #[test]
    fn extend_adds_and_saturates() {
        let dom = TropicalDomain;
        assert_eq!(dom.extend(&Some(2), &Some(3)), Some(5));
        assert_eq!(dom.extend(&Some(u64::MAX), &Some(1)), Some(u64::MAX));
        assert_eq!(dom.extend(&None, &Some(3)), None);
    }
}

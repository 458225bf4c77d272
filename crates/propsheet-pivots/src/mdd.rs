//! Canonical form of a pivot expression as a reduced, ordered decision diagram.
//!
//! Pivots are tested in declaration order. Each pivot has one branch per choice plus a
//! last branch for "unset". Branches leading to the same result are merged, so two
//! expressions are equivalent exactly when their diagrams are equal.

use crate::expression::Expr;
use indexmap::IndexMap;
use itertools::Itertools;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Mdd {
    Constant(bool),
    Branch { pivot: usize, children: Vec<Mdd> },
}

impl Mdd {
    /// `domains[p]` is the number of choices of pivot `p`, not counting unset.
    pub(crate) fn build(expr: &Expr, domains: &[usize]) -> Mdd {
        build_from(expr, domains, 0)
    }

    /// `assignment[p]` is a choice index; `domains[p]` (or anything missing) is unset.
    #[cfg(test)]
    pub(crate) fn evaluate(&self, assignment: &[usize], domains: &[usize]) -> bool {
        let mut node = self;
        loop {
            match node {
                Mdd::Constant(b) => return *b,
                Mdd::Branch { pivot, children } => {
                    let unset = domains.get(*pivot).copied().unwrap_or_default();
                    let value = assignment.get(*pivot).copied().unwrap_or(unset).min(unset);
                    match children.get(value) {
                        Some(child) => node = child,
                        None => return false,
                    }
                }
            }
        }
    }

    /// Turn the diagram back into a boolean term over choice sets.
    pub(crate) fn to_term(&self, domains: &[usize]) -> Term {
        match self {
            Mdd::Constant(b) => Term::Constant(*b),
            Mdd::Branch { pivot, children } => {
                let unset = domains.get(*pivot).copied().unwrap_or_default();
                let mut groups: IndexMap<&Mdd, Vec<usize>> = IndexMap::new();
                for (value, child) in children.iter().enumerate() {
                    groups.entry(child).or_default().push(value);
                }

                let mut branches = vec![];
                for (child, values) in groups {
                    if *child == Mdd::Constant(false) {
                        continue;
                    }
                    let literal = Term::literal(*pivot, &values, unset);
                    branches.push(match child.to_term(domains) {
                        Term::Constant(true) => literal,
                        Term::And(rest) => Term::And(std::iter::once(literal).chain(rest).collect()),
                        rest => Term::And(vec![literal, rest]),
                    });
                }

                match branches.len() {
                    0 => Term::Constant(false),
                    1 => branches.remove(0),
                    _ => Term::Or(branches),
                }
            }
        }
    }
}

fn build_from(expr: &Expr, domains: &[usize], first: usize) -> Mdd {
    if let Some(b) = expr.as_constant() {
        return Mdd::Constant(b);
    }

    let Some(pivot) = (first..domains.len()).find(|&p| expr.mentions(p)) else {
        return Mdd::Constant(expr.evaluate(&[]));
    };

    let children = (0..=domains[pivot])
        .map(|value| build_from(&expr.restrict(pivot, value), domains, pivot + 1))
        .collect_vec();

    if children.iter().all_equal() {
        return children
            .into_iter()
            .next()
            .unwrap_or(Mdd::Constant(false));
    }
    Mdd::Branch { pivot, children }
}

/// A rendered-ready boolean term. Literals test a pivot against a set of choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Term {
    Constant(bool),
    /// `pivot` is one of `choices`, or with `negated`, none of them (unset included).
    Is {
        pivot: usize,
        choices: Vec<usize>,
        negated: bool,
    },
    And(Vec<Term>),
    Or(Vec<Term>),
}

impl Term {
    fn literal(pivot: usize, values: &[usize], unset: usize) -> Term {
        if values.contains(&unset) {
            Term::Is {
                pivot,
                choices: (0..unset).filter(|c| !values.contains(c)).collect(),
                negated: true,
            }
        } else {
            Term::Is {
                pivot,
                choices: values.to_vec(),
                negated: false,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::expression::Expr;
    use crate::mdd::{Mdd, Term};
    use pretty_assertions::assert_eq;

    fn lit(pivot: usize, choice: usize) -> Expr {
        Expr::Choice { pivot, choice }
    }

    fn not(e: Expr) -> Expr {
        Expr::Not(Box::new(e))
    }

    const DOMAINS: &[usize] = &[2, 2];

    #[test]
    fn operand_order_does_not_matter() {
        let a = Expr::And(vec![lit(0, 0), lit(1, 1)]);
        let b = Expr::And(vec![lit(1, 1), lit(0, 0)]);

        assert_eq!(Mdd::build(&a, DOMAINS), Mdd::build(&b, DOMAINS));
    }

    #[test]
    fn de_morgan() {
        let a = not(Expr::Or(vec![lit(0, 0), lit(1, 0)]));
        let b = Expr::And(vec![not(lit(0, 0)), not(lit(1, 0))]);

        assert_eq!(Mdd::build(&a, DOMAINS), Mdd::build(&b, DOMAINS));
    }

    #[test]
    fn tautology_collapses() {
        let e = Expr::Or(vec![lit(0, 0), not(lit(0, 0))]);
        assert_eq!(Mdd::build(&e, DOMAINS), Mdd::Constant(true));

        let e = Expr::And(vec![lit(0, 0), lit(0, 1)]);
        assert_eq!(Mdd::build(&e, DOMAINS), Mdd::Constant(false));
    }

    #[test]
    fn negation_includes_unset() {
        let mdd = Mdd::build(&not(lit(0, 0)), DOMAINS);

        assert!(!mdd.evaluate(&[0], DOMAINS));
        assert!(mdd.evaluate(&[1], DOMAINS));
        assert!(mdd.evaluate(&[], DOMAINS));
        assert_eq!(
            mdd.to_term(DOMAINS),
            Term::Is {
                pivot: 0,
                choices: vec![0],
                negated: true
            }
        );
    }

    #[test]
    fn terms_group_choices() {
        let e = Expr::And(vec![Expr::Or(vec![lit(0, 0), lit(0, 1)]), lit(1, 0)]);

        assert_eq!(
            Mdd::build(&e, DOMAINS).to_term(DOMAINS),
            Term::And(vec![
                Term::Is {
                    pivot: 0,
                    choices: vec![0, 1],
                    negated: false
                },
                Term::Is {
                    pivot: 1,
                    choices: vec![0],
                    negated: false
                },
            ])
        );
    }
}

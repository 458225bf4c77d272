use crate::errors::{PivotError, PivotResult};
use crate::expression::{Expr, ExpressionParser};
use crate::mdd::Mdd;
use crate::pivot::Pivot;
use crate::render::{render, Target};
use fxhash::FxHashMap;
use indexmap::{IndexMap, IndexSet};
use propsheet_view::View;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;
use tracing::{debug, trace};

struct Compiled {
    expr: Expr,
    mdd: Mdd,
}

/// The pivots of one packaging session, with the expressions compiled so far.
///
/// Equivalent expressions share one canonical form no matter how they are written:
///
/// ```ignore
/// assert_eq!(pivots.compile(r"x86\debug", Target::Path)?, "x86/debug");
/// assert_eq!(pivots.compile(r"debug\x86", Target::Path)?, "x86/debug");
/// ```
pub struct Pivots {
    package: String,
    pivots: Vec<Pivot>,
    domains: Vec<usize>,
    compiled: RefCell<FxHashMap<String, Rc<Compiled>>>,
    rendered: RefCell<FxHashMap<(String, Target), String>>,
    canonical: RefCell<IndexMap<Mdd, String>>,
    used: RefCell<IndexSet<(usize, usize)>>,
}

impl Debug for Pivots {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pivots")
            .field("package", &self.package)
            .field("pivots", &self.pivots)
            .field("compiled", &self.compiled.borrow().len())
            .field("canonical", &self.canonical.borrow().values().collect::<Vec<_>>())
            .finish()
    }
}

/// Marks an expression that is already an MSBuild condition.
const RAW_CONDITION: &str = "$(";

impl Pivots {
    /// Every child of `configurations` is one pivot.
    pub fn new<S: Into<String>>(configurations: View<'_>, package: S) -> PivotResult<Pivots> {
        let pivots = configurations
            .children()?
            .into_iter()
            .map(Pivot::from_view)
            .collect::<PivotResult<Vec<_>>>()?;
        Ok(Pivots::from_pivots(pivots, package))
    }

    /// Pivots from the `configurations` child of `root`.
    pub fn from_root<S: Into<String>>(root: View<'_>, package: S) -> PivotResult<Pivots> {
        match root.get("configurations")? {
            Some(configurations) => Pivots::new(configurations, package),
            None => Err(PivotError::MissingConfigurations),
        }
    }

    pub fn from_pivots<S: Into<String>>(pivots: Vec<Pivot>, package: S) -> Pivots {
        let package = package.into();
        debug!(
            %package,
            pivots = ?pivots.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            "pivots"
        );
        Pivots {
            package,
            domains: pivots.iter().map(|p| p.choices.len()).collect(),
            pivots,
            compiled: RefCell::default(),
            rendered: RefCell::default(),
            canonical: RefCell::default(),
            used: RefCell::default(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn pivots(&self) -> &[Pivot] {
        &self.pivots
    }

    pub fn pivot(&self, name: &str) -> Option<&Pivot> {
        self.pivots
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Choice names first, then aliases; pivots in declaration order, first match wins.
    fn resolve(&self, token: &str, expression: &str) -> PivotResult<(usize, usize)> {
        let found = self
            .pivots
            .iter()
            .enumerate()
            .find_map(|(p, pivot)| pivot.choice_index(token).map(|c| (p, c)))
            .or_else(|| {
                self.pivots
                    .iter()
                    .enumerate()
                    .find_map(|(p, pivot)| pivot.alias_index(token).map(|c| (p, c)))
            });

        match found {
            Some(literal) => {
                self.used.borrow_mut().insert(literal);
                Ok(literal)
            }
            None => Err(PivotError::UnknownChoice {
                token: token.to_string(),
                expression: expression.to_string(),
            }),
        }
    }

    fn compiled(&self, expression: &str) -> PivotResult<Rc<Compiled>> {
        if expression.contains(RAW_CONDITION) {
            return Err(PivotError::NotEvaluable {
                expression: expression.to_string(),
            });
        }
        if let Some(compiled) = self.compiled.borrow().get(expression) {
            trace!(expression, "compiled expression cache hit");
            return Ok(compiled.clone());
        }

        let expr = ExpressionParser::new(expression, |token: &str| {
            self.resolve(token, expression)
        })
        .parse()?;
        let mdd = Mdd::build(&expr, &self.domains);

        {
            let mut canonical = self.canonical.borrow_mut();
            if !canonical.contains_key(&mdd) {
                let label = render(
                    &mdd.to_term(&self.domains),
                    Target::Label,
                    &self.pivots,
                    &self.package,
                );
                debug!(expression, canonical = %label, "new canonical expression");
                canonical.insert(mdd.clone(), label);
            }
        }

        let compiled = Rc::new(Compiled { expr, mdd });
        self.compiled
            .borrow_mut()
            .insert(expression.to_string(), compiled.clone());
        Ok(compiled)
    }

    /// Render `expression` for `target`. An expression that already contains an MSBuild
    /// property reference is returned as written.
    pub fn compile(&self, expression: &str, target: Target) -> PivotResult<String> {
        if expression.contains(RAW_CONDITION) {
            return Ok(expression.to_string());
        }

        let key = (expression.to_string(), target);
        if let Some(rendered) = self.rendered.borrow().get(&key) {
            return Ok(rendered.clone());
        }

        let compiled = self.compiled(expression)?;
        let rendered = render(
            &compiled.mdd.to_term(&self.domains),
            target,
            &self.pivots,
            &self.package,
        );
        self.rendered.borrow_mut().insert(key, rendered.clone());
        Ok(rendered)
    }

    pub fn path(&self, expression: &str) -> PivotResult<String> {
        self.compile(expression, Target::Path)
    }

    pub fn label(&self, expression: &str) -> PivotResult<String> {
        self.compile(expression, Target::Label)
    }

    pub fn msbuild(&self, expression: &str) -> PivotResult<String> {
        self.compile(expression, Target::MsBuild)
    }

    /// The canonical label of the bucket `expression` belongs to.
    pub fn canonical(&self, expression: &str) -> PivotResult<String> {
        let compiled = self.compiled(expression)?;
        Ok(self
            .canonical
            .borrow()
            .get(&compiled.mdd)
            .cloned()
            .unwrap_or_default())
    }

    /// Every distinct canonical form seen so far, in the order first seen.
    pub fn canonical_expressions(&self) -> Vec<String> {
        self.canonical.borrow().values().cloned().collect()
    }

    pub fn equivalent(&self, a: &str, b: &str) -> PivotResult<bool> {
        Ok(self.compiled(a)?.mdd == self.compiled(b)?.mdd)
    }

    /// Evaluate `expression` with the given `(pivot, choice)` settings; pivots not named
    /// are unset. Choices may be given by alias.
    pub fn matches(&self, expression: &str, assignment: &[(&str, &str)]) -> PivotResult<bool> {
        let mut values = self.domains.clone();
        for (pivot, choice) in assignment {
            let index = self
                .pivots
                .iter()
                .position(|p| p.name.eq_ignore_ascii_case(pivot))
                .ok_or_else(|| PivotError::UnknownPivot {
                    name: pivot.to_string(),
                })?;
            let p = &self.pivots[index];
            values[index] = p
                .choice_index(choice)
                .or_else(|| p.alias_index(choice))
                .ok_or_else(|| PivotError::UnknownChoice {
                    token: choice.to_string(),
                    expression: expression.to_string(),
                })?;
        }

        Ok(self.compiled(expression)?.expr.evaluate(&values))
    }

    /// Choices of `pivot` referenced by any expression compiled so far.
    pub fn used_choices(&self, pivot: &str) -> Vec<String> {
        let Some(index) = self
            .pivots
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(pivot))
        else {
            return vec![];
        };
        let used = self.used.borrow();
        self.pivots[index]
            .choices
            .iter()
            .enumerate()
            .filter(|(c, _)| used.contains(&(index, *c)))
            .map(|(_, choice)| choice.name.clone())
            .collect()
    }
}

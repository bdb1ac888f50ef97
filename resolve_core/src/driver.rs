//! Driver: runs the builder, invokes the solver with the branch heuristic,
//! and on unsatisfiability re-runs in diagnostic ("closest match") mode so
//! failures can be explained.

use crate::builder::{BuiltProblem, VarLabel};
use crate::assembly::ResultAssembly;
use crate::decider::Decider;
use crate::error::Error;
use crate::model::Implementation;
use crate::provider::{derive_root, ImplementationProvider, Requirements, RootRequirement};
use crate::sat::{Literal, ReasonTree};
use crate::selections::SelectionsDocument;
use std::rc::Rc;

use crate::builder::ProblemBuilder;

fn do_solve(
    provider: &dyn ImplementationProvider,
    root: &RootRequirement,
    closest_match: bool,
) -> Option<BuiltProblem> {
    let builder = ProblemBuilder::new(provider, closest_match);
    let mut problem = builder.build(root);
    let decider = Decider::new(provider, &problem.iface_cache, &problem.command_cache, root);
    let sat = problem.engine.run_solver(&mut |engine| decider.next(engine));
    if sat {
        Some(problem)
    } else {
        None
    }
}

/// Solves `requirements` against `provider`, retrying in diagnostic mode on
/// failure. `provider` is assumed already scoped/filtered by the caller (the
/// provider's ranking policy is an external collaborator, out of scope
/// here); `has_ld_linux_so_2` feeds [`derive_root`]'s multi-arch decision.
pub fn solve_for<'p>(
    requirements: &Requirements,
    provider: &'p dyn ImplementationProvider,
    has_ld_linux_so_2: bool,
) -> Result<SolveResult<'p>, Error> {
    let (_scope, root) = derive_root(requirements, has_ld_linux_so_2);

    if let Some(problem) = do_solve(provider, &root, false) {
        log::debug!("solved for interface {} without diagnostics", root.iface());
        return Ok(SolveResult {
            ok: true,
            problem,
            root,
            provider,
            requirements: requirements.clone(),
        });
    }

    log::warn!(
        "no solution for interface {}; retrying with closest-match diagnostics",
        root.iface()
    );
    match do_solve(provider, &root, true) {
        Some(problem) => Ok(SolveResult {
            ok: false,
            problem,
            root,
            provider,
            requirements: requirements.clone(),
        }),
        None => Err(Error::DiagnosticUnsat),
    }
}

/// The outcome of a solve: `ok` tells a caller whether this came from the
/// first (real) pass or the diagnostic fallback.
pub struct SolveResult<'p> {
    ok: bool,
    problem: BuiltProblem,
    root: RootRequirement,
    provider: &'p dyn ImplementationProvider,
    requirements: Requirements,
}

impl<'p> SolveResult<'p> {
    pub fn ok(&self) -> bool {
        self.ok
    }

    pub fn get_selections(&self) -> SelectionsDocument {
        ResultAssembly::new(self.provider, &self.problem).assemble(&self.root)
    }

    /// The selected implementation for `iface`, or `None` if it wasn't
    /// selected or the selection is the dummy implementation.
    pub fn get_selected(&self, iface: &str) -> Option<Rc<Implementation>> {
        let set = self.problem.iface_cache.get(&iface.to_string())?;
        let imp = set.selected_member(&self.problem.engine)?.clone();
        (!imp.is_dummy()).then_some(imp)
    }

    pub fn implementations(&self) -> Vec<(String, Option<(Literal, Rc<Implementation>)>)> {
        self.problem
            .iface_cache
            .bindings()
            .into_iter()
            .map(|(iface, set)| {
                let selected = set
                    .handle()
                    .and_then(|handle| self.problem.engine.get_selected(handle))
                    .and_then(|lit| set.selected_member(&self.problem.engine).map(|imp| (lit, imp.clone())));
                (iface, selected)
            })
            .collect()
    }

    pub fn impl_provider(&self) -> &'p dyn ImplementationProvider {
        self.provider
    }

    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    /// Explains why `lit` is forced false. Only meaningful when `self.ok()`
    /// is `false` (a closest-match solve).
    pub fn explain(&self, lit: Literal) -> ReasonTree {
        self.problem.engine.explain_reason(lit)
    }
}

// VarLabel only needs to be nameable here for `ReasonTree`'s payload bound;
// re-exported so downstream crates don't need to import `builder` directly.
pub type Reason = VarLabel;

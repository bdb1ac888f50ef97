use crate::sat::assignment::{Assignment, Reason};
use crate::sat::clause::{AmoId, ClauseDb, ClauseId};
use crate::sat::literal::{Literal, Sign, Variable};
use ahash::AHashSet as HashSet;
use bounded::Index as _;

/// The governing handle for an at-most-one group, returned by
/// [`SatEngine::at_most_one`]. Lets callers (the decider, result assembly)
/// ask which of the group's literals is currently selected or which is the
/// best undecided candidate, without re-walking the whole group themselves.
pub type ClauseHandle = AmoId;

/// A node in the explanation tree returned by [`SatEngine::explain_reason`].
/// Only meaningful in diagnostic (closest-match) solves.
#[derive(Debug, Clone)]
pub struct ReasonTree {
    pub literal: Literal,
    pub detail: String,
    pub children: Vec<ReasonTree>,
}

/// A boolean-constraint solver specialized to the clause shapes the
/// component-selection problem needs: at-most-one groups, implications, and
/// plain disjunctions. Generalizes the reference `s3-sat-solver`'s
/// `Assignment` + `ClauseDb` + `OccurrenceMap` trio (which only ever needed
/// plain CNF) to also track at-most-one groups directly, and attaches a
/// caller-chosen payload to every variable.
#[derive(Debug, Default, Clone)]
pub struct SatEngine<P> {
    payloads: Vec<P>,
    clauses: ClauseDb,
    assignment: Assignment,
    /// Set once and for all by [`Self::at_least_one`] when asked to assert
    /// the empty disjunction -- a clause with no literals can never be
    /// satisfied, regardless of any decision the solver makes. Checked
    /// up front by [`Self::run_solver`] rather than relying on propagation
    /// to notice it, since an empty clause is never registered in any
    /// occurrence list.
    contradiction: bool,
}

impl<P> SatEngine<P> {
    pub fn new() -> Self {
        Self {
            payloads: Vec::new(),
            clauses: ClauseDb::default(),
            assignment: Assignment::default(),
            contradiction: false,
        }
    }

    /// Creates a new variable carrying `payload` and returns its positive
    /// literal.
    pub fn add_variable(&mut self, payload: P) -> Literal {
        let index = self.payloads.len();
        self.payloads.push(payload);
        self.assignment.register_variables(1);
        Variable::from_index(index).into_literal(Sign::POS)
    }

    /// Returns the negation of `lit`.
    pub fn neg(&self, lit: Literal) -> Literal {
        !lit
    }

    /// Asserts that at most one of `lits` may be true. Returns a handle that
    /// can later be queried for the currently selected literal or the best
    /// undecided one.
    ///
    /// If `lits` is empty the returned handle governs no literals;
    /// `get_selected`/`get_best_undecided` always return `None` for it.
    pub fn at_most_one(&mut self, lits: Vec<Literal>) -> ClauseHandle {
        let id = self.clauses.push_amo(lits.clone());
        self.assignment.register_amo(id, &lits);
        id
    }

    /// Asserts the disjunction of `lits`, annotated with `reason` for later
    /// diagnostics. An empty `lits` asserts the empty clause, which can
    /// never be satisfied; recorded as a standing contradiction rather than
    /// left to (never) propagate, since an empty clause is never registered
    /// in any occurrence list.
    pub fn at_least_one(&mut self, lits: Vec<Literal>, reason: &'static str) {
        if lits.is_empty() {
            self.contradiction = true;
        }
        let id = self.clauses.push_clause(lits.clone(), reason);
        self.assignment.register_clause(id, &lits);
    }

    /// Asserts `a -> (b1 OR ... OR bn)`, i.e. the clause `(!a) OR b1 OR ... OR bn`.
    pub fn implies(&mut self, a: Literal, bs: Vec<Literal>, reason: &'static str) {
        let mut literals = Vec::with_capacity(bs.len() + 1);
        literals.push(!a);
        literals.extend(bs);
        let id = self.clauses.push_clause(literals.clone(), reason);
        self.assignment.register_clause(id, &literals);
    }

    /// Returns the literal of `handle`'s group currently assigned true, if any.
    pub fn get_selected(&self, handle: ClauseHandle) -> Option<Literal> {
        self.clauses
            .resolve_amo(handle)
            .literals()
            .iter()
            .copied()
            .find(|&literal| self.assignment.is_satisfied(literal) == Some(true))
    }

    /// Returns the first literal of `handle`'s group (in insertion order)
    /// that is neither forced true nor forced false.
    pub fn get_best_undecided(&self, handle: ClauseHandle) -> Option<Literal> {
        self.clauses
            .resolve_amo(handle)
            .literals()
            .iter()
            .copied()
            .find(|&literal| self.assignment.is_satisfied(literal).is_none())
    }

    /// Returns the payload attached to `lit`'s variable.
    pub fn get_user_data_for_lit(&self, lit: Literal) -> &P {
        &self.payloads[lit.variable().into_index()]
    }

    pub fn is_true(&self, lit: Literal) -> bool {
        self.assignment.is_satisfied(lit) == Some(true)
    }

    pub fn is_decided(&self, lit: Literal) -> bool {
        self.assignment.is_satisfied(lit).is_some()
    }

    /// Runs the solver: repeatedly asks `decider` for the next literal to
    /// make true, propagates it, and backtracks on conflict. `decider`
    /// returning `None` means every live obligation has been decided.
    ///
    /// Returns `true` if a satisfying assignment was found (readable
    /// afterwards through [`Self::get_selected`]/[`Self::is_true`]), `false`
    /// if the clause set is unsatisfiable.
    pub fn run_solver<D>(&mut self, decider: &mut D) -> bool
    where
        D: FnMut(&SatEngine<P>) -> Option<Literal>,
    {
        if self.contradiction {
            return false;
        }
        self.solve_rec(decider)
    }

    fn solve_rec<D>(&mut self, decider: &mut D) -> bool
    where
        D: FnMut(&SatEngine<P>) -> Option<Literal>,
    {
        let next = decider(self);
        let literal = match next {
            None => return true,
            Some(literal) => literal,
        };

        let mark = self.assignment.mark();
        if !self
            .assignment
            .decide_and_propagate(literal, &self.clauses)
            .is_conflict()
            && self.solve_rec(decider)
        {
            return true;
        }
        self.assignment.undo_to(mark);

        let mark = self.assignment.mark();
        if !self
            .assignment
            .decide_and_propagate(!literal, &self.clauses)
            .is_conflict()
            && self.solve_rec(decider)
        {
            return true;
        }
        self.assignment.undo_to(mark);
        false
    }

    /// Explains why `lit` is forced false, as a tree of reasons. Only
    /// meaningful after a diagnostic (closest-match) solve; panics if `lit`
    /// is not currently forced false.
    pub fn explain_reason(&self, lit: Literal) -> ReasonTree
    where
        P: std::fmt::Debug,
    {
        assert_eq!(
            self.assignment.is_satisfied(lit),
            Some(false),
            "explain_reason called on a literal that is not forced false"
        );
        let mut seen = HashSet::default();
        self.explain_rec(lit, &mut seen)
    }

    fn explain_rec(&self, lit: Literal, seen: &mut HashSet<Variable>) -> ReasonTree
    where
        P: std::fmt::Debug,
    {
        if !seen.insert(lit.variable()) {
            return ReasonTree {
                literal: lit,
                detail: "(already explained above)".to_string(),
                children: Vec::new(),
            };
        }
        let payload = self.get_user_data_for_lit(lit);
        match self.assignment.reason_for(lit.variable()) {
            None | Some(Reason::Decision) => ReasonTree {
                literal: lit,
                detail: format!("decided directly ({:?})", payload),
                children: Vec::new(),
            },
            Some(Reason::Clause(id)) => self.explain_clause(lit, id, payload, seen),
            Some(Reason::AtMostOne { group, forced_by }) => {
                let child = self.explain_rec(forced_by, seen);
                ReasonTree {
                    literal: lit,
                    detail: format!(
                        "excluded by at-most-one group {:?} once {:?} was selected",
                        group, forced_by
                    ),
                    children: vec![child],
                }
            }
        }
    }

    fn explain_clause(
        &self,
        lit: Literal,
        id: ClauseId,
        payload: &P,
        seen: &mut HashSet<Variable>,
    ) -> ReasonTree
    where
        P: std::fmt::Debug,
    {
        let clause = self.clauses.resolve_clause(id);
        let children = clause
            .literals()
            .iter()
            .copied()
            .filter(|&other| other != lit)
            .map(|other| self.explain_rec(!other, seen))
            .collect();
        ReasonTree {
            literal: lit,
            detail: format!("forced by clause \"{}\" ({:?})", clause.reason, payload),
            children,
        }
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }
}

use crate::sat::clause::{AmoId, ClauseDb, ClauseId};
use crate::sat::literal::{Literal, Sign, Variable};
use bounded::{BoundedMap, Index as _};

/// Why a literal ended up on the trail.
#[derive(Debug, Copy, Clone)]
pub enum Reason {
    /// Chosen directly by the decider.
    Decision,
    /// Forced because all other literals of a general clause were false.
    Clause(ClauseId),
    /// Forced false because another literal of the same at-most-one group
    /// was assigned true.
    AtMostOne { group: AmoId, forced_by: Literal },
}

/// Why propagation failed.
#[derive(Debug, Copy, Clone)]
pub enum ConflictCause {
    Clause(ClauseId),
    AtMostOne(AmoId),
}

#[derive(Debug, Copy, Clone)]
pub enum PropagationResult {
    Consistent,
    Conflict(ConflictCause),
}

impl PropagationResult {
    pub fn is_conflict(self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Occurrence lists used to find, for a literal that was just satisfied,
/// which general clauses might now be unit or conflicting (those containing
/// its negation) and which at-most-one groups must now falsify their other
/// members (those containing the literal itself).
#[derive(Debug, Default, Clone)]
struct Occurrences {
    general: Vec<ClauseId>,
    amo: Vec<AmoId>,
}

#[derive(Debug, Default, Clone)]
struct OccurrenceMap {
    /// Indexed by the packed literal value: `by_literal[lit]` holds the
    /// clauses/groups that contain exactly `lit` (not its negation).
    by_literal: Vec<Occurrences>,
}

impl OccurrenceMap {
    fn slot_index(literal: Literal) -> usize {
        literal.variable().into_index() * 2 + (literal.is_positive() as usize)
    }

    fn register_variables(&mut self, additional: usize) {
        self.by_literal
            .resize_with(self.by_literal.len() + additional * 2, Occurrences::default);
    }

    fn register_clause_literal(&mut self, literal: Literal, id: ClauseId) {
        self.by_literal[Self::slot_index(literal)].general.push(id);
    }

    fn register_amo_literal(&mut self, literal: Literal, id: AmoId) {
        self.by_literal[Self::slot_index(literal)].amo.push(id);
    }

    /// Clauses containing the negation of `literal` -- i.e. clauses that may
    /// have just lost a satisfying literal.
    fn clauses_containing_negation(&self, literal: Literal) -> &[ClauseId] {
        &self.by_literal[Self::slot_index(!literal)].general
    }

    /// At-most-one groups containing `literal` itself.
    fn amo_groups_containing(&self, literal: Literal) -> &[AmoId] {
        &self.by_literal[Self::slot_index(literal)].amo
    }
}

/// The trail of literals assigned so far, in assignment order, together with
/// enough information to undo back to any earlier point and to explain a
/// forced-false literal.
#[derive(Debug, Default, Clone)]
struct Trail {
    entries: Vec<Literal>,
    reasons: BoundedMap<Variable, Reason>,
}

impl Trail {
    fn register_variables(&mut self, additional: usize) {
        let new_len = self.reasons.capacity() + additional;
        self.reasons.resize_capacity(new_len);
    }

    fn mark(&self) -> usize {
        self.entries.len()
    }
}

/// The partial assignment together with its trail, watch/occurrence lists
/// and propagation queue. Generalizes the reference solver's
/// `Assignment` + `OccurrenceMap` + `Propagator` trio to the clause shapes
/// this engine supports (at-most-one groups and general disjunctive clauses).
#[derive(Debug, Default, Clone)]
pub struct Assignment {
    values: BoundedMap<Variable, Sign>,
    occurrences: OccurrenceMap,
    trail: Trail,
    queue: Vec<Literal>,
}

impl Assignment {
    pub fn register_variables(&mut self, additional: usize) {
        let new_len = self.values.capacity() + additional;
        self.values.resize_capacity(new_len);
        self.occurrences.register_variables(additional);
        self.trail.register_variables(additional);
    }

    pub fn register_clause(&mut self, id: ClauseId, literals: &[Literal]) {
        for &literal in literals {
            self.occurrences.register_clause_literal(literal, id);
        }
    }

    pub fn register_amo(&mut self, id: AmoId, literals: &[Literal]) {
        for &literal in literals {
            self.occurrences.register_amo_literal(literal, id);
        }
    }

    pub fn value_of(&self, variable: Variable) -> Option<Sign> {
        self.values.get(variable).expect("variable out of bounds").copied()
    }

    /// Returns `Some(true)` / `Some(false)` if the literal is determined,
    /// `None` if its variable is still unassigned.
    pub fn is_satisfied(&self, literal: Literal) -> Option<bool> {
        self.value_of(literal.variable())
            .map(|sign| sign == literal.sign())
    }

    pub fn is_unassigned(&self, variable: Variable) -> bool {
        self.value_of(variable).is_none()
    }

    pub fn reason_for(&self, variable: Variable) -> Option<Reason> {
        self.trail
            .reasons
            .get(variable)
            .expect("variable out of bounds")
            .copied()
    }

    pub fn mark(&self) -> usize {
        self.trail.mark()
    }

    /// Undoes every assignment made after `mark`.
    pub fn undo_to(&mut self, mark: usize) {
        while self.trail.entries.len() > mark {
            let literal = self.trail.entries.pop().expect("trail underflow");
            self.values
                .take(literal.variable())
                .expect("variable out of bounds");
        }
    }

    /// Assigns `literal` true for the given reason, without propagating.
    ///
    /// Returns `Err` if the variable is already assigned to the opposite
    /// polarity (a genuine conflict) or does nothing (`Ok(false)`) if it is
    /// already assigned to the same polarity.
    fn assign(&mut self, literal: Literal, reason: Reason) -> Result<bool, ConflictCause> {
        if let Some(existing) = self.value_of(literal.variable()) {
            return if existing == literal.sign() {
                Ok(false)
            } else {
                Err(match reason {
                    Reason::Clause(id) => ConflictCause::Clause(id),
                    Reason::AtMostOne { group, .. } => ConflictCause::AtMostOne(group),
                    Reason::Decision => {
                        unreachable!("a decision literal is never already assigned")
                    }
                })
            };
        }
        self.values
            .insert(literal.variable(), literal.sign())
            .expect("variable out of bounds");
        self.trail
            .reasons
            .insert(literal.variable(), reason)
            .expect("variable out of bounds");
        self.trail.entries.push(literal);
        Ok(true)
    }

    /// Assigns `literal` as a decision and propagates consequences to a
    /// fixed point.
    pub fn decide_and_propagate(
        &mut self,
        literal: Literal,
        clauses: &ClauseDb,
    ) -> PropagationResult {
        match self.assign(literal, Reason::Decision) {
            Err(cause) => return PropagationResult::Conflict(cause),
            Ok(_) => {}
        }
        self.propagate(literal, clauses)
    }

    fn propagate(&mut self, root: Literal, clauses: &ClauseDb) -> PropagationResult {
        self.queue.clear();
        self.queue.push(root);
        while let Some(literal) = self.queue.pop() {
            let amo_groups = self.occurrences.amo_groups_containing(literal).to_vec();
            for group_id in amo_groups {
                let group = clauses.resolve_amo(group_id);
                for &other in group.literals() {
                    if other == literal {
                        continue;
                    }
                    match self.is_satisfied(other) {
                        Some(true) => {
                            return PropagationResult::Conflict(ConflictCause::AtMostOne(
                                group_id,
                            ))
                        }
                        Some(false) => {}
                        None => {
                            let forced = !other;
                            match self.assign(
                                forced,
                                Reason::AtMostOne {
                                    group: group_id,
                                    forced_by: literal,
                                },
                            ) {
                                Err(cause) => return PropagationResult::Conflict(cause),
                                Ok(true) => self.queue.push(forced),
                                Ok(false) => {}
                            }
                        }
                    }
                }
            }
            let clauses_to_check = self
                .occurrences
                .clauses_containing_negation(literal)
                .to_vec();
            for clause_id in clauses_to_check {
                match self.clause_status(clause_id, clauses) {
                    ClauseStatus::Satisfied => {}
                    ClauseStatus::Conflicting => {
                        return PropagationResult::Conflict(ConflictCause::Clause(clause_id))
                    }
                    ClauseStatus::Unit(forced) => {
                        match self.assign(forced, Reason::Clause(clause_id)) {
                            Err(cause) => return PropagationResult::Conflict(cause),
                            Ok(true) => self.queue.push(forced),
                            Ok(false) => {}
                        }
                    }
                    ClauseStatus::Undetermined => {}
                }
            }
        }
        PropagationResult::Consistent
    }

    fn clause_status(&self, id: ClauseId, clauses: &ClauseDb) -> ClauseStatus {
        let clause = clauses.resolve_clause(id);
        let mut undetermined = None;
        let mut undetermined_count = 0;
        for &literal in clause.literals() {
            match self.is_satisfied(literal) {
                Some(true) => return ClauseStatus::Satisfied,
                Some(false) => {}
                None => {
                    undetermined = Some(literal);
                    undetermined_count += 1;
                }
            }
        }
        match undetermined_count {
            0 => ClauseStatus::Conflicting,
            1 => ClauseStatus::Unit(undetermined.expect("counted exactly one")),
            _ => ClauseStatus::Undetermined,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Variable, Sign)> + '_ {
        AssignmentIter {
            values: &self.values,
            current: 0,
            len: self.values.capacity(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ClauseStatus {
    Satisfied,
    Conflicting,
    Unit(Literal),
    Undetermined,
}

struct AssignmentIter<'a> {
    values: &'a BoundedMap<Variable, Sign>,
    current: usize,
    len: usize,
}

impl<'a> Iterator for AssignmentIter<'a> {
    type Item = (Variable, Sign);

    fn next(&mut self) -> Option<Self::Item> {
        while self.current < self.len {
            let variable = Variable::from_index(self.current);
            self.current += 1;
            if let Some(sign) = self.values.get(variable).expect("in bounds") {
                return Some((variable, *sign));
            }
        }
        None
    }
}

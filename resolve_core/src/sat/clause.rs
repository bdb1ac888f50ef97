use crate::sat::literal::Literal;
use bounded::Index;

/// Identifies a general ("at least one of these is true") clause.
///
/// Both [`SatEngine::at_least_one`](crate::sat::SatEngine::at_least_one) and
/// [`SatEngine::implies`](crate::sat::SatEngine::implies) lower to this shape:
/// `implies(a, bs)` is stored as the clause `(!a) OR b1 OR ... OR bn`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ClauseId(usize);

impl Index for ClauseId {
    #[inline]
    fn from_index(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    fn into_index(self) -> usize {
        self.0
    }
}

/// A general disjunctive clause together with the diagnostic reason it was
/// added for. The reason is only ever read by [`crate::sat::SatEngine::explain_reason`].
#[derive(Debug, Clone)]
pub struct GeneralClause {
    pub(crate) literals: Vec<Literal>,
    pub(crate) reason: &'static str,
}

impl GeneralClause {
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }
}

/// Identifies an at-most-one group, i.e. the governing clause handle returned
/// by [`SatEngine::at_most_one`](crate::sat::SatEngine::at_most_one).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct AmoId(usize);

impl Index for AmoId {
    #[inline]
    fn from_index(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    fn into_index(self) -> usize {
        self.0
    }
}

/// The list of literals of which at most one may be true, in the insertion
/// order the branch heuristic relies on for its "best undecided" preference.
#[derive(Debug, Clone, Default)]
pub struct AmoGroup {
    pub(crate) literals: Vec<Literal>,
}

impl AmoGroup {
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }
}

/// Append-only storage for both clause shapes used by the engine.
#[derive(Debug, Default, Clone)]
pub struct ClauseDb {
    clauses: Vec<GeneralClause>,
    amo_groups: Vec<AmoGroup>,
}

impl ClauseDb {
    pub fn push_clause(&mut self, literals: Vec<Literal>, reason: &'static str) -> ClauseId {
        let id = ClauseId(self.clauses.len());
        self.clauses.push(GeneralClause { literals, reason });
        id
    }

    pub fn push_amo(&mut self, literals: Vec<Literal>) -> AmoId {
        let id = AmoId(self.amo_groups.len());
        self.amo_groups.push(AmoGroup { literals });
        id
    }

    pub fn resolve_clause(&self, id: ClauseId) -> &GeneralClause {
        &self.clauses[id.0]
    }

    pub fn resolve_amo(&self, id: AmoId) -> &AmoGroup {
        &self.amo_groups[id.0]
    }

    pub fn clauses(&self) -> impl Iterator<Item = (ClauseId, &GeneralClause)> {
        self.clauses
            .iter()
            .enumerate()
            .map(|(index, clause)| (ClauseId(index), clause))
    }

    pub fn amo_groups(&self) -> impl Iterator<Item = (AmoId, &AmoGroup)> {
        self.amo_groups
            .iter()
            .enumerate()
            .map(|(index, group)| (AmoId(index), group))
    }
}

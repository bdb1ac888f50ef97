//! Branch Heuristic / Decider: a depth-first walk of the "current
//! solution" that picks the highest-ranked undecided candidate of the
//! earliest unresolved interface. This is a `find_undecided` recursion,
//! not a generic variable-priority heap -- the provider's preference order
//! is baked into candidate-set insertion order, and this walk is what
//! turns that into branching decisions.

use crate::builder::{CommandCandidateSet, DecisionState, ImplCandidateSet, VarLabel};
use crate::cache::CacheSnapshot;
use crate::model::Importance;
use crate::provider::{ImplementationProvider, RootRequirement};
use crate::sat::{Literal, SatEngine};
use ahash::AHashSet;

/// A point in the requirement graph the decider can be asked to resolve:
/// either an interface or a (command, interface) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Req {
    Iface(String),
    Command(String, String),
}

impl From<&RootRequirement> for Req {
    fn from(root: &RootRequirement) -> Self {
        match root {
            RootRequirement::Iface(iface) => Req::Iface(iface.clone()),
            RootRequirement::Command { name, iface } => Req::Command(name.clone(), iface.clone()),
        }
    }
}

/// Walks the candidate graph to find the next literal to decide.
pub struct Decider<'a> {
    provider: &'a dyn ImplementationProvider,
    iface_cache: &'a CacheSnapshot<String, ImplCandidateSet>,
    command_cache: &'a CacheSnapshot<(String, String), CommandCandidateSet>,
    root: Req,
}

impl<'a> Decider<'a> {
    pub fn new(
        provider: &'a dyn ImplementationProvider,
        iface_cache: &'a CacheSnapshot<String, ImplCandidateSet>,
        command_cache: &'a CacheSnapshot<(String, String), CommandCandidateSet>,
        root: &RootRequirement,
    ) -> Self {
        Self {
            provider,
            iface_cache,
            command_cache,
            root: Req::from(root),
        }
    }

    /// The `decider` closure shape [`SatEngine::run_solver`] expects.
    pub fn next(&self, engine: &SatEngine<VarLabel>) -> Option<Literal> {
        let mut seen = AHashSet::default();
        self.find_undecided(&self.root.clone(), engine, &mut seen)
    }

    fn find_undecided(
        &self,
        req: &Req,
        engine: &SatEngine<VarLabel>,
        seen: &mut AHashSet<Req>,
    ) -> Option<Literal> {
        if !seen.insert(req.clone()) {
            return None;
        }

        let state = match req {
            Req::Iface(iface) => self
                .iface_cache
                .get(iface)
                .map(|set| set.decision_state(engine))
                .unwrap_or(DecisionState::Unselected),
            Req::Command(name, iface) => self
                .command_cache
                .get(&(name.clone(), iface.clone()))
                .map(|set| set.decision_state(engine))
                .unwrap_or(DecisionState::Unselected),
        };

        match state {
            DecisionState::Unselected => None,
            DecisionState::Undecided(lit) => Some(lit),
            DecisionState::Selected(deps) => {
                for dep in &deps {
                    if dep.importance == Importance::Restricts || !self.provider.is_dep_needed(dep) {
                        continue;
                    }
                    if let Some(lit) = self.find_undecided(&Req::Iface(dep.target.clone()), engine, seen) {
                        return Some(lit);
                    }
                    for cmd_name in &dep.required_commands {
                        if let Some(lit) = self.find_undecided(
                            &Req::Command(cmd_name.clone(), dep.target.clone()),
                            engine,
                            seen,
                        ) {
                            return Some(lit);
                        }
                    }
                }
                if let Req::Command(_, iface) = req {
                    return self.find_undecided(&Req::Iface(iface.clone()), engine, seen);
                }
                None
            }
        }
    }
}

//! The Problem Builder: walks the requirement graph reachable from the
//! root, consulting the [`ImplementationProvider`], allocating SAT
//! variables, and emitting clauses into the [`SatEngine`].

use crate::cache::Cache;
use crate::model::{Command, Dependency, ImplMode, Implementation, Importance};
use crate::provider::{ImplementationProvider, RootRequirement};
use crate::sat::{ClauseHandle, Literal, SatEngine};
use ahash::AHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// The tagged union labelling every SAT variable the builder allocates.
/// Modelled as a closed enum dispatched via pattern matching, in place of
/// the source implementation's open polymorphic variants.
#[derive(Debug, Clone)]
pub enum VarLabel {
    /// "This implementation is chosen."
    ImplElem(Rc<Implementation>),
    /// "This command record is chosen."
    CommandElem(CommandCandidate),
    /// Auxiliary variable for CPU-family exclusion (`"mDef"` or `"m64"`).
    MachineGroup(&'static str),
    /// "Some candidate for this interface is selected" -- only allocated
    /// for optional (non-essential) dependencies.
    Interface(String),
}

/// A command candidate: the command record together with the implementation
/// that owns it, since result assembly needs both.
#[derive(Debug, Clone)]
pub struct CommandCandidate {
    pub owner: Rc<Implementation>,
    pub command: Rc<Command>,
}

/// Anything a candidate set's member can hand back a dependency list for,
/// so [`CandidateSet::decision_state`] can report `Selected(deps)` without
/// caring whether the member is an implementation or a command.
pub trait CandidateDeps {
    fn dependencies(&self) -> &[Dependency];
}

impl CandidateDeps for Rc<Implementation> {
    fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }
}

impl CandidateDeps for CommandCandidate {
    fn dependencies(&self) -> &[Dependency] {
        &self.command.dependencies
    }
}

/// The decision state of a [`CandidateSet`], read off the current SAT
/// assignment. Deliberately untyped in its payload (just the dependency
/// list, mirroring `Selected(deps)`) so both an
/// [`ImplCandidateSet`] and a [`CommandCandidateSet`] produce the same
/// shape for the decider to walk; use [`CandidateSet::selected_member`]
/// when the concrete payload itself is needed (result assembly).
#[derive(Debug, Clone)]
pub enum DecisionState {
    /// No candidates, or all of them are falsified.
    Unselected,
    /// The best undecided candidate, by insertion order.
    Undecided(Literal),
    /// The chosen candidate's dependency list, to continue walking.
    Selected(Vec<Dependency>),
}

/// A candidate set: the governing at-most-one clause (if any) plus the
/// `(variable, payload)` pairs it governs.
#[derive(Debug, Clone)]
pub struct CandidateSet<T> {
    handle: Option<ClauseHandle>,
    members: Vec<(Literal, T)>,
}

impl<T> CandidateSet<T> {
    pub fn new(handle: Option<ClauseHandle>, members: Vec<(Literal, T)>) -> Self {
        Self { handle, members }
    }

    pub fn members(&self) -> &[(Literal, T)] {
        &self.members
    }

    pub fn vars(&self) -> Vec<Literal> {
        self.members.iter().map(|(lit, _)| *lit).collect()
    }

    pub fn handle(&self) -> Option<ClauseHandle> {
        self.handle
    }
}

impl<T> CandidateSet<T>
where
    T: CandidateDeps + Clone,
{
    /// Reads the set's decision state off `engine`'s current assignment.
    pub fn decision_state<P>(&self, engine: &SatEngine<P>) -> DecisionState {
        let Some(handle) = self.handle else {
            return DecisionState::Unselected;
        };
        if let Some(selected) = engine.get_selected(handle) {
            let (_, member) = self
                .members
                .iter()
                .find(|(lit, _)| *lit == selected)
                .expect("selected literal must belong to its own candidate set");
            return DecisionState::Selected(member.dependencies().to_vec());
        }
        match engine.get_best_undecided(handle) {
            Some(lit) => DecisionState::Undecided(lit),
            None => DecisionState::Unselected,
        }
    }

    /// The concrete payload of the currently selected member, if any.
    pub fn selected_member<P>(&self, engine: &SatEngine<P>) -> Option<&T> {
        let handle = self.handle?;
        let selected = engine.get_selected(handle)?;
        self.members
            .iter()
            .find(|(lit, _)| *lit == selected)
            .map(|(_, member)| member)
    }
}

pub type ImplCandidateSet = CandidateSet<Rc<Implementation>>;
pub type CommandCandidateSet = CandidateSet<CommandCandidate>;

fn machine_group_for(machine: &str) -> &'static str {
    if machine.to_ascii_lowercase().contains("64") {
        "m64"
    } else {
        "mDef"
    }
}

/// The frozen result of [`ProblemBuilder::build`]: an engine ready for
/// [`SatEngine::run_solver`], both candidate caches snapshotted, and the
/// auxiliary `Interface(iface)` variables allocated for optional
/// dependencies (result assembly needs these to know whether an optional
/// dependency actually ended up in use).
pub struct BuiltProblem {
    pub engine: SatEngine<VarLabel>,
    pub iface_cache: crate::cache::CacheSnapshot<String, ImplCandidateSet>,
    pub command_cache: crate::cache::CacheSnapshot<(String, String), CommandCandidateSet>,
    pub interface_vars: AHashMap<String, Literal>,
}

/// Walks the requirement graph starting at a root requirement, populating
/// the two candidate caches and emitting clauses into a [`SatEngine`].
///
/// Every cache/engine access goes through `RefCell`s so that the recursive
/// walk -- which re-enters the builder from inside a cache's lazily-invoked
/// continuation -- only ever needs a shared `&self`.
pub struct ProblemBuilder<'p> {
    provider: &'p dyn ImplementationProvider,
    diagnostic: bool,
    engine: RefCell<SatEngine<VarLabel>>,
    iface_cache: Cache<String, ImplCandidateSet>,
    command_cache: Cache<(String, String), CommandCandidateSet>,
    interface_vars: RefCell<AHashMap<String, Literal>>,
    source_impl_vars: RefCell<AHashMap<(String, String), Literal>>,
    machine_group_vars: RefCell<Option<(Literal, Literal)>>,
    replacement_conflicts: RefCell<Vec<(String, String)>>,
}

impl<'p> ProblemBuilder<'p> {
    pub fn new(provider: &'p dyn ImplementationProvider, diagnostic: bool) -> Self {
        Self {
            provider,
            diagnostic,
            engine: RefCell::new(SatEngine::new()),
            iface_cache: Cache::new(),
            command_cache: Cache::new(),
            interface_vars: RefCell::new(AHashMap::new()),
            source_impl_vars: RefCell::new(AHashMap::new()),
            machine_group_vars: RefCell::new(None),
            replacement_conflicts: RefCell::new(Vec::new()),
        }
    }

    /// Walks the graph reachable from `root`, then asserts the root
    /// obligation and resolves deferred replacement conflicts. Consumes
    /// `self` into its engine and caches, ready for [`SatEngine::run_solver`].
    pub fn build(self, root: &RootRequirement) -> BuiltProblem {
        let root_vars = match root {
            RootRequirement::Iface(iface) => self.ensure_iface_candidates(iface).vars(),
            RootRequirement::Command { name, iface } => {
                self.ensure_command_candidates(name, iface).vars()
            }
        };
        self.engine.borrow_mut().at_least_one(root_vars, "need root");
        self.resolve_replacement_conflicts();

        BuiltProblem {
            engine: self.engine.into_inner(),
            iface_cache: self.iface_cache.snapshot(),
            command_cache: self.command_cache.snapshot(),
            interface_vars: self.interface_vars.into_inner(),
        }
    }

    pub fn ensure_iface_candidates(&self, iface: &str) -> ImplCandidateSet {
        self.iface_cache.lookup(iface.to_string(), |iface| {
            let candidates = self.provider.get_implementations(iface);
            let mut impls = candidates.impls.clone();
            if self.diagnostic {
                impls.push(Implementation::dummy_for(iface));
            }
            if let Some(replacement) = &candidates.replacement {
                self.replacement_conflicts
                    .borrow_mut()
                    .push((iface.clone(), replacement.clone()));
            }

            let mut by_id: AHashMap<String, Vec<Rc<Implementation>>> = AHashMap::new();
            for imp in &impls {
                by_id.entry(imp.id.clone()).or_default().push(imp.clone());
            }

            let kept: Vec<Rc<Implementation>> = impls
                .iter()
                .filter(|imp| {
                    let siblings = &by_id[&imp.id];
                    let has_immediate = siblings.iter().any(|i| matches!(i.mode, ImplMode::Immediate));
                    let has_source =
                        siblings.iter().any(|i| matches!(i.mode, ImplMode::RequiresCompilation(_)));
                    !(has_immediate && has_source && matches!(imp.mode, ImplMode::Immediate))
                })
                .cloned()
                .collect();

            let mut members = Vec::with_capacity(kept.len());
            for imp in &kept {
                let var = self.engine.borrow_mut().add_variable(VarLabel::ImplElem(imp.clone()));
                members.push((var, imp.clone()));
            }
            let handle = (!members.is_empty())
                .then(|| self.engine.borrow_mut().at_most_one(members.iter().map(|(l, _)| *l).collect()));
            let value = ImplCandidateSet::new(handle, members.clone());

            let iface_owned = iface.clone();
            let continuation = move || {
                for (impl_var, imp) in &members {
                    if let ImplMode::RequiresCompilation(lazy_source) = &imp.mode {
                        let source_impl = lazy_source.force();
                        let source_var = self.source_impl_var(&source_impl);
                        self.engine
                            .borrow_mut()
                            .implies(*impl_var, vec![source_var], "compiled impl forces its source");
                        if let Some(compile_cmd) = source_impl.commands.get("compile") {
                            let compile_lit = self.engine.borrow_mut().add_variable(VarLabel::CommandElem(
                                CommandCandidate {
                                    owner: source_impl.clone(),
                                    command: Rc::new(compile_cmd.clone()),
                                },
                            ));
                            self.engine.borrow_mut().implies(
                                *impl_var,
                                vec![compile_lit],
                                "compiled impl requires its compile command",
                            );
                            for dep in &compile_cmd.dependencies {
                                self.process_dependency(compile_lit, dep);
                            }
                        }
                    }
                    if !imp.is_dummy() {
                        if let Some(machine) = &imp.machine {
                            let (m_def, m64) = self.machine_group_vars();
                            let group = if machine_group_for(machine) == "m64" { m64 } else { m_def };
                            self.engine
                                .borrow_mut()
                                .implies(*impl_var, vec![group], "machine group exclusion");
                        }
                    }
                    self.process_self_bindings(*impl_var, &imp.self_bindings, &iface_owned);
                    for dep in &imp.dependencies {
                        self.process_dependency(*impl_var, dep);
                    }
                }
            };
            (value, continuation)
        })
    }

    pub fn ensure_command_candidates(&self, name: &str, iface: &str) -> CommandCandidateSet {
        let key = (name.to_string(), iface.to_string());
        self.command_cache.lookup(key, |(name, iface)| {
            let impl_candidates = self.ensure_iface_candidates(iface);
            let mut members = Vec::new();
            for (_, imp) in impl_candidates.members() {
                if imp.is_dummy() {
                    let candidate = CommandCandidate {
                        owner: imp.clone(),
                        command: Rc::new(Command::dummy(name)),
                    };
                    let cmd_var = self
                        .engine
                        .borrow_mut()
                        .add_variable(VarLabel::CommandElem(candidate.clone()));
                    members.push((cmd_var, candidate));
                } else if let Some(cmd) = imp.commands.get(name) {
                    let cmd_rc = Rc::new(cmd.clone());
                    let cmd_var = self
                        .engine
                        .borrow_mut()
                        .add_variable(VarLabel::CommandElem(CommandCandidate {
                            owner: imp.clone(),
                            command: cmd_rc.clone(),
                        }));
                    members.push((cmd_var, CommandCandidate { owner: imp.clone(), command: cmd_rc }));
                }
            }
            let handle = (!members.is_empty())
                .then(|| self.engine.borrow_mut().at_most_one(members.iter().map(|(l, _)| *l).collect()));
            let value = CommandCandidateSet::new(handle, members.clone());

            let continuation = move || {
                for (cmd_var, candidate) in &members {
                    let owner_var = self.impl_var_of(&candidate.owner);
                    self.engine
                        .borrow_mut()
                        .implies(*cmd_var, vec![owner_var], "command requires its implementation");
                    self.process_self_bindings(*cmd_var, &candidate.command.bindings, &candidate.owner.iface);
                    for dep in &candidate.command.dependencies {
                        self.process_dependency(*cmd_var, dep);
                    }
                }
            };
            (value, continuation)
        })
    }

    /// The literal allocated for `imp` inside its own interface's candidate
    /// set. `imp`'s interface has necessarily already been materialised by
    /// the time a command candidate references it.
    fn impl_var_of(&self, imp: &Rc<Implementation>) -> Literal {
        let set = self
            .iface_cache
            .get(&imp.iface)
            .expect("owning implementation's interface must already be materialised");
        set.members()
            .iter()
            .find(|(_, candidate)| Rc::ptr_eq(candidate, imp))
            .map(|(lit, _)| *lit)
            .expect("owning implementation must be a member of its own interface's candidate set")
    }

    fn source_impl_var(&self, source_impl: &Rc<Implementation>) -> Literal {
        let key = (source_impl.iface.clone(), source_impl.id.clone());
        if let Some(lit) = self.source_impl_vars.borrow().get(&key) {
            return *lit;
        }
        let lit = self
            .engine
            .borrow_mut()
            .add_variable(VarLabel::ImplElem(source_impl.clone()));
        self.source_impl_vars.borrow_mut().insert(key, lit);
        lit
    }

    fn machine_group_vars(&self) -> (Literal, Literal) {
        if let Some(pair) = *self.machine_group_vars.borrow() {
            return pair;
        }
        let m_def = self.engine.borrow_mut().add_variable(VarLabel::MachineGroup("mDef"));
        let m64 = self.engine.borrow_mut().add_variable(VarLabel::MachineGroup("m64"));
        self.engine.borrow_mut().at_most_one(vec![m_def, m64]);
        *self.machine_group_vars.borrow_mut() = Some((m_def, m64));
        (m_def, m64)
    }

    fn interface_var(&self, iface: &str) -> Literal {
        if let Some(lit) = self.interface_vars.borrow().get(iface) {
            return *lit;
        }
        let lit = self
            .engine
            .borrow_mut()
            .add_variable(VarLabel::Interface(iface.to_string()));
        self.interface_vars.borrow_mut().insert(iface.to_string(), lit);
        lit
    }

    fn process_self_bindings(&self, user_var: Literal, bindings: &[crate::model::Binding], owner_iface: &str) {
        for binding in bindings {
            if let Some(name) = &binding.names_command {
                let cmd_candidates = self.ensure_command_candidates(name, owner_iface);
                self.engine
                    .borrow_mut()
                    .implies(user_var, cmd_candidates.vars(), "self-binding requires command");
            }
        }
    }

    fn process_dependency(&self, user_var: Literal, dep: &Dependency) {
        if !self.provider.is_dep_needed(dep) {
            return;
        }
        let candidates = self.ensure_iface_candidates(&dep.target);
        let (pass, fail): (Vec<_>, Vec<_>) = candidates
            .members()
            .iter()
            .partition(|(_, imp)| imp.is_dummy() || dep.meets_all_restrictions(imp));
        let pass_vars: Vec<Literal> = pass.iter().map(|(lit, _)| *lit).collect();
        let fail_vars: Vec<Literal> = fail.iter().map(|(lit, _)| *lit).collect();

        if dep.importance != Importance::Restricts {
            for name in &dep.required_commands {
                let cmd_candidates = self.ensure_command_candidates(name, &dep.target);
                match dep.importance {
                    Importance::Essential => {
                        self.engine.borrow_mut().implies(
                            user_var,
                            cmd_candidates.vars(),
                            "essential dependency command requirement",
                        );
                    }
                    _ => {
                        let iface_lit = self.interface_var(&dep.target);
                        let neg_iface = self.engine.borrow().neg(iface_lit);
                        let mut group = vec![neg_iface];
                        group.extend(pass_vars.iter().copied());
                        self.engine.borrow_mut().at_most_one(group);

                        let mut bs = vec![neg_iface];
                        bs.extend(cmd_candidates.vars());
                        self.engine.borrow_mut().implies(
                            user_var,
                            bs,
                            "recommended dependency command requirement",
                        );
                    }
                }
            }
        }

        match dep.importance {
            Importance::Essential => {
                self.engine
                    .borrow_mut()
                    .implies(user_var, pass_vars, "essential dependency restriction");
            }
            _ => {
                let mut group = vec![user_var];
                group.extend(fail_vars);
                self.engine.borrow_mut().at_most_one(group);
            }
        }
    }

    fn resolve_replacement_conflicts(&self) {
        let conflicts = self.replacement_conflicts.borrow().clone();
        for (original, replacement) in conflicts {
            if original == replacement {
                log::warn!("interface {original} names itself as its own replacement; ignoring");
                continue;
            }
            let Some(replacement_set) = self.iface_cache.get(&replacement) else {
                continue;
            };
            let Some(original_set) = self.iface_cache.get(&original) else {
                continue;
            };
            let mut union_vars = Vec::new();
            for (lit, imp) in original_set.members() {
                if !imp.is_dummy() {
                    union_vars.push(*lit);
                }
            }
            for (lit, imp) in replacement_set.members() {
                if !imp.is_dummy() {
                    union_vars.push(*lit);
                }
            }
            if union_vars.len() > 1 {
                self.engine.borrow_mut().at_most_one(union_vars);
            }
        }
    }
}

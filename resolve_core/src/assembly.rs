//! Result Assembly: turns a satisfying assignment into a selections
//! document.

use crate::builder::{BuiltProblem, VarLabel};
use crate::model::{Binding, Command, Dependency, ImplMode, Implementation, Importance};
use crate::provider::{ImplementationProvider, RootRequirement};
use crate::sat::SatEngine;
use crate::selections::{attr_map, BindingNode, CommandNode, DependencyNode, Selection, SelectionsDocument};
use std::rc::Rc;

pub struct ResultAssembly<'a> {
    provider: &'a dyn ImplementationProvider,
    engine: &'a SatEngine<VarLabel>,
    problem: &'a BuiltProblem,
}

impl<'a> ResultAssembly<'a> {
    pub fn new(provider: &'a dyn ImplementationProvider, problem: &'a BuiltProblem) -> Self {
        Self {
            provider,
            engine: &problem.engine,
            problem,
        }
    }

    pub fn assemble(&self, root: &RootRequirement) -> SelectionsDocument {
        let mut selections = Vec::new();
        for (iface, set) in self.problem.iface_cache.bindings() {
            let Some(imp) = set.selected_member(self.engine) else {
                continue;
            };
            selections.push(self.build_selection(&iface, imp));
            if let ImplMode::RequiresCompilation(lazy_source) = &imp.mode {
                let source_impl = lazy_source.force();
                let mut source_selection = self.build_selection(&iface, &source_impl);
                source_selection.commands = vec![self.build_compile_command_node(&source_impl)];
                selections.push(source_selection);
            }
        }
        SelectionsDocument {
            interface: root.iface().to_string(),
            command: root.command_name().map(|name| name.to_string()),
            selections,
        }
    }

    fn build_selection(&self, iface: &str, imp: &Rc<Implementation>) -> Selection {
        let mut raw = imp.attrs.clone();
        raw.remove("stability");
        raw.remove("main");
        raw.remove("self-test");
        if raw.get("from-feed").map(|f| f == iface).unwrap_or(false) {
            raw.remove("from-feed");
        }
        let mut attrs = attr_map(&raw);
        attrs.insert("@interface".to_string(), iface.to_string());

        let mut commands = Vec::new();
        let mut bindings = Vec::new();
        let mut dependencies = Vec::new();

        if !imp.is_dummy() {
            commands = self.commands_for_impl(iface, imp);
            bindings = imp.self_bindings.iter().map(binding_node).collect();
            dependencies = imp
                .dependencies
                .iter()
                .filter(|dep| self.dep_in_use(dep))
                .map(dependency_node)
                .collect();
        }

        Selection {
            attrs,
            commands,
            bindings,
            dependencies,
            manifest_digest: imp.manifest_digest.as_ref().map(attr_map),
        }
    }

    /// Command names requested for `iface` are exactly the keys materialised
    /// in the command cache during problem construction -- that cache is
    /// only ever populated for `(name, iface)` pairs someone actually asked
    /// for (§4.2/§4.3).
    fn commands_for_impl(&self, iface: &str, imp: &Rc<Implementation>) -> Vec<CommandNode> {
        self.problem
            .command_cache
            .bindings()
            .into_iter()
            .filter(|((_, key_iface), _)| key_iface.as_str() == iface)
            .filter_map(|((_, _), set)| set.selected_member(self.engine).cloned())
            .filter(|candidate| Rc::ptr_eq(&candidate.owner, imp))
            .map(|candidate| self.build_command_node(&candidate.command))
            .collect()
    }

    fn build_command_node(&self, cmd: &Command) -> CommandNode {
        let attrs = attr_map(&cmd.attrs);
        let dependencies = cmd
            .dependencies
            .iter()
            .filter(|dep| self.dep_in_use(dep))
            .map(dependency_node)
            .collect();
        let bindings = cmd.bindings.iter().map(binding_node).collect();
        CommandNode { attrs, dependencies, bindings }
    }

    /// The synthetic `compile` command node attached to a source impl's
    /// parallel selection (§4.5, testable property 8).
    fn build_compile_command_node(&self, source_impl: &Rc<Implementation>) -> CommandNode {
        match source_impl.commands.get("compile") {
            Some(cmd) => self.build_command_node(cmd),
            None => CommandNode::default(),
        }
    }

    fn dep_in_use(&self, dep: &Dependency) -> bool {
        if dep.importance == Importance::Restricts {
            return false;
        }
        if !self.provider.is_dep_needed(dep) {
            return false;
        }
        match dep.importance {
            Importance::Essential => true,
            Importance::Recommended => self
                .problem
                .interface_vars
                .get(&dep.target)
                .map(|lit| self.engine.is_true(*lit))
                .unwrap_or(false),
            Importance::Restricts => unreachable!(),
        }
    }
}

fn binding_node(binding: &Binding) -> BindingNode {
    let mut attrs = attr_map(&binding.attrs);
    if let Some(name) = &binding.names_command {
        attrs.insert("@command".to_string(), name.clone());
    }
    BindingNode { attrs }
}

fn dependency_node(dep: &Dependency) -> DependencyNode {
    let mut attrs = std::collections::BTreeMap::new();
    attrs.insert("@interface".to_string(), dep.target.clone());
    if dep.importance == Importance::Recommended {
        attrs.insert("@importance".to_string(), "recommended".to_string());
    }
    DependencyNode { attrs }
}

//! End-to-end solve scenarios, run through the public API with a minimal
//! in-memory provider built inline for this test binary (duplicated,
//! minimally, from `src/tests.rs` -- deliberately not shared with
//! `resolve_cli`'s own fixture provider, since a real feed-backed provider
//! and this throwaway one have no business sharing code).

use ahash::AHashMap;
use resolve_core::model::{
    Command, Dependency, ImplMode, Implementation, Importance, LazySourceImpl, Restriction, Version,
};
use resolve_core::provider::{Candidates, ImplementationProvider, Requirements};
use resolve_core::solve_for;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug)]
struct VersionAtLeast(Version);

impl Restriction for VersionAtLeast {
    fn meets_restriction(&self, candidate: &Implementation) -> bool {
        candidate.version >= self.0
    }
}

#[derive(Default)]
struct FixtureProvider {
    catalog: AHashMap<String, Candidates>,
}

impl FixtureProvider {
    fn register(&mut self, iface: &str, impls: Vec<Rc<Implementation>>) {
        self.catalog.insert(
            iface.to_string(),
            Candidates { replacement: None, impls, rejects: Vec::new() },
        );
    }

    fn register_replacement(&mut self, iface: &str, impls: Vec<Rc<Implementation>>, replacement: &str) {
        self.catalog.insert(
            iface.to_string(),
            Candidates {
                replacement: Some(replacement.to_string()),
                impls,
                rejects: Vec::new(),
            },
        );
    }
}

impl ImplementationProvider for FixtureProvider {
    fn get_implementations(&self, iface: &str) -> Candidates {
        self.catalog.get(iface).cloned().unwrap_or_else(|| Candidates {
            replacement: None,
            impls: Vec::new(),
            rejects: Vec::new(),
        })
    }

    fn is_dep_needed(&self, _dep: &Dependency) -> bool {
        true
    }
}

fn bare_impl(id: &str, iface: &str, version: &str) -> Implementation {
    let mut attrs = BTreeMap::new();
    attrs.insert("id".to_string(), id.to_string());
    attrs.insert("version".to_string(), version.to_string());
    Implementation {
        id: id.to_string(),
        iface: iface.to_string(),
        version: Version(version.to_string()),
        os: None,
        machine: None,
        attrs,
        dependencies: Vec::new(),
        commands: BTreeMap::new(),
        self_bindings: Vec::new(),
        mode: ImplMode::Immediate,
        from_feed: None,
        manifest_digest: None,
    }
}

fn essential_dep(target: &str) -> Dependency {
    Dependency {
        target: target.to_string(),
        importance: Importance::Essential,
        restrictions: Vec::new(),
        required_commands: Vec::new(),
    }
}

fn req_iface(iface: &str) -> Requirements {
    Requirements {
        iface: iface.to_string(),
        command: None,
        os: None,
        cpu: None,
        source: false,
        extra_restrictions: BTreeMap::new(),
        languages: Vec::new(),
    }
}

fn req_command(iface: &str, command: &str) -> Requirements {
    Requirements { command: Some(command.to_string()), ..req_iface(iface) }
}

/// Trivial solve: one interface, one impl, no deps.
#[test]
fn trivial_solve() {
    let mut provider = FixtureProvider::default();
    provider.register("A", vec![Rc::new(bare_impl("a1", "A", "1"))]);

    let result = solve_for(&req_iface("A"), &provider, true).unwrap();
    assert!(result.ok());
    let doc = result.get_selections();
    assert_eq!(doc.selections.len(), 1);
    assert_eq!(doc.selections[0].attrs.get("@id").map(String::as_str), Some("a1"));
}

/// Chain: A's a1 essentially depends on B; B has b1.
#[test]
fn dependency_chain() {
    let mut provider = FixtureProvider::default();
    let mut a1 = bare_impl("a1", "A", "1");
    a1.dependencies.push(essential_dep("B"));
    provider.register("A", vec![Rc::new(a1)]);
    provider.register("B", vec![Rc::new(bare_impl("b1", "B", "1"))]);

    let result = solve_for(&req_iface("A"), &provider, true).unwrap();
    assert!(result.ok());
    assert_eq!(result.get_selected("A").unwrap().id, "a1");
    assert_eq!(result.get_selected("B").unwrap().id, "b1");
}

/// Version restriction: a1 restricts B to >=2; B has b1=1, b2=2.
#[test]
fn version_restriction() {
    let mut provider = FixtureProvider::default();
    let mut a1 = bare_impl("a1", "A", "1");
    a1.dependencies.push(Dependency {
        target: "B".to_string(),
        importance: Importance::Essential,
        restrictions: vec![Rc::new(VersionAtLeast(Version("2".to_string())))],
        required_commands: Vec::new(),
    });
    provider.register("A", vec![Rc::new(a1)]);
    provider.register(
        "B",
        vec![Rc::new(bare_impl("b1", "B", "1")), Rc::new(bare_impl("b2", "B", "2"))],
    );

    let result = solve_for(&req_iface("A"), &provider, true).unwrap();
    assert!(result.ok());
    assert_eq!(result.get_selected("B").unwrap().id, "b2");
}

/// Unsat then closest match: A essentially depends on B; B has no
/// impls.
#[test]
fn unsat_then_closest_match() {
    let mut provider = FixtureProvider::default();
    let mut a1 = bare_impl("a1", "A", "1");
    a1.dependencies.push(essential_dep("B"));
    provider.register("A", vec![Rc::new(a1)]);
    provider.register("B", Vec::new());

    let result = solve_for(&req_iface("A"), &provider, true).unwrap();
    assert!(!result.ok());
    let doc = result.get_selections();
    assert!(doc
        .selections
        .iter()
        .any(|s| s.attrs.get("@interface").map(String::as_str) == Some("B")));
    assert!(result.get_selected("B").is_none());
}

/// Replacement conflict: A is replaced by A2; both materialise via
/// different dependency paths from ROOT.
#[test]
fn replacement_conflict() {
    let mut provider = FixtureProvider::default();
    let mut root = bare_impl("root1", "ROOT", "1");
    root.dependencies.push(essential_dep("A"));
    root.dependencies.push(Dependency {
        target: "A2".to_string(),
        importance: Importance::Recommended,
        restrictions: Vec::new(),
        required_commands: Vec::new(),
    });
    provider.register("ROOT", vec![Rc::new(root)]);
    provider.register_replacement("A", vec![Rc::new(bare_impl("a1", "A", "1"))], "A2");
    provider.register("A2", vec![Rc::new(bare_impl("a1-new", "A2", "1"))]);

    let result = solve_for(&req_iface("ROOT"), &provider, true).unwrap();
    assert!(result.ok());
    let a = result.get_selected("A").is_some();
    let a2 = result.get_selected("A2").is_some();
    assert!(a ^ a2, "exactly one of A, A2 may contribute a selection");
}

/// Command dependency with source compilation: root requests command
/// "run" on A, which only has a `requires_compilation` impl offering
/// "compile".
#[test]
fn command_dependency_with_source_compilation() {
    let mut provider = FixtureProvider::default();

    let mut source = bare_impl("a-src", "A", "1");
    source.commands.insert(
        "compile".to_string(),
        Command {
            name: "compile".to_string(),
            dependencies: Vec::new(),
            bindings: Vec::new(),
            attrs: BTreeMap::new(),
        },
    );
    source.commands.insert(
        "run".to_string(),
        Command {
            name: "run".to_string(),
            dependencies: Vec::new(),
            bindings: Vec::new(),
            attrs: BTreeMap::new(),
        },
    );
    let source_rc = Rc::new(source);
    let lazy = {
        let source_rc = source_rc.clone();
        LazySourceImpl::new(move || source_rc.clone())
    };

    let mut compiled = bare_impl("a-src", "A", "1");
    compiled.mode = ImplMode::RequiresCompilation(lazy);
    compiled.commands.insert(
        "run".to_string(),
        Command {
            name: "run".to_string(),
            dependencies: Vec::new(),
            bindings: Vec::new(),
            attrs: BTreeMap::new(),
        },
    );
    provider.register("A", vec![Rc::new(compiled)]);

    let result = solve_for(&req_command("A", "run"), &provider, true).unwrap();
    assert!(result.ok());
    let doc = result.get_selections();
    assert_eq!(doc.command.as_deref(), Some("run"));
    assert_eq!(doc.selections.len(), 2);
    let total_commands: usize = doc.selections.iter().map(|s| s.commands.len()).sum();
    assert_eq!(total_commands, 2, "one selection carries `run`, the other `compile`");
}

//! Invariant tests for the solve pipeline, run against a minimal in-memory
//! [`ImplementationProvider`] built inline. Sibling to `lib.rs`, matching
//! the reference solver's own `tests.rs` placement.

use crate::driver::solve_for;
use crate::model::{
    Command, Dependency, ImplMode, Implementation, Importance, LazySourceImpl, Restriction, Version,
};
use crate::provider::{Candidates, ImplementationProvider, Requirements};
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug)]
struct VersionAtLeast(Version);

impl Restriction for VersionAtLeast {
    fn meets_restriction(&self, candidate: &Implementation) -> bool {
        candidate.version >= self.0
    }
}

/// A minimal in-memory provider for exercising `solve_for` without a real
/// feed. Not a stand-in for the external provider's ranking policy --
/// candidates are returned in the order they were registered, untouched.
#[derive(Default)]
struct TestProvider {
    catalog: AHashMap<String, Candidates>,
}

impl TestProvider {
    fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, iface: &str, impls: Vec<Rc<Implementation>>) {
        self.catalog.insert(
            iface.to_string(),
            Candidates {
                replacement: None,
                impls,
                rejects: Vec::new(),
            },
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

impl ImplementationProvider for TestProvider {
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

fn requirements_for(iface: &str) -> Requirements {
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

/// Invariant 1: for every interface present in the result, exactly one
/// candidate has `get_selected` true.
#[test]
fn invariant_one_candidate_selected_per_interface() {
    let mut provider = TestProvider::new();
    let mut a1 = bare_impl("a1", "A", "1");
    a1.dependencies.push(essential_dep("B"));
    provider.register("A", vec![Rc::new(a1)]);
    provider.register("B", vec![Rc::new(bare_impl("b1", "B", "1"))]);

    let result = solve_for(&requirements_for("A"), &provider, true).expect("solves");
    assert!(result.ok());
    let doc = result.get_selections();
    assert_eq!(doc.selections.len(), 2);
}

/// Invariant 2: an essential dependency's target interface has a selected
/// candidate satisfying all restrictions.
#[test]
fn invariant_essential_dependency_restriction_satisfied() {
    let mut provider = TestProvider::new();
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
        vec![
            Rc::new(bare_impl("b1", "B", "1")),
            Rc::new(bare_impl("b2", "B", "2")),
        ],
    );

    let result = solve_for(&requirements_for("A"), &provider, true).unwrap();
    assert!(result.ok());
    let selected_b = result.get_selected("B").expect("B selected");
    assert_eq!(selected_b.id, "b2");
}

/// Invariant 3: no two selected impls belong to mutually-excluded machine
/// groups. A dependency restricted to nothing forces the builder to pick
/// between a 32-bit and 64-bit sibling of the same interface; the machine
/// group clause must keep them from coexisting across two dependents.
#[test]
fn invariant_no_mixed_machine_groups() {
    let mut provider = TestProvider::new();
    let mut a1 = bare_impl("a1", "A", "1");
    a1.dependencies.push(essential_dep("LIB"));
    provider.register("A", vec![Rc::new(a1)]);

    let mut lib64 = bare_impl("lib64", "LIB", "1");
    lib64.machine = Some("x86_64".to_string());
    provider.register("LIB", vec![Rc::new(lib64)]);

    let result = solve_for(&requirements_for("A"), &provider, true).unwrap();
    assert!(result.ok());
    // A single dependent forcing one machine group never conflicts with
    // itself; this asserts the clause exists and is satisfiable, not that
    // it was exercised adversarially (a second, i686 sibling would need a
    // second dependent to create an actual conflict, which is out of scope
    // for this minimal fixture).
    assert!(result.get_selected("LIB").is_some());
}

/// Invariant 4: for a `<replaced-by>` pair where both sides materialise
/// with non-dummy variables, at most one contributes a selection.
#[test]
fn invariant_replacement_conflict_picks_one_side() {
    let mut provider = TestProvider::new();
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

    let result = solve_for(&requirements_for("ROOT"), &provider, true).unwrap();
    assert!(result.ok());
    let a_selected = result.get_selected("A").is_some();
    let a2_selected = result.get_selected("A2").is_some();
    assert!(a_selected ^ a2_selected, "exactly one side of the replacement must be selected");
}

/// Invariant 5: `solve_for` is deterministic given deterministic provider
/// outputs.
#[test]
fn invariant_deterministic_given_same_provider() {
    let mut provider = TestProvider::new();
    let mut a1 = bare_impl("a1", "A", "1");
    a1.dependencies.push(essential_dep("B"));
    provider.register("A", vec![Rc::new(a1)]);
    provider.register(
        "B",
        vec![Rc::new(bare_impl("b1", "B", "1")), Rc::new(bare_impl("b2", "B", "2"))],
    );

    let first = solve_for(&requirements_for("A"), &provider, true).unwrap().get_selections().to_xml().unwrap();
    let second = solve_for(&requirements_for("A"), &provider, true).unwrap().get_selections().to_xml().unwrap();
    assert_eq!(first, second);
}

/// Invariant 6: first-pass success implies no dummy impl appears in the
/// selections document.
#[test]
fn invariant_no_dummy_on_successful_first_pass() {
    let mut provider = TestProvider::new();
    provider.register("A", vec![Rc::new(bare_impl("a1", "A", "1"))]);

    let result = solve_for(&requirements_for("A"), &provider, true).unwrap();
    assert!(result.ok());
    let doc = result.get_selections();
    assert_eq!(doc.selections.len(), 1);
    assert_eq!(doc.selections[0].attrs.get("@id").map(String::as_str), Some("a1"));
}

/// Invariant 7: the closest-match (diagnostic) pass always returns a
/// result even when the real pass is unsatisfiable.
#[test]
fn invariant_closest_match_always_succeeds() {
    let provider_with_empty_target = {
        let mut provider = TestProvider::new();
        let mut a1 = bare_impl("a1", "A", "1");
        a1.dependencies.push(essential_dep("B"));
        provider.register("A", vec![Rc::new(a1)]);
        provider.register("B", Vec::new());
        provider
    };

    let result = solve_for(&requirements_for("A"), &provider_with_empty_target, true).unwrap();
    assert!(!result.ok());
    assert!(result.get_selected("B").is_none(), "dummy selections never surface through get_selected");
    let doc = result.get_selections();
    assert!(doc.selections.iter().any(|s| s.attrs.get("@interface").map(String::as_str) == Some("B")));
}

/// The root interface itself has no candidates: the first (non-diagnostic)
/// pass must be unsatisfiable rather than vacuously succeed with zero
/// selections, so the driver falls through to the dummy-backed diagnostic
/// pass (§4.6, §7).
#[test]
fn root_with_no_candidates_falls_through_to_closest_match() {
    let provider = TestProvider::new();

    let result = solve_for(&requirements_for("A"), &provider, true).unwrap();
    assert!(!result.ok(), "first pass must fail when the root has no real candidates");
    let doc = result.get_selections();
    assert!(
        doc.selections
            .iter()
            .any(|s| s.attrs.get("@interface").map(String::as_str) == Some("A")),
        "closest-match pass must cover the root interface with the dummy implementation"
    );
}

/// Invariant 8: a selected `requires_compilation` impl produces two
/// selection records for its interface.
#[test]
fn invariant_compiled_impl_emits_source_selection_too() {
    let mut provider = TestProvider::new();

    let mut source = bare_impl("a-src", "A", "1");
    let compile_cmd = Command {
        name: "compile".to_string(),
        dependencies: Vec::new(),
        bindings: Vec::new(),
        attrs: BTreeMap::new(),
    };
    source.commands.insert("compile".to_string(), compile_cmd);
    let source_rc = Rc::new(source);

    let lazy = {
        let source_rc = source_rc.clone();
        LazySourceImpl::new(move || source_rc.clone())
    };
    let mut compiled = bare_impl("a-src", "A", "1");
    compiled.mode = ImplMode::RequiresCompilation(lazy);
    provider.register("A", vec![Rc::new(compiled)]);

    let result = solve_for(&requirements_for("A"), &provider, true).unwrap();
    assert!(result.ok());
    let doc = result.get_selections();
    assert_eq!(doc.selections.len(), 2);
    let compile_selection = doc
        .selections
        .iter()
        .find(|s| !s.commands.is_empty())
        .expect("one selection carries the compile command");
    assert_eq!(compile_selection.commands.len(), 1);
}

/// Invariant 9: selections are emitted in ascending lexicographic order of
/// interface URI.
#[test]
fn invariant_selections_sorted_lexicographically() {
    let mut provider = TestProvider::new();
    let mut a1 = bare_impl("a1", "A", "1");
    a1.dependencies.push(essential_dep("Z"));
    a1.dependencies.push(essential_dep("M"));
    provider.register("A", vec![Rc::new(a1)]);
    provider.register("Z", vec![Rc::new(bare_impl("z1", "Z", "1"))]);
    provider.register("M", vec![Rc::new(bare_impl("m1", "M", "1"))]);

    let result = solve_for(&requirements_for("A"), &provider, true).unwrap();
    let doc = result.get_selections();
    let ifaces: Vec<&str> = doc
        .selections
        .iter()
        .map(|s| s.attrs.get("@interface").map(String::as_str).unwrap())
        .collect();
    let mut sorted = ifaces.clone();
    sorted.sort();
    assert_eq!(ifaces, sorted);
}

/// Invariant 10: `from-feed` is omitted whenever it equals `interface`.
#[test]
fn invariant_from_feed_omitted_when_redundant() {
    let mut provider = TestProvider::new();
    let mut a1 = bare_impl("a1", "A", "1");
    a1.attrs.insert("from-feed".to_string(), "A".to_string());
    let mut a2 = bare_impl("a2", "A", "1");
    a2.attrs.insert("from-feed".to_string(), "other-feed".to_string());
    provider.register("A", vec![Rc::new(a1)]);

    let result = solve_for(&requirements_for("A"), &provider, true).unwrap();
    let doc = result.get_selections();
    assert!(!doc.selections[0].attrs.contains_key("@from-feed"));

    // A distinct impl whose `from-feed` differs from its interface keeps it.
    let mut provider2 = TestProvider::new();
    provider2.register("A", vec![Rc::new(a2)]);
    let result2 = solve_for(&requirements_for("A"), &provider2, true).unwrap();
    let doc2 = result2.get_selections();
    assert_eq!(doc2.selections[0].attrs.get("@from-feed").map(String::as_str), Some("other-feed"));
}

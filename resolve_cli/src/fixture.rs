//! `FixtureProvider`: a `serde`-deserialized in-memory catalogue standing in
//! for a real feed-backed [`ImplementationProvider`]. Not part of the
//! library -- feed parsing and provider ranking policy are external
//! collaborators, so this stays CLI-only, purely to give `resolve` and its
//! integration tests something concrete to solve against.

use ahash::AHashMap;
use resolve_core::model::{
    Binding, Command, Dependency, ImplMode, Implementation, Importance, Restriction, Version,
};
use resolve_core::provider::{Candidates, ImplementationProvider};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Deserialize)]
pub struct FixtureDocument {
    pub root: RootJson,
    pub catalog: BTreeMap<String, InterfaceJson>,
}

#[derive(Debug, Deserialize)]
pub struct RootJson {
    pub iface: String,
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InterfaceJson {
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub impls: Vec<ImplJson>,
}

#[derive(Debug, Deserialize)]
pub struct ImplJson {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub machine: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyJson>,
    #[serde(default)]
    pub commands: BTreeMap<String, CommandJson>,
    #[serde(default)]
    pub self_bindings: Vec<BindingJson>,
    /// Name of another impl record in the *same* interface's `impls` list
    /// this one requires compilation from. Absent means the impl is usable
    /// as-is.
    #[serde(default)]
    pub requires_compilation_of: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommandJson {
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyJson>,
    #[serde(default)]
    pub bindings: Vec<BindingJson>,
}

#[derive(Debug, Deserialize)]
pub struct BindingJson {
    #[serde(default)]
    pub names_command: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct DependencyJson {
    pub target: String,
    #[serde(default)]
    pub importance: ImportanceJson,
    #[serde(default)]
    pub version_at_least: Option<String>,
    #[serde(default)]
    pub required_commands: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportanceJson {
    #[default]
    Essential,
    Restricts,
    Recommended,
}

#[derive(Debug)]
struct VersionAtLeast(Version);

impl Restriction for VersionAtLeast {
    fn meets_restriction(&self, candidate: &Implementation) -> bool {
        candidate.version >= self.0
    }
}

fn binding(json: &BindingJson) -> Binding {
    Binding { names_command: json.names_command.clone(), attrs: json.attrs.clone() }
}

fn dependency(json: &DependencyJson) -> Dependency {
    let mut restrictions: Vec<Rc<dyn Restriction>> = Vec::new();
    if let Some(floor) = &json.version_at_least {
        restrictions.push(Rc::new(VersionAtLeast(Version(floor.clone()))));
    }
    Dependency {
        target: json.target.clone(),
        importance: match json.importance {
            ImportanceJson::Essential => Importance::Essential,
            ImportanceJson::Restricts => Importance::Restricts,
            ImportanceJson::Recommended => Importance::Recommended,
        },
        restrictions,
        required_commands: json.required_commands.clone(),
    }
}

fn command(name: &str, json: &CommandJson) -> Command {
    Command {
        name: name.to_string(),
        dependencies: json.dependencies.iter().map(dependency).collect(),
        bindings: json.bindings.iter().map(binding).collect(),
        attrs: json.attrs.clone(),
    }
}

fn build_record(iface: &str, entry: &ImplJson, mode: ImplMode) -> Implementation {
    let mut attrs = entry.attrs.clone();
    attrs.entry("id".to_string()).or_insert_with(|| entry.id.clone());
    attrs.entry("version".to_string()).or_insert_with(|| entry.version.clone());
    Implementation {
        id: entry.id.clone(),
        iface: iface.to_string(),
        version: Version(entry.version.clone()),
        os: entry.os.clone(),
        machine: entry.machine.clone(),
        attrs,
        dependencies: entry.dependencies.iter().map(dependency).collect(),
        commands: entry
            .commands
            .iter()
            .map(|(name, cmd_json)| (name.clone(), command(name, cmd_json)))
            .collect(),
        self_bindings: entry.self_bindings.iter().map(binding).collect(),
        mode,
        from_feed: entry.attrs.get("from-feed").cloned(),
        manifest_digest: None,
    }
}

/// Builds the impl records for one interface. `requires_compilation_of`
/// names a sibling entry in the same JSON list to use as the companion
/// source implementation; that sibling is built first (as an ordinary
/// immediate impl) so the [`resolve_core::model::LazySourceImpl`] wrapping
/// it can just clone the already-built `Rc`, matching the "safe to force
/// more than once, evaluated at most once" contract without needing real
/// laziness in a fixture that has the whole catalogue in memory upfront.
fn build_impls(iface: &str, json_impls: &[ImplJson]) -> Vec<Rc<Implementation>> {
    let mut sources: BTreeMap<String, Rc<Implementation>> = BTreeMap::new();
    for entry in json_impls {
        if entry.requires_compilation_of.is_none() {
            sources.insert(entry.id.clone(), Rc::new(build_record(iface, entry, ImplMode::Immediate)));
        }
    }

    json_impls
        .iter()
        .map(|entry| match &entry.requires_compilation_of {
            None => sources[&entry.id].clone(),
            Some(source_id) => {
                let source = sources
                    .get(source_id)
                    .unwrap_or_else(|| {
                        panic!("{iface}: {source_id} referenced by requires_compilation_of but absent from impls")
                    })
                    .clone();
                let lazy = resolve_core::model::LazySourceImpl::new(move || source.clone());
                Rc::new(build_record(iface, entry, ImplMode::RequiresCompilation(lazy)))
            }
        })
        .collect()
}

pub struct FixtureProvider {
    catalog: AHashMap<String, Candidates>,
}

impl FixtureProvider {
    pub fn from_document(doc: &FixtureDocument) -> Self {
        let mut catalog = AHashMap::new();
        for (iface, entry) in &doc.catalog {
            let impls = build_impls(iface, &entry.impls);
            catalog.insert(
                iface.clone(),
                Candidates { replacement: entry.replacement.clone(), impls, rejects: Vec::new() },
            );
        }
        Self { catalog }
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

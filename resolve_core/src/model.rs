//! Plain data the problem builder consumes from the implementation provider.
//!
//! These types describe what the core *observes*; they are not produced
//! here. Feed parsing and the `Element`/XML layer that fills them in stay
//! an external collaborator.

use std::collections::BTreeMap;
use std::rc::Rc;

/// An interface identifier: an opaque URI. Keys both candidate caches.
pub type IfaceId = String;

/// Relative importance of a dependency.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Importance {
    /// The dependency must be satisfiable; if it cannot, the requiring impl
    /// or command is unusable.
    Essential,
    /// A version-only constraint: narrows acceptable candidates of the
    /// target interface without requiring that any be selected.
    Restricts,
    /// Like essential, but failure to satisfy it does not rule out the
    /// requiring impl or command -- it only prevents it from claiming the
    /// target's candidate.
    Recommended,
}

/// Narrows which implementations of a dependency's target interface are
/// acceptable. The core only ever calls `meets_restriction`; how a
/// restriction is represented (version range, architecture, attribute
/// match) is the provider's business.
pub trait Restriction: std::fmt::Debug {
    fn meets_restriction(&self, candidate: &Implementation) -> bool;
}

/// A directed link from an implementation or command to a target interface.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub target: IfaceId,
    pub importance: Importance,
    pub restrictions: Vec<Rc<dyn Restriction>>,
    pub required_commands: Vec<String>,
}

impl Dependency {
    pub fn meets_all_restrictions(&self, candidate: &Implementation) -> bool {
        self.restrictions
            .iter()
            .all(|restriction| restriction.meets_restriction(candidate))
    }
}

/// An environmental injection (path, variable) a selection's user must
/// apply. Parsed only far enough to know whether it names a command in the
/// same implementation -- the rest of its shape is opaque attribute data
/// carried through to the selections document untouched.
#[derive(Debug, Clone)]
pub struct Binding {
    /// `Some(command_name)` when this binding targets a command exported by
    /// the same implementation; `None` for a plain environment binding.
    pub names_command: Option<String>,
    /// Opaque payload copied verbatim into the selections document.
    pub attrs: BTreeMap<String, String>,
}

/// A named invocation entry point exported by an implementation.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub dependencies: Vec<Dependency>,
    pub bindings: Vec<Binding>,
    /// Opaque XML subtree, copied into the selections document minus any
    /// nested `requires`/`restricts`/`runner` children (§4.5).
    pub attrs: BTreeMap<String, String>,
}

impl Command {
    /// Synthesizes the sentinel dummy command diagnostic mode offers
    /// unconditionally for any requested command name, regardless of
    /// whether the dummy implementation was built knowing that name in
    /// advance.
    pub fn dummy(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dependencies: Vec::new(),
            bindings: Vec::new(),
            attrs: BTreeMap::new(),
        }
    }
}

/// How an implementation is obtained.
#[derive(Debug, Clone)]
pub enum ImplMode {
    /// Directly usable as-is.
    Immediate,
    /// Must be compiled from a companion source implementation, forced
    /// lazily and memoized -- evaluating the reference more than once is a
    /// programmer error (§5 "Lazy force ... must be safe to evaluate
    /// exactly once per impl").
    RequiresCompilation(LazySourceImpl),
}

/// A once-only lazily forced reference to a companion source implementation.
#[derive(Clone)]
pub struct LazySourceImpl {
    inner: Rc<std::cell::OnceCell<Rc<Implementation>>>,
    force: Rc<dyn Fn() -> Rc<Implementation>>,
}

impl LazySourceImpl {
    pub fn new(force: impl Fn() -> Rc<Implementation> + 'static) -> Self {
        Self {
            inner: Rc::new(std::cell::OnceCell::new()),
            force: Rc::new(force),
        }
    }

    /// Forces evaluation, memoizing the result. Safe to call more than once;
    /// only the first call actually invokes the provider-supplied thunk.
    pub fn force(&self) -> Rc<Implementation> {
        self.inner.get_or_init(|| (self.force)()).clone()
    }
}

impl std::fmt::Debug for LazySourceImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LazySourceImpl(forced = {})", self.inner.get().is_some())
    }
}

/// A concrete version of an interface, as reported by the provider.
#[derive(Debug, Clone)]
pub struct Implementation {
    pub id: String,
    pub iface: IfaceId,
    pub version: Version,
    pub os: Option<String>,
    pub machine: Option<String>,
    pub attrs: BTreeMap<String, String>,
    pub dependencies: Vec<Dependency>,
    pub commands: BTreeMap<String, Command>,
    pub self_bindings: Vec<Binding>,
    pub mode: ImplMode,
    pub from_feed: Option<String>,
    /// Opaque `manifest-digest` child, copied into the selection verbatim
    /// if present.
    pub manifest_digest: Option<BTreeMap<String, String>>,
}

impl Implementation {
    pub fn is_dummy(&self) -> bool {
        self.version.0 == "dummy"
    }

    /// Builds the sentinel dummy implementation used only in diagnostic
    /// mode: satisfies every restriction, local path `"/dummy"`. Commands
    /// are synthesized on demand by [`Command::dummy`] when a request for
    /// one is actually made, rather than pre-populated here -- the dummy
    /// impl can't know in advance which command names will be asked for.
    pub fn dummy_for(iface: &str) -> Rc<Self> {
        let mut attrs = BTreeMap::new();
        attrs.insert("local-path".to_string(), "/dummy".to_string());
        Rc::new(Self {
            id: "dummy".to_string(),
            iface: iface.to_string(),
            version: Version("dummy".to_string()),
            os: None,
            machine: None,
            attrs,
            dependencies: Vec::new(),
            commands: BTreeMap::new(),
            self_bindings: Vec::new(),
            mode: ImplMode::Immediate,
            from_feed: None,
            manifest_digest: None,
        })
    }
}

/// A parsed version string. Kept opaque (string-wrapped) -- version
/// comparison semantics belong to the provider/restriction implementations,
/// not the core.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pub String);

impl Version {
    pub fn is_dummy(&self) -> bool {
        self.0 == "dummy"
    }
}

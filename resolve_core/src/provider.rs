//! External collaborators the core consumes read-only: the implementation
//! provider and the requirements/scope the driver derives from a request.
//! Ranking policy, rejection reasons, and feed parsing all live on the
//! other side of [`ImplementationProvider`]; this module only defines the
//! seam.

use crate::model::{Implementation, IfaceId};
use std::collections::BTreeMap;
use std::rc::Rc;

/// What `get_implementations` returns for one interface.
#[derive(Debug, Clone)]
pub struct Candidates {
    /// `<replaced-by>` target, if the provider's feed declared one.
    pub replacement: Option<IfaceId>,
    /// Candidate implementations, in the provider's preference order.
    pub impls: Vec<Rc<Implementation>>,
    /// Rejected candidates and why; carried through untouched, the core
    /// never inspects this -- it exists purely so a caller can report why a
    /// candidate never reached `impls`.
    pub rejects: Vec<(Rc<Implementation>, String)>,
}

/// The provider the problem builder consults while walking the requirement
/// graph. Implemented externally (feed parsing, ranking, platform
/// filtering); the core treats it as a read-only oracle.
pub trait ImplementationProvider {
    fn get_implementations(&self, iface: &str) -> Candidates;

    /// Whether a `use=`-filtered dependency actually applies under the
    /// current scope.
    fn is_dep_needed(&self, dep: &crate::model::Dependency) -> bool;
}

/// A fully-resolved root request: either "pick any candidate for this
/// interface" or "pick a candidate publishing this command".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootRequirement {
    Iface(IfaceId),
    Command { name: String, iface: IfaceId },
}

impl RootRequirement {
    pub fn iface(&self) -> &str {
        match self {
            Self::Iface(iface) => iface,
            Self::Command { iface, .. } => iface,
        }
    }

    pub fn command_name(&self) -> Option<&str> {
        match self {
            Self::Iface(_) => None,
            Self::Command { name, .. } => Some(name),
        }
    }
}

/// The raw request handed to `solve_for`, before scope derivation.
#[derive(Debug, Clone)]
pub struct Requirements {
    pub iface: IfaceId,
    pub command: Option<String>,
    pub os: Option<String>,
    pub cpu: Option<String>,
    pub source: bool,
    pub extra_restrictions: BTreeMap<IfaceId, String>,
    pub languages: Vec<String>,
}

/// Scope filter derived from [`Requirements`]: the inputs the provider needs
/// to rank and filter candidates consistently across the whole solve.
#[derive(Debug, Clone)]
pub struct Scope {
    pub os: Option<String>,
    pub cpu: Option<String>,
    pub source_preferred: bool,
    pub languages: Vec<String>,
    pub extra_restrictions: BTreeMap<IfaceId, String>,
    /// Implicit `use="testing"` filter, turned on when the requested
    /// command is `"test"`.
    pub use_testing: bool,
    /// Disables multi-arch handling on Linux hosts lacking
    /// `/lib/ld-linux.so.2` (32-bit compatibility loader absent).
    pub multi_arch: bool,
}

/// Computes the scope filter and root requirement from a raw `Requirements`
/// value.
///
/// `has_ld_linux_so_2` is injected rather than probed from the filesystem
/// directly, so the decision stays testable without a real host's library
/// layout.
pub fn derive_root(requirements: &Requirements, has_ld_linux_so_2: bool) -> (Scope, RootRequirement) {
    let use_testing = requirements.command.as_deref() == Some("test");
    let scope = Scope {
        os: requirements.os.clone(),
        cpu: requirements.cpu.clone(),
        source_preferred: requirements.source,
        languages: requirements.languages.clone(),
        extra_restrictions: requirements.extra_restrictions.clone(),
        use_testing,
        multi_arch: has_ld_linux_so_2,
    };
    let root = match &requirements.command {
        Some(name) => RootRequirement::Command {
            name: name.clone(),
            iface: requirements.iface.clone(),
        },
        None => RootRequirement::Iface(requirements.iface.clone()),
    };
    (scope, root)
}

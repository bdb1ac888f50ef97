use core::fmt;

/// Errors the core can report. Follows the reference solver's own style: a
/// flat enum with `From` impls for the sub-errors of each module, rather than
/// a derive-macro error crate.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The SAT engine found the clause set unsatisfiable even in diagnostic
    /// (closest-match) mode. Unreachable by construction -- the dummy impl
    /// satisfies every restriction and offers every command -- so surfacing
    /// this means a problem-builder invariant broke.
    DiagnosticUnsat,
    /// A candidate set's governing at-most-one clause resolved to a selected
    /// literal whose payload was not the expected variant.
    UnexpectedPayloadVariant,
    /// `Cache::lookup`'s `make` closure attempted to call back into
    /// `lookup` directly instead of deferring the recursive work to its
    /// returned continuation.
    ReentrantCacheLookup,
    /// Propagated from `bounded` collection accesses.
    Bounded(bounded::OutOfBoundsAccess),
    /// The root requirement named an interface or command the provider
    /// never returned any candidates for, and not even the dummy
    /// implementation was available to cover it (non-diagnostic mode).
    NoCandidatesForRoot,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiagnosticUnsat => {
                write!(f, "closest-match solve was unsatisfiable, which should never happen")
            }
            Self::UnexpectedPayloadVariant => {
                write!(f, "a selected literal's payload was not the variant its candidate set expected")
            }
            Self::ReentrantCacheLookup => {
                write!(f, "a cache lookup's constructor recursed back into the cache directly")
            }
            Self::Bounded(_) => write!(f, "out-of-bounds access on a bounded collection"),
            Self::NoCandidatesForRoot => {
                write!(f, "no candidates available for the root requirement")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<bounded::OutOfBoundsAccess> for Error {
    fn from(err: bounded::OutOfBoundsAccess) -> Self {
        Self::Bounded(err)
    }
}

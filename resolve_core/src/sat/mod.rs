//! The boolean-constraint engine underlying component selection.
//!
//! Generalizes the reference `s3-sat-solver`'s `Literal`/`ClauseDb`/`Assignment`
//! trio (built for plain CNF over anonymous variables) to the clause shapes
//! component selection actually needs -- at-most-one groups, implications,
//! at-least-one obligations -- and to variables that carry a payload
//! (an implementation, a command, a machine group, an interface).

mod assignment;
mod clause;
mod engine;
mod literal;

pub use assignment::{ConflictCause, PropagationResult, Reason};
pub use clause::{AmoGroup, AmoId, ClauseId, GeneralClause};
pub use engine::{ClauseHandle, ReasonTree, SatEngine};
pub use literal::{Literal, Sign, Variable};

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Payload {
        Impl(&'static str),
    }

    #[test]
    fn at_most_one_forces_others_false_once_one_is_selected() {
        let mut engine: SatEngine<Payload> = SatEngine::new();
        let a = engine.add_variable(Payload::Impl("a"));
        let b = engine.add_variable(Payload::Impl("b"));
        let c = engine.add_variable(Payload::Impl("c"));
        let handle = engine.at_most_one(vec![a, b, c]);

        let sat = engine.run_solver(&mut |eng| {
            if !eng.is_decided(a) {
                Some(a)
            } else {
                None
            }
        });

        assert!(sat);
        assert_eq!(engine.get_selected(handle), Some(a));
        assert!(!engine.is_true(b));
        assert!(!engine.is_true(c));
    }

    #[test]
    fn at_least_one_forces_the_last_undecided_literal_true() {
        let mut engine: SatEngine<Payload> = SatEngine::new();
        let a = engine.add_variable(Payload::Impl("a"));
        let b = engine.add_variable(Payload::Impl("b"));
        engine.at_least_one(vec![a, b], "need a or b");

        let sat = engine.run_solver(&mut |eng| {
            if !eng.is_decided(a) {
                Some(!a)
            } else {
                None
            }
        });

        assert!(sat);
        assert!(!engine.is_true(a));
        assert!(engine.is_true(b));
    }

    #[test]
    fn implies_forces_dependency_true_once_dependent_is_selected() {
        let mut engine: SatEngine<Payload> = SatEngine::new();
        let dependent = engine.add_variable(Payload::Impl("dependent"));
        let dependency = engine.add_variable(Payload::Impl("dependency"));
        engine.implies(dependent, vec![dependency], "dependent requires dependency");

        let sat = engine.run_solver(&mut |eng| {
            if !eng.is_decided(dependent) {
                Some(dependent)
            } else {
                None
            }
        });

        assert!(sat);
        assert!(engine.is_true(dependency));
    }

    #[test]
    fn conflicting_implications_are_unsatisfiable() {
        let mut engine: SatEngine<Payload> = SatEngine::new();
        let a = engine.add_variable(Payload::Impl("a"));
        let b = engine.add_variable(Payload::Impl("b"));
        engine.at_least_one(vec![a], "need a");
        engine.implies(a, vec![b], "a requires b");
        engine.implies(a, vec![!b], "a also excludes b");

        let sat = engine.run_solver(&mut |eng| {
            if !eng.is_decided(a) {
                Some(a)
            } else {
                None
            }
        });

        assert!(!sat);
    }

    #[test]
    fn explain_reason_walks_the_causal_chain() {
        let mut engine: SatEngine<Payload> = SatEngine::new();
        let a = engine.add_variable(Payload::Impl("a"));
        let b = engine.add_variable(Payload::Impl("b"));
        let handle = engine.at_most_one(vec![a, b]);

        let sat = engine.run_solver(&mut |eng| {
            if !eng.is_decided(a) {
                Some(a)
            } else {
                None
            }
        });
        assert!(sat);
        assert_eq!(engine.get_selected(handle), Some(a));

        let tree = engine.explain_reason(!b);
        assert_eq!(tree.literal, !b);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].literal, a);
    }
}

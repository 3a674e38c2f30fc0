//! Overload selection
//!
//! Picking a function for a call is a pure function of the candidate
//! signatures and the argument types; the resolver gathers both and acts
//! on the returned [`Selection`].
//!
//! A candidate matches a call *exactly* when every argument type equals
//! its parameter type, and *loosely* when every argument is equal or
//! coercible and at least one needs a coercion. An argument that is itself
//! an unresolved overloaded name contributes the best tier among its own
//! candidates. A unique exact match wins; otherwise a unique loose match;
//! otherwise the call is ambiguous or has no match.

use smallvec::SmallVec;

use crate::symbols::types::{CoercionRules, TypeId};

/// Signature of one callable candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub params: SmallVec<[TypeId; 4]>,
    /// Parameters without a default value
    pub required: usize,
}

impl Candidate {
    pub fn new(params: &[TypeId], required: usize) -> Self {
        Self {
            params: params.into(),
            required,
        }
    }

    pub fn accepts_count(&self, count: usize) -> bool {
        (self.required..=self.params.len()).contains(&count)
    }
}

/// Static type of one call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    Known(TypeId),
    /// Types of the candidates of an unresolved overloaded name.
    Candidates(SmallVec<[TypeId; 4]>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Exact(usize),
    Loose(usize),
    /// Indices of the equally good candidates.
    Ambiguous(SmallVec<[usize; 4]>),
    NoMatch,
}

/// How well one argument or one candidate matches. `Exact` is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Exact,
    Loose,
}

/// Tier of passing a value of type `arg` where `param` is expected.
pub fn type_tier(arg: TypeId, param: TypeId, rules: &dyn CoercionRules) -> Option<Tier> {
    if arg == param {
        Some(Tier::Exact)
    } else if rules.is_coercible(arg, param) {
        Some(Tier::Loose)
    } else {
        None
    }
}

fn arg_tier(arg: &ArgType, param: TypeId, rules: &dyn CoercionRules) -> Option<Tier> {
    match arg {
        ArgType::Known(ty) => type_tier(*ty, param, rules),
        ArgType::Candidates(types) => types
            .iter()
            .filter_map(|ty| type_tier(*ty, param, rules))
            .min(),
    }
}

/// Tier of a whole candidate: the worst tier among its arguments.
pub fn candidate_tier(
    candidate: &Candidate,
    args: &[ArgType],
    rules: &dyn CoercionRules,
) -> Option<Tier> {
    if !candidate.accepts_count(args.len()) {
        return None;
    }
    args.iter()
        .zip(&candidate.params)
        .try_fold(Tier::Exact, |worst, (arg, param)| {
            arg_tier(arg, *param, rules).map(|tier| worst.max(tier))
        })
}

/// Choose among `candidates` for a call with `args`. `None` entries are
/// names that are not callable; they never match but keep their index.
pub fn select_overload(
    candidates: &[Option<Candidate>],
    args: &[ArgType],
    rules: &dyn CoercionRules,
) -> Selection {
    let mut exact: SmallVec<[usize; 4]> = SmallVec::new();
    let mut loose: SmallVec<[usize; 4]> = SmallVec::new();

    for (index, candidate) in candidates.iter().enumerate() {
        let Some(candidate) = candidate else {
            continue;
        };
        match candidate_tier(candidate, args, rules) {
            Some(Tier::Exact) => exact.push(index),
            Some(Tier::Loose) => loose.push(index),
            None => {}
        }
    }

    match (exact.as_slice(), loose.as_slice()) {
        ([only], _) => Selection::Exact(*only),
        ([], [only]) => Selection::Loose(*only),
        ([], []) => Selection::NoMatch,
        ([], _) => Selection::Ambiguous(loose),
        _ => Selection::Ambiguous(exact),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::types::{NumericWidening, Strict};
    use smallvec::smallvec;

    fn known(types: &[TypeId]) -> Vec<ArgType> {
        types.iter().map(|ty| ArgType::Known(*ty)).collect()
    }

    #[test]
    fn test_arity_selects_overload() {
        let candidates = [
            Some(Candidate::new(&[TypeId::I32], 1)),
            Some(Candidate::new(&[TypeId::I32, TypeId::I32], 2)),
        ];
        let args = known(&[TypeId::I32, TypeId::I32]);
        assert_eq!(
            select_overload(&candidates, &args, &NumericWidening),
            Selection::Exact(1)
        );
    }

    #[test]
    fn test_exact_beats_loose() {
        let candidates = [
            Some(Candidate::new(&[TypeId::F64], 1)),
            Some(Candidate::new(&[TypeId::I32], 1)),
        ];
        let args = known(&[TypeId::I32]);
        assert_eq!(
            select_overload(&candidates, &args, &NumericWidening),
            Selection::Exact(1)
        );

        let args = known(&[TypeId::I16]);
        assert_eq!(
            select_overload(&candidates, &args, &NumericWidening),
            Selection::Ambiguous(smallvec![0, 1])
        );
    }

    #[test]
    fn test_unique_loose_match() {
        let candidates = [
            Some(Candidate::new(&[TypeId::F64], 1)),
            Some(Candidate::new(&[TypeId::BOOL], 1)),
        ];
        let args = known(&[TypeId::I32]);
        assert_eq!(
            select_overload(&candidates, &args, &NumericWidening),
            Selection::Loose(0)
        );
        assert_eq!(
            select_overload(&candidates, &args, &Strict),
            Selection::NoMatch
        );
    }

    #[test]
    fn test_default_parameters_widen_arity() {
        let candidates = [Some(Candidate::new(&[TypeId::I32, TypeId::BOOL], 1))];
        assert_eq!(
            select_overload(&candidates, &known(&[TypeId::I32]), &Strict),
            Selection::Exact(0)
        );
        assert_eq!(
            select_overload(&candidates, &known(&[]), &Strict),
            Selection::NoMatch
        );
    }

    #[test]
    fn test_multi_candidate_argument_uses_best_tier() {
        let candidates = [
            Some(Candidate::new(&[TypeId::I64], 1)),
            None,
        ];
        let args = vec![ArgType::Candidates(smallvec![TypeId::I32, TypeId::I64])];
        assert_eq!(
            select_overload(&candidates, &args, &NumericWidening),
            Selection::Exact(0)
        );
    }

    #[test]
    fn test_candidate_tier_is_worst_argument() {
        let candidate = Candidate::new(&[TypeId::I32, TypeId::F64], 2);
        assert_eq!(
            candidate_tier(&candidate, &known(&[TypeId::I32, TypeId::F64]), &NumericWidening),
            Some(Tier::Exact)
        );
        assert_eq!(
            candidate_tier(&candidate, &known(&[TypeId::I32, TypeId::I32]), &NumericWidening),
            Some(Tier::Loose)
        );
        assert_eq!(
            candidate_tier(&candidate, &known(&[TypeId::BOOL, TypeId::F64]), &NumericWidening),
            None
        );
    }
}

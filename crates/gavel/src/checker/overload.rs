//! Overload resolution for function calls.
//!
//! A candidate must match the call style (global or method) and arity, and
//! every parameter must be assignable from its argument. Among candidates,
//! the one with the most parameters matching exactly (not through `Dyn`)
//! wins. When an argument type contains `Dyn`, every candidate is kept and
//! the choice is made at run time.

use crate::types::{FunctionDecl, OverloadDecl, Type};

use super::CheckErrorKind;

/// Result of overload resolution.
#[derive(Debug)]
pub struct OverloadResult {
    /// The resolved result type.
    pub result_type: Type,
    /// The chosen overload IDs. More than one only under runtime dispatch.
    pub overload_ids: Vec<String>,
}

/// Resolve the best matching overload(s) for a call.
///
/// `args` includes the receiver type first for method calls.
pub fn resolve_overload(
    func: &FunctionDecl,
    is_member: bool,
    args: &[Type],
) -> Result<OverloadResult, CheckErrorKind> {
    let same_style: Vec<&OverloadDecl> = func
        .overloads
        .iter()
        .filter(|o| o.is_member == is_member)
        .collect();

    let matching: Vec<&OverloadDecl> = same_style
        .iter()
        .copied()
        .filter(|o| {
            o.params.len() == args.len()
                && o.params
                    .iter()
                    .zip(args)
                    .all(|(param, arg)| param.is_assignable_from(arg))
        })
        .collect();

    if matching.is_empty() {
        return Err(no_match(func, args, &same_style));
    }

    if args.iter().any(Type::contains_dyn) {
        let result_type = matching
            .iter()
            .map(|o| o.result.clone())
            .reduce(|acc, ty| acc.join(&ty))
            .unwrap_or(Type::Dyn);
        return Ok(OverloadResult {
            result_type,
            overload_ids: matching.iter().map(|o| o.id.clone()).collect(),
        });
    }

    let best = matching
        .iter()
        .map(|o| specificity(o, args))
        .max()
        .unwrap_or(0);
    let winners: Vec<&OverloadDecl> = matching
        .into_iter()
        .filter(|o| specificity(o, args) == best)
        .collect();

    match winners.as_slice() {
        [single] => Ok(OverloadResult {
            result_type: single.result.clone(),
            overload_ids: vec![single.id.clone()],
        }),
        tied => Err(no_match(func, args, tied)),
    }
}

/// Number of parameters matching their argument exactly.
fn specificity(overload: &OverloadDecl, args: &[Type]) -> usize {
    overload
        .params
        .iter()
        .zip(args)
        .filter(|(param, arg)| !param.contains_dyn() && param == arg)
        .count()
}

fn no_match(func: &FunctionDecl, args: &[Type], candidates: &[&OverloadDecl]) -> CheckErrorKind {
    CheckErrorKind::NoMatchingOverload {
        function: func.name.clone(),
        arg_types: args.to_vec(),
        candidates: candidates.iter().map(|o| o.signature(&func.name)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size_decl() -> FunctionDecl {
        FunctionDecl::new("size").with_overloads([
            OverloadDecl::function("size_string", vec![Type::String], Type::Int),
            OverloadDecl::function("size_list", vec![Type::list(Type::Dyn)], Type::Int),
            OverloadDecl::method("string_size", vec![Type::String], Type::Int),
        ])
    }

    #[test]
    fn test_resolve_simple_overload() {
        let result = resolve_overload(&size_decl(), false, &[Type::String]).expect("match");
        assert_eq!(result.overload_ids, vec!["size_string".to_string()]);
        assert_eq!(result.result_type, Type::Int);
    }

    #[test]
    fn test_resolve_method_overload() {
        let result = resolve_overload(&size_decl(), true, &[Type::String]).expect("match");
        assert_eq!(result.overload_ids, vec!["string_size".to_string()]);
    }

    #[test]
    fn test_resolve_no_match_lists_candidates() {
        let err = resolve_overload(&size_decl(), false, &[Type::Int]).unwrap_err();
        match err {
            CheckErrorKind::NoMatchingOverload { candidates, .. } => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_exact_match_beats_dyn() {
        let decl = FunctionDecl::new("f").with_overloads([
            OverloadDecl::function("f_dyn", vec![Type::Dyn], Type::Dyn),
            OverloadDecl::function("f_int", vec![Type::Int], Type::Int),
        ]);
        let result = resolve_overload(&decl, false, &[Type::Int]).expect("match");
        assert_eq!(result.overload_ids, vec!["f_int".to_string()]);
    }

    #[test]
    fn test_tie_is_ambiguous() {
        let decl = FunctionDecl::new("f").with_overloads([
            OverloadDecl::function("f_a", vec![Type::Int, Type::Dyn], Type::Int),
            OverloadDecl::function("f_b", vec![Type::Dyn, Type::Int], Type::Int),
        ]);
        let err = resolve_overload(&decl, false, &[Type::Int, Type::Int]).unwrap_err();
        assert!(matches!(err, CheckErrorKind::NoMatchingOverload { .. }));
    }

    #[test]
    fn test_dyn_argument_keeps_all_matches() {
        let result = resolve_overload(&size_decl(), false, &[Type::Dyn]).expect("match");
        assert_eq!(result.overload_ids.len(), 2);
        assert_eq!(result.result_type, Type::Int);
    }
}

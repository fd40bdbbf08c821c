//! Operator kernels.
//!
//! A kernel implements one operator for one operand kind. Typed kernels
//! match the expected kind first and fall back to the dynamic kernel, which
//! inspects both values and fails with `ArgumentTypeMismatch` when no
//! overload applies.

use std::cmp::Ordering;
use std::sync::Arc;

use gavel_parser::{BinaryOp, UnaryOp};

use super::{EvalError, MapKey, Value, ValueMap};
use crate::types::OperandKind;

pub(crate) type BinaryKernel = fn(&Value, &Value) -> Result<Value, EvalError>;
pub(crate) type UnaryKernel = fn(&Value) -> Result<Value, EvalError>;

/// Picks the kernel for `op` over `kind`. `&&` and `||` are control flow
/// and have no kernel.
pub(crate) fn binary_kernel(op: BinaryOp, kind: OperandKind) -> Option<BinaryKernel> {
    use OperandKind as K;

    let kernel: BinaryKernel = match (op, kind) {
        (BinaryOp::And | BinaryOp::Or, _) => return None,

        (BinaryOp::Add, K::Int) => add_int,
        (BinaryOp::Add, K::UInt) => add_uint,
        (BinaryOp::Add, K::Double) => add_double,
        (BinaryOp::Add, K::String) => add_string,
        (BinaryOp::Add, _) => add,
        (BinaryOp::Sub, K::Int) => sub_int,
        (BinaryOp::Sub, K::UInt) => sub_uint,
        (BinaryOp::Sub, K::Double) => sub_double,
        (BinaryOp::Sub, _) => sub,
        (BinaryOp::Mul, K::Int) => mul_int,
        (BinaryOp::Mul, K::UInt) => mul_uint,
        (BinaryOp::Mul, K::Double) => mul_double,
        (BinaryOp::Mul, _) => mul,
        (BinaryOp::Div, _) => div,
        (BinaryOp::Mod, _) => rem,

        (BinaryOp::Eq, K::Dyn | K::List | K::Map) => eq_dyn,
        (BinaryOp::Eq, _) => eq_same,
        (BinaryOp::Ne, K::Dyn | K::List | K::Map) => ne_dyn,
        (BinaryOp::Ne, _) => ne_same,

        (BinaryOp::Lt, K::Dyn) => lt_dyn,
        (BinaryOp::Lt, _) => lt_same,
        (BinaryOp::Le, K::Dyn) => le_dyn,
        (BinaryOp::Le, _) => le_same,
        (BinaryOp::Gt, K::Dyn) => gt_dyn,
        (BinaryOp::Gt, _) => gt_same,
        (BinaryOp::Ge, K::Dyn) => ge_dyn,
        (BinaryOp::Ge, _) => ge_same,

        (BinaryOp::In, K::List) => in_list,
        (BinaryOp::In, K::Map) => in_map,
        (BinaryOp::In, _) => in_dyn,
    };
    Some(kernel)
}

pub(crate) fn unary_kernel(op: UnaryOp, kind: OperandKind) -> UnaryKernel {
    match (op, kind) {
        (UnaryOp::Neg, OperandKind::Int) => neg_int,
        (UnaryOp::Neg, _) => neg,
        (UnaryOp::Not, _) => not,
    }
}

fn mismatch(op: &str, l: &Value, r: &Value) -> EvalError {
    EvalError::no_matching_operator(op, &[l.kind_name(), r.kind_name()])
}

fn checked<T>(result: Option<T>, operation: &str) -> Result<T, EvalError> {
    result.ok_or_else(|| EvalError::overflow(operation))
}

// ==================== Arithmetic ====================

macro_rules! typed_arithmetic {
    ($($name:ident: $variant:ident, $method:ident, $label:literal, $fallback:ident;)*) => {
        $(
            fn $name(l: &Value, r: &Value) -> Result<Value, EvalError> {
                match (l, r) {
                    (Value::$variant(a), Value::$variant(b)) => {
                        checked(a.$method(*b), $label).map(Value::$variant)
                    }
                    _ => $fallback(l, r),
                }
            }
        )*
    };
}

typed_arithmetic! {
    add_int: Int, checked_add, "integer addition", add;
    add_uint: UInt, checked_add, "unsigned addition", add;
    sub_int: Int, checked_sub, "integer subtraction", sub;
    sub_uint: UInt, checked_sub, "unsigned subtraction", sub;
    mul_int: Int, checked_mul, "integer multiplication", mul;
    mul_uint: UInt, checked_mul, "unsigned multiplication", mul;
}

fn add_double(l: &Value, r: &Value) -> Result<Value, EvalError> {
    match (l, r) {
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a + b)),
        _ => add(l, r),
    }
}

fn sub_double(l: &Value, r: &Value) -> Result<Value, EvalError> {
    match (l, r) {
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a - b)),
        _ => sub(l, r),
    }
}

fn mul_double(l: &Value, r: &Value) -> Result<Value, EvalError> {
    match (l, r) {
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a * b)),
        _ => mul(l, r),
    }
}

fn add_string(l: &Value, r: &Value) -> Result<Value, EvalError> {
    match (l, r) {
        (Value::String(a), Value::String(b)) => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Value::from(joined))
        }
        _ => add(l, r),
    }
}

pub(crate) fn add(l: &Value, r: &Value) -> Result<Value, EvalError> {
    match (l, r) {
        (Value::Int(_), Value::Int(_)) => add_int(l, r),
        (Value::UInt(_), Value::UInt(_)) => add_uint(l, r),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a + b)),
        (Value::String(_), Value::String(_)) => add_string(l, r),
        (Value::Bytes(a), Value::Bytes(b)) => {
            Ok(Value::Bytes(a.iter().chain(b.iter()).copied().collect()))
        }
        (Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
        }
        _ => Err(mismatch("+", l, r)),
    }
}

pub(crate) fn sub(l: &Value, r: &Value) -> Result<Value, EvalError> {
    match (l, r) {
        (Value::Int(_), Value::Int(_)) => sub_int(l, r),
        (Value::UInt(_), Value::UInt(_)) => sub_uint(l, r),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a - b)),
        _ => Err(mismatch("-", l, r)),
    }
}

pub(crate) fn mul(l: &Value, r: &Value) -> Result<Value, EvalError> {
    match (l, r) {
        (Value::Int(_), Value::Int(_)) => mul_int(l, r),
        (Value::UInt(_), Value::UInt(_)) => mul_uint(l, r),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a * b)),
        _ => Err(mismatch("*", l, r)),
    }
}

pub(crate) fn div(l: &Value, r: &Value) -> Result<Value, EvalError> {
    match (l, r) {
        (Value::Int(_), Value::Int(0)) | (Value::UInt(_), Value::UInt(0)) => {
            Err(EvalError::division_by_zero())
        }
        (Value::Int(a), Value::Int(b)) => checked(a.checked_div(*b), "integer division").map(Value::Int),
        (Value::UInt(a), Value::UInt(b)) => {
            checked(a.checked_div(*b), "unsigned division").map(Value::UInt)
        }
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a / b)),
        _ => Err(mismatch("/", l, r)),
    }
}

pub(crate) fn rem(l: &Value, r: &Value) -> Result<Value, EvalError> {
    match (l, r) {
        (Value::Int(_), Value::Int(0)) | (Value::UInt(_), Value::UInt(0)) => {
            Err(EvalError::modulo_by_zero())
        }
        (Value::Int(a), Value::Int(b)) => checked(a.checked_rem(*b), "integer modulo").map(Value::Int),
        (Value::UInt(a), Value::UInt(b)) => {
            checked(a.checked_rem(*b), "unsigned modulo").map(Value::UInt)
        }
        _ => Err(mismatch("%", l, r)),
    }
}

// ==================== Equality ====================

fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::UInt(_) | Value::Double(_))
}

/// Equality with numeric comparison across Int, UInt and Double, applied
/// recursively through lists and maps.
pub(crate) fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        _ if is_numeric(l) && is_numeric(r) => l.compare(r) == Some(Ordering::Equal),
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => l == r,
    }
}

fn eq_same(l: &Value, r: &Value) -> Result<Value, EvalError> {
    Ok(Value::Bool(l == r))
}

fn ne_same(l: &Value, r: &Value) -> Result<Value, EvalError> {
    Ok(Value::Bool(l != r))
}

pub(crate) fn eq_dyn(l: &Value, r: &Value) -> Result<Value, EvalError> {
    Ok(Value::Bool(values_equal(l, r)))
}

fn ne_dyn(l: &Value, r: &Value) -> Result<Value, EvalError> {
    Ok(Value::Bool(!values_equal(l, r)))
}

// ==================== Ordering ====================

fn ordered(
    l: &Value,
    r: &Value,
    symbol: &str,
    test: fn(Ordering) -> bool,
    cross_numeric: bool,
) -> Result<Value, EvalError> {
    let numeric_pair = is_numeric(l) && is_numeric(r);
    let same_kind = std::mem::discriminant(l) == std::mem::discriminant(r);
    if !same_kind && !(cross_numeric && numeric_pair) {
        return Err(mismatch(symbol, l, r));
    }
    match l.compare(r) {
        Some(ordering) => Ok(Value::Bool(test(ordering))),
        // NaN is unordered
        None if numeric_pair => Ok(Value::Bool(false)),
        None => Err(mismatch(symbol, l, r)),
    }
}

macro_rules! ordering_kernels {
    ($($same:ident, $dynamic:ident: $symbol:literal, $test:path;)*) => {
        $(
            fn $same(l: &Value, r: &Value) -> Result<Value, EvalError> {
                ordered(l, r, $symbol, $test, false)
            }

            fn $dynamic(l: &Value, r: &Value) -> Result<Value, EvalError> {
                ordered(l, r, $symbol, $test, true)
            }
        )*
    };
}

ordering_kernels! {
    lt_same, lt_dyn: "<", Ordering::is_lt;
    le_same, le_dyn: "<=", Ordering::is_le;
    gt_same, gt_dyn: ">", Ordering::is_gt;
    ge_same, ge_dyn: ">=", Ordering::is_ge;
}

// ==================== Membership ====================

fn in_list(needle: &Value, haystack: &Value) -> Result<Value, EvalError> {
    match haystack {
        Value::List(items) => Ok(Value::Bool(items.iter().any(|item| item == needle))),
        _ => in_dyn(needle, haystack),
    }
}

fn in_map(needle: &Value, haystack: &Value) -> Result<Value, EvalError> {
    match (haystack, MapKey::from_value(needle)) {
        (Value::Map(map), Some(key)) => Ok(Value::Bool(map.contains_key(&key))),
        _ => in_dyn(needle, haystack),
    }
}

fn in_dyn(needle: &Value, haystack: &Value) -> Result<Value, EvalError> {
    match haystack {
        Value::List(items) => Ok(Value::Bool(
            items.iter().any(|item| values_equal(item, needle)),
        )),
        Value::Map(map) => Ok(Value::Bool(lookup_key(map, needle)?.is_some())),
        _ => Err(mismatch("in", needle, haystack)),
    }
}

/// Looks `key` up in `map`. Numeric keys also match entries stored under
/// an equal number of another numeric kind.
pub(crate) fn lookup_key<'m>(map: &'m ValueMap, key: &Value) -> Result<Option<&'m Value>, EvalError> {
    if let Some(exact) = MapKey::from_value(key) {
        if let Some(found) = map.get(&exact) {
            return Ok(Some(found));
        }
    }
    let alternatives: [Option<MapKey>; 2] = match key {
        Value::Int(i) => [u64::try_from(*i).ok().map(MapKey::UInt), None],
        Value::UInt(u) => [i64::try_from(*u).ok().map(MapKey::Int), None],
        Value::Double(d) if d.fract() == 0.0 => [
            double_to_int(*d).map(MapKey::Int),
            double_to_uint(*d).map(MapKey::UInt),
        ],
        Value::Double(_) => [None, None],
        Value::Bool(_) | Value::String(_) => return Ok(None),
        other => return Err(EvalError::type_mismatch("map key", other.kind_name())),
    };
    Ok(alternatives
        .into_iter()
        .flatten()
        .find_map(|alt| map.get(&alt)))
}

/// Converts an in-range double to i64. Fractions truncate.
pub(crate) fn double_to_int(d: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is out of range.
    (d.is_finite() && d >= -9_223_372_036_854_775_808.0 && d < 9_223_372_036_854_775_808.0)
        .then_some(d as i64)
}

/// Converts an in-range double to u64. Fractions truncate.
pub(crate) fn double_to_uint(d: f64) -> Option<u64> {
    (d.is_finite() && d > -1.0 && d < 18_446_744_073_709_551_616.0).then_some(d as u64)
}

// ==================== Unary ====================

fn neg_int(v: &Value) -> Result<Value, EvalError> {
    match v {
        Value::Int(i) => checked(i.checked_neg(), "integer negation").map(Value::Int),
        _ => neg(v),
    }
}

pub(crate) fn neg(v: &Value) -> Result<Value, EvalError> {
    match v {
        Value::Int(_) => neg_int(v),
        Value::Double(d) => Ok(Value::Double(-d)),
        other => Err(EvalError::no_matching_operator("-", &[other.kind_name()])),
    }
}

pub(crate) fn not(v: &Value) -> Result<Value, EvalError> {
    match v {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(EvalError::no_matching_operator("!", &[other.kind_name()])),
    }
}

// ==================== Access ====================

/// `container[index]` for lists and maps.
pub(crate) fn index(container: &Value, idx: &Value) -> Result<Value, EvalError> {
    match container {
        Value::List(items) => {
            let position = match idx {
                Value::Int(i) => usize::try_from(*i).ok(),
                Value::UInt(u) => usize::try_from(*u).ok(),
                other => return Err(mismatch("[]", container, other)),
            };
            position
                .and_then(|p| items.get(p))
                .cloned()
                .ok_or_else(|| EvalError::index_out_of_bounds(idx, items.len()))
        }
        Value::Map(map) => lookup_key(map, idx)?
            .cloned()
            .ok_or_else(|| EvalError::no_such_key(idx)),
        _ => Err(mismatch("[]", container, idx)),
    }
}

/// `value.field` on objects and string-keyed maps.
pub(crate) fn select(value: &Value, field: &str) -> Result<Value, EvalError> {
    match value {
        Value::Object(object) => object
            .get(field)
            .ok_or_else(|| EvalError::no_such_field(field)),
        Value::Map(map) => map
            .get_str(field)
            .cloned()
            .ok_or_else(|| EvalError::no_such_field(field)),
        other => Err(EvalError::not_selectable(field, other.kind_name())),
    }
}

/// `has(value.field)`.
pub(crate) fn has_field(value: &Value, field: &str) -> Result<Value, EvalError> {
    match value {
        Value::Object(object) => Ok(Value::Bool(object.get(field).is_some())),
        Value::Map(map) => Ok(Value::Bool(map.get_str(field).is_some())),
        other => Err(EvalError::not_selectable(field, other.kind_name())),
    }
}

// ==================== Construction ====================

pub(crate) fn build_list(items: Vec<Value>) -> Value {
    Value::List(Arc::from(items))
}

/// Builds a map literal. Duplicate keys are an error.
pub(crate) fn build_map(entries: impl IntoIterator<Item = (Value, Value)>) -> Result<Value, EvalError> {
    let mut map = ValueMap::new();
    for (key, value) in entries {
        let map_key = MapKey::from_value(&key)
            .ok_or_else(|| EvalError::type_mismatch("map key", key.kind_name()))?;
        if map.insert(map_key, value).is_some() {
            return Err(EvalError::invalid_argument(format!(
                "duplicate map key {key}"
            )));
        }
    }
    Ok(Value::Map(Arc::new(map)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalErrorKind;

    fn binary(op: BinaryOp, kind: OperandKind, l: Value, r: Value) -> Result<Value, EvalError> {
        let kernel = binary_kernel(op, kind).expect("kernel");
        kernel(&l, &r)
    }

    #[test]
    fn typed_arithmetic_checks_overflow() {
        assert_eq!(
            binary(BinaryOp::Add, OperandKind::Int, Value::Int(1), Value::Int(2)),
            Ok(Value::Int(3))
        );
        let err = binary(BinaryOp::Add, OperandKind::Int, Value::Int(i64::MAX), Value::Int(1))
            .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::NumericOverflow);

        let err = binary(BinaryOp::Sub, OperandKind::UInt, Value::UInt(0), Value::UInt(1))
            .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::NumericOverflow);
    }

    #[test]
    fn division_by_zero() {
        let err = binary(BinaryOp::Div, OperandKind::Int, Value::Int(1), Value::Int(0)).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
        let err = binary(BinaryOp::Mod, OperandKind::UInt, Value::UInt(1), Value::UInt(0))
            .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
        let err = binary(BinaryOp::Div, OperandKind::Int, Value::Int(i64::MIN), Value::Int(-1))
            .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::NumericOverflow);
        assert_eq!(
            binary(BinaryOp::Div, OperandKind::Double, Value::Double(1.0), Value::Double(0.0)),
            Ok(Value::Double(f64::INFINITY))
        );
    }

    #[test]
    fn dynamic_kernels_reject_mixed_kinds() {
        let err = binary(BinaryOp::Add, OperandKind::Dyn, Value::Int(1), Value::string("a"))
            .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::ArgumentTypeMismatch);
        assert_eq!(err.message, "no overload of '+' for (int, string)");
    }

    #[test]
    fn dynamic_equality_is_numeric() {
        assert_eq!(
            binary(BinaryOp::Eq, OperandKind::Dyn, Value::Int(1), Value::UInt(1)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            binary(BinaryOp::Eq, OperandKind::Dyn, Value::Int(1), Value::string("1")),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            binary(BinaryOp::Lt, OperandKind::Dyn, Value::Int(1), Value::Double(1.5)),
            Ok(Value::Bool(true))
        );
        let err = binary(BinaryOp::Lt, OperandKind::Int, Value::Int(1), Value::Double(1.5))
            .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::ArgumentTypeMismatch);
    }

    #[test]
    fn nan_is_unordered() {
        assert_eq!(
            binary(BinaryOp::Lt, OperandKind::Double, Value::Double(f64::NAN), Value::Double(1.0)),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn membership() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            binary(BinaryOp::In, OperandKind::List, Value::Int(2), list.clone()),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            binary(BinaryOp::In, OperandKind::Dyn, Value::UInt(2), list),
            Ok(Value::Bool(true))
        );
        let map = build_map([(Value::string("a"), Value::Int(1))]).expect("map");
        assert_eq!(
            binary(BinaryOp::In, OperandKind::Map, Value::string("a"), map),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn indexing() {
        let list = Value::list(vec![Value::Int(10)]);
        assert_eq!(index(&list, &Value::Int(0)), Ok(Value::Int(10)));
        assert_eq!(
            index(&list, &Value::Int(-1)).unwrap_err().kind,
            EvalErrorKind::IndexOutOfBounds
        );

        let map = build_map([(Value::Int(1), Value::string("one"))]).expect("map");
        assert_eq!(index(&map, &Value::UInt(1)), Ok(Value::string("one")));
        assert_eq!(index(&map, &Value::Double(1.0)), Ok(Value::string("one")));
        assert_eq!(
            index(&map, &Value::Int(2)).unwrap_err().kind,
            EvalErrorKind::NoSuchKey
        );
    }

    #[test]
    fn duplicate_map_keys_are_rejected() {
        let err = build_map([
            (Value::string("a"), Value::Int(1)),
            (Value::string("a"), Value::Int(2)),
        ])
        .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::InvalidArgument);
    }

    #[test]
    fn select_requires_fields() {
        let map = build_map([(Value::string("method"), Value::string("GET"))]).expect("map");
        assert_eq!(select(&map, "method"), Ok(Value::string("GET")));
        assert_eq!(select(&map, "url").unwrap_err().kind, EvalErrorKind::NoSuchField);
        assert_eq!(
            select(&Value::Int(1), "x").unwrap_err().kind,
            EvalErrorKind::NoSuchField
        );
        assert_eq!(has_field(&map, "url"), Ok(Value::Bool(false)));
    }

    #[test]
    fn unary() {
        let neg = unary_kernel(UnaryOp::Neg, OperandKind::Int);
        assert_eq!(neg(&Value::Int(5)), Ok(Value::Int(-5)));
        assert_eq!(neg(&Value::Int(i64::MIN)).unwrap_err().kind, EvalErrorKind::NumericOverflow);
        let not = unary_kernel(UnaryOp::Not, OperandKind::Dyn);
        assert_eq!(not(&Value::Int(1)).unwrap_err().kind, EvalErrorKind::ArgumentTypeMismatch);
    }
}

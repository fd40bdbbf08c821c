//! Variable bindings for evaluation.
//!
//! The `Activation` trait resolves variable names to values while a program
//! runs. Bindings are read-only for the duration of an evaluation.

use std::collections::HashMap;
use std::sync::Arc;

use super::Value;

/// Trait for resolving variable bindings during evaluation.
pub trait Activation: Send + Sync {
    /// Resolve a variable name to its value.
    ///
    /// Returns `None` if the variable is not defined in this activation.
    fn resolve(&self, name: &str) -> Option<Value>;

    /// Check if a variable is defined.
    ///
    /// Default implementation returns true if `resolve()` returns Some.
    fn has(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Resolve a variable by the slot the compiler assigned to it.
    ///
    /// The evaluator always calls this method. The default ignores the
    /// slot and looks the name up.
    fn resolve_slot(&self, slot: usize, name: &str) -> Option<Value> {
        let _ = slot;
        self.resolve(name)
    }
}

/// A simple activation backed by a HashMap.
#[derive(Debug, Clone, Default)]
pub struct MapActivation {
    bindings: HashMap<String, Value>,
}

impl MapActivation {
    /// Create a new empty activation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a binding (builder pattern).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    /// Remove a binding.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<S: Into<String>, V: Into<Value>> FromIterator<(S, V)> for MapActivation {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl Activation for MapActivation {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

/// An empty activation with no bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyActivation;

impl EmptyActivation {
    pub fn new() -> Self {
        Self
    }
}

impl Activation for EmptyActivation {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }

    fn has(&self, _name: &str) -> bool {
        false
    }
}

/// Bindings laid out by a program's slot table.
///
/// Resolving a variable is an array index; no hashing happens on the
/// evaluate path. Build one per program with [`SlotActivation::new`] using
/// [`Program::slots`](crate::Program::slots).
#[derive(Debug, Clone)]
pub struct SlotActivation {
    names: Arc<[Arc<str>]>,
    values: Vec<Option<Value>>,
}

impl SlotActivation {
    pub fn new(names: Arc<[Arc<str>]>) -> Self {
        let values = vec![None; names.len()];
        Self { names, values }
    }

    /// Slot index of `name`, if the program references it.
    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|slot| &**slot == name)
    }

    /// Binds `name`. Returns false when the program never references it.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.slot_of(name) {
            Some(slot) => {
                self.values[slot] = Some(value.into());
                true
            }
            None => false,
        }
    }

    /// Binds a slot directly. Out-of-range slots are ignored.
    pub fn set_slot(&mut self, slot: usize, value: impl Into<Value>) {
        if let Some(entry) = self.values.get_mut(slot) {
            *entry = Some(value.into());
        }
    }

    /// Unbinds every slot so the activation can be refilled.
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|entry| *entry = None);
    }
}

impl Activation for SlotActivation {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.slot_of(name)
            .and_then(|slot| self.values[slot].clone())
    }

    fn resolve_slot(&self, slot: usize, name: &str) -> Option<Value> {
        match self.names.get(slot) {
            Some(slot_name) if &**slot_name == name => self.values[slot].clone(),
            _ => self.resolve(name),
        }
    }
}

impl<T: Activation> Activation for Arc<T> {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }

    fn resolve_slot(&self, slot: usize, name: &str) -> Option<Value> {
        (**self).resolve_slot(slot, name)
    }
}

impl<T: Activation> Activation for Box<T> {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }

    fn resolve_slot(&self, slot: usize, name: &str) -> Option<Value> {
        (**self).resolve_slot(slot, name)
    }
}

impl<T: Activation + ?Sized> Activation for &T {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }

    fn resolve_slot(&self, slot: usize, name: &str) -> Option<Value> {
        (**self).resolve_slot(slot, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_activation() {
        let mut activation = MapActivation::new();
        activation.insert("x", 42i64);
        activation.insert("name", "hello");

        assert_eq!(activation.resolve("x"), Some(Value::Int(42)));
        assert_eq!(activation.resolve("name"), Some(Value::from("hello")));
        assert_eq!(activation.resolve("unknown"), None);

        assert!(activation.has("x"));
        assert!(!activation.has("unknown"));
    }

    #[test]
    fn test_map_activation_from_iter() {
        let activation: MapActivation = [("count", 42), ("limit", 7)].into_iter().collect();
        assert_eq!(activation.resolve("count"), Some(Value::Int(42)));
        assert_eq!(activation.len(), 2);
    }

    #[test]
    fn test_empty_activation() {
        let activation = EmptyActivation::new();
        assert_eq!(activation.resolve("anything"), None);
        assert!(!activation.has("anything"));
    }

    #[test]
    fn test_slot_activation() {
        let names: Arc<[Arc<str>]> = vec![Arc::from("a"), Arc::from("b")].into();
        let mut activation = SlotActivation::new(names);

        assert!(activation.set("b", 2i64));
        assert!(!activation.set("c", 3i64));

        assert_eq!(activation.resolve_slot(1, "b"), Some(Value::Int(2)));
        assert_eq!(activation.resolve_slot(0, "a"), None);
        // A slot/name mismatch falls back to the name.
        assert_eq!(activation.resolve_slot(0, "b"), Some(Value::Int(2)));

        activation.clear();
        assert_eq!(activation.resolve("b"), None);
    }
}

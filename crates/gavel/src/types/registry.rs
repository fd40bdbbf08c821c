//! Host-supplied object type descriptions.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::Type;

/// Field table of one object type.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub name: Arc<str>,
    fields: BTreeMap<String, Type>,
}

impl ObjectType {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field (builder pattern).
    pub fn with_field(mut self, name: impl Into<String>, field_type: Type) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), ty))
    }
}

/// Maps object type names to their field tables.
///
/// Read-only during checking; the engine never mutates it.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    objects: HashMap<Arc<str>, ObjectType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an object type (builder pattern). Replaces any previous
    /// entry with the same name.
    pub fn with_object(mut self, object: ObjectType) -> Self {
        self.register(object);
        self
    }

    pub fn register(&mut self, object: ObjectType) {
        self.objects.insert(object.name.clone(), object);
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.objects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// Looks up the type of `field` on the object type `type_name`.
    pub fn field_type(&self, type_name: &str, field: &str) -> Option<&Type> {
        self.object(type_name)?.field(field)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup() {
        let registry = TypeRegistry::new().with_object(
            ObjectType::new("request")
                .with_field("method", Type::String)
                .with_field("headers", Type::map(Type::String, Type::String)),
        );

        assert_eq!(registry.field_type("request", "method"), Some(&Type::String));
        assert_eq!(registry.field_type("request", "body"), None);
        assert_eq!(registry.field_type("response", "method"), None);
        assert!(registry.contains("request"));
    }
}

//! Property descriptors and per-class schemas
//!
//! A [`PropertyDescriptor`] carries the kind, default, mutability and an
//! optional custom validator for one property. A [`Schema`] is the ordered
//! table of descriptors a class declares on top of its parent.

use crate::value::{Value, ValueKind};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Custom validation hook, run after the kind check
///
/// Returns a human-readable reason on rejection.
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Descriptor for a single property
#[derive(Clone)]
pub struct PropertyDescriptor {
    kind: ValueKind,
    default: Value,
    read_only: bool,
    validator: Option<Validator>,
}

impl PropertyDescriptor {
    /// Create descriptor with explicit kind and default
    #[inline]
    #[must_use]
    pub fn new(kind: ValueKind, default: impl Into<Value>) -> Self {
        Self {
            kind,
            default: default.into(),
            read_only: false,
            validator: None,
        }
    }

    /// String property
    #[inline]
    #[must_use]
    pub fn string(default: impl Into<String>) -> Self {
        Self::new(ValueKind::String, Value::String(default.into()))
    }

    /// Bool property
    #[inline]
    #[must_use]
    pub fn bool(default: bool) -> Self {
        Self::new(ValueKind::Bool, default)
    }

    /// Integer property
    #[inline]
    #[must_use]
    pub fn int(default: i64) -> Self {
        Self::new(ValueKind::Int, default)
    }

    /// Number property
    #[inline]
    #[must_use]
    pub fn number(default: f64) -> Self {
        Self::new(ValueKind::Number, default)
    }

    /// Nullable instance reference, defaulting to null
    #[inline]
    #[must_use]
    pub fn reference() -> Self {
        Self::new(ValueKind::Ref, Value::Ref(None))
    }

    /// Mark read-only
    #[inline]
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Attach custom validator
    #[inline]
    #[must_use]
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Declared kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Default value
    #[inline]
    #[must_use]
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Whether writes are rejected
    #[inline]
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Validate and normalize a candidate value
    ///
    /// Integers widen into `Number` properties and `Nil` becomes a null
    /// reference for `Ref` properties. Everything else must match the
    /// declared kind exactly before the custom validator runs.
    ///
    /// # Errors
    /// Returns the rejection reason
    #[allow(clippy::cast_precision_loss)]
    pub fn validate(&self, value: Value) -> Result<Value, String> {
        let value = match (self.kind, value) {
            (ValueKind::Number, Value::Int(i)) => Value::Number(i as f64),
            (ValueKind::Ref, Value::Nil) => Value::Ref(None),
            (kind, value) if value.kind() == Some(kind) => value,
            (kind, value) => {
                return Err(format!("expected {kind}, got {}", value.kind_name()));
            }
        };

        if let Some(validator) = &self.validator {
            validator(&value)?;
        }
        Ok(value)
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("read_only", &self.read_only)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// Ordered property table declared by one class
#[derive(Debug, Clone, Default)]
pub struct Schema {
    properties: IndexMap<String, PropertyDescriptor>,
}

impl Schema {
    /// Create empty schema
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property (builder style); a repeated name replaces the earlier entry
    #[inline]
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, descriptor: PropertyDescriptor) -> Self {
        self.properties.insert(name.into(), descriptor);
        self
    }

    /// Lookup by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    /// Check if declared
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Iterate in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyDescriptor)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared properties
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

//! Declared key namespace: which storage keys exist and how each is encoded.

use std::{collections::BTreeSet, fmt, rc::Rc};

use thiserror::Error;

use crate::{
    codec::{Schema, SharedCodec},
    storage::PROBE_KEY,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Misuse of the key namespace or the cell registry.
pub enum RegistryError {
    /// The key was already declared.
    #[error("storage key `{0}` is declared more than once")]
    DuplicateKey(String),
    /// The key collides with the reserved capability-probe key.
    #[error("storage key `{0}` is reserved")]
    ReservedKey(String),
    /// A live cell exists for the key with a different value type.
    #[error("storage key `{key}` is already bound to a different value type")]
    TypeMismatch {
        /// Conflicting key.
        key: String,
    },
}

/// A storage key bound to the codec for its value type.
pub struct ItemKey<V> {
    name: Rc<str>,
    codec: SharedCodec<V>,
}

impl<V> ItemKey<V> {
    /// Binds `name` to `codec` without declaring it in an [`ItemKeys`] set.
    pub fn new<S>(name: impl Into<String>, codec: S) -> Self
    where
        S: Schema<Input = String, Output = V> + 'static,
    {
        Self {
            name: Rc::from(name.into()),
            codec: Rc::new(codec),
        }
    }

    /// Storage key name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Codec bound to this key.
    pub fn codec(&self) -> SharedCodec<V> {
        self.codec.clone()
    }
}

impl<V> Clone for ItemKey<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl<V> fmt::Debug for ItemKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemKey")
            .field("name", &self.name)
            .field("value", &std::any::type_name::<V>())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
/// Set of declared storage keys. Each key may be declared once.
pub struct ItemKeys {
    names: BTreeSet<String>,
}

impl ItemKeys {
    /// Creates an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name` with its codec.
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is already declared or is the reserved probe key.
    pub fn declare<V, S>(
        &mut self,
        name: impl Into<String>,
        codec: S,
    ) -> Result<ItemKey<V>, RegistryError>
    where
        S: Schema<Input = String, Output = V> + 'static,
    {
        let name = name.into();
        if name == PROBE_KEY {
            return Err(RegistryError::ReservedKey(name));
        }
        if !self.names.insert(name.clone()) {
            return Err(RegistryError::DuplicateKey(name));
        }
        Ok(ItemKey::new(name, codec))
    }

    /// Returns `true` when `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Declared names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of declared keys.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` when nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::codec::{json, json_with, LiteralUnion};

    #[test]
    fn declare_rejects_duplicates() {
        let mut keys = ItemKeys::new();
        let theme = keys
            .declare("theme", json_with(LiteralUnion::new(["light", "dark"])))
            .expect("declare theme");
        assert_eq!(theme.name(), "theme");

        let err = keys.declare("theme", json::<String>()).expect_err("duplicate");
        assert_eq!(err, RegistryError::DuplicateKey("theme".to_string()));
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn declare_rejects_probe_key() {
        let mut keys = ItemKeys::new();
        let err = keys.declare(PROBE_KEY, json::<u32>()).expect_err("reserved");
        assert_eq!(err, RegistryError::ReservedKey(PROBE_KEY.to_string()));
        assert!(keys.is_empty());
    }

    #[test]
    fn names_are_sorted() {
        let mut keys = ItemKeys::new();
        keys.declare("zoom", json::<f64>()).expect("zoom");
        keys.declare("accent", json::<String>()).expect("accent");
        assert_eq!(keys.names().collect::<Vec<_>>(), vec!["accent", "zoom"]);
        assert!(keys.contains("zoom"));
    }
}

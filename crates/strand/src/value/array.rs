//! Indexed storage shared by arrays and associative maps

use indexmap::IndexMap;

use super::Value;
use crate::error::{Result, ScriptError};

/// Backing store of array and map values.
///
/// Elements always live in `items`; a map additionally records, in
/// insertion order, the position of each key. Every operation that moves
/// elements renumbers the recorded positions so the two never drift apart.
#[derive(Clone, Default)]
pub struct ArrayData {
    items: Vec<Value>,
    keys: Option<IndexMap<String, usize>>,
}

impl ArrayData {
    /// Largest length an index write may grow an array to.
    pub const MAX_LEN: usize = 1 << 24;

    /// A plain array over `items`.
    pub fn new(items: Vec<Value>) -> Self {
        Self { items, keys: None }
    }

    /// An empty associative map.
    pub fn map() -> Self {
        Self {
            items: Vec::new(),
            keys: Some(IndexMap::new()),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check if an associative index is present.
    pub fn is_map(&self) -> bool {
        self.keys.is_some()
    }

    /// All elements in position order.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Mutable access to the elements, for in-place updates that keep
    /// positions stable (sorting or reversing would break the key index).
    pub fn items_mut(&mut self) -> &mut [Value] {
        &mut self.items
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Element recorded under `key`.
    pub fn get_key(&self, key: &str) -> Option<&Value> {
        let position = *self.keys.as_ref()?.get(key)?;
        self.items.get(position)
    }

    /// Check if `key` is recorded.
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.as_ref().is_some_and(|k| k.contains_key(key))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().flat_map(|k| k.keys().map(String::as_str))
    }

    /// Key recorded for the element at `position`, if any.
    pub fn key_of(&self, position: usize) -> Option<&str> {
        self.keys
            .as_ref()?
            .iter()
            .find(|(_, p)| **p == position)
            .map(|(k, _)| k.as_str())
    }

    /// Append an element.
    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    /// Store `value` under `key`, replacing an existing entry in place.
    pub fn insert_key(&mut self, key: impl Into<String>, value: Value) {
        *self.key_slot_mut(key) = value;
    }

    /// Mutable slot at `index`, materializing `None` gaps up to it.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if reaching `index` would grow past [`Self::MAX_LEN`].
    pub fn slot_mut(&mut self, index: usize) -> Result<&mut Value> {
        if index >= self.items.len() {
            Self::check_growth(index)?;
            self.items.resize_with(index + 1, Value::none);
        }
        Ok(&mut self.items[index])
    }

    /// Check that writing at `index` stays within [`Self::MAX_LEN`].
    pub fn check_growth(index: usize) -> Result<()> {
        if index < Self::MAX_LEN {
            Ok(())
        } else {
            Err(ScriptError::type_mismatch(
                format!("an index below {}", Self::MAX_LEN),
                index.to_string(),
            ))
        }
    }

    /// Mutable slot for `key`, appending a `None` element for a new key.
    pub fn key_slot_mut(&mut self, key: impl Into<String>) -> &mut Value {
        let key = key.into();
        let next = self.items.len();
        let keys = self.keys.get_or_insert_with(IndexMap::new);
        let position = *keys.entry(key).or_insert(next);
        if position == next {
            self.items.push(Value::none());
        }
        &mut self.items[position]
    }

    /// Insert at `index`, shifting later elements and their keys.
    pub fn insert_at(&mut self, index: usize, value: Value) {
        let index = index.min(self.items.len());
        self.items.insert(index, value);
        if let Some(keys) = self.keys.as_mut() {
            for position in keys.values_mut() {
                if *position >= index {
                    *position += 1;
                }
            }
        }
    }

    /// Remove the element at `index`, dropping its key and renumbering.
    pub fn remove_at(&mut self, index: usize) -> Option<Value> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        if let Some(keys) = self.keys.as_mut() {
            keys.retain(|_, position| *position != index);
            for position in keys.values_mut() {
                if *position > index {
                    *position -= 1;
                }
            }
        }
        Some(removed)
    }

    /// Remove the element recorded under `key`.
    pub fn remove_key(&mut self, key: &str) -> Option<Value> {
        let position = *self.keys.as_ref()?.get(key)?;
        self.remove_at(position)
    }

    /// Remove every element and key.
    pub fn clear(&mut self) {
        self.items.clear();
        if let Some(keys) = self.keys.as_mut() {
            keys.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::number(n)
    }

    #[test]
    fn test_slot_mut_materializes_gaps() {
        let mut a = ArrayData::new(vec![num(1.0)]);
        *a.slot_mut(3).unwrap() = num(4.0);
        assert_eq!(a.len(), 4);
        assert!(a.get(1).unwrap().is_none());
        assert!(a.get(2).unwrap().is_none());
        assert_eq!(a.get(3), Some(&num(4.0)));
    }

    #[test]
    fn test_slot_mut_refuses_huge_growth() {
        let mut a = ArrayData::new(vec![num(1.0)]);
        assert!(a.slot_mut(usize::MAX).is_err());
        assert!(a.slot_mut(ArrayData::MAX_LEN).is_err());
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_keys_keep_insertion_order() {
        let mut m = ArrayData::map();
        m.insert_key("b", num(2.0));
        m.insert_key("a", num(1.0));
        m.insert_key("b", num(20.0));
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(m.get_key("b"), Some(&num(20.0)));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_remove_renumbers_positions() {
        let mut m = ArrayData::map();
        m.insert_key("x", num(1.0));
        m.insert_key("y", num(2.0));
        m.insert_key("z", num(3.0));

        assert_eq!(m.remove_key("x"), Some(num(1.0)));
        assert_eq!(m.get_key("y"), Some(&num(2.0)));
        assert_eq!(m.get_key("z"), Some(&num(3.0)));
        assert_eq!(m.key_of(0), Some("y"));
        assert!(!m.contains_key("x"));
    }

    #[test]
    fn test_insert_at_shifts_keys() {
        let mut m = ArrayData::map();
        m.insert_key("a", num(1.0));
        m.insert_at(0, num(0.0));
        assert_eq!(m.get_key("a"), Some(&num(1.0)));
        assert_eq!(m.key_of(1), Some("a"));
        assert_eq!(m.key_of(0), None);
    }

    #[test]
    fn test_key_on_plain_array_promotes_to_map() {
        let mut a = ArrayData::new(vec![num(1.0)]);
        assert!(!a.is_map());
        a.insert_key("k", num(2.0));
        assert!(a.is_map());
        assert_eq!(a.get(1), Some(&num(2.0)));
    }
}

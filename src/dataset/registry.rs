//! Run-scoped class label registry.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// The integer id written as the first field of a YOLO label line.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub u64);

impl ClassId {
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps class names to ids in first-seen order.
///
/// The registry is append-only: once a name has an id it keeps it for the
/// rest of the run. Both splits of a conversion share one registry so ids in
/// `train` and `val` label files agree.
#[derive(Clone, Debug, Default)]
pub struct ClassRegistry {
    ids: HashMap<String, ClassId>,
    names: Vec<String>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `name`, registering it with the next free id if unseen.
    pub fn resolve(&mut self, name: &str) -> ClassId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }

        let id = ClassId::new(self.names.len() as u64);
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        id
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The inverse mapping, id to name, as written to `data.yaml`.
    pub fn id_to_name(&self) -> BTreeMap<u64, String> {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| (idx as u64, name.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_first_seen_order() {
        let mut registry = ClassRegistry::new();
        assert_eq!(registry.resolve("polyp"), ClassId::new(0));
        assert_eq!(registry.resolve("normal"), ClassId::new(1));
        assert_eq!(registry.resolve("polyp"), ClassId::new(0));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), ["polyp", "normal"]);
    }

    #[test]
    fn id_to_name_inverts_the_registry() {
        let mut registry = ClassRegistry::new();
        for name in ["polyp", "normal", "polyp"] {
            registry.resolve(name);
        }

        let mapping = registry.id_to_name();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping[&0], "polyp");
        assert_eq!(mapping[&1], "normal");
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut registry = ClassRegistry::new();
        let lower = registry.resolve("polyp");
        let upper = registry.resolve("Polyp");
        assert_ne!(lower, upper);
    }
}

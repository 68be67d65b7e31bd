// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Error, Group, Loader, Result};

/// Maps namespaces to their [`Group`].
///
/// The server side of the peer protocol resolves incoming requests through a registry. Groups
/// are only ever added; lookups run concurrently with each other.
///
/// # Examples
///
/// ```
/// use shoal::{ErrorKind, GroupRegistry, LoaderFn};
///
/// let registry = GroupRegistry::new();
/// let loader = || LoaderFn::new(|key: String| async move { Ok::<_, &str>(key) });
///
/// registry.new_group("scores", 1 << 10, loader()).unwrap();
/// let duplicate = registry.new_group("scores", 1 << 10, loader()).unwrap_err();
///
/// assert_eq!(duplicate.kind(), ErrorKind::Misconfiguration);
/// assert!(registry.get("scores").is_some());
/// assert!(registry.get("names").is_none());
/// ```
#[derive(Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl GroupRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a group with the given budget and loader, and registers it.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Misconfiguration`](crate::ErrorKind::Misconfiguration) when the
    /// name is empty or already registered.
    pub fn new_group(&self, name: impl Into<String>, cache_bytes: usize, loader: impl Loader + 'static) -> Result<Arc<Group>> {
        let group = Group::builder(name).cache_bytes(cache_bytes).loader(loader).build()?;
        self.register(group)
    }

    /// Registers a group under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Misconfiguration`](crate::ErrorKind::Misconfiguration) when a
    /// group with the same name is already registered.
    pub fn register(&self, group: Group) -> Result<Arc<Group>> {
        let mut groups = self.groups.write();
        if groups.contains_key(group.name()) {
            return Err(Error::misconfigured(format!("duplicate registration of group {}", group.name())));
        }

        let group = Arc::new(group);
        groups.insert(group.name().to_owned(), Arc::clone(&group));
        drop(groups);

        tracing::event!(
            name: "shoal.group_registered",
            tracing::Level::INFO,
            group.name = group.name(),
            cache.max_bytes = group.cache_bytes(),
            "registered group",
        );
        Ok(group)
    }

    /// Returns the group registered as `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Returns the number of registered groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Returns `true` if no group is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

impl Debug for GroupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups = self.groups.read();
        let mut names: Vec<&str> = groups.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("GroupRegistry").field("groups", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::testing::MockLoader;

    #[test]
    fn registered_groups_are_shared() {
        let registry = GroupRegistry::new();
        let group = registry.new_group("scores", 0, MockLoader::new()).unwrap();

        let found = registry.get("scores").unwrap();
        assert!(Arc::ptr_eq(&group, &found));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_registry() {
        let registry = GroupRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("scores").is_none());
    }

    #[test]
    fn duplicate_keeps_first_group() {
        let registry = GroupRegistry::new();
        registry.new_group("scores", 10, MockLoader::new()).unwrap();

        let group = Group::builder("scores").cache_bytes(20).loader(MockLoader::new()).build().unwrap();
        assert!(registry.register(group).is_err());
        assert_eq!(registry.get("scores").unwrap().cache_bytes(), 10);
    }

    #[test]
    fn debug_lists_sorted_names() {
        let registry = GroupRegistry::new();
        registry.new_group("scores", 0, MockLoader::new()).unwrap();
        registry.new_group("names", 0, MockLoader::new()).unwrap();

        assert_eq!(format!("{registry:?}"), r#"GroupRegistry { groups: ["names", "scores"] }"#);
    }

    #[test]
    #[traced_test]
    fn registration_is_logged() {
        let registry = GroupRegistry::new();
        registry.new_group("scores", 2048, MockLoader::new()).unwrap();

        assert!(logs_contain("registered group"));
        assert!(logs_contain("scores"));
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use dashmap::DashSet;

use crate::registry::Registry;

/// Configures a [`Registry`] before it is created.
///
/// Both injection passes are enabled unless turned off.
///
/// # Examples
///
/// ```
/// use wireup::Registry;
///
/// let registry = Registry::builder()
///     .working_package("my_app::services")
///     .working_package("my_app::storage")
///     .inject_setters(false)
///     .build();
///
/// assert!(registry.injects_properties());
/// assert!(!registry.injects_setters());
/// assert_eq!(registry.working_packages(), ["my_app::services", "my_app::storage"]);
/// ```
#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    namespaces: Vec<String>,
    inject_properties: bool,
    inject_setters: bool,
}

impl RegistryBuilder {
    pub(crate) const fn new() -> Self {
        Self {
            namespaces: Vec::new(),
            inject_properties: true,
            inject_setters: true,
        }
    }

    /// Adds a namespace prefix whose types may be resolved without a binding.
    #[must_use]
    pub fn working_package(mut self, namespace: impl Into<String>) -> Self {
        self.namespaces.push(namespace.into());
        self
    }

    /// Adds several namespace prefixes.
    #[must_use]
    pub fn working_packages<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces.extend(namespaces.into_iter().map(Into::into));
        self
    }

    /// Whether new instances receive field injection.
    #[must_use]
    pub fn inject_properties(mut self, enabled: bool) -> Self {
        self.inject_properties = enabled;
        self
    }

    /// Whether new instances receive setter injection.
    #[must_use]
    pub fn inject_setters(mut self, enabled: bool) -> Self {
        self.inject_setters = enabled;
        self
    }

    /// Creates the registry.
    #[must_use]
    pub fn build(self) -> Registry {
        let namespaces: DashSet<String> = self.namespaces.into_iter().collect();
        Registry::from_parts(namespaces, self.inject_properties, self.inject_setters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_both_passes() {
        let registry = RegistryBuilder::new().build();

        assert!(registry.injects_properties());
        assert!(registry.injects_setters());
        assert!(registry.working_packages().is_empty());
    }

    #[test]
    fn duplicate_namespaces_collapse() {
        let registry = RegistryBuilder::new()
            .working_packages(["app", "app", "lib"])
            .inject_properties(false)
            .build();

        assert_eq!(registry.working_packages(), ["app", "lib"]);
        assert!(!registry.injects_properties());
    }

    #[test]
    fn builder_matches_direct_construction() {
        let built = RegistryBuilder::new().working_package("app").build();

        assert_eq!(built, Registry::new("app"));
    }
}

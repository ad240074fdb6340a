//! Mocking the exports of a module namespace.

use crate::error::{SpyError, SpyResult};
use crate::mock::{create_mock, Mock};
use decoy_core::{CoreError, ObjectRef};
use indexmap::IndexMap;

/// Loads module namespace objects
pub trait ModuleResolver {
    /// Namespace object of `specifier`
    ///
    /// # Errors
    ///
    /// Returns error if the module can not be resolved
    fn resolve(&self, specifier: &str) -> SpyResult<ObjectRef>;
}

/// In-memory module table with writable exports
#[derive(Debug, Clone, Default)]
pub struct StaticModules {
    modules: IndexMap<String, ObjectRef>,
}

impl StaticModules {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module
    #[must_use]
    pub fn with_module(mut self, specifier: impl Into<String>, namespace: ObjectRef) -> Self {
        self.insert(specifier, namespace);
        self
    }

    /// Add or replace a module
    pub fn insert(&mut self, specifier: impl Into<String>, namespace: ObjectRef) {
        self.modules.insert(specifier.into(), namespace);
    }

    /// Number of modules
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleResolver for StaticModules {
    fn resolve(&self, specifier: &str) -> SpyResult<ObjectRef> {
        self.modules.get(specifier).cloned().ok_or_else(|| {
            CoreError::NotFound {
                kind: "Module".to_string(),
                id: specifier.to_string(),
            }
            .into()
        })
    }
}

/// Declare a mock of the named exports of a module
///
/// # Errors
///
/// Returns a usage error if the module can not be resolved or an export is
/// read-only
pub fn mock_module(
    resolver: &dyn ModuleResolver,
    specifier: &str,
    exports: &[&str],
) -> SpyResult<Mock> {
    let namespace = resolver.resolve(specifier)?;
    if let Some(name) = exports
        .iter()
        .find(|name| namespace.has_own(name) && !namespace.is_writable(name))
    {
        return Err(SpyError::usage(format!(
            "Export '{name}' of module '{specifier}' is read-only and can not be mocked. \
             Provide the module through a resolver with writable exports, \
             e.g. StaticModules::new().with_module(\"{specifier}\", namespace)."
        )));
    }
    tracing::debug!(specifier, exports = exports.len(), "module mock declared");
    create_mock(&namespace, exports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::init_mocks;
    use crate::spy::Spy;
    use decoy_core::Value;

    fn api() -> ObjectRef {
        ObjectRef::new().with("fetch", Value::function("fetch", |_| Ok(Value::from("network"))))
    }

    #[test]
    fn test_static_modules() {
        let modules = StaticModules::new().with_module("./api", api());
        assert_eq!(modules.len(), 1);
        assert!(modules.resolve("./api").is_ok());

        let err = modules.resolve("./missing").unwrap_err();
        assert_eq!(err.message(), "Module not found: ./missing");
    }

    #[test]
    fn test_mock_module_exports() {
        let namespace = api();
        let modules = StaticModules::new().with_module("./api", namespace.clone());
        let mock = mock_module(&modules, "./api", &["fetch"]).unwrap();
        assert!(mock.target().ptr_eq(&namespace));

        init_mocks().unwrap();
        mock.spy("fetch").unwrap().returns(vec![Value::from("mocked")]);
        let fetch = namespace.get("fetch").unwrap();
        assert_eq!(fetch.as_function().unwrap().call(&[]).unwrap().as_str(), Some("mocked"));
        Spy::restore_all();
    }

    #[test]
    fn test_read_only_export_rejected() {
        let namespace = ObjectRef::new();
        namespace.define_readonly("fetch", Value::function("fetch", |_| Ok(Value::Undefined)));
        let modules = StaticModules::new().with_module("./frozen", namespace);

        let err = mock_module(&modules, "./frozen", &["fetch"]).unwrap_err();
        assert!(err.is_usage());
        assert!(err.message().contains("read-only"));
        assert!(err.message().contains("StaticModules"));
    }
}

//! Qualification of local object paths against a base context.

use cim_model::{KeyBinding, ObjectPath};

/// Supplies the scheme, host, port and default namespace for local paths.
///
/// The resolver is an immutable value owned by a [`Decoder`](crate::Decoder);
/// changing the base means building a new decoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathResolver {
    base: ObjectPath,
}

impl PathResolver {
    pub fn new(base: ObjectPath) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &ObjectPath {
        &self.base
    }

    /// Replace the base path entirely.
    pub fn set_base(&mut self, base: ObjectPath) {
        self.base = base;
    }

    /// Class path in `namespace`, or the base namespace when it is absent or
    /// empty.
    pub fn build(&self, name: &str, namespace: Option<&str>) -> ObjectPath {
        self.build_with_keys(name, namespace, Vec::new())
    }

    pub fn build_with_keys(
        &self,
        name: &str,
        namespace: Option<&str>,
        keys: Vec<KeyBinding>,
    ) -> ObjectPath {
        let namespace = namespace
            .filter(|ns| !ns.is_empty())
            .map(str::to_string)
            .or_else(|| self.base.namespace.clone());
        ObjectPath {
            scheme: self.base.scheme.clone(),
            host: self.base.host.clone(),
            port: self.base.port,
            namespace,
            object_name: name.to_string(),
            keys,
        }
    }

    /// Fill only the context fields `path` lacks.
    pub fn resolve(&self, mut path: ObjectPath) -> ObjectPath {
        self.resolve_in_place(&mut path);
        path
    }

    pub fn resolve_in_place(&self, path: &mut ObjectPath) {
        if path.host.is_none() {
            path.host = self.base.host.clone();
            if path.port.is_none() {
                path.port = self.base.port;
            }
        }
        if path.scheme.is_none() {
            path.scheme = self.base.scheme.clone();
        }
        if path.namespace.as_deref().map_or(true, str::is_empty) {
            path.namespace = self.base.namespace.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cim_model::TypedValue;

    fn base() -> PathResolver {
        PathResolver::new(ObjectPath::parse("https://cimom:5989/root/cimv2").expect("base"))
    }

    #[test]
    fn build_prefers_supplied_namespace() {
        let resolver = base();
        let path = resolver.build("CIM_Foo", Some("root/interop"));
        assert_eq!(path.namespace.as_deref(), Some("root/interop"));
        assert_eq!(path.host.as_deref(), Some("cimom"));
        assert_eq!(path.port, Some(5989));
        assert_eq!(path.scheme.as_deref(), Some("https"));

        let path = resolver.build("CIM_Foo", Some(""));
        assert_eq!(path.namespace.as_deref(), Some("root/cimv2"));
        let path = resolver.build_with_keys(
            "CIM_Foo",
            None,
            vec![KeyBinding::new("Id", TypedValue::string("1"))],
        );
        assert!(path.is_instance());
        assert_eq!(path.namespace.as_deref(), Some("root/cimv2"));
    }

    #[test]
    fn resolve_is_idempotent_on_qualified_paths() {
        let resolver = base();
        let qualified = ObjectPath::parse("http://other:5988/root/other:CIM_Bar.Id=\"x\"").unwrap();
        assert_eq!(resolver.resolve(qualified.clone()), qualified);

        let local = ObjectPath::new("CIM_Bar");
        let once = resolver.resolve(local);
        assert_eq!(once.to_string(), "https://cimom:5989/root/cimv2:CIM_Bar");
        assert_eq!(resolver.resolve(once.clone()), once);
    }

    #[test]
    fn set_base_replaces_everything() {
        let mut resolver = base();
        resolver.set_base(ObjectPath::namespace("root/test"));
        let path = resolver.build("CIM_Foo", None);
        assert_eq!(path.host, None);
        assert_eq!(path.scheme, None);
        assert_eq!(path.namespace.as_deref(), Some("root/test"));
    }
}

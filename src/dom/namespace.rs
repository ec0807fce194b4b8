//! Namespace Resolution
//!
//! Stack-based namespace resolver used while building a tree. Each open
//! element is one scope; declarations made in a scope vanish when it is
//! popped.

use super::strings::StringPool;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI)
#[derive(Debug, Clone)]
struct NsBinding {
    prefix_id: u32,
    uri_id: u32,
    depth: u32,
}

/// Stack-based namespace resolver
#[derive(Debug)]
pub struct NamespaceResolver {
    /// Stack of namespace bindings
    bindings: Vec<NsBinding>,
    /// Current element depth
    depth: u32,
    xml_prefix_id: u32,
    xmlns_prefix_id: u32,
}

impl NamespaceResolver {
    /// Create a new namespace resolver with pre-declared xml and xmlns namespaces
    pub fn new(strings: &mut StringPool) -> Self {
        let xml_prefix_id = strings.intern("xml");
        let xmlns_prefix_id = strings.intern("xmlns");
        let xml_uri_id = strings.intern(ns::XML);
        let xmlns_uri_id = strings.intern(ns::XMLNS);

        NamespaceResolver {
            bindings: vec![
                NsBinding {
                    prefix_id: xml_prefix_id,
                    uri_id: xml_uri_id,
                    depth: 0,
                },
                NsBinding {
                    prefix_id: xmlns_prefix_id,
                    uri_id: xmlns_uri_id,
                    depth: 0,
                },
            ],
            depth: 0,
            xml_prefix_id,
            xmlns_prefix_id,
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a namespace binding for the current scope.
    ///
    /// Returns false for attempts to rebind `xml` or `xmlns`.
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32) -> bool {
        if prefix_id == self.xml_prefix_id || prefix_id == self.xmlns_prefix_id {
            return false;
        }

        self.bindings.push(NsBinding {
            prefix_id,
            uri_id,
            depth: self.depth,
        });
        true
    }

    /// Resolve a prefix to a namespace URI ID
    ///
    /// An empty default-namespace declaration (`xmlns=""`) resolves to 0.
    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix_id == prefix_id)
            .map(|b| b.uri_id)
    }

    /// Resolve the default namespace
    pub fn resolve_default(&self) -> Option<u32> {
        self.resolve(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespaces() {
        let mut strings = StringPool::new();
        let resolver = NamespaceResolver::new(&mut strings);

        let xml_id = strings.intern("xml");
        let uri = resolver.resolve(xml_id).map(|id| strings.resolve(id));
        assert_eq!(uri, Some(ns::XML));
        assert_eq!(resolver.resolve_default(), None);
    }

    #[test]
    fn test_reserved_prefixes_cannot_rebind() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);

        let xml_id = strings.intern("xml");
        let other = strings.intern("urn:other");
        resolver.push_scope();
        assert!(!resolver.declare(xml_id, other));
        assert_ne!(resolver.resolve(xml_id), Some(other));
    }

    #[test]
    fn test_scope_pop() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);

        let prefix = strings.intern("foo");
        let uri = strings.intern("http://example.com/foo");

        resolver.push_scope();
        assert!(resolver.declare(prefix, uri));
        assert_eq!(resolver.resolve(prefix), Some(uri));

        resolver.pop_scope();
        assert_eq!(resolver.resolve(prefix), None);
    }

    #[test]
    fn test_shadow_binding() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);

        let prefix = strings.intern("ns");
        let uri1 = strings.intern("http://example.com/ns1");
        let uri2 = strings.intern("http://example.com/ns2");

        resolver.push_scope();
        resolver.declare(prefix, uri1);

        resolver.push_scope();
        resolver.declare(prefix, uri2);
        assert_eq!(resolver.resolve(prefix), Some(uri2));

        resolver.pop_scope();
        assert_eq!(resolver.resolve(prefix), Some(uri1));
    }

    #[test]
    fn test_default_namespace_undeclared() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);

        let uri = strings.intern("urn:outer");
        resolver.push_scope();
        resolver.declare(0, uri);
        resolver.push_scope();
        resolver.declare(0, 0);
        assert_eq!(resolver.resolve_default(), Some(0));
        resolver.pop_scope();
        assert_eq!(resolver.resolve_default(), Some(uri));
    }
}

//! Target class availability
//!
//! Some chains need a class that lives under different names depending on
//! the target runtime (the JDK-internal BCEL copy versus the standalone
//! library, two generations of Rhino). Those are resolved against a
//! [`ClassPath`], first available candidate wins.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::ir::TypeRef;

/// Classes referenced directly by generated chains
pub mod known {
    /// `java.lang.Thread`
    pub const THREAD: &str = "java.lang.Thread";
    /// `java.lang.Runtime`
    pub const RUNTIME: &str = "java.lang.Runtime";
    /// `java.net.InetAddress`
    pub const INET_ADDRESS: &str = "java.net.InetAddress";
    /// `java.net.URL`
    pub const URL: &str = "java.net.URL";
    /// `java.net.URLClassLoader`
    pub const URL_CLASS_LOADER: &str = "java.net.URLClassLoader";
    /// `javax.script.ScriptEngineManager`
    pub const SCRIPT_ENGINE_MANAGER: &str = "javax.script.ScriptEngineManager";
    /// `java.io.FileOutputStream`
    pub const FILE_OUTPUT_STREAM: &str = "java.io.FileOutputStream";
    /// `javax.naming.InitialContext`
    pub const INITIAL_CONTEXT: &str = "javax.naming.InitialContext";
}

/// BCEL class loader, JDK-internal copy first
pub const BCEL_CLASS_LOADER: [&str; 2] = [
    "com.sun.org.apache.bcel.internal.util.ClassLoader",
    "org.apache.bcel.util.ClassLoader",
];

/// Rhino defining class loader, current package first
pub const RHINO_DEFINING_CLASS_LOADER: [&str; 2] = [
    "org.mozilla.javascript.DefiningClassLoader",
    "org.mozilla.classfile.DefiningClassLoader",
];

/// The set of classes assumed present on the target
#[derive(Debug, Clone, Default)]
pub struct ClassPath {
    /// `None` means every class resolves
    available: Option<BTreeSet<String>>,
}

impl ClassPath {
    /// Every class resolves; candidates resolve to the first entry
    pub fn permissive() -> Self {
        Self { available: None }
    }

    /// Only the listed classes resolve
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            available: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether `name` is available
    pub fn contains(&self, name: &str) -> bool {
        match &self.available {
            None => true,
            Some(set) => set.contains(name),
        }
    }

    /// First available candidate
    pub fn resolve_first(&self, candidates: &[&str]) -> Result<TypeRef> {
        candidates
            .iter()
            .find(|name| self.contains(name))
            .map(|name| TypeRef::class(*name))
            .ok_or_else(|| Error::UnresolvedClass {
                candidates: candidates.iter().map(|s| s.to_string()).collect(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_takes_first() {
        let t = ClassPath::permissive()
            .resolve_first(&RHINO_DEFINING_CLASS_LOADER)
            .unwrap();
        assert_eq!(t, TypeRef::class("org.mozilla.javascript.DefiningClassLoader"));
    }

    #[test]
    fn test_falls_back_to_second() {
        let cp = ClassPath::only(["org.apache.bcel.util.ClassLoader"]);
        let t = cp.resolve_first(&BCEL_CLASS_LOADER).unwrap();
        assert_eq!(t, TypeRef::class("org.apache.bcel.util.ClassLoader"));
    }

    #[test]
    fn test_unresolved() {
        let cp = ClassPath::only(Vec::<String>::new());
        let err = cp.resolve_first(&BCEL_CLASS_LOADER).unwrap_err();
        assert!(matches!(err, Error::UnresolvedClass { ref candidates } if candidates.len() == 2));
    }
}

//! The mutable program representation threaded through every pass
//!
//! Holds the class table and performs exact-match method/constructor
//! resolution along superclass chains. The "classes" here are data
//! describing a foreign program; hierarchy walks are explicit loops over
//! resolved ancestor lists, never host-language dispatch.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::{InstrumentError, Result};

use super::body::Body;
use super::class::{Class, Method};
use super::instruction::MethodRef;
use super::ty::Type;

/// Class table of one program under instrumentation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    classes: FxHashMap<String, Class>,
    /// Insertion order, for deterministic iteration
    order: Vec<String>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    /// Program pre-seeded with the signature-only library classes
    /// instrumentation codegen resolves against.
    pub fn with_platform_stubs() -> Self {
        let mut program = Program::new();
        for class in platform_stubs() {
            program
                .add_class(class)
                .expect("platform stubs have unique names");
        }
        program
    }

    pub fn add_class(&mut self, class: Class) -> Result<()> {
        if self.classes.contains_key(&class.name) {
            return Err(InstrumentError::structural(format!(
                "class {} already present in the program",
                class.name
            )));
        }
        self.order.push(class.name.clone());
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.get(name)
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut Class> {
        self.classes.get_mut(name)
    }

    /// Classes in insertion order
    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.order.iter().filter_map(|name| self.classes.get(name))
    }

    /// Ancestor chain starting at `class` itself, walking superclass names
    /// toward the root. Cycle-safe; unknown superclasses end the chain.
    pub fn ancestors<'a>(&'a self, class: &'a str) -> Vec<&'a str> {
        let mut chain = Vec::new();
        let mut current = Some(class);
        while let Some(name) = current {
            if chain.contains(&name) {
                break;
            }
            chain.push(name);
            current = self
                .classes
                .get(name)
                .and_then(|cls| cls.superclass.as_deref());
        }
        chain
    }

    /// Resolve a method by declaring type, name and ordered parameter types,
    /// walking the superclass chain. Exact parameter-type match; the return
    /// type never participates.
    pub fn resolve_method(&self, class: &str, name: &str, params: &[Type]) -> Result<MethodRef> {
        for ancestor in self.ancestors(class) {
            if let Some(cls) = self.classes.get(ancestor) {
                if let Some(method) = cls.find_method(name, params) {
                    return Ok(method.make_ref(ancestor));
                }
            }
        }
        Err(InstrumentError::lookup(format!(
            "no method {}({}) on {} or its ancestors",
            name,
            params.iter().map(Type::name).collect::<Vec<_>>().join(","),
            class
        )))
    }

    /// Resolve a constructor overload on the class itself.
    pub fn resolve_constructor(&self, class: &str, params: &[Type]) -> Result<MethodRef> {
        let cls = self
            .classes
            .get(class)
            .ok_or_else(|| InstrumentError::lookup(format!("unknown class {}", class)))?;
        cls.find_method("<init>", params)
            .map(|method| method.make_ref(class))
            .ok_or_else(|| {
                InstrumentError::lookup(format!(
                    "no constructor ({}) on {}",
                    params.iter().map(Type::name).collect::<Vec<_>>().join(","),
                    class
                ))
            })
    }

    /// (class name, method index) of every method that has a body, in
    /// deterministic order. The driver detaches each body for its visit.
    pub fn body_targets(&self) -> Vec<(String, usize)> {
        let mut targets = Vec::new();
        for class in self.classes() {
            for (index, method) in class.methods.iter().enumerate() {
                if method.body.is_some() {
                    targets.push((class.name.clone(), index));
                }
            }
        }
        targets
    }

    /// Detach a body so passes can edit it while resolving against the
    /// program; `put_body` reattaches it.
    pub fn take_body(&mut self, class: &str, method_index: usize) -> Option<Body> {
        self.classes
            .get_mut(class)?
            .methods
            .get_mut(method_index)?
            .body
            .take()
    }

    pub fn put_body(&mut self, class: &str, method_index: usize, body: Body) {
        if let Some(method) = self
            .classes
            .get_mut(class)
            .and_then(|cls| cls.methods.get_mut(method_index))
        {
            method.body = Some(body);
        }
    }
}

/// The `addBasicClass` set: library classes instrumentation codegen needs to
/// resolve calls against, signatures only.
fn platform_stubs() -> Vec<Class> {
    let object = || Type::object("java.lang.Object");
    let string = || Type::object("java.lang.String");

    let mut classes = vec![
        Class::new("java.lang.Object").with_method(Method::stub(
            "toString",
            vec![],
            string(),
            false,
        )),
        Class::new("android.util.Log")
            .with_superclass("java.lang.Object")
            .with_method(Method::stub(
                "i",
                vec![string(), string()],
                Type::Int,
                true,
            )),
        Class::new("java.lang.System")
            .with_superclass("java.lang.Object")
            .with_method(Method::stub(
                "identityHashCode",
                vec![object()],
                Type::Int,
                true,
            )),
        Class::new("java.lang.StringBuilder")
            .with_superclass("java.lang.Object")
            .with_method(Method::stub("<init>", vec![string()], Type::Void, false))
            .with_method(Method::stub(
                "append",
                vec![string()],
                Type::object("java.lang.StringBuilder"),
                false,
            ))
            .with_method(Method::stub("toString", vec![], string(), false)),
    ];

    let mut string_class = Class::new("java.lang.String").with_superclass("java.lang.Object");
    for param in [
        Type::Boolean,
        Type::Char,
        Type::Int,
        Type::Long,
        Type::Float,
        Type::Double,
        object(),
    ] {
        string_class = string_class.with_method(Method::stub("valueOf", vec![param], string(), true));
    }
    string_class = string_class.with_method(Method::stub(
        "format",
        vec![string(), Type::array(object())],
        string(),
        true,
    ));
    classes.push(string_class);

    for (name, primitive) in [
        ("java.lang.Boolean", Type::Boolean),
        ("java.lang.Byte", Type::Byte),
        ("java.lang.Short", Type::Short),
        ("java.lang.Character", Type::Char),
        ("java.lang.Integer", Type::Int),
        ("java.lang.Long", Type::Long),
        ("java.lang.Float", Type::Float),
        ("java.lang.Double", Type::Double),
    ] {
        classes.push(
            Class::new(name)
                .with_superclass("java.lang.Object")
                .with_method(Method::stub(
                    "valueOf",
                    vec![primitive],
                    Type::object(name),
                    true,
                )),
        );
    }

    classes.push(
        Class::new("java.io.InputStream")
            .with_superclass("java.lang.Object")
            .with_method(Method::stub("read", vec![], Type::Int, false)),
    );
    classes.push(
        Class::new("java.io.OutputStream")
            .with_superclass("java.lang.Object")
            .with_method(Method::stub("write", vec![Type::Int], Type::Void, false)),
    );
    classes.push(
        Class::new("java.io.FilterInputStream")
            .with_superclass("java.io.InputStream")
            .with_method(Method::stub(
                "<init>",
                vec![Type::object("java.io.InputStream")],
                Type::Void,
                false,
            )),
    );
    classes.push(
        Class::new("java.io.FilterOutputStream")
            .with_superclass("java.io.OutputStream")
            .with_method(Method::stub(
                "<init>",
                vec![Type::object("java.io.OutputStream")],
                Type::Void,
                false,
            )),
    );

    classes.push(
        Class::new("java.net.URL")
            .with_superclass("java.lang.Object")
            .with_method(Method::stub(
                "openConnection",
                vec![],
                Type::object("java.net.URLConnection"),
                false,
            )),
    );
    classes.push(
        Class::new("java.net.URLConnection")
            .with_superclass("java.lang.Object")
            .with_method(Method::stub(
                "addRequestProperty",
                vec![string(), string()],
                Type::Void,
                false,
            ))
            .with_method(Method::stub("connect", vec![], Type::Void, false))
            .with_method(Method::stub("getContentLength", vec![], Type::Int, false))
            .with_method(Method::stub("getContentType", vec![], string(), false))
            .with_method(Method::stub(
                "getHeaderField",
                vec![string()],
                string(),
                false,
            ))
            .with_method(Method::stub(
                "getInputStream",
                vec![],
                Type::object("java.io.InputStream"),
                false,
            ))
            .with_method(Method::stub(
                "getOutputStream",
                vec![],
                Type::object("java.io.OutputStream"),
                false,
            )),
    );
    classes.push(
        Class::new("java.net.HttpURLConnection")
            .with_superclass("java.net.URLConnection")
            .with_method(Method::stub("getResponseCode", vec![], Type::Int, false))
            .with_method(Method::stub(
                "setRequestMethod",
                vec![string()],
                Type::Void,
                false,
            )),
    );
    classes.push(
        Class::new("javax.net.ssl.HttpsURLConnection")
            .with_superclass("java.net.HttpURLConnection"),
    );

    classes
}

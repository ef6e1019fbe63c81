//! Classes and methods of the modeled program

use serde::{Deserialize, Serialize};

use super::body::Body;
use super::instruction::MethodRef;
use super::ty::Type;

/// Instance field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Type,
}

/// A method of the modeled program; library stubs carry no body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
    pub is_static: bool,
    pub body: Option<Body>,
}

impl Method {
    /// Signature-only method, the shape platform stubs use
    pub fn stub(name: impl Into<String>, params: Vec<Type>, ret: Type, is_static: bool) -> Self {
        Method {
            name: name.into(),
            params,
            ret,
            is_static,
            body: None,
        }
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn make_ref(&self, class: &str) -> MethodRef {
        MethodRef {
            class: class.to_string(),
            name: self.name.clone(),
            params: self.params.clone(),
            ret: self.ret.clone(),
            is_static: self.is_static,
        }
    }
}

/// A class of the modeled program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    /// Fully qualified name
    pub name: String,
    pub superclass: Option<String>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<Method>,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Class {
            name: name.into(),
            superclass: None,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Exact-signature lookup on this class only
    pub fn find_method(&self, name: &str, params: &[Type]) -> Option<&Method> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.params == params)
    }
}

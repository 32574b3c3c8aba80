//! # Contract Descriptors
//!
//! The reflective metadata of a hub contract: which members it declares, what
//! each one returns, how many parameters it takes and which names override
//! the defaults.
//!
//! Descriptors are normally emitted by `#[hub_contract]`, but they are plain
//! data and can be assembled by hand with the builder methods below.
//!
//! ## Philosophy
//!
//! - **Syntactic Types**: A [`TypeDescriptor`] records what a declared type
//!   looks like, not what it is. Shape rules live in [`crate::classify`].
//! - **Declaration Order**: Members keep the order they were declared in, so
//!   scanning and error reporting are deterministic.

/// Whether a contract is a pure capability declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContractKind {
    /// A trait: no bodies that could conflict with generated ones.
    Interface,
    /// A struct, enum or other concrete type.
    Concrete,
}

/// Where a member was declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Declared by the contract itself.
    Declared,
    /// Inherited from the base [`HubClient`](crate::proxy::HubClient) surface.
    Base,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    /// A value-carrying member with no parameters.
    Property { writable: bool },
    /// A getter or setter backing `property`.
    Accessor { property: String },
}

/// The syntactic form of a declared return, value or parameter type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// `()` or no declared type.
    Unit,
    /// A pending completion with no carried value.
    Completion,
    /// A pending completion carrying the named type.
    Pending(String),
    /// An unsubscribe handle.
    Subscription,
    /// A push-based sequence of the named item type.
    Observable(String),
    /// A callable taking `arity` parameters.
    Handler { arity: usize },
    /// Anything else.
    Named(String),
}

impl std::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unit => write!(f, "()"),
            Self::Completion => write!(f, "Completion"),
            Self::Pending(t) => write!(f, "Pending<{}>", t),
            Self::Subscription => write!(f, "Subscription"),
            Self::Observable(t) => write!(f, "Observable<{}>", t),
            Self::Handler { arity } => write!(f, "Fn/{}", arity),
            Self::Named(t) => write!(f, "{}", t),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: TypeDescriptor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberDescriptor {
    pub name: String,
    pub kind: MemberKind,
    pub origin: Origin,
    pub value_type: TypeDescriptor,
    pub params: Vec<Param>,
    /// Member-level wire name override.
    pub method_name: Option<String>,
    /// Declared but intentionally left unbound.
    pub not_mapped: bool,
}

impl MemberDescriptor {
    pub fn method(name: impl Into<String>, returns: TypeDescriptor) -> Self {
        Self::with_kind(name, MemberKind::Method, returns)
    }

    pub fn property(name: impl Into<String>, value: TypeDescriptor, writable: bool) -> Self {
        Self::with_kind(name, MemberKind::Property { writable }, value)
    }

    pub fn accessor(name: impl Into<String>, property: impl Into<String>, value: TypeDescriptor) -> Self {
        Self::with_kind(name, MemberKind::Accessor { property: property.into() }, value)
    }

    fn with_kind(name: impl Into<String>, kind: MemberKind, value_type: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            kind,
            origin: Origin::Declared,
            value_type,
            params: Vec::new(),
            method_name: None,
            not_mapped: false,
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.params.push(Param { name: name.into(), ty });
        self
    }

    /// Appends `count` parameters of an unspecified type.
    pub fn params(mut self, count: usize) -> Self {
        for _ in 0..count {
            let name = format!("arg{}", self.params.len() + 1);
            self.params.push(Param { name, ty: TypeDescriptor::Named("_".into()) });
        }
        self
    }

    pub fn method_name(mut self, wire_name: impl Into<String>) -> Self {
        self.method_name = Some(wire_name.into());
        self
    }

    pub fn not_mapped(mut self) -> Self {
        self.not_mapped = true;
        self
    }

    pub fn inherited(mut self) -> Self {
        self.origin = Origin::Base;
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractDescriptor {
    pub name: String,
    pub kind: ContractKind,
    /// Contract-level hub name override.
    pub hub_name: Option<String>,
    pub members: Vec<MemberDescriptor>,
}

impl ContractDescriptor {
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ContractKind::Interface,
            hub_name: None,
            members: Vec::new(),
        }
    }

    pub fn concrete(name: impl Into<String>) -> Self {
        Self {
            kind: ContractKind::Concrete,
            ..Self::interface(name)
        }
    }

    pub fn hub_name(mut self, hub_name: impl Into<String>) -> Self {
        self.hub_name = Some(hub_name.into());
        self
    }

    pub fn member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    /// Adds the base [`HubClient`](crate::proxy::HubClient) members, marked
    /// as inherited.
    pub fn with_base_members(self) -> Self {
        self.member(
            MemberDescriptor::method("invoke", TypeDescriptor::Completion)
                .param("method", TypeDescriptor::Named("&str".into()))
                .param("args", TypeDescriptor::Named("Vec<Value>".into()))
                .inherited(),
        )
        .member(
            MemberDescriptor::method("invoke_typed", TypeDescriptor::Pending("R".into()))
                .param("method", TypeDescriptor::Named("&str".into()))
                .param("args", TypeDescriptor::Named("Vec<Value>".into()))
                .inherited(),
        )
        .member(
            MemberDescriptor::method("subscribe", TypeDescriptor::Subscription)
                .param("event", TypeDescriptor::Named("&str".into()))
                .param("handler", TypeDescriptor::Named("EventHandler".into()))
                .inherited(),
        )
    }
}

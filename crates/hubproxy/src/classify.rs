//! # Shape Classifier
//!
//! Maps a scanned member to the transport primitive that serves it.
//!
//! | declared as                                   | shape      |
//! |-----------------------------------------------|------------|
//! | method returning `Completion`                 | `Call`     |
//! | method returning `Pending<T>`                 | `TypedCall`|
//! | method `(handler: impl Fn(..)) -> Subscription` | `Event`  |
//! | parameterless property `Observable<T>`        | `Stream`   |
//!
//! Anything else is rejected. Accessors that survive scanning are skipped.

use crate::contract::MemberDescriptor;
use crate::contract::MemberKind;
use crate::contract::TypeDescriptor;
use crate::error::Error;
use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Fire-and-forget call.
    Call,
    /// Call whose completion carries `result`.
    TypedCall { result: String },
    /// Server-pushed event; `arity` is the handler's parameter count.
    Event { arity: usize },
    /// Continuous stream of `item` values.
    Stream { item: String },
}

impl Shape {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::TypedCall { .. } => "typed call",
            Self::Event { .. } => "event",
            Self::Stream { .. } => "stream",
        }
    }
}

/// Classifies `member`, or returns `None` for an accessor.
pub fn classify(member: &MemberDescriptor) -> Result<Option<Shape>> {
    let shape = match (&member.kind, &member.value_type) {
        (MemberKind::Accessor { .. }, _) => return Ok(None),

        (MemberKind::Method, TypeDescriptor::Completion) => Shape::Call,
        (MemberKind::Method, TypeDescriptor::Pending(result)) => Shape::TypedCall { result: result.clone() },
        (MemberKind::Method, TypeDescriptor::Subscription) => match member.params.as_slice() {
            [handler] => match handler.ty {
                TypeDescriptor::Handler { arity } => Shape::Event { arity },
                _ => return Err(unsupported(member)),
            },
            _ => return Err(unsupported(member)),
        },

        (MemberKind::Property { .. }, TypeDescriptor::Observable(item)) if member.params.is_empty() => {
            Shape::Stream { item: item.clone() }
        }

        _ => return Err(unsupported(member)),
    };
    Ok(Some(shape))
}

fn unsupported(member: &MemberDescriptor) -> Error {
    let params: Vec<String> = member.params.iter().map(|p| p.ty.to_string()).collect();
    Error::UnsupportedMemberShape {
        member: member.name.clone(),
        found: format!("fn({}) -> {}", params.join(", "), member.value_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(arity: usize) -> TypeDescriptor {
        TypeDescriptor::Handler { arity }
    }

    #[test]
    fn test_classify_calls() {
        let call = MemberDescriptor::method("ping", TypeDescriptor::Completion);
        let typed = MemberDescriptor::method("echo", TypeDescriptor::Pending("String".into())).params(1);

        assert_eq!(classify(&call).unwrap(), Some(Shape::Call));
        assert_eq!(
            classify(&typed).unwrap(),
            Some(Shape::TypedCall { result: "String".into() })
        );
    }

    #[test]
    fn test_classify_event() {
        let event = MemberDescriptor::method("on_message", TypeDescriptor::Subscription)
            .param("handler", handler(2));

        assert_eq!(classify(&event).unwrap(), Some(Shape::Event { arity: 2 }));
    }

    #[test]
    fn test_classify_event_needs_exactly_one_handler() {
        let none = MemberDescriptor::method("on_a", TypeDescriptor::Subscription);
        let plain = MemberDescriptor::method("on_b", TypeDescriptor::Subscription)
            .param("x", TypeDescriptor::Named("u32".into()));
        let two = MemberDescriptor::method("on_c", TypeDescriptor::Subscription)
            .param("h1", handler(0))
            .param("h2", handler(0));

        for member in [none, plain, two] {
            assert!(matches!(
                classify(&member),
                Err(Error::UnsupportedMemberShape { .. })
            ));
        }
    }

    #[test]
    fn test_classify_stream_property() {
        let ro = MemberDescriptor::property("prices", TypeDescriptor::Observable("f64".into()), false);
        let rw = MemberDescriptor::property("ticks", TypeDescriptor::Observable("u64".into()), true);

        assert_eq!(classify(&ro).unwrap(), Some(Shape::Stream { item: "f64".into() }));
        assert_eq!(classify(&rw).unwrap(), Some(Shape::Stream { item: "u64".into() }));
    }

    #[test]
    fn test_classify_rejects_void() {
        let member = MemberDescriptor::method("action_with_void_return", TypeDescriptor::Unit);

        match classify(&member) {
            Err(Error::UnsupportedMemberShape { member, found }) => {
                assert_eq!(member, "action_with_void_return");
                assert_eq!(found, "fn() -> ()");
            }
            other => panic!("expected UnsupportedMemberShape, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_rejects_observable_method() {
        let member = MemberDescriptor::method("prices", TypeDescriptor::Observable("f64".into())).params(1);

        assert!(matches!(classify(&member), Err(Error::UnsupportedMemberShape { .. })));
    }

    #[test]
    fn test_classify_skips_accessors() {
        let member = MemberDescriptor::accessor("get_name", "name", TypeDescriptor::Named("String".into()));

        assert_eq!(classify(&member).unwrap(), None);
    }
}

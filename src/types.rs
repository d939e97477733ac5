//! Type-system collaborator.
//!
//! The resolver only needs a handful of questions answered about the host's
//! class model. [`crate::model::ClassModel`] answers them from JSON; an IDE
//! host with its own type index implements this trait directly.

use std::fmt::Debug;

pub trait TypeSystem {
    type Class: Copy + Eq + Debug;
    type Field: Copy + Eq + Debug;

    /// Field named `name` visible on `class`, including inherited members.
    /// The nearest declaration wins.
    fn find_field(&self, class: Self::Class, name: &str) -> Option<Self::Field>;

    /// Class that a field's declared type resolves to. Collection and array
    /// types resolve to their element class; primitives resolve to nothing.
    fn field_class(&self, field: Self::Field) -> Option<Self::Class>;

    /// Every field visible on `class`, own declarations first.
    fn fields(&self, class: Self::Class) -> Vec<Self::Field>;

    fn field_name(&self, field: Self::Field) -> &str;

    fn class_name(&self, class: Self::Class) -> &str;
}

//! Widget arguments and the change detector over them.
//!
//! Arguments come in two flavors: *value-comparable* ones carry a structural
//! equality and are diffed by value; *reference-only* ones have no usable
//! equality and are diffed by allocation identity. The reference policy is a
//! deliberate approximation: two `Rc`s that are logically equal but come from
//! different allocations count as different.

use std::any::Any;
use std::rc::Rc;

/// Object-safe structural equality for value-comparable arguments.
pub trait ValueArg: Any {
    fn eq_dyn(&self, other: &dyn ValueArg) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T: PartialEq + Any> ValueArg for T {
    fn eq_dyn(&self, other: &dyn ValueArg) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One argument as stored in a state entry, tagged with its equality strategy.
pub enum Argument {
    Value(Box<dyn ValueArg>),
    Reference(Rc<dyn Any>),
}

impl Argument {
    pub fn value<T: PartialEq + 'static>(value: T) -> Self {
        Argument::Value(Box::new(value))
    }

    pub fn reference<T: Any>(value: Rc<T>) -> Self {
        Argument::Reference(value)
    }

    fn differs_from(&self, other: &Argument) -> bool {
        match (self, other) {
            (Argument::Value(a), Argument::Value(b)) => !a.eq_dyn(b.as_ref()),
            (Argument::Reference(a), Argument::Reference(b)) => {
                // Compare the data pointers only; vtable pointers of fat
                // pointers are not stable across codegen units.
                Rc::as_ptr(a) as *const () != Rc::as_ptr(b) as *const ()
            }
            _ => true,
        }
    }
}

/// Element-wise diff of two argument lists. O(argument count); no deep tree
/// diffing happens anywhere else.
pub fn args_differ(previous: &[Argument], current: &[Argument]) -> bool {
    if previous.len() != current.len() {
        return true;
    }
    previous
        .iter()
        .zip(current.iter())
        .any(|(prev, next)| prev.differs_from(next))
}

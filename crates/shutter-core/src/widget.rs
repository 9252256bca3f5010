//! Widget descriptions produced by call sites and consumed by the store.

use crate::args::Argument;
use crate::key::CallSite;
use crate::key::hash_disambiguator;
use crate::scope::Scope;
use shutter_layout::LayoutStyle;
use shutter_render::DrawPrimitive;
use smallvec::SmallVec;
use std::hash::Hash;
use std::rc::Rc;

pub(crate) type WidgetBody = Rc<dyn Fn(&mut Scope<'_>)>;

/// One widget invocation: kind, identity inputs, arguments and content.
///
/// A widget is either a pure composition (body emits child widgets) or a
/// *primitive* carrying layout attributes and draw primitives; primitives may
/// still have a body emitting children.
pub struct Widget {
    pub(crate) name: &'static str,
    pub(crate) call: CallSite,
    pub(crate) disambiguator: Option<u64>,
    pub(crate) args: SmallVec<[Argument; 4]>,
    pub(crate) style: Option<LayoutStyle>,
    pub(crate) draw: Vec<DrawPrimitive>,
    pub(crate) body: Option<WidgetBody>,
}

impl Widget {
    pub fn new(name: &'static str, call: CallSite) -> Self {
        Self {
            name,
            call,
            disambiguator: None,
            args: SmallVec::new(),
            style: None,
            draw: Vec::new(),
            body: None,
        }
    }

    /// Explicit disambiguator for repeated call sites (list items).
    ///
    /// Omitting this inside a variable-length repetition makes items
    /// reconcile by position: removing the first item shifts state onto its
    /// successors. Key list items whenever items can reorder.
    pub fn keyed<K: Hash>(mut self, key: K) -> Self {
        self.disambiguator = Some(hash_disambiguator(&key));
        self
    }

    /// Adds a value-comparable argument, diffed by structural equality.
    pub fn arg<T: PartialEq + 'static>(mut self, value: T) -> Self {
        self.args.push(Argument::value(value));
        self
    }

    /// Adds a reference-only argument, diffed by allocation identity.
    pub fn arg_ref<T: 'static>(mut self, value: Rc<T>) -> Self {
        self.args.push(Argument::reference(value));
        self
    }

    /// Marks this widget primitive by attaching layout attributes.
    pub fn style(mut self, style: LayoutStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Appends a draw primitive. Only meaningful on primitive widgets.
    pub fn draw(mut self, primitive: DrawPrimitive) -> Self {
        self.draw.push(primitive);
        self
    }

    pub fn body(mut self, body: impl Fn(&mut Scope<'_>) + 'static) -> Self {
        self.body = Some(Rc::new(body));
        self
    }

    pub fn is_primitive(&self) -> bool {
        self.style.is_some()
    }
}

/// Captures the current source position as a [`CallSite`].
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::CallSite::new($crate::location_key(file!(), line!(), column!()))
    };
}

/// Shorthand for `Widget::new(name, call_site!())`.
#[macro_export]
macro_rules! widget {
    ($name:expr) => {
        $crate::Widget::new($name, $crate::call_site!())
    };
}

//! # Destinations and the Destination Resolver
//!
//! A destination is a typed, mutable location in the caller's object graph.
//! Every destination reports a [`Slot`] describing its static shape:
//!
//! - *indirection layers*: [`Slot::Optional`] (`Option<T>`) and
//!   [`Slot::Indirect`] (`Box<T>`), which must be walked before a value can
//!   be written;
//! - *concrete locations*: strings, booleans, numbers, records (structs with
//!   a [`FieldMap`]) and sequences (`Vec<T>`);
//! - [`Slot::Void`]: `()`, a location that can never hold a value.
//!
//! [`resolve`] walks the layers, allocating empty `Option`s on the way down.
//! When the incoming value is `null`, resolution stops at the last optional
//! layer in front of a concrete value so the caller can clear it instead of
//! allocating storage it would immediately throw away.
//!
//! ## Records
//!
//! Structs expose their fields through [`Record::describe`], which registers
//! each field in a [`FieldMap`] once per object decode. A field registered
//! with [`FieldMap::tagged`] matches its serialization name exactly; a field
//! registered with [`FieldMap::untagged`] matches its identifier
//! case-insensitively. The [`record!`](crate::record) macro writes both
//! trait impls from a field list.

use std::collections::HashMap;

use crate::token::Token;

/// A location in the caller's object graph.
pub trait Destination {
    /// Shape of this location.
    fn slot(&mut self) -> Slot<'_>;

    /// Whether this type is, or indirectly wraps, an optional layer that can
    /// represent `null`.
    fn nullable() -> bool
    where
        Self: Sized,
    {
        false
    }
}

/// The static shape of a [`Destination`], with mutable access to it.
pub enum Slot<'a> {
    /// An `Option<T>` layer.
    Optional(&'a mut dyn Optional),
    /// A `Box<T>` layer; always populated.
    Indirect(&'a mut dyn Destination),
    /// A string location.
    String(&'a mut String),
    /// A boolean location.
    Bool(&'a mut bool),
    /// A numeric location.
    Number(&'a mut dyn Numeric),
    /// A struct with named fields.
    Record(&'a mut dyn Record),
    /// A growable sequence.
    Sequence(&'a mut dyn Sequence),
    /// A location that cannot hold a value.
    Void,
}

impl Slot<'_> {
    /// Short name of the shape, for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Slot::Optional(_) => "optional",
            Slot::Indirect(_) => "boxed",
            Slot::String(_) => "string",
            Slot::Bool(_) => "boolean",
            Slot::Number(_) => "number",
            Slot::Record(_) => "record",
            Slot::Sequence(_) => "sequence",
            Slot::Void => "void",
        }
    }
}

/// An optional layer around another destination.
pub trait Optional {
    /// Whether the layer is currently empty.
    fn is_empty(&self) -> bool;

    /// Sets the layer to its empty state.
    fn clear(&mut self);

    /// Whether the wrapped type can itself represent `null`.
    fn inner_is_nullable(&self) -> bool;

    /// The wrapped destination, if present.
    fn current(&mut self) -> Option<&mut dyn Destination>;

    /// The wrapped destination, allocating a default value first if empty.
    fn get_or_allocate(&mut self) -> &mut dyn Destination;

    /// A fresh default value of the wrapped type, not attached to the layer.
    fn detached(&self) -> Box<dyn Destination + '_>;
}

/// A numeric location that parses JSON number literals.
pub trait Numeric {
    /// Rust type name of the location (`"u8"`, `"f64"`, ...).
    fn type_name(&self) -> &'static str;

    /// Whether `literal` is representable in this type.
    fn accepts(&self, literal: &str) -> bool;

    /// Parses and stores `literal`. Returns `false`, leaving the location
    /// untouched, when it is not representable.
    fn assign(&mut self, literal: &str) -> bool;
}

/// A struct whose fields can be bound by name.
pub trait Record {
    /// Registers every bindable field in `fields`.
    fn describe<'a>(&'a mut self, fields: &mut FieldMap<'a>);
}

/// A growable sequence of same-shaped elements.
pub trait Sequence {
    /// Starts a detached staging buffer. The sequence is only modified when
    /// the buffer is committed.
    fn stage(&mut self) -> Box<dyn Staging + '_>;
}

/// Elements decoded for a [`Sequence`] but not yet visible in it.
pub trait Staging {
    /// Allocates a fresh default element and returns it for decoding.
    fn fresh_element(&mut self) -> &mut dyn Destination;

    /// Appends the element returned by the last
    /// [`fresh_element`](Self::fresh_element) call.
    fn append(&mut self);

    /// Number of elements appended so far.
    fn staged(&self) -> usize;

    /// Replaces the sequence's contents with the staged elements.
    fn commit(self: Box<Self>);
}

/// Incoming property name to field destination, built once per object.
#[derive(Default)]
pub struct FieldMap<'a> {
    tagged: HashMap<String, &'a mut dyn Destination>,
    untagged: HashMap<String, &'a mut dyn Destination>,
}

impl<'a> FieldMap<'a> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a field under its explicit serialization name.
    pub fn tagged(&mut self, name: &str, field: &'a mut dyn Destination) -> &mut Self {
        self.tagged.insert(name.to_string(), field);
        self
    }

    /// Registers a field under its identifier, matched case-insensitively.
    pub fn untagged(&mut self, ident: &str, field: &'a mut dyn Destination) -> &mut Self {
        self.untagged.insert(ident.to_lowercase(), field);
        self
    }

    /// Finds the field bound to `key`. Explicit names take precedence.
    pub fn lookup(&mut self, key: &str) -> Option<&mut dyn Destination> {
        let field = if self.tagged.contains_key(key) {
            self.tagged.get_mut(key)
        } else {
            self.untagged.get_mut(&key.to_lowercase())
        };
        match field {
            Some(field) => Some(&mut **field),
            None => None,
        }
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.tagged.len() + self.untagged.len()
    }

    /// Whether no field is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of [`resolve`].
pub enum Resolved<'a> {
    /// No destination: consume the value, do not bind it.
    Absent,
    /// The optional layer that should be cleared for a `null` value.
    Empty(&'a mut dyn Optional),
    /// The innermost concrete location.
    Concrete(Slot<'a>),
}

/// Walks indirection layers down to a concrete location.
///
/// Empty optional layers are filled with a default value on the way, except
/// that for a `null` value the walk stops at the optional layer directly in
/// front of a non-nullable type. An absent or void destination resolves to
/// [`Resolved::Absent`].
pub fn resolve<'a>(destination: Option<&'a mut dyn Destination>, is_null: bool) -> Resolved<'a> {
    let Some(destination) = destination else {
        return Resolved::Absent;
    };
    let mut slot = destination.slot();
    loop {
        slot = match slot {
            Slot::Optional(layer) => {
                if is_null && !layer.inner_is_nullable() {
                    return Resolved::Empty(layer);
                }
                layer.get_or_allocate().slot()
            }
            Slot::Indirect(inner) => inner.slot(),
            Slot::Void => return Resolved::Absent,
            concrete => return Resolved::Concrete(concrete),
        };
    }
}

/// Reborrows an optional destination handle for a nested call.
pub(crate) fn reborrow<'a>(
    destination: &'a mut Option<&mut dyn Destination>,
) -> Option<&'a mut dyn Destination> {
    match destination {
        Some(target) => Some(&mut **target),
        None => None,
    }
}

/// Number of layers in front of the outermost empty `Option` on the way to
/// the concrete location, or `None` when no layer would be allocated.
pub(crate) fn vacant_layer(destination: &mut dyn Destination) -> Option<usize> {
    let mut depth = 0;
    let mut slot = destination.slot();
    loop {
        slot = match slot {
            Slot::Optional(layer) => match layer.current() {
                Some(inner) => inner.slot(),
                None => return Some(depth),
            },
            Slot::Indirect(inner) => inner.slot(),
            _ => return None,
        };
        depth += 1;
    }
}

/// Empties the `Option` layer found `depth` layers below `destination`.
pub(crate) fn clear_layer(destination: &mut dyn Destination, depth: usize) {
    let mut slot = destination.slot();
    for _ in 0..depth {
        slot = match slot {
            Slot::Optional(layer) => match layer.current() {
                Some(inner) => inner.slot(),
                None => return,
            },
            Slot::Indirect(inner) => inner.slot(),
            _ => return,
        };
    }
    if let Slot::Optional(layer) = slot {
        layer.clear();
    }
}

/// Checks that `token` could be written into `destination` without
/// allocating anything on the way.
pub(crate) fn check_scalar(destination: &mut dyn Destination, token: &Token) -> Result<(), String> {
    match destination.slot() {
        Slot::Optional(layer) => match layer.current() {
            Some(inner) => check_scalar(inner, token),
            None => check_scalar(&mut *layer.detached(), token),
        },
        Slot::Indirect(inner) => check_scalar(inner, token),
        Slot::Void => Ok(()),
        concrete => scalar_fits(&concrete, token),
    }
}

fn scalar_fits(slot: &Slot<'_>, token: &Token) -> Result<(), String> {
    match (slot, token) {
        (Slot::String(_), Token::String(_)) | (Slot::Bool(_), Token::Bool(_)) => Ok(()),
        (Slot::Number(target), Token::Number(literal)) => {
            if target.accepts(literal) {
                Ok(())
            } else {
                Err(format!(
                    "cannot represent {literal} as {}",
                    target.type_name()
                ))
            }
        }
        (slot, token) => Err(format!(
            "cannot bind a {} into a {} destination",
            token.category(),
            slot.describe()
        )),
    }
}

/// Writes a scalar token into a concrete slot. Returns `false` when the
/// shapes disagree; the slot is then untouched.
pub(crate) fn write_scalar(slot: Slot<'_>, token: Token) -> bool {
    match (slot, token) {
        (Slot::String(target), Token::String(value)) => {
            *target = value;
            true
        }
        (Slot::Bool(target), Token::Bool(value)) => {
            *target = value;
            true
        }
        (Slot::Number(target), Token::Number(literal)) => target.assign(&literal),
        _ => false,
    }
}

impl Destination for String {
    fn slot(&mut self) -> Slot<'_> {
        Slot::String(self)
    }
}

impl Destination for bool {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Bool(self)
    }
}

impl Destination for () {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Void
    }
}

macro_rules! numeric_destination {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Numeric for $ty {
                fn type_name(&self) -> &'static str {
                    stringify!($ty)
                }

                fn accepts(&self, literal: &str) -> bool {
                    literal.parse::<$ty>().is_ok()
                }

                fn assign(&mut self, literal: &str) -> bool {
                    match literal.parse::<$ty>() {
                        Ok(value) => {
                            *self = value;
                            true
                        }
                        Err(_) => false,
                    }
                }
            }

            impl Destination for $ty {
                fn slot(&mut self) -> Slot<'_> {
                    Slot::Number(self)
                }
            }
        )*
    };
}

numeric_destination!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<T: Destination + Default> Optional for Option<T> {
    fn is_empty(&self) -> bool {
        self.is_none()
    }

    fn clear(&mut self) {
        *self = None;
    }

    fn inner_is_nullable(&self) -> bool {
        T::nullable()
    }

    fn current(&mut self) -> Option<&mut dyn Destination> {
        match self {
            Some(inner) => Some(inner),
            None => None,
        }
    }

    fn get_or_allocate(&mut self) -> &mut dyn Destination {
        self.get_or_insert_with(T::default)
    }

    fn detached(&self) -> Box<dyn Destination + '_> {
        Box::new(T::default())
    }
}

impl<T: Destination + Default> Destination for Option<T> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Optional(self)
    }

    fn nullable() -> bool {
        true
    }
}

impl<T: Destination> Destination for Box<T> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Indirect(&mut **self)
    }

    fn nullable() -> bool {
        T::nullable()
    }
}

struct VecStaging<'a, T> {
    target: &'a mut Vec<T>,
    items: Vec<T>,
    fresh: Option<T>,
}

impl<T: Destination + Default> Staging for VecStaging<'_, T> {
    fn fresh_element(&mut self) -> &mut dyn Destination {
        self.fresh.insert(T::default())
    }

    fn append(&mut self) {
        if let Some(item) = self.fresh.take() {
            self.items.push(item);
        }
    }

    fn staged(&self) -> usize {
        self.items.len()
    }

    fn commit(self: Box<Self>) {
        let staging = *self;
        *staging.target = staging.items;
    }
}

impl<T: Destination + Default> Sequence for Vec<T> {
    fn stage(&mut self) -> Box<dyn Staging + '_> {
        Box::new(VecStaging {
            target: self,
            items: Vec::new(),
            fresh: None,
        })
    }
}

impl<T: Destination + Default> Destination for Vec<T> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Sequence(self)
    }
}

/// Implements [`Destination`] and [`Record`] for a struct from its field list.
///
/// `"name" => field` binds `field` under the explicit serialization name
/// `name`; a bare `field` is matched case-insensitively on its identifier.
///
/// ```
/// #[derive(Default)]
/// struct Child {
///     foo: String,
/// }
///
/// #[derive(Default)]
/// struct Parent {
///     string: String,
///     total: Option<f64>,
///     child: Child,
/// }
///
/// schemabind::record!(Child { foo });
/// schemabind::record!(Parent { "string" => string, total, "child" => child });
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ident { $($body:tt)* }) => {
        impl $crate::Destination for $ty {
            fn slot(&mut self) -> $crate::Slot<'_> {
                $crate::Slot::Record(self)
            }
        }

        impl $crate::Record for $ty {
            fn describe<'a>(&'a mut self, fields: &mut $crate::FieldMap<'a>) {
                $crate::record!(@fields self, fields, $($body)*);
            }
        }
    };
    (@fields $self:ident, $fields:ident, ) => {};
    (@fields $self:ident, $fields:ident, $name:literal => $field:ident $(, $($rest:tt)*)?) => {
        $fields.tagged($name, &mut $self.$field);
        $crate::record!(@fields $self, $fields, $($($rest)*)?);
    };
    (@fields $self:ident, $fields:ident, $field:ident $(, $($rest:tt)*)?) => {
        $fields.untagged(stringify!($field), &mut $self.$field);
        $crate::record!(@fields $self, $fields, $($($rest)*)?);
    };
}

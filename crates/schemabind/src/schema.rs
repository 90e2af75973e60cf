//! # Schema Navigator
//!
//! Read-only structural queries over one node of a parsed JSON Schema
//! document. The navigator answers exactly the questions the engine needs to
//! dispatch a value: which types are allowed, which schema governs a named
//! property or an array element, and whether undeclared properties pass.
//!
//! Value-level constraints (bounds, patterns, enumerations, formats) are not
//! evaluated here; see [`crate::checker`].
//!
//! ## Keyword handling
//!
//! - `type`: a string or an array of strings. A node without `type` admits
//!   every type.
//! - `properties`: member name to child schema.
//! - `items`: a single schema for every element. A missing or tuple-form
//!   `items` admits any element.
//! - `additionalProperties`: `true` or a schema allows undeclared members
//!   (they are consumed without being bound); `false` or a missing keyword
//!   rejects them.
//! - `$ref`: local JSON Pointer references (`#/definitions/...`) are followed
//!   against the document root. Keywords written next to the `$ref` stay in
//!   force: the referring node is kept as an overlay, consulted before the
//!   target, and its `type` narrows the target's.
//! - Boolean schemas: `true` admits everything, `false` nothing.

use std::fmt;

use serde_json::Value;

/// Schema used where a document omits a child schema.
static PERMISSIVE: Value = Value::Bool(true);

/// Upper bound on chained `$ref` hops, guarding against reference cycles.
const MAX_REF_HOPS: usize = 32;

/// A JSON Schema primitive type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    /// `object`
    Object,
    /// `array`
    Array,
    /// `string`
    String,
    /// `number`
    Number,
    /// `integer`
    Integer,
    /// `boolean`
    Boolean,
    /// `null`
    Null,
}

impl JsonType {
    const ALL: [JsonType; 7] = [
        JsonType::Object,
        JsonType::Array,
        JsonType::String,
        JsonType::Number,
        JsonType::Integer,
        JsonType::Boolean,
        JsonType::Null,
    ];

    /// Parses a `type` keyword entry.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "object" => Some(JsonType::Object),
            "array" => Some(JsonType::Array),
            "string" => Some(JsonType::String),
            "number" => Some(JsonType::Number),
            "integer" => Some(JsonType::Integer),
            "boolean" => Some(JsonType::Boolean),
            "null" => Some(JsonType::Null),
            _ => None,
        }
    }

    /// The keyword spelling of this type.
    pub fn name(self) -> &'static str {
        match self {
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Integer => "integer",
            JsonType::Boolean => "boolean",
            JsonType::Null => "null",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of [`JsonType`]s declared by a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSet(u8);

impl TypeSet {
    /// No type is admitted.
    pub const NONE: TypeSet = TypeSet(0);
    /// Every type is admitted.
    pub const ANY: TypeSet = TypeSet(0b0111_1111);

    /// Types admitted by both sets.
    pub fn intersect(self, other: TypeSet) -> Self {
        TypeSet(self.0 & other.0)
    }

    /// Adds `ty` to the set.
    pub fn with(self, ty: JsonType) -> Self {
        TypeSet(self.0 | ty.bit())
    }

    /// Whether `ty` is a member.
    pub fn contains(self, ty: JsonType) -> bool {
        self.0 & ty.bit() != 0
    }

    /// Whether a number literal is admitted. Integral literals also match
    /// `integer`.
    pub fn admits_number(self, integral: bool) -> bool {
        self.contains(JsonType::Number) || (integral && self.contains(JsonType::Integer))
    }

    /// Members in declaration order of [`JsonType`].
    pub fn iter(self) -> impl Iterator<Item = JsonType> {
        JsonType::ALL.into_iter().filter(move |ty| self.contains(*ty))
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == TypeSet::ANY {
            return f.write_str("any");
        }
        if *self == TypeSet::NONE {
            return f.write_str("nothing");
        }
        for (i, ty) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(ty.name())?;
        }
        Ok(())
    }
}

/// A borrowed schema node together with the document it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct SchemaFragment<'s> {
    document: &'s Value,
    node: &'s Value,
    overlay: Option<&'s Value>,
}

impl<'s> SchemaFragment<'s> {
    /// The root fragment of a schema document.
    pub fn root(document: &'s Value) -> Self {
        Self {
            document,
            node: document,
            overlay: None,
        }
        .dereferenced()
    }

    fn at(&self, node: &'s Value) -> Self {
        Self {
            document: self.document,
            node,
            overlay: None,
        }
        .dereferenced()
    }

    /// Follows local `$ref` pointers. An unresolvable reference leaves the
    /// node as is. A referring node with keywords besides `$ref` becomes the
    /// overlay.
    fn dereferenced(mut self) -> Self {
        let referring = self.node;
        for _ in 0..MAX_REF_HOPS {
            let Some(reference) = self.node.get("$ref").and_then(Value::as_str) else {
                break;
            };
            let Some(pointer) = reference.strip_prefix('#') else {
                break;
            };
            match self.document.pointer(pointer) {
                Some(target) => self.node = target,
                None => break,
            }
        }
        let has_siblings = referring
            .as_object()
            .is_some_and(|map| map.keys().any(|keyword| keyword != "$ref"));
        if has_siblings && !std::ptr::eq(referring, self.node) {
            self.overlay = Some(referring);
        }
        self
    }

    /// Looks `keyword` up in the overlay first, then in the target node.
    fn keyword(&self, keyword: &str) -> Option<&'s Value> {
        self.overlay
            .and_then(|overlay| overlay.get(keyword))
            .or_else(|| self.node.get(keyword))
    }

    /// The schema node itself.
    pub fn value(&self) -> &'s Value {
        self.node
    }

    /// The node that referred to [`value`](Self::value) through `$ref`, when
    /// it carries keywords of its own.
    pub fn overlay(&self) -> Option<&'s Value> {
        self.overlay
    }

    /// The document the node belongs to.
    pub fn document(&self) -> &'s Value {
        self.document
    }

    /// Declared type set.
    pub fn type_set(&self) -> TypeSet {
        let declared = node_types(self.node);
        match self.overlay {
            Some(overlay) => declared.intersect(node_types(overlay)),
            None => declared,
        }
    }

    /// Child schema for a declared property, if any.
    pub fn property_schema(&self, name: &str) -> Option<SchemaFragment<'s>> {
        let declared = |node: &'s Value| node.get("properties").and_then(|p| p.get(name));
        self.overlay
            .and_then(declared)
            .or_else(|| declared(self.node))
            .map(|child| self.at(child))
    }

    /// Schema governing array elements.
    pub fn item_schema(&self) -> SchemaFragment<'s> {
        match self.keyword("items") {
            Some(items @ (Value::Object(_) | Value::Bool(_))) => self.at(items),
            _ => self.at(&PERMISSIVE),
        }
    }

    /// Whether members absent from `properties` are permitted.
    pub fn allows_additional_properties(&self) -> bool {
        if let Value::Bool(allowed) = self.node {
            return *allowed;
        }
        match self.keyword("additionalProperties") {
            Some(Value::Bool(allowed)) => *allowed,
            Some(Value::Object(_)) => true,
            _ => false,
        }
    }
}

fn node_types(node: &Value) -> TypeSet {
    match node {
        Value::Bool(false) => TypeSet::NONE,
        Value::Object(map) => match map.get("type") {
            None => TypeSet::ANY,
            Some(Value::String(name)) => parse_types(std::iter::once(name.as_str())),
            Some(Value::Array(names)) => parse_types(names.iter().filter_map(Value::as_str)),
            Some(_) => TypeSet::NONE,
        },
        _ => TypeSet::ANY,
    }
}

fn parse_types<'a>(names: impl Iterator<Item = &'a str>) -> TypeSet {
    names
        .filter_map(JsonType::from_name)
        .fold(TypeSet::NONE, TypeSet::with)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_set_single_and_array() {
        let doc = json!({"type": "string"});
        let ts = SchemaFragment::root(&doc).type_set();
        assert!(ts.contains(JsonType::String));
        assert!(!ts.contains(JsonType::Number));

        let doc = json!({"type": ["integer", "null"]});
        let ts = SchemaFragment::root(&doc).type_set();
        assert!(ts.contains(JsonType::Integer));
        assert!(ts.contains(JsonType::Null));
        assert_eq!(ts.to_string(), "integer|null");
    }

    #[test]
    fn test_missing_type_admits_everything() {
        let doc = json!({"maximum": 3});
        assert_eq!(SchemaFragment::root(&doc).type_set(), TypeSet::ANY);
    }

    #[test]
    fn test_boolean_schemas() {
        let yes = json!(true);
        let no = json!(false);
        assert_eq!(SchemaFragment::root(&yes).type_set(), TypeSet::ANY);
        assert!(SchemaFragment::root(&yes).allows_additional_properties());
        assert_eq!(SchemaFragment::root(&no).type_set(), TypeSet::NONE);
        assert!(!SchemaFragment::root(&no).allows_additional_properties());
    }

    #[test]
    fn test_admits_number() {
        let integer = TypeSet::NONE.with(JsonType::Integer);
        assert!(integer.admits_number(true));
        assert!(!integer.admits_number(false));
        assert!(TypeSet::NONE.with(JsonType::Number).admits_number(false));
    }

    #[test]
    fn test_property_lookup() {
        let doc = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}}
        });
        let root = SchemaFragment::root(&doc);
        let name = root.property_schema("name").unwrap();
        assert!(name.type_set().contains(JsonType::String));
        assert!(root.property_schema("other").is_none());
    }

    #[test]
    fn test_additional_properties_policy() {
        let absent = json!({"type": "object"});
        let allowed = json!({"type": "object", "additionalProperties": true});
        let schema = json!({"type": "object", "additionalProperties": {"type": "string"}});
        let denied = json!({"type": "object", "additionalProperties": false});
        assert!(!SchemaFragment::root(&absent).allows_additional_properties());
        assert!(SchemaFragment::root(&allowed).allows_additional_properties());
        assert!(SchemaFragment::root(&schema).allows_additional_properties());
        assert!(!SchemaFragment::root(&denied).allows_additional_properties());
    }

    #[test]
    fn test_missing_items_is_permissive() {
        let doc = json!({"type": "array"});
        let items = SchemaFragment::root(&doc).item_schema();
        assert_eq!(items.type_set(), TypeSet::ANY);
    }

    #[test]
    fn test_local_ref_is_followed() {
        let doc = json!({
            "definitions": {"name": {"type": "string", "maxLength": 4}},
            "type": "object",
            "properties": {"name": {"$ref": "#/definitions/name"}}
        });
        let name = SchemaFragment::root(&doc).property_schema("name").unwrap();
        assert_eq!(name.value()["maxLength"], 4);
    }

    #[test]
    fn test_ref_siblings_stay_in_force() {
        let doc = json!({
            "$defs": {
                "num": {"type": ["number", "string"], "minimum": 0},
                "obj": {"type": "object", "properties": {"a": {"type": "string"}}}
            },
            "properties": {
                "n": {"$ref": "#/$defs/num", "type": "number", "maximum": 3},
                "o": {"$ref": "#/$defs/obj", "properties": {"b": {}}, "additionalProperties": true},
                "plain": {"$ref": "#/$defs/num"}
            }
        });
        let root = SchemaFragment::root(&doc);

        let n = root.property_schema("n").unwrap();
        assert_eq!(n.type_set(), TypeSet::NONE.with(JsonType::Number));
        assert_eq!(n.value()["minimum"], 0);
        assert_eq!(n.overlay().unwrap()["maximum"], 3);

        let o = root.property_schema("o").unwrap();
        assert!(o.property_schema("a").is_some());
        assert!(o.property_schema("b").is_some());
        assert!(o.allows_additional_properties());

        assert!(root.property_schema("plain").unwrap().overlay().is_none());
    }

    #[test]
    fn test_ref_cycle_terminates() {
        let doc = json!({
            "definitions": {"a": {"$ref": "#/definitions/b"}, "b": {"$ref": "#/definitions/a"}},
            "properties": {"x": {"$ref": "#/definitions/a"}}
        });
        let x = SchemaFragment::root(&doc).property_schema("x").unwrap();
        assert!(x.value().get("$ref").is_some());
    }
}

//! Records and the mapping between records and attribute maps.
//!
//! A record type describes itself through a static table of [`Attribute`]s:
//! the canonical (underscore style) attribute name, which doubles as the
//! column name, its [`AttributeKind`] and a typed getter and setter. The
//! [`RecordMapper`] drives those tables in both directions, so nothing is
//! discovered at run time.
//!
//! ```
//! use objsql::{Attribute, AttributeKind, Record, Value};
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Tag {
//!     id: Option<i64>,
//!     label: Option<String>,
//! }
//!
//! static TAG_ATTRIBUTES: &[Attribute<Tag>] = &[
//!     Attribute::new("id", AttributeKind::Integer, |t: &Tag| t.id.into(), |t: &mut Tag, v: Value| t.id = v.as_integer()),
//!     Attribute::new("label", AttributeKind::Text, |t: &Tag| t.label.clone().into(), |t: &mut Tag, v: Value| t.label = v.into_text()),
//! ];
//!
//! impl Record for Tag {
//!     const TABLE_NAME: &'static str = "tags";
//!     fn attributes() -> &'static [Attribute<Self>] {
//!         TAG_ATTRIBUTES
//!     }
//! }
//!
//! let mut attributes = objsql::AttributeMap::new();
//! attributes.insert("label".into(), Value::from("rust"));
//! attributes.insert("id".into(), Value::from("7"));
//! let tag = Tag::new_instance_from(attributes, false).unwrap();
//! assert_eq!(tag.id, Some(7));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::datatype::{AttributeKind, Value};
use crate::error::{ObjsqlError, Result};
use crate::validate::{self, Rule, Violation};

/// The shape shared by records, decoded rows and external object notation.
pub type AttributeMap = BTreeMap<String, Value>;

/// One entry of a record type's static schema.
pub struct Attribute<R: 'static> {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub get: fn(&R) -> Value,
    pub set: fn(&mut R, Value),
}

impl<R: 'static> Attribute<R> {
    pub const fn new(
        name: &'static str,
        kind: AttributeKind,
        get: fn(&R) -> Value,
        set: fn(&mut R, Value),
    ) -> Self {
        Self { name, kind, get, set }
    }
}

impl<R: 'static> fmt::Debug for Attribute<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::<{}>", self.name, self.kind)
    }
}

/// A typed, attribute mapped entity persisted as one row of `TABLE_NAME`.
pub trait Record: Default + Clone + fmt::Debug + 'static {
    const TABLE_NAME: &'static str;
    const PRIMARY_KEY: &'static str = "id";

    fn attributes() -> &'static [Attribute<Self>];

    /// Validation rules, evaluated in declaration order.
    fn rules() -> &'static [Rule] {
        &[]
    }

    fn attribute(name: &str) -> Option<&'static Attribute<Self>> {
        Self::attributes().iter().find(|a| a.name == name)
    }
    fn primary_key(&self) -> Value {
        Self::attribute(Self::PRIMARY_KEY)
            .map(|a| (a.get)(self))
            .unwrap_or(Value::Null)
    }
    /// Sets the primary key, coercing `id` to the declared kind.
    fn set_primary_key(&mut self, id: Value) -> Result<()> {
        let attribute = Self::attribute(Self::PRIMARY_KEY).ok_or_else(|| {
            ObjsqlError::Mapping(format!(
                "{} declares no '{}' attribute",
                Self::TABLE_NAME,
                Self::PRIMARY_KEY
            ))
        })?;
        (attribute.set)(self, id.coerce(attribute.kind)?);
        Ok(())
    }
    fn validate(&self) -> Vec<Violation> {
        validate::validate(self)
    }
    /// Builds a record from a camel or underscore keyed map, ignoring unknown keys.
    fn new_instance_from(attributes: AttributeMap, use_underline_keys: bool) -> Result<Self> {
        RecordMapper::default().from_map(attributes, use_underline_keys)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStyle {
    #[default]
    Camel,
    Underscore,
}

lazy_static! {
    static ref WORD_BOUNDARY: Regex = Regex::new(r"([a-z0-9])([A-Z])").unwrap();
}

pub fn to_underscore(key: &str) -> String {
    WORD_BOUNDARY.replace_all(key, "${1}_${2}").to_lowercase()
}

pub fn to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl KeyStyle {
    pub fn apply(&self, canonical: &str) -> String {
        match self {
            KeyStyle::Camel => to_camel(canonical),
            KeyStyle::Underscore => canonical.to_string(),
        }
    }
}

/// Converts between records and attribute maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordMapper {
    pub key_style: KeyStyle,
    pub strict: bool,
}

impl RecordMapper {
    pub fn new(key_style: KeyStyle, strict: bool) -> Self {
        Self { key_style, strict }
    }

    /// All set attributes of `record`, keyed in the mapper's style.
    pub fn to_map<R: Record>(&self, record: &R) -> AttributeMap {
        R::attributes()
            .iter()
            .map(|a| (self.key_style.apply(a.name), (a.get)(record)))
            .filter(|(_, value)| !value.is_null())
            .collect()
    }

    /// Builds a record from `attributes`.
    ///
    /// Each key is normalised on its own, so a map may mix camel and
    /// underscore keys. When both spellings of one attribute are present the
    /// spelling matching `use_underline_keys` wins.
    pub fn from_map<R: Record>(&self, attributes: AttributeMap, use_underline_keys: bool) -> Result<R> {
        let declared = if use_underline_keys {
            KeyStyle::Underscore
        } else {
            KeyStyle::Camel
        };
        let mut resolved: BTreeMap<&'static str, (bool, Value)> = BTreeMap::new();
        for (key, value) in attributes {
            let canonical = to_underscore(&key);
            let attribute = match R::attribute(&canonical) {
                Some(attribute) => attribute,
                None if self.strict => {
                    return Err(ObjsqlError::Mapping(format!(
                        "unknown attribute '{}' for {}",
                        key,
                        R::TABLE_NAME
                    )));
                }
                None => {
                    debug!(key = %key, table = R::TABLE_NAME, "ignoring unknown attribute");
                    continue;
                }
            };
            let preferred = key == declared.apply(attribute.name);
            match resolved.get(attribute.name) {
                Some((true, _)) if !preferred => continue,
                _ => {
                    resolved.insert(attribute.name, (preferred, value));
                }
            }
        }
        let mut record = R::default();
        for (name, (_, value)) in resolved {
            if let Some(attribute) = R::attribute(name) {
                let value = value.coerce(attribute.kind).map_err(|e| match e {
                    ObjsqlError::Mapping(message) => {
                        ObjsqlError::Mapping(format!("attribute '{}': {}", name, message))
                    }
                    other => other,
                })?;
                (attribute.set)(&mut record, value);
            }
        }
        Ok(record)
    }
}

/// Adapts an already parsed JSON object into an attribute map.
pub fn attributes_from_json(json: serde_json::Value) -> Result<AttributeMap> {
    match json {
        serde_json::Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        other => Err(ObjsqlError::Mapping(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

use std::fmt::{self, Display};

use crate::{GraphError, GraphErrorKind};

#[cfg(feature = "serde")]
use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};

/// Port subtype tags as they appear in node-schema and graph files.
///
/// Two spellings are accepted for integers (`int` / `integer`) and booleans
/// (`bool` / `boolean`); both map to the same tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortType {
    Exec,
    Int,
    Float,
    Str,
    Bool,
    Array,
}

impl PortType {
    /// Parse a schema/graph type string (case-insensitive).
    pub fn parse(s: &str) -> Option<PortType> {
        match s.to_ascii_lowercase().as_str() {
            "exec" => Some(PortType::Exec),
            "int" | "integer" => Some(PortType::Int),
            "float" => Some(PortType::Float),
            "string" => Some(PortType::Str),
            "bool" | "boolean" => Some(PortType::Bool),
            "array" => Some(PortType::Array),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PortType::Exec => "exec",
            PortType::Int => "int",
            PortType::Float => "float",
            PortType::Str => "string",
            PortType::Bool => "bool",
            PortType::Array => "array",
        }
    }

    /// The canonical spellings accepted for data subtypes, in file order.
    /// Variable-accessor prototypes are synthesized once per spelling.
    pub const DATA_SPELLINGS: &'static [&'static str] =
        &["int", "integer", "float", "string", "bool", "boolean", "array"];
}

impl Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of an array payload.
///
/// Both slots are always stored; consumers pick the slot appropriate to the
/// context (`GetArrayInt` reads `int_val`, `GetArrayString` reads `str_val`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ArrayElem {
    pub int_val: i64,
    pub str_val: String,
}

impl ArrayElem {
    pub fn from_int(v: i64) -> Self {
        Self {
            int_val: v,
            ..Default::default()
        }
    }

    pub fn from_str<S: Into<String>>(v: S) -> Self {
        Self {
            int_val: 0,
            str_val: v.into(),
        }
    }
}

/// The payload of one port: a tagged variant whose tag is fixed at
/// construction (from the schema) and never changes; only the payload
/// mutates.
///
/// `Exec` carries no payload — it marks a control-flow port. Typed reads
/// never coerce: an `Int` read from a `Bool` port (or vice versa) fails.
#[derive(Debug, Clone, PartialEq)]
pub enum PortValue {
    Exec,
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Array(Vec<ArrayElem>),
}

impl PortValue {
    /// The zero value for a subtype tag.
    pub fn new(ty: PortType) -> PortValue {
        match ty {
            PortType::Exec => PortValue::Exec,
            PortType::Int => PortValue::Int(0),
            PortType::Float => PortValue::Float(0.0),
            PortType::Str => PortValue::Str(String::new()),
            PortType::Bool => PortValue::Bool(false),
            PortType::Array => PortValue::Array(Vec::new()),
        }
    }

    pub fn port_type(&self) -> PortType {
        match self {
            PortValue::Exec => PortType::Exec,
            PortValue::Int(_) => PortType::Int,
            PortValue::Float(_) => PortType::Float,
            PortValue::Str(_) => PortType::Str,
            PortValue::Bool(_) => PortType::Bool,
            PortValue::Array(_) => PortType::Array,
        }
    }

    pub fn is_exec(&self) -> bool {
        matches!(self, PortValue::Exec)
    }

    /// Restore the zero value of the variant, keeping the tag.
    pub fn reset(&mut self) {
        *self = PortValue::new(self.port_type());
    }

    /* ───────────────────────── typed reads ───────────────────────── */

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PortValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PortValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PortValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PortValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ArrayElem]> {
        match self {
            PortValue::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn array_int(&self, idx: usize) -> Option<i64> {
        self.as_array()?.get(idx).map(|e| e.int_val)
    }

    pub fn array_str(&self, idx: usize) -> Option<&str> {
        self.as_array()?.get(idx).map(|e| e.str_val.as_str())
    }

    /// Length of an array payload; 0 for every other variant.
    pub fn array_len(&self) -> usize {
        self.as_array().map_or(0, |a| a.len())
    }

    /* ───────────────────────── typed writes ──────────────────────── */

    pub fn set_int(&mut self, v: i64) -> bool {
        match self {
            PortValue::Int(slot) => {
                *slot = v;
                true
            }
            _ => false,
        }
    }

    pub fn set_float(&mut self, v: f64) -> bool {
        match self {
            PortValue::Float(slot) => {
                *slot = v;
                true
            }
            _ => false,
        }
    }

    pub fn set_str<S: Into<String>>(&mut self, v: S) -> bool {
        match self {
            PortValue::Str(slot) => {
                *slot = v.into();
                true
            }
            _ => false,
        }
    }

    pub fn set_bool(&mut self, v: bool) -> bool {
        match self {
            PortValue::Bool(slot) => {
                *slot = v;
                true
            }
            _ => false,
        }
    }

    pub fn set_array_int(&mut self, idx: usize, v: i64) -> bool {
        match self {
            PortValue::Array(elems) => match elems.get_mut(idx) {
                Some(e) => {
                    e.int_val = v;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    pub fn set_array_str<S: Into<String>>(&mut self, idx: usize, v: S) -> bool {
        match self {
            PortValue::Array(elems) => match elems.get_mut(idx) {
                Some(e) => {
                    e.str_val = v.into();
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    pub fn push_array_int(&mut self, v: i64) -> bool {
        match self {
            PortValue::Array(elems) => {
                elems.push(ArrayElem::from_int(v));
                true
            }
            _ => false,
        }
    }

    pub fn push_array_str<S: Into<String>>(&mut self, v: S) -> bool {
        match self {
            PortValue::Array(elems) => {
                elems.push(ArrayElem::from_str(v));
                true
            }
            _ => false,
        }
    }

    /* ───────────────────────── assignment ────────────────────────── */

    /// Wire-copy from a producer's out-port into a consumer's in-port.
    ///
    /// Requires both ports to carry the same variant tag; the payload is
    /// deep-copied.
    pub fn assign_from(&mut self, other: &PortValue) -> bool {
        if self.port_type() != other.port_type() {
            return false;
        }
        *self = other.clone();
        true
    }

    /// Coerce a generic host literal into this port's declared subtype.
    ///
    /// Used for default-literal injection and caller-supplied arguments.
    /// The coercion table:
    ///
    /// | literal \ port | Int | Float | Str | Bool | Array |
    /// |---|---|---|---|---|---|
    /// | Int   | v | v as f64 | decimal | v != 0 | error |
    /// | Float | trunc | v | trunc decimal | trunc != 0 | error |
    /// | Str   | parse | parse | v | parse | error |
    /// | Bool  | error | error | error | v | error |
    /// | Array | error | error | error | error | deep copy |
    pub fn assign_literal(&mut self, lit: &Literal) -> Result<(), GraphError> {
        let mismatch = |lit: &Literal, port: &PortValue| {
            GraphError::new(GraphErrorKind::Type).with_message(format!(
                "port type is {}, but value is {lit}",
                port.port_type()
            ))
        };

        match lit {
            Literal::Int(v) => match self {
                PortValue::Int(slot) => *slot = *v,
                PortValue::Float(slot) => *slot = *v as f64,
                PortValue::Str(slot) => *slot = format!("{v}"),
                PortValue::Bool(slot) => *slot = *v != 0,
                _ => return Err(mismatch(lit, self)),
            },
            Literal::Float(v) => match self {
                PortValue::Int(slot) => *slot = *v as i64,
                PortValue::Float(slot) => *slot = *v,
                PortValue::Str(slot) => *slot = format!("{}", *v as i64),
                PortValue::Bool(slot) => *slot = (*v as i64) != 0,
                _ => return Err(mismatch(lit, self)),
            },
            Literal::Str(v) => match self {
                PortValue::Int(slot) => {
                    *slot = v.parse::<i64>().map_err(|e| {
                        GraphError::new(GraphErrorKind::Type)
                            .with_message(format!("cannot parse '{v}' as int: {e}"))
                    })?;
                }
                PortValue::Float(slot) => {
                    *slot = v.parse::<f64>().map_err(|e| {
                        GraphError::new(GraphErrorKind::Type)
                            .with_message(format!("cannot parse '{v}' as float: {e}"))
                    })?;
                }
                PortValue::Str(slot) => *slot = v.clone(),
                PortValue::Bool(slot) => {
                    *slot = v.parse::<bool>().map_err(|e| {
                        GraphError::new(GraphErrorKind::Type)
                            .with_message(format!("cannot parse '{v}' as bool: {e}"))
                    })?;
                }
                _ => return Err(mismatch(lit, self)),
            },
            Literal::Bool(v) => match self {
                PortValue::Bool(slot) => *slot = *v,
                _ => return Err(mismatch(lit, self)),
            },
            Literal::Array(elems) => match self {
                PortValue::Array(slot) => *slot = elems.clone(),
                _ => return Err(mismatch(lit, self)),
            },
        }
        Ok(())
    }
}

impl Display for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortValue::Exec => write!(f, "exec"),
            PortValue::Int(v) => write!(f, "{v}"),
            PortValue::Float(v) => write!(f, "{v}"),
            PortValue::Str(v) => write!(f, "{v}"),
            PortValue::Bool(v) => write!(f, "{v}"),
            PortValue::Array(v) => write!(f, "{v:?}"),
        }
    }
}

/// A generic host value: default literals in graph files, declared-variable
/// initial values, and caller-supplied `Do` arguments all arrive as one of
/// these.
///
/// Array literals are stored as [`ArrayElem`] pairs so a port array survives
/// a round trip through a timer event without losing either slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Array(Vec<ArrayElem>),
}

impl Literal {
    /// The int slots of an array literal, if this is one.
    pub fn as_int_array(&self) -> Option<Vec<i64>> {
        match self {
            Literal::Array(elems) => Some(elems.iter().map(|e| e.int_val).collect()),
            _ => None,
        }
    }

    /// The string slots of an array literal, if this is one.
    pub fn as_str_array(&self) -> Option<Vec<String>> {
        match self {
            Literal::Array(elems) => Some(elems.iter().map(|e| e.str_val.clone()).collect()),
            _ => None,
        }
    }

    pub fn int_array<I: IntoIterator<Item = i64>>(vals: I) -> Literal {
        Literal::Array(vals.into_iter().map(ArrayElem::from_int).collect())
    }

    pub fn str_array<I, S>(vals: I) -> Literal
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Literal::Array(vals.into_iter().map(ArrayElem::from_str).collect())
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::Str(v.to_string())
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<Vec<ArrayElem>> for Literal {
    fn from(v: Vec<ArrayElem>) -> Self {
        Literal::Array(v)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Str(v) => write!(f, "{v}"),
            Literal::Bool(v) => write!(f, "{v}"),
            Literal::Array(v) => write!(f, "{v:?}"),
        }
    }
}

/// Decode order is load-bearing: integers must be tried before floats so
/// `7` lands in `Int(7)`, and array elements accept ints and strings only.
#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Literal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LiteralVisitor;

        impl<'de> Visitor<'de> for LiteralVisitor {
            type Value = Literal;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an int, float, string, bool, or array of ints/strings")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Literal, E> {
                Ok(Literal::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Literal, E> {
                i64::try_from(v)
                    .map(Literal::Int)
                    .map_err(|_| E::custom(format!("integer {v} overflows i64")))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Literal, E> {
                Ok(Literal::Float(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Literal, E> {
                Ok(Literal::Str(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Literal, E> {
                Ok(Literal::Str(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Literal, E> {
                Ok(Literal::Bool(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Literal, A::Error> {
                let mut elems = Vec::new();
                while let Some(item) = seq.next_element::<Literal>()? {
                    match item {
                        Literal::Int(v) => elems.push(ArrayElem::from_int(v)),
                        Literal::Float(v) => elems.push(ArrayElem::from_int(v as i64)),
                        Literal::Str(v) => elems.push(ArrayElem::from_str(v)),
                        other => {
                            return Err(de::Error::custom(format!(
                                "unsupported array element: {other}"
                            )));
                        }
                    }
                }
                Ok(Literal::Array(elems))
            }
        }

        deserializer.deserialize_any(LiteralVisitor)
    }
}

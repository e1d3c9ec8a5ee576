use std::collections::BTreeMap;
use std::fmt;

use chrono::Local;

/// The value of a document variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    /// Interpret the right-hand side of a `!var`/`!const` directive.
    /// Only boolean literals are coerced; everything else stays a string.
    pub fn parse(raw: &str) -> Value {
        match raw {
            "true" | "TRUE" => Value::Boolean(true),
            "false" | "FALSE" => Value::Boolean(false),
            _ => Value::String(raw.to_string()),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Number(_) => ValueKind::Number,
            Value::Boolean(_) => ValueKind::Boolean,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.is_finite() && *n == n.floor() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariableError {
    /// A mutable assignment uses the name of a constant.
    ConstantCollision(String),
    ConstantAlreadySet { name: String, kind: ValueKind },
    TypeMismatch {
        name: String,
        expected: ValueKind,
        found: ValueKind,
    },
}

impl fmt::Display for VariableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableError::ConstantCollision(name) => write!(
                f,
                "cannot declare a variable with the name of the constant {}",
                name
            ),
            VariableError::ConstantAlreadySet { name, kind } => write!(
                f,
                "cannot set the already set constant {} of type {}",
                name, kind
            ),
            VariableError::TypeMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "type error: {} holds a {}, got a {}",
                name, expected, found
            ),
        }
    }
}

impl std::error::Error for VariableError {}

/// Result of looking up a variable in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableLookup {
    Found(Value),
    /// Declared (predefined) but never assigned.
    Unset,
    NotFound,
}

#[derive(Debug, Clone)]
enum Slot {
    Unset,
    Set(Value),
    Computed(fn(&VariableStore) -> Value),
}

#[derive(Debug, Clone)]
struct Variable {
    kind: ValueKind,
    slot: Slot,
    constant: bool,
}

/// Named, typed variables and constants of one document.
///
/// A fresh store holds the predefined entries every document can use.
#[derive(Debug, Clone)]
pub struct VariableStore {
    variables: BTreeMap<String, Variable>,
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore {
    pub fn new() -> Self {
        let mut store = VariableStore {
            variables: BTreeMap::new(),
        };
        for name in ["TITLE", "ICON", "LANG", "ENCODING", "BODY_ID", "BODY_CLASS"] {
            store.declare(name, ValueKind::String, Slot::Unset, true);
        }
        store.declare(
            "VERSION",
            ValueKind::String,
            Slot::Set(Value::String(format!("Hamill {}", env!("CARGO_PKG_VERSION")))),
            true,
        );
        store.declare("NOW", ValueKind::String, Slot::Computed(now), true);
        for name in ["PARAGRAPH_DEFINITION", "EXPORT_COMMENT"] {
            store.declare(name, ValueKind::Boolean, Slot::Set(Value::Boolean(false)), false);
        }
        for name in [
            "DEFAULT_CODE",
            "DEFAULT_TABLE_CLASS",
            "DEFAULT_PARAGRAPH_CLASS",
            "DEFAULT_FIND_IMAGE",
            "NEXT_TABLE_CLASS",
            "NEXT_TABLE_ID",
            "NEXT_CODE_CLASS",
            "NEXT_CODE_ID",
        ] {
            store.declare(name, ValueKind::String, Slot::Unset, false);
        }
        store
    }

    fn declare(&mut self, name: &str, kind: ValueKind, slot: Slot, constant: bool) {
        self.variables
            .insert(name.to_string(), Variable { kind, slot, constant });
    }

    /// Assign `value` to `name`, creating the entry when it does not exist.
    ///
    /// `constant` marks the assignment as coming from a constant declaration.
    /// Such an assignment on an existing mutable variable only changes its value.
    pub fn set(&mut self, name: &str, value: Value, constant: bool) -> Result<(), VariableError> {
        let Some(var) = self.variables.get_mut(name) else {
            self.declare(name, value.kind(), Slot::Set(value), constant);
            return Ok(());
        };

        if var.constant {
            if !constant {
                return Err(VariableError::ConstantCollision(name.to_string()));
            }
            if !matches!(var.slot, Slot::Unset) {
                return Err(VariableError::ConstantAlreadySet {
                    name: name.to_string(),
                    kind: var.kind,
                });
            }
        }

        let value = match (var.kind, value) {
            (ValueKind::String, Value::String(s)) => Value::String(s),
            (ValueKind::String, other) => Value::String(other.to_string()),
            (expected, value) if value.kind() == expected => value,
            (expected, value) => {
                return Err(VariableError::TypeMismatch {
                    name: name.to_string(),
                    expected,
                    found: value.kind(),
                });
            }
        };
        var.slot = Slot::Set(value);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> VariableLookup {
        match self.variables.get(name).map(|v| &v.slot) {
            None => VariableLookup::NotFound,
            Some(Slot::Unset) => VariableLookup::Unset,
            Some(Slot::Set(value)) => VariableLookup::Found(value.clone()),
            Some(Slot::Computed(compute)) => VariableLookup::Found(compute(self)),
        }
    }

    /// The value of `name` if it exists and is set.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.lookup(name) {
            VariableLookup::Found(value) => Some(value),
            _ => None,
        }
    }

    /// The value of `name` as a non-empty string, if set.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|v| v.to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn is_set_true(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| v.is_truthy())
    }

    /// Read a one-shot hint and clear it. Constants are read but never cleared.
    pub fn take_string(&mut self, name: &str) -> Option<String> {
        let value = self.get_string(name);
        if let Some(var) = self.variables.get_mut(name) {
            if !var.constant {
                var.slot = Slot::Unset;
            }
        }
        value
    }

    pub fn is_constant(&self, name: &str) -> bool {
        self.variables.get(name).is_some_and(|v| v.constant)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}

const ENGLISH_TO_FRENCH: &[(&str, &str)] = &[
    ("monday", "lundi"),
    ("tuesday", "mardi"),
    ("wednesday", "mercredi"),
    ("thursday", "jeudi"),
    ("friday", "vendredi"),
    ("saturday", "samedi"),
    ("sunday", "dimanche"),
    ("january", "janvier"),
    ("february", "février"),
    ("march", "mars"),
    ("april", "avril"),
    ("may", "mai"),
    ("june", "juin"),
    ("july", "juillet"),
    ("august", "août"),
    ("september", "septembre"),
    ("october", "octobre"),
    ("november", "novembre"),
    ("december", "décembre"),
];

fn now(store: &VariableStore) -> Value {
    let date = Local::now().format("%A %d %B %Y").to_string().to_lowercase();
    let is_french = store.get_string("LANG").is_some_and(|lang| lang == "fr");
    Value::String(if is_french { localize_fr(&date) } else { date })
}

fn localize_fr(date: &str) -> String {
    date.split(' ')
        .map(|word| {
            ENGLISH_TO_FRENCH
                .iter()
                .find(|(en, _)| *en == word)
                .map_or(word, |(_, fr)| *fr)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_can_be_set_once() {
        let mut store = VariableStore::new();
        store.set("TITLE", Value::parse("Home"), true).unwrap();
        assert_eq!(store.get_string("TITLE").as_deref(), Some("Home"));

        let err = store.set("TITLE", Value::parse("Away"), true).unwrap_err();
        assert_eq!(
            err,
            VariableError::ConstantAlreadySet {
                name: "TITLE".into(),
                kind: ValueKind::String
            }
        );
    }

    #[test]
    fn variable_cannot_shadow_constant() {
        let mut store = VariableStore::new();
        let err = store.set("VERSION", Value::parse("x"), false).unwrap_err();
        assert_eq!(err, VariableError::ConstantCollision("VERSION".into()));
    }

    #[test]
    fn boolean_slots_reject_strings() {
        let mut store = VariableStore::new();
        store
            .set("EXPORT_COMMENT", Value::parse("TRUE"), false)
            .unwrap();
        assert!(store.is_set_true("EXPORT_COMMENT"));
        assert!(matches!(
            store.set("EXPORT_COMMENT", Value::parse("yes"), false),
            Err(VariableError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn string_slots_accept_any_value() {
        let mut store = VariableStore::new();
        store.set("NEXT_TABLE_ID", Value::Number(3.0), false).unwrap();
        assert_eq!(store.take_string("NEXT_TABLE_ID").as_deref(), Some("3"));
        assert_eq!(store.take_string("NEXT_TABLE_ID"), None);
    }

    #[test]
    fn const_on_mutable_variable_keeps_it_mutable() {
        let mut store = VariableStore::new();
        store
            .set("NEXT_CODE_CLASS", Value::parse("cls"), true)
            .unwrap();
        assert!(!store.is_constant("NEXT_CODE_CLASS"));
        store
            .set("NEXT_CODE_CLASS", Value::parse("other"), false)
            .unwrap();
    }

    #[test]
    fn lookup_distinguishes_unset_from_unknown() {
        let store = VariableStore::new();
        assert_eq!(store.lookup("ICON"), VariableLookup::Unset);
        assert_eq!(store.lookup("NOPE"), VariableLookup::NotFound);
        assert!(matches!(store.lookup("NOW"), VariableLookup::Found(_)));
    }

    #[test]
    fn french_dates() {
        assert_eq!(
            localize_fr("monday 05 october 2026"),
            "lundi 05 octobre 2026"
        );
    }

    #[test]
    fn integral_numbers_display_without_fraction() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
    }
}

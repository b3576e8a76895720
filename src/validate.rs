// Declarative validation of record attributes
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use lazy_static::lazy_static;
use regex::Regex;

use crate::datatype::Value;
use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Check {
    Required,
    /// Character count bounds, inclusive.
    Length { min: usize, max: usize },
    Pattern(&'static str),
    Range { min: f64, max: f64 },
    OneOf(&'static [&'static str]),
}

impl Check {
    pub fn identifier(&self) -> &'static str {
        match self {
            Check::Required => "required",
            Check::Length { .. } => "length",
            Check::Pattern(_) => "pattern",
            Check::Range { .. } => "range",
            Check::OneOf(_) => "one_of",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub field: &'static str,
    pub check: Check,
}

impl Rule {
    pub const fn new(field: &'static str, check: Check) -> Self {
        Self { field, check }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub rule: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({}): {}", self.field, self.rule, self.message)
    }
}

/// Evaluates every rule of `R` against the record's current attributes.
pub fn validate<R: Record>(record: &R) -> Vec<Violation> {
    let mut violations = Vec::new();
    for rule in R::rules() {
        let value = match R::attribute(rule.field) {
            Some(attribute) => (attribute.get)(record),
            None => Value::Null,
        };
        if let Some(message) = evaluate(&rule.check, &value) {
            violations.push(Violation {
                field: rule.field.to_string(),
                rule: rule.check.identifier().to_string(),
                message,
            });
        }
    }
    violations
}

lazy_static! {
    // rule patterns are static, so each one is compiled once
    static ref PATTERNS: Mutex<HashMap<&'static str, Regex>> = Mutex::new(HashMap::new());
}

fn pattern_matches(pattern: &'static str, text: &str) -> Result<bool, regex::Error> {
    // a poisoned cache still holds valid regexes
    let mut patterns = PATTERNS.lock().unwrap_or_else(|e| e.into_inner());
    let regex = match patterns.entry(pattern) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => entry.insert(Regex::new(pattern)?),
    };
    Ok(regex.is_match(text))
}

// None when the value passes
fn evaluate(check: &Check, value: &Value) -> Option<String> {
    if let Check::Required = check {
        return match value {
            Value::Null => Some("must be present".to_string()),
            Value::Text(s) if s.trim().is_empty() => Some("must not be blank".to_string()),
            _ => None,
        };
    }
    if value.is_null() {
        return None;
    }
    match check {
        Check::Required => None,
        Check::Length { min, max } => {
            let length = value.to_string().chars().count();
            if length < *min || length > *max {
                Some(format!("length must be between {} and {}, was {}", min, max, length))
            } else {
                None
            }
        }
        Check::Pattern(pattern) => match pattern_matches(*pattern, &value.to_string()) {
            Ok(true) => None,
            Ok(false) => Some(format!("must match {}", pattern)),
            Err(e) => Some(format!("pattern {} cannot be compiled: {}", pattern, e)),
        },
        Check::Range { min, max } => match value.as_real() {
            Some(n) if n >= *min && n <= *max => None,
            Some(n) => Some(format!("must be between {} and {}, was {}", min, max, n)),
            None => Some("must be numeric".to_string()),
        },
        Check::OneOf(allowed) => {
            let text = value.to_string();
            if allowed.contains(&text.as_str()) {
                None
            } else {
                Some(format!("must be one of {}", allowed.join(", ")))
            }
        }
    }
}

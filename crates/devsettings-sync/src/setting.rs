//! Setting descriptors
//!
//! A setting is declared once, statically, as a [`SettingDescriptor`]: its key,
//! the category it is listed under, the domain of values it accepts, how to tell
//! whether the hardware behind it exists, and where its value is pushed.

use crate::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A concrete setting value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Choice(String),
}

impl SettingValue {
    /// Payload written to the hardware sink
    pub fn payload(&self) -> String {
        match self {
            SettingValue::Bool(true) => "1".to_string(),
            SettingValue::Bool(false) => "0".to_string(),
            SettingValue::Int(n) => n.to_string(),
            SettingValue::Choice(s) => s.clone(),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Int(n) => write!(f, "{}", n),
            SettingValue::Choice(s) => f.write_str(s),
        }
    }
}

/// Values a setting accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ValueDomain {
    /// Checkbox, pushed as "0"/"1"
    Boolean { default: bool },
    /// Enumerated string list
    Choice { options: Vec<String>, default: String },
    /// Integer-as-string within an inclusive range
    Integer { min: i64, max: i64, default: i64 },
}

impl ValueDomain {
    pub fn boolean(default: bool) -> Self {
        ValueDomain::Boolean { default }
    }

    /// Build a choice domain. The default must be one of the options.
    pub fn choice<I, S>(options: I, default: &str) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        if options.is_empty() {
            return Err(SyncError::InvalidDomain("choice has no options".to_string()));
        }
        if !options.iter().any(|o| o == default) {
            return Err(SyncError::InvalidDomain(format!(
                "default '{}' is not one of {:?}",
                default, options
            )));
        }
        Ok(ValueDomain::Choice {
            options,
            default: default.to_string(),
        })
    }

    /// Build an integer domain. The default must lie in `min..=max`.
    pub fn integer(min: i64, max: i64, default: i64) -> Result<Self, SyncError> {
        if min > max {
            return Err(SyncError::InvalidDomain(format!(
                "empty range {}..={}",
                min, max
            )));
        }
        if !(min..=max).contains(&default) {
            return Err(SyncError::InvalidDomain(format!(
                "default {} outside {}..={}",
                default, min, max
            )));
        }
        Ok(ValueDomain::Integer { min, max, default })
    }

    /// Short name of the domain kind
    pub fn kind(&self) -> &'static str {
        match self {
            ValueDomain::Boolean { .. } => "bool",
            ValueDomain::Choice { .. } => "choice",
            ValueDomain::Integer { .. } => "integer",
        }
    }

    pub fn default_value(&self) -> SettingValue {
        match self {
            ValueDomain::Boolean { default } => SettingValue::Bool(*default),
            ValueDomain::Choice { default, .. } => SettingValue::Choice(default.clone()),
            ValueDomain::Integer { default, .. } => SettingValue::Int(*default),
        }
    }

    /// Strict membership: the value has this domain's type and is in range
    pub fn contains(&self, value: &SettingValue) -> bool {
        match (self, value) {
            (ValueDomain::Boolean { .. }, SettingValue::Bool(_)) => true,
            (ValueDomain::Choice { options, .. }, SettingValue::Choice(s)) => {
                options.iter().any(|o| o == s)
            }
            (ValueDomain::Integer { min, max, .. }, SettingValue::Int(n)) => {
                (*min..=*max).contains(n)
            }
            _ => false,
        }
    }

    /// Convert a loosely-typed value (for example a hand-edited store entry)
    /// into this domain, if it denotes an in-domain value.
    pub fn coerce(&self, value: &SettingValue) -> Option<SettingValue> {
        if self.contains(value) {
            return Some(value.clone());
        }
        match value {
            SettingValue::Choice(s) => self.parse(s),
            SettingValue::Int(n) => self.parse(&n.to_string()),
            SettingValue::Bool(_) => None,
        }
    }

    /// Parse user input into an in-domain value
    pub fn parse(&self, raw: &str) -> Option<SettingValue> {
        let raw = raw.trim();
        match self {
            ValueDomain::Boolean { .. } => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Some(SettingValue::Bool(true)),
                "0" | "false" | "off" | "no" => Some(SettingValue::Bool(false)),
                _ => None,
            },
            ValueDomain::Choice { options, .. } => options
                .iter()
                .find(|o| o.as_str() == raw)
                .map(|o| SettingValue::Choice(o.clone())),
            ValueDomain::Integer { min, max, .. } => raw
                .parse::<i64>()
                .ok()
                .filter(|n| (*min..=*max).contains(n))
                .map(SettingValue::Int),
        }
    }

    /// Value to use given what the store holds: the stored value when it is
    /// in-domain, the default otherwise.
    pub fn resolve(&self, stored: Option<SettingValue>) -> SettingValue {
        stored
            .and_then(|v| self.coerce(&v))
            .unwrap_or_else(|| self.default_value())
    }
}

/// Runtime check for hardware feature presence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "check", content = "path", rename_all = "snake_case")]
pub enum Support {
    Always,
    Never,
    PathExists(PathBuf),
    Writable(PathBuf),
}

/// Destination receiving a setting's value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkTarget {
    /// Writable sysfs/driver control file
    ControlFile { path: PathBuf },
    /// System-wide broadcast carrying the payload as a string extra
    Broadcast { action: String, extra: String },
}

impl fmt::Display for SinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkTarget::ControlFile { path } => write!(f, "{}", path.display()),
            SinkTarget::Broadcast { action, extra } => write!(f, "{} [{}]", action, extra),
        }
    }
}

/// Group of settings shown together
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub key: String,
    pub title: String,
}

impl Category {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
        }
    }
}

/// Static declaration of one hardware setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingDescriptor {
    pub id: String,
    pub category: String,
    pub title: String,
    pub domain: ValueDomain,
    pub support: Support,
    pub sink: SinkTarget,
}

impl SettingDescriptor {
    /// Setting backed by a control file. Supported when the file is writable.
    pub fn control_file(
        id: impl Into<String>,
        category: impl Into<String>,
        title: impl Into<String>,
        domain: ValueDomain,
        path: impl Into<PathBuf>,
    ) -> Self {
        let path = path.into();
        Self {
            id: id.into(),
            category: category.into(),
            title: title.into(),
            domain,
            support: Support::Writable(path.clone()),
            sink: SinkTarget::ControlFile { path },
        }
    }

    /// Setting backed by a system broadcast. Always supported.
    pub fn broadcast(
        id: impl Into<String>,
        category: impl Into<String>,
        title: impl Into<String>,
        domain: ValueDomain,
        action: impl Into<String>,
        extra: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            title: title.into(),
            domain,
            support: Support::Always,
            sink: SinkTarget::Broadcast {
                action: action.into(),
                extra: extra.into(),
            },
        }
    }

    pub fn with_support(mut self, support: Support) -> Self {
        self.support = support;
        self
    }

    /// Point a control-file setting at another path. The writability check
    /// follows the new path unless the support predicate was customised.
    pub fn with_control_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let SinkTarget::ControlFile { path: old } = &self.sink {
            if self.support == Support::Writable(old.clone()) {
                self.support = Support::Writable(path.clone());
            }
        }
        self.sink = SinkTarget::ControlFile { path };
        self
    }

    pub fn with_domain(mut self, domain: ValueDomain) -> Self {
        self.domain = domain;
        self
    }

    /// Control file path, if this setting writes to one
    pub fn control_path(&self) -> Option<&Path> {
        match &self.sink {
            SinkTarget::ControlFile { path } => Some(path),
            SinkTarget::Broadcast { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_payload() {
        assert_eq!(SettingValue::Bool(true).payload(), "1");
        assert_eq!(SettingValue::Bool(false).payload(), "0");
        assert_eq!(SettingValue::Int(42).payload(), "42");
        assert_eq!(SettingValue::Choice("2".into()).payload(), "2");
    }

    #[test]
    fn test_choice_default_must_be_option() {
        assert!(ValueDomain::choice(["0", "1"], "1").is_ok());
        assert!(ValueDomain::choice(["0", "1"], "3").is_err());
        assert!(ValueDomain::choice(Vec::<String>::new(), "0").is_err());
    }

    #[test]
    fn test_integer_default_in_range() {
        assert!(ValueDomain::integer(0, 100, 50).is_ok());
        assert!(ValueDomain::integer(0, 100, 101).is_err());
        assert!(ValueDomain::integer(10, 0, 5).is_err());
    }

    #[test]
    fn test_contains_is_type_strict() {
        let domain = ValueDomain::integer(0, 100, 50).unwrap();
        assert!(domain.contains(&SettingValue::Int(0)));
        assert!(!domain.contains(&SettingValue::Int(101)));
        assert!(!domain.contains(&SettingValue::Choice("50".into())));
        assert!(!domain.contains(&SettingValue::Bool(true)));
    }

    #[test]
    fn test_parse_boolean_spellings() {
        let domain = ValueDomain::boolean(false);
        for raw in ["1", "true", "ON", " yes "] {
            assert_eq!(domain.parse(raw), Some(SettingValue::Bool(true)), "{raw}");
        }
        for raw in ["0", "False", "off", "no"] {
            assert_eq!(domain.parse(raw), Some(SettingValue::Bool(false)), "{raw}");
        }
        assert_eq!(domain.parse("maybe"), None);
    }

    #[test]
    fn test_parse_choice_and_integer() {
        let choice = ValueDomain::choice(["30", "40", "50"], "50").unwrap();
        assert_eq!(choice.parse("40"), Some(SettingValue::Choice("40".into())));
        assert_eq!(choice.parse("45"), None);

        let int = ValueDomain::integer(0, 100, 50).unwrap();
        assert_eq!(int.parse("75"), Some(SettingValue::Int(75)));
        assert_eq!(int.parse("-1"), None);
        assert_eq!(int.parse("abc"), None);
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let choice = ValueDomain::choice(["0", "1", "2"], "1").unwrap();
        assert_eq!(choice.resolve(None), SettingValue::Choice("1".into()));
        assert_eq!(
            choice.resolve(Some(SettingValue::Choice("9".into()))),
            SettingValue::Choice("1".into())
        );
        // Integers written by hand into the store still map onto options
        assert_eq!(
            choice.resolve(Some(SettingValue::Int(2))),
            SettingValue::Choice("2".into())
        );
        assert_eq!(
            choice.resolve(Some(SettingValue::Bool(true))),
            SettingValue::Choice("1".into())
        );
    }

    #[test]
    fn test_with_control_path_moves_support_check() {
        let desc = SettingDescriptor::control_file(
            "mdnie_negative",
            "category_screen",
            "Negative",
            ValueDomain::boolean(false),
            "/sys/a",
        )
        .with_control_path("/sys/b");
        assert_eq!(desc.support, Support::Writable(PathBuf::from("/sys/b")));
        assert_eq!(desc.control_path(), Some(Path::new("/sys/b")));

        let pinned = SettingDescriptor::control_file(
            "x",
            "c",
            "X",
            ValueDomain::boolean(false),
            "/sys/a",
        )
        .with_support(Support::Always)
        .with_control_path("/sys/b");
        assert_eq!(pinned.support, Support::Always);
    }
}

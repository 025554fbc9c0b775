//! Validation of keys used through the attribute facade.

use std::fmt;

/// Returns `true` if `key` matches `^[a-zA-Z_$][a-zA-Z_$0-9]*$`, i.e. if it
/// could be spelled as an attribute name.
pub fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Why a key cannot be used as an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WarningReason {
    /// The key does not match the identifier pattern.
    InvalidIdentifier,
    /// The key is the name of a method of the map.
    ReservedName,
}

impl fmt::Display for WarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningReason::InvalidIdentifier => f.write_str("invalid variable name"),
            WarningReason::ReservedName => f.write_str("a method with the same name exists"),
        }
    }
}

/// A key was stored, but it is reachable only by index, not as an attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyWarning {
    key: String,
    reason: WarningReason,
}

impl KeyWarning {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn reason(&self) -> WarningReason {
        self.reason
    }
}

impl fmt::Display for KeyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' cannot be used as an attribute ({}); it can still be accessed by index",
            self.key, self.reason,
        )
    }
}

/// Checks `key` against the identifier pattern and the `reserved` names.
///
/// A reserved-name collision takes precedence over a syntax failure, so at
/// most one warning is produced per key.
pub(crate) fn check(key: &str, reserved: &[&str]) -> Option<KeyWarning> {
    let reason = if reserved.contains(&key) {
        WarningReason::ReservedName
    } else if !is_identifier(key) {
        WarningReason::InvalidIdentifier
    } else {
        return None;
    };
    Some(KeyWarning {
        key: key.to_owned(),
        reason,
    })
}

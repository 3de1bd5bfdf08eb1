//! Naming rules for migration files and identifiers

use once_cell::sync::Lazy;
use regex::Regex;

/// Migration file names: `{version}_{snake_name}.yaml` (or `.yml`)
pub static FILE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<version>\d{14}|\d{20})_(?P<name>[A-Za-z_]+)\.ya?ml$")
        .expect("file pattern is a valid regex")
});

/// Identifiers accepted as a migration name on the command line
pub static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z]+(_?[a-zA-Z])*$").expect("name pattern is a valid regex")
});

/// Identifiers accepted as a migration version on the command line
pub static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{14}|\d{20})$").expect("version pattern is a valid regex"));

/// Width of generated version tokens
pub const VERSION_WIDTH: usize = 20;

pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let mut previous_lower = false;

    for c in s.chars() {
        if c == '_' || c == '-' || c == ' ' {
            if !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
            previous_lower = false;
            continue;
        }

        if c.is_uppercase() && previous_lower {
            result.push('_');
        }

        previous_lower = c.is_lowercase() || c.is_ascii_digit();
        result.extend(c.to_lowercase());
    }

    result.trim_end_matches('_').to_string()
}

pub fn to_pascal_case(s: &str) -> String {
    s.split(|c| c == '_' || c == '-' || c == ' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}

/// `{version}_{snake_case(name)}.yaml`
pub fn file_name(version: &str, name: &str) -> String {
    format!("{}_{}.yaml", version, to_snake_case(name))
}

/// Split a file name into the version and PascalCase name it implies.
///
/// The version is everything before the first `_`; the name is the rest,
/// with its extension stripped.
pub fn parts_from_file_name(file_name: &str) -> (String, String) {
    match file_name.split_once('_') {
        Some((version, rest)) => {
            let stem = rest.split('.').next().unwrap_or_default();
            (version.to_string(), to_pascal_case(stem))
        }
        None => (file_name.to_string(), String::new()),
    }
}

/// Case- and format-insensitive comparison used for name collisions
pub fn same_name(left: &str, right: &str) -> bool {
    to_snake_case(left) == to_snake_case(right)
}

/// How a user-supplied identifier should be matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Name(String),
    Version(String),
}

impl Identifier {
    /// Names are normalised to PascalCase. Anything that is neither a
    /// name nor a version token is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        if VERSION_PATTERN.is_match(value) {
            Some(Identifier::Version(value.to_string()))
        } else if NAME_PATTERN.is_match(value) {
            Some(Identifier::Name(to_pascal_case(value)))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Name(value) | Identifier::Version(value) => value,
        }
    }
}

//! Canonical type names.
//!
//! Both sides of a signature match (manifest parameters and the identity
//! reported by the instrumentation mechanism) go through `canonical_type_name`,
//! so primitive and boxed spellings of the same type compare equal.

use crate::error::{HookError, Result};
use regex::Regex;
use std::sync::LazyLock;

static TYPE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][\w$]*(\.[A-Za-z_$][\w$]*)*$").expect("type name pattern compiles")
});

const ARRAY_SUFFIX: &str = "[]";

/// Map a primitive, boxed or foreign spelling to the canonical primitive name.
fn primitive_alias(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "boolean" | "bool" | "Boolean" | "java.lang.Boolean" => "boolean",
        "byte" | "i8" | "Byte" | "java.lang.Byte" => "byte",
        "short" | "i16" | "Short" | "java.lang.Short" => "short",
        "char" | "Character" | "java.lang.Character" => "char",
        "int" | "i32" | "Integer" | "java.lang.Integer" => "int",
        "long" | "i64" | "Long" | "java.lang.Long" => "long",
        "float" | "f32" | "Float" | "java.lang.Float" => "float",
        "double" | "f64" | "Double" | "java.lang.Double" => "double",
        "void" | "Void" | "java.lang.Void" => "void",
        _ => return None,
    };
    Some(canonical)
}

/// Whether `name` is one of the canonical primitive names.
pub fn is_primitive(name: &str) -> bool {
    primitive_alias(name) == Some(name)
}

/// Normalize a type name to its canonical form.
///
/// Whitespace is trimmed, array suffixes are kept after normalizing the
/// element type, and primitive aliases collapse to one spelling.
///
/// # Examples
///
/// ```
/// use hookscope::signature::canonical_type_name;
///
/// assert_eq!(canonical_type_name("java.lang.Integer").unwrap(), "int");
/// assert_eq!(canonical_type_name(" i64[] ").unwrap(), "long[]");
/// assert_eq!(canonical_type_name("com.example.Request").unwrap(), "com.example.Request");
/// assert!(canonical_type_name("not a type").is_err());
/// ```
pub fn canonical_type_name(raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    let mut element = trimmed;
    let mut dimensions = 0;
    while let Some(stripped) = element.strip_suffix(ARRAY_SUFFIX) {
        element = stripped.trim_end();
        dimensions += 1;
    }

    let element = match primitive_alias(element) {
        Some(primitive) => primitive,
        None if TYPE_NAME.is_match(element) => element,
        None => {
            return Err(HookError::Manifest(format!("invalid type name '{}'", raw)));
        }
    };

    let mut canonical = String::with_capacity(element.len() + dimensions * ARRAY_SUFFIX.len());
    canonical.push_str(element);
    for _ in 0..dimensions {
        canonical.push_str(ARRAY_SUFFIX);
    }
    Ok(canonical)
}

/// Canonicalize every name in order.
pub fn canonical_type_names<S: AsRef<str>>(raw: &[S]) -> Result<Vec<String>> {
    raw.iter().map(|t| canonical_type_name(t.as_ref())).collect()
}

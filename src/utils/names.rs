//! Library identifier validation

use crate::error::{Result, TpkmError};

const MAX_NAME_LEN: usize = 214;

fn is_separator(c: char) -> bool {
    matches!(c, '-' | '_' | '.')
}

/// Validate a registry library name: lowercase alphanumerics with internal
/// `-`, `_`, `.` separators, no leading or trailing separator, at most 214
/// characters
pub fn validate_library_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TpkmError::Validation("library name is empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(TpkmError::Validation(format!(
            "library name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    for c in name.chars() {
        let valid = c.is_ascii_lowercase() || c.is_ascii_digit() || is_separator(c);
        if !valid {
            return Err(TpkmError::Validation(format!(
                "library name {name:?} contains invalid character {c:?} \
                 (lowercase letters, digits, '-', '_', '.' only)"
            )));
        }
    }
    let first = name.chars().next().unwrap();
    let last = name.chars().last().unwrap();
    if is_separator(first) || is_separator(last) {
        return Err(TpkmError::Validation(format!(
            "library name {name:?} must not start or end with a separator"
        )));
    }
    Ok(())
}

/// Split a `<name>` or `<name>@<version>` CLI argument
pub fn parse_library_spec(spec: &str) -> Result<(String, Option<String>)> {
    let (name, version) = match spec.split_once('@') {
        Some((n, v)) => (n, Some(v.to_string())),
        None => (spec, None),
    };
    validate_library_name(name)?;
    if let Some(v) = &version {
        if v.is_empty() {
            return Err(TpkmError::Validation(format!(
                "empty version in {spec:?}"
            )));
        }
    }
    Ok((name.to_string(), version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_names() {
        for name in ["foo", "my-lib", "my_lib.core", "a", "lib2", "a.b-c_d"] {
            assert!(validate_library_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_bad_names() {
        for name in ["", "Foo", "foo bar", "-foo", "foo-", ".foo", "foo.", "fo/o", "fóo"] {
            assert!(validate_library_name(name).is_err(), "{name:?}");
        }
        let long = "a".repeat(215);
        assert!(validate_library_name(&long).is_err());
    }

    #[test]
    fn splits_name_and_version() {
        assert_eq!(
            parse_library_spec("foo@1.2.3").unwrap(),
            ("foo".to_string(), Some("1.2.3".to_string()))
        );
        assert_eq!(parse_library_spec("foo").unwrap(), ("foo".to_string(), None));
        assert!(parse_library_spec("foo@").is_err());
        assert!(parse_library_spec("Foo@1.0.0").is_err());
    }
}

//! node/pointer — разбор JSON Pointer (RFC 6901) в последовательность ключей.

use crate::error::{CacheError, Result};

use super::Key;

/// Split "/a/0/b~1c" into ["a", "0", "b/c"]. The empty pointer is the root.
/// Tokens stay fields; numeric tokens address sequence elements on lookup.
pub fn parse_pointer(pointer: &str) -> Result<Vec<Key>> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let rest = pointer.strip_prefix('/').ok_or_else(|| {
        CacheError::Config(format!("json pointer must start with '/': {pointer:?}"))
    })?;
    Ok(rest
        .split('/')
        .map(|tok| Key::Field(tok.replace("~1", "/").replace("~0", "~")))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_pointer_is_empty() {
        assert!(parse_pointer("").unwrap().is_empty());
    }

    #[test]
    fn escapes_are_decoded_in_order() {
        let keys = parse_pointer("/a~1b/~01/0").unwrap();
        assert_eq!(
            keys,
            vec![
                Key::Field("a/b".into()),
                Key::Field("~1".into()),
                Key::Field("0".into())
            ]
        );
    }

    #[test]
    fn missing_leading_slash_is_an_error() {
        assert!(parse_pointer("a/b").is_err());
    }
}

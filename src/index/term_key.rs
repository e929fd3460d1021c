/// Canonical term key: `indexName:field:term`. The first colon separates the
/// index name; everything after it is the field-scoped term, which itself
/// contains a `field:value` separator the caller is responsible for.
///
/// The synthetic field `_all` mirrors every term for cross-field queries, so
/// `all_key(index, term)` builds `indexName:_all:term`.
pub fn term_key(index_name: &str, field_term: &str) -> String {
    format!("{index_name}:{field_term}")
}

pub fn field_term(field: &str, term: &str) -> String {
    format!("{field}:{term}")
}

pub fn all_term_key(index_name: &str, term: &str) -> String {
    term_key(index_name, &field_term("_all", term))
}

/// Splits a canonical key back into `(indexName, field, term)`. Returns `None`
/// if the key does not have at least two colon-separated segments.
pub fn parse_term_key(key: &str) -> Option<(&str, &str, &str)> {
    let (index_name, rest) = key.split_once(':')?;
    let (field, term) = rest.split_once(':')?;
    Some((index_name, field, term))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_parses_canonical_key() {
        let key = term_key("articles", &field_term("title", "fox"));
        assert_eq!(key, "articles:title:fox");
        assert_eq!(parse_term_key(&key), Some(("articles", "title", "fox")));
    }

    #[test]
    fn all_term_key_uses_synthetic_field() {
        assert_eq!(all_term_key("articles", "fox"), "articles:_all:fox");
    }

    #[test]
    fn term_itself_may_contain_colons() {
        let key = "articles:price:10:99";
        assert_eq!(parse_term_key(key), Some(("articles", "price", "10:99")));
    }
}

//! OSGi header clause syntax:
//! `name1;name2;attr=value;dir:=value, name3;attr="quoted,value"`.

use std::fmt;

use crate::manifest::ManifestError;

/// One comma separated element of a header value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Clause {
    pub names: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub directives: Vec<(String, String)>,
}

impl Clause {
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or("")
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        lookup(&self.attributes, key)
    }

    pub fn directive(&self, key: &str) -> Option<&str> {
        lookup(&self.directives, key)
    }

    /// Replace (or append) an attribute value.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key.to_owned(), value)),
        }
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names.join(";"))?;
        for (key, value) in &self.attributes {
            write!(f, ";{key}={}", quote(value))?;
        }
        for (key, value) in &self.directives {
            write!(f, ";{key}:={}", quote(value))?;
        }
        Ok(())
    }
}

fn quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
    if plain {
        value.to_owned()
    } else {
        format!("\"{value}\"")
    }
}

/// Parse a header value into clauses.
pub fn parse_header(header: &str, value: &str) -> Result<Vec<Clause>, ManifestError> {
    let err = |reason: &str| ManifestError::InvalidHeader {
        header: header.to_owned(),
        reason: reason.to_owned(),
    };

    let mut clauses = Vec::new();
    for element in split_outside_quotes(value, ',').map_err(|_| err("unterminated quote"))? {
        if element.trim().is_empty() {
            return Err(err("empty clause"));
        }

        let mut clause = Clause::default();
        for part in split_outside_quotes(element, ';').map_err(|_| err("unterminated quote"))? {
            let part = part.trim();
            if part.is_empty() {
                return Err(err("empty clause element"));
            }

            if let Some((key, value)) = split_key_value(part) {
                let (key, directive) = match key.strip_suffix(':') {
                    Some(key) => (key.trim(), true),
                    None => (key.trim(), false),
                };
                if key.is_empty() {
                    return Err(err("attribute without a name"));
                }
                let value = unquote(value.trim());
                if directive {
                    clause.directives.push((key.to_owned(), value));
                } else {
                    clause.attributes.push((key.to_owned(), value));
                }
            } else {
                if !clause.attributes.is_empty() || !clause.directives.is_empty() {
                    return Err(err("name after attributes"));
                }
                clause.names.push(part.to_owned());
            }
        }

        if clause.names.is_empty() {
            return Err(err("clause without a name"));
        }
        clauses.push(clause);
    }
    Ok(clauses)
}

/// Render clauses back into a header value.
pub fn render_header(clauses: &[Clause]) -> String {
    clauses
        .iter()
        .map(Clause::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

struct UnterminatedQuote;

fn split_outside_quotes(value: &str, separator: char) -> Result<Vec<&str>, UnterminatedQuote> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, ch) in value.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                parts.push(&value[start..i]);
                start = i + ch.len_utf8();
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(UnterminatedQuote);
    }
    parts.push(&value[start..]);
    Ok(parts)
}

/// Splits `key=value` at the first `=` outside quotes.
fn split_key_value(part: &str) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    for (i, ch) in part.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '=' if !in_quotes => return Some((&part[..i], &part[i + 1..])),
            _ => {}
        }
    }
    None
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_attributes_and_directives() {
        let clauses = parse_header(
            "Import-Package",
            "com.acme;com.acme.spi;version=\"[1.0,2.0)\";resolution:=optional, org.other",
        )
        .unwrap();

        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].names, vec!["com.acme", "com.acme.spi"]);
        assert_eq!(clauses[0].attribute("version"), Some("[1.0,2.0)"));
        assert_eq!(clauses[0].directive("resolution"), Some("optional"));
        assert_eq!(clauses[1].name(), "org.other");
        assert_eq!(clauses[1].attribute("version"), None);
    }

    #[test]
    fn rejects_malformed_clauses() {
        for bad in [
            "com.acme;version=\"[1.0,2.0)",
            "com.acme,,org.other",
            "version=1.0",
            "com.acme;=1.0",
            "com.acme;version=1.0;late.name",
        ] {
            let err = parse_header("Import-Package", bad).unwrap_err();
            assert!(matches!(err, ManifestError::InvalidHeader { .. }), "{bad}");
        }
    }

    #[test]
    fn renders_with_quoting() {
        let mut clauses = parse_header("Require-Bundle", "com.acme;bundle-version=1.0;visibility:=reexport").unwrap();
        clauses[0].set_attribute("bundle-version", "[1.1.0,2.0.0)");
        assert_eq!(
            render_header(&clauses),
            "com.acme;bundle-version=\"[1.1.0,2.0.0)\";visibility:=reexport"
        );
    }
}

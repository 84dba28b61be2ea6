//! Java `.properties` parser
//!
//! Build fixtures commonly dump their observable state into `.properties`
//! files that the harness then asserts on. This module parses the textual
//! format as written by `java.util.Properties#store`: comment lines, the
//! three separator styles, backslash line continuations, and the escape
//! sequences, into an insertion-ordered key/value collection.

use std::fmt;

/// Insertion-ordered key/value collection parsed from `.properties` text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

impl Properties {
    /// Parse properties from text
    ///
    /// Later occurrences of a key overwrite earlier ones, keeping the
    /// original position in iteration order.
    pub fn parse(text: &str) -> Self {
        let mut properties = Properties::default();
        let mut lines = text.lines();

        while let Some(raw) = lines.next() {
            let line = trim_leading_ws(raw);
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let mut logical = line.to_string();
            while has_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some(next) => logical.push_str(trim_leading_ws(next)),
                    None => break,
                }
            }

            let (key, value) = split_key_value(&logical);
            properties.insert(unescape(key), unescape(value));
        }

        properties
    }

    /// Set a key, overwriting any previous value in place
    pub fn insert(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Remove a key, returning its value if present
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

fn trim_leading_ws(line: &str) -> &str {
    line.trim_start_matches([' ', '\t', '\u{c}'])
}

/// A logical line continues when it ends with an odd number of backslashes
fn has_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split a logical line into raw (still escaped) key and value parts.
///
/// The key ends at the first unescaped `=`, `:` or whitespace. A whitespace
/// separator may be followed by a single `=` or `:` that is also consumed.
fn split_key_value(line: &str) -> (&str, &str) {
    let bytes = line.as_bytes();
    let mut escaped = false;
    let mut key_end = bytes.len();
    let mut sep = 0u8;

    for (i, b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'=' | b':' | b' ' | b'\t' | b'\x0c' => {
                key_end = i;
                sep = *b;
                break;
            }
            _ => (),
        }
    }

    let key = &line[..key_end];
    if key_end == bytes.len() {
        return (key, "");
    }

    let mut value_start = key_end + 1;
    if sep == b' ' || sep == b'\t' || sep == b'\x0c' {
        while value_start < bytes.len() && matches!(bytes[value_start], b' ' | b'\t' | b'\x0c') {
            value_start += 1;
        }
        if value_start < bytes.len() && matches!(bytes[value_start], b'=' | b':') {
            value_start += 1;
        }
    }
    while value_start < bytes.len() && matches!(bytes[value_start], b' ' | b'\t' | b'\x0c') {
        value_start += 1;
    }

    (key, &line[value_start..])
}

/// Resolve backslash escape sequences
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        // Malformed unicode escape: keep the raw text
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => (),
        }
    }

    out
}

//! Property stores.
//!
//! The engine never owns the build's property namespace. It reads and writes
//! through the narrow [`PropertyStore`] capability, which hosts implement over
//! whatever map they keep.

use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
};

use crate::error::DescribeError;

/// Mutable key-value namespace shared with the host build.
pub trait PropertyStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String);

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl PropertyStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }

    fn contains(&self, key: &str) -> bool {
        self.contains_key(key)
    }
}

impl PropertyStore for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }

    fn contains(&self, key: &str) -> bool {
        self.contains_key(key)
    }
}

/// In-memory store with deterministic (sorted) iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPropertyStore {
    entries: BTreeMap<String, String>,
}

impl MemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryPropertyStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl PropertyStore for MemoryPropertyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

/// A store backed by a `.properties` file.
///
/// Loading a missing file yields an empty store. IO failures surface as
/// [`DescribeError::Store`]. Saving rewrites the whole file with keys sorted,
/// so comments in the original are not preserved.
#[derive(Debug, Clone)]
pub struct PropertiesFile {
    path: PathBuf,
    entries: MemoryPropertyStore,
}

impl PropertiesFile {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, DescribeError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => parse_properties(&raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Properties file not found, starting empty");
                MemoryPropertyStore::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &MemoryPropertyStore {
        &self.entries
    }

    pub fn save(&self) -> Result<(), DescribeError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, render_properties(&self.entries))?;
        Ok(())
    }
}

impl PropertyStore for PropertiesFile {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.set(key, value);
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }
}

const WHITESPACE: [char; 3] = [' ', '\t', '\x0c'];

/// Parse the `java.util.Properties` text format.
///
/// Keys end at the first unescaped `=`, `:` or whitespace. A line ending in an
/// odd number of backslashes continues on the next one. Values may carry
/// `\uXXXX` escapes, including surrogate pairs.
pub fn parse_properties(raw: &str) -> MemoryPropertyStore {
    let mut store = MemoryPropertyStore::new();

    for line in logical_lines(raw) {
        let (key, value) = split_entry(&line);
        store.set(&unescape(key), unescape(value));
    }

    store
}

/// Render entries as `key=value` lines in key order. Characters outside
/// printable ASCII are written as `\uXXXX`, as `Properties.store()` does.
pub fn render_properties(store: &MemoryPropertyStore) -> String {
    let mut out = String::new();
    for (key, value) in store.iter() {
        out.push_str(&escape(key, true));
        out.push('=');
        out.push_str(&escape(value, false));
        out.push('\n');
    }
    out
}

/// Join continued lines and drop blanks and comments. Leading whitespace of a
/// continuation line is not part of the value.
fn logical_lines(raw: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<String> = None;

    for physical in raw.lines() {
        let part = physical.trim_start_matches(WHITESPACE);
        if current.is_none()
            && (part.is_empty() || part.starts_with('#') || part.starts_with('!'))
        {
            continue;
        }

        let trailing = part.chars().rev().take_while(|&c| c == '\\').count();
        let continues = trailing % 2 == 1;
        let text = if continues { &part[..part.len() - 1] } else { part };

        let mut buf = current.take().unwrap_or_default();
        buf.push_str(text);
        if continues {
            current = Some(buf);
        } else {
            lines.push(buf);
        }
    }

    if let Some(last) = current {
        lines.push(last);
    }
    lines
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut key_end = line.len();
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let mut rest = line[key_end..].trim_start_matches(WHITESPACE);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches(WHITESPACE);
    }
    (&line[..key_end], rest)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_high: Option<u16> = None;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            flush_surrogate(&mut out, &mut pending_high);
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('u') => {
                let hex: String = chars.clone().take(4).collect();
                if hex.len() == 4
                    && hex.chars().all(|h| h.is_ascii_hexdigit())
                    && let Ok(unit) = u16::from_str_radix(&hex, 16)
                {
                    chars.nth(3);
                    push_utf16(&mut out, &mut pending_high, unit);
                } else {
                    // Malformed escape, kept verbatim
                    flush_surrogate(&mut out, &mut pending_high);
                    out.push_str("\\u");
                }
            }
            Some(other) => {
                flush_surrogate(&mut out, &mut pending_high);
                out.push(match other {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    'f' => '\x0c',
                    c => c,
                });
            }
            None => {}
        }
    }

    flush_surrogate(&mut out, &mut pending_high);
    out
}

fn push_utf16(out: &mut String, pending_high: &mut Option<u16>, unit: u16) {
    if let Some(high) = pending_high.take() {
        if (0xDC00..=0xDFFF).contains(&unit) {
            out.extend(
                char::decode_utf16([high, unit]).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
            );
            return;
        }
        out.push(char::REPLACEMENT_CHARACTER);
    }

    if (0xD800..=0xDBFF).contains(&unit) {
        *pending_high = Some(unit);
    } else {
        out.push(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
}

fn flush_surrogate(out: &mut String, pending_high: &mut Option<u16>) {
    if pending_high.take().is_some() {
        out.push(char::REPLACEMENT_CHARACTER);
    }
}

fn escape(raw: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '#' | '!' if i == 0 => {
                out.push('\\');
                out.push(c);
            }
            c if !(' '..='~').contains(&c) => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04X}", unit));
                }
            }
            _ => out.push(c),
        }
    }
    out
}

//! Lock key templating.
//!
//! A template embeds `#{…}` placeholders that are expanded against the
//! positional arguments of a call site:
//!
//! - `#{3}` substitutes the fourth argument as a whole
//! - `#{1.book.title}` reads a property path from the second argument
//! - `#{user.id}` is shorthand for `#{0.user.id}`
//!
//! Resolution never fails. A placeholder that cannot be resolved (index out of
//! range, missing path, `null` value) stays in the key as literal text.

use regex::{Captures, Regex};
use serde_json::Value;

/// Namespace applied to every lock key that does not already carry it.
pub const LOCK_NAMESPACE: &str = "lock:";

/// Expands key templates against positional call arguments.
#[derive(Debug, Clone)]
pub struct KeyResolver {
    placeholder: Regex,
}

/// How a single placeholder addresses the argument list.
#[derive(Debug, PartialEq, Eq)]
enum Placeholder<'a> {
    /// `#{N}`
    Index(usize),
    /// `#{N.path}` or `#{path}` (index 0)
    Path { index: usize, path: &'a str },
    /// Index too large to address anything.
    Unaddressable,
}

impl KeyResolver {
    pub fn new() -> Self {
        Self {
            placeholder: Regex::new(r"#\{([^}]+)\}").expect("placeholder pattern is a valid regex"),
        }
    }

    /// Expand every placeholder of `template` against `args`.
    ///
    /// Each placeholder of the template is classified and replaced exactly once,
    /// so text produced by a substitution is never expanded again.
    pub fn resolve(&self, template: &str, args: &[Value]) -> String {
        self.placeholder
            .replace_all(template, |caps: &Captures| {
                let literal = &caps[0];
                match expand(&caps[1], args) {
                    Some(value) => value,
                    None => literal.to_string(),
                }
            })
            .into_owned()
    }
}

impl Default for KeyResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefix `key` with `namespace` unless it already starts with it.
pub fn namespaced(key: &str, namespace: &str) -> String {
    if key.starts_with(namespace) {
        key.to_string()
    } else {
        format!("{namespace}{key}")
    }
}

fn expand(content: &str, args: &[Value]) -> Option<String> {
    match classify(content) {
        Placeholder::Index(index) => args.get(index).map(render),
        Placeholder::Path { index, path } => {
            let value = lookup_path(args.get(index)?, path)?;
            if value.is_null() { None } else { Some(render(value)) }
        }
        Placeholder::Unaddressable => None,
    }
}

fn classify(content: &str) -> Placeholder<'_> {
    if is_bare_index(content) {
        return content
            .parse()
            .map(Placeholder::Index)
            .unwrap_or(Placeholder::Unaddressable);
    }

    if let Some((head, path)) = content.split_once('.') {
        if is_bare_index(head) && !path.is_empty() {
            return head
                .parse()
                .map(|index| Placeholder::Path { index, path })
                .unwrap_or(Placeholder::Unaddressable);
        }
    }

    Placeholder::Path {
        index: 0,
        path: content,
    }
}

fn is_bare_index(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Split `a.b[0].c` into `["a", "b", "0", "c"]`.
///
/// Returns `None` for malformed paths (empty segments, unclosed brackets).
pub(crate) fn parse_path(path: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    let mut rest = path;

    while !rest.is_empty() {
        let end = rest.find(['.', '[']).unwrap_or(rest.len());
        let (name, tail) = rest.split_at(end);

        if !name.is_empty() {
            segments.push(name);
        } else if !tail.starts_with('[') {
            return None;
        }

        rest = tail;
        while let Some(inner) = rest.strip_prefix('[') {
            let close = inner.find(']')?;
            let index = &inner[..close];
            if index.is_empty() {
                return None;
            }
            segments.push(index);
            rest = &inner[close + 1..];
        }

        if let Some(next) = rest.strip_prefix('.') {
            if next.is_empty() {
                return None;
            }
            rest = next;
        } else if !rest.is_empty() {
            return None;
        }
    }

    if segments.is_empty() { None } else { Some(segments) }
}

fn lookup_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    parse_path(path)?
        .into_iter()
        .try_fold(root, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

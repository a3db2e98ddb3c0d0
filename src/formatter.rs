//! Rendering values as text for diffs and failure messages.

use crate::value::Value;

/// Hook applied to every object before it is stringified for a diff.
pub type ObjectPreparer = dyn Fn(&Value) -> Value + Send + Sync;

const PP_WIDTH: usize = 80;

/// Render a value the way the differ compares objects.
///
/// Mappings become one `key => value,` line per entry sorted by the key's
/// string form; multi-line strings are kept as they are; everything else is
/// pretty-printed. The result always ends with a newline.
pub fn object_to_string(value: &Value, preparer: Option<&ObjectPreparer>) -> String {
    let prepared = prepare(value, preparer);
    let mut out = match &prepared {
        Value::Hash(entries) => sorted_entries(entries, preparer)
            .into_iter()
            .map(|entry| format!("{entry},"))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Str(_) | Value::Bytes(_) => {
            let text = prepared.to_s();
            if text.contains('\n') { text } else { prepared.inspect() }
        }
        other => pretty_print(other),
    };
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn prepare(value: &Value, preparer: Option<&ObjectPreparer>) -> Value {
    match preparer {
        Some(prepare) => prepare(value),
        None => value.clone(),
    }
}

fn sorted_entries(entries: &[(Value, Value)], preparer: Option<&ObjectPreparer>) -> Vec<String> {
    let mut sorted: Vec<&(Value, Value)> = entries.iter().collect();
    sorted.sort_by_cached_key(|(key, _)| key.to_s());
    sorted
        .into_iter()
        .map(|(key, value)| {
            format!(
                "{} => {}",
                format_nested(key, preparer),
                format_nested(value, preparer)
            )
        })
        .collect()
}

fn format_nested(value: &Value, preparer: Option<&ObjectPreparer>) -> String {
    match prepare(value, preparer) {
        Value::Hash(entries) => format!("{{{}}}", sorted_entries(&entries, preparer).join(", ")),
        other => other.inspect(),
    }
}

/// Pretty-print within 80 columns, breaking collections one element per
/// line when they do not fit.
pub fn pretty_print(value: &Value) -> String {
    let mut out = String::new();
    pp_at(value, 0, &mut out);
    out.push('\n');
    out
}

fn pp_at(value: &Value, column: usize, out: &mut String) {
    let flat = value.inspect();
    if column + flat.chars().count() <= PP_WIDTH {
        out.push_str(&flat);
        return;
    }
    match value {
        Value::Array(items) if !items.is_empty() => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                    out.push_str(&" ".repeat(column + 1));
                }
                pp_at(item, column + 1, out);
            }
            out.push(']');
        }
        Value::Hash(entries) if !entries.is_empty() => {
            out.push('{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                    out.push_str(&" ".repeat(column + 1));
                }
                let key = format!("{}=>", key.inspect());
                let key_width = key.chars().count();
                out.push_str(&key);
                pp_at(item, column + 1 + key_width, out);
            }
            out.push('}');
        }
        Value::Struct(record) if !record.fields.is_empty() => {
            out.push_str("#<struct ");
            out.push_str(&record.name);
            for (i, (name, item)) in record.fields.iter().enumerate() {
                out.push_str(if i > 0 { ",\n" } else { "\n" });
                out.push_str(&" ".repeat(column + 1));
                out.push_str(name);
                out.push('=');
                pp_at(item, column + 2 + name.chars().count(), out);
            }
            out.push('>');
        }
        _ => out.push_str(&flat),
    }
}

/// Formats values for failure messages, truncating long output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectFormatter {
    pub max_formatted_output_length: Option<usize>,
}

impl Default for ObjectFormatter {
    fn default() -> Self {
        Self::new(Some(200))
    }
}

impl ObjectFormatter {
    const ELLIPSIS: &'static str = "...";

    pub fn new(max_formatted_output_length: Option<usize>) -> Self {
        Self {
            max_formatted_output_length,
        }
    }

    pub fn format(&self, value: &Value) -> String {
        let inspected = value.inspect();
        let Some(limit) = self.max_formatted_output_length else {
            return inspected;
        };
        let chars: Vec<char> = inspected.chars().collect();
        if chars.len() < limit {
            return inspected;
        }
        let head = (limit / 2 + 1).min(chars.len());
        let tail = limit.div_ceil(2).min(chars.len());
        let mut out: String = chars[..head].iter().collect();
        out.push_str(Self::ELLIPSIS);
        out.extend(&chars[chars.len() - tail..]);
        out
    }
}

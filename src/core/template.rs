//! Message templates.
//!
//! Templates contain named holes such as `{Message}`. Holes are filled
//! positionally: the first hole takes the first value, and so on. `{{` and
//! `}}` produce literal braces. Holes without a value are left as written.

use std::fmt::{Display, Write};

/// Fill the holes of `template` with `values`, in order.
///
/// # Examples
///
/// ```
/// use bevy_console_access::core::render_template;
///
/// let text = render_template("Console says '{Message}'", &[&"hello"]);
/// assert_eq!(text, "Console says 'hello'");
/// ```
pub fn render_template(template: &str, values: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut values = values.iter();
    let mut chars = template.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek().is_some_and(|&(_, next)| next == '}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let Some(end) = template[start..].find('}').map(|i| start + i) else {
                    out.push_str(&template[start..]);
                    break;
                };
                match values.next() {
                    Some(value) => {
                        let _ = write!(out, "{}", value);
                    }
                    None => out.push_str(&template[start..=end]),
                }
                while chars.peek().is_some_and(|&(i, _)| i <= end) {
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Names of the holes in `template`, in order.
pub fn template_holes(template: &str) -> Vec<&str> {
    let mut holes = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        if rest[open + 1..].starts_with('{') {
            rest = &rest[open + 2..];
            continue;
        }
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        holes.push(&rest[open + 1..open + close]);
        rest = &rest[open + close + 1..];
    }
    holes
}

//! PMX text reader and writer.
//!
//! ```text
//! @key:<TAB>value              named parameter (global namespace) for the next item
//! @ns::key:<TAB>value          named parameter in namespace `ns`
//! 8 1 0 0 0 200                ordinary item: P1 P2 P3 ...
//! t 1 10 14                    text item: P2 P3 ... (P1 = 16)
//! Allegro                      its payload, on the following line
//! ```
//!
//! A line whose first number is `0` is ignored. The first line that is neither a
//! parameter line nor a run of numbers ends the input.

use super::format_number;
use crate::error::ScoreError;
use crate::item::{Item, ItemType, AUTO_NAMESPACE, MAX_FIXED};
use tracing::warn;

#[derive(Debug, Clone, Copy, Default)]
pub struct PmxOptions {
    /// Also write the derived `auto` namespace.
    pub include_auto: bool,
}

struct PendingParam {
    namespace: String,
    key: String,
    value: String,
}

/// `key:<TAB>value` or `ns::key:<TAB>value`; `key: value` is accepted too.
fn parse_param_line(content: &str) -> Option<PendingParam> {
    let (head, value) = match content.split_once('\t') {
        Some((head, value)) => (head.trim_end(), value),
        None => match content.split_once(": ") {
            Some((head, value)) => (head, value.trim()),
            None => (content.strip_suffix(':')?, ""),
        },
    };
    let head = head.strip_suffix(':').unwrap_or(head);
    let (namespace, key) = head.split_once("::").unwrap_or(("", head));
    if key.is_empty() {
        return None;
    }
    Some(PendingParam {
        namespace: namespace.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_numbers<'a>(tokens: impl Iterator<Item = &'a str>) -> Option<Vec<f32>> {
    tokens.map(|t| t.parse::<f32>().ok()).collect()
}

fn too_many_fields(line: usize, count: usize) -> ScoreError {
    ScoreError::Parse {
        line,
        message: format!("{} fixed parameters, at most {} allowed", count, MAX_FIXED),
    }
}

/// Read PMX text into items in file order.
pub fn read(source: &str) -> Result<Vec<Item>, ScoreError> {
    let mut items = Vec::new();
    let mut pending: Vec<PendingParam> = Vec::new();
    let mut lines = source.lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let line_number = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(content) = line.strip_prefix('@') {
            match parse_param_line(content) {
                Some(param) => pending.push(param),
                None => {
                    return Err(ScoreError::Parse {
                        line: line_number,
                        message: format!("named parameter line has no key separator: @{}", content),
                    })
                }
            }
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else { continue };

        let mut item = if first == "t" {
            let Some(params) = parse_numbers(tokens) else {
                warn!(line = line_number, "text item header is not numeric, input ends here");
                break;
            };
            if params.len() + 1 > MAX_FIXED {
                return Err(too_many_fields(line_number, params.len() + 1));
            }
            let mut fixed = Vec::with_capacity(params.len() + 1);
            fixed.push(ItemType::Text.code() as f32);
            fixed.extend(params);
            let mut item = Item::from_fixed(fixed)?;
            let Some((_, payload)) = lines.next() else {
                return Err(ScoreError::Parse {
                    line: line_number,
                    message: "text item has no payload line".to_string(),
                });
            };
            item.load_text(payload.trim_end_matches('\r'));
            item
        } else {
            let Some(fixed) = parse_numbers(std::iter::once(first).chain(tokens)) else {
                warn!(line = line_number, "non-numeric line, input ends here");
                break;
            };
            if fixed[0] == 0.0 {
                pending.clear();
                continue;
            }
            if fixed.len() > MAX_FIXED {
                return Err(too_many_fields(line_number, fixed.len()));
            }
            Item::from_fixed(fixed)?
        };

        for param in pending.drain(..) {
            item.set_named(&param.namespace, &param.key, &param.value);
        }
        items.push(item);
    }

    Ok(items)
}

/// Fixed fields with trailing zeros dropped (P1 always kept).
fn trimmed_fields(item: &Item) -> Vec<f32> {
    let mut fields = item.fixed_values().to_vec();
    while fields.len() > 1 && fields.last() == Some(&0.0) {
        fields.pop();
    }
    fields
}

/// Write items as PMX text.
pub fn write(items: &[Item], options: PmxOptions) -> String {
    let mut out = String::new();
    for item in items {
        for namespace in item.namespaces() {
            if namespace == AUTO_NAMESPACE && !options.include_auto {
                continue;
            }
            for (key, value) in item.named_params(namespace) {
                if namespace.is_empty() {
                    out.push_str(&format!("@{}:\t{}\n", key, value));
                } else {
                    out.push_str(&format!("@{}::{}:\t{}\n", namespace, key, value));
                }
            }
        }

        let fields = trimmed_fields(item);
        let numbers: Vec<String> = fields.iter().map(|&v| format_number(v)).collect();
        if item.is(ItemType::Text) {
            out.push('t');
            for number in &numbers[1..] {
                out.push(' ');
                out.push_str(number);
            }
            out.push('\n');
            out.push_str(item.text().unwrap_or(""));
            out.push('\n');
        } else {
            out.push_str(&numbers.join(" "));
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_numbers_and_text() {
        let source = "8 1 0 0 0 200\nt 1 10 14\nAllegro\n1 1 20 5 0 0 1\n";
        let items = read(source).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].item_type(), ItemType::Staff);
        assert_eq!(items[0].fixed(6), 200.0);
        assert_eq!(items[1].item_type(), ItemType::Text);
        assert_eq!(items[1].text(), Some("Allegro"));
        assert_eq!(items[1].fixed(12), 7.0);
        assert_eq!(items[2].duration(), 1.0);
    }

    #[test]
    fn test_zero_lines_are_skipped_and_junk_stops_input() {
        let source = "0 1 2\n14 1 50\nend of data\n1 1 10 3\n";
        let items = read(source).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_type(), ItemType::Barline);
    }

    #[test]
    fn test_named_parameters_attach_to_next_item() {
        let source = "@id:\tn1\n@verovio::stem:\tup\n1 1 10 3\n2 1 20 3 0 0 1\n";
        let items = read(source).unwrap();
        assert_eq!(items[0].named("", "id"), "n1");
        assert_eq!(items[0].named("verovio", "stem"), "up");
        assert!(!items[1].has_named("", "id"));
    }

    #[test]
    fn test_write_round_trips_tokens() {
        let source = "@id:\tn1\n1 1 10 3 0 0 1.5\nt 1 10 14 0 0 0 0 0 0 0 5\nLargo\n";
        let items = read(source).unwrap();
        let written = write(&items, PmxOptions::default());
        assert_eq!(written, source);
    }

    #[test]
    fn test_short_text_header_is_kept() {
        let source = "t 1 10 14\nAllegro\n";
        let items = read(source).unwrap();
        assert_eq!(items[0].text(), Some("Allegro"));
        assert_eq!(items[0].fixed(12), 0.0);
        assert_eq!(write(&items, PmxOptions::default()), source);
    }

    #[test]
    fn test_auto_namespace_is_optional() {
        let mut item = Item::with_params(ItemType::Note, &[1.0, 10.0, 3.0]);
        item.set_auto("pitch", "E4");
        let plain = write(std::slice::from_ref(&item), PmxOptions::default());
        assert!(!plain.contains("auto"));
        let full = write(&[item], PmxOptions { include_auto: true });
        assert!(full.starts_with("@auto::pitch:\tE4\n"));
    }

    #[test]
    fn test_missing_payload_is_an_error() {
        let err = read("t 1 10 14").unwrap_err();
        assert!(matches!(err, ScoreError::Parse { line: 1, .. }));
    }
}

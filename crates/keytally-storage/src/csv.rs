//! Minimal CSV record handling for the time log.
//!
//! Fields containing a comma, a double quote or a line break are wrapped
//! in double quotes with inner quotes doubled (RFC 4180). Records never
//! span lines because labels are validated to be single-line.

use std::borrow::Cow;

fn needs_quoting(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
}

/// Quote `field` if it needs quoting.
///
/// ```
/// use keytally_storage::csv::quote_field;
///
/// assert_eq!(quote_field("Support"), "Support");
/// assert_eq!(quote_field("R&D, phase 2"), "\"R&D, phase 2\"");
/// assert_eq!(quote_field("say \"hi\""), "\"say \"\"hi\"\"\"");
/// ```
pub fn quote_field(field: &str) -> Cow<'_, str> {
    if needs_quoting(field) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Format one record, newline included.
pub fn format_record(fields: &[&str]) -> String {
    let mut record = fields
        .iter()
        .map(|f| quote_field(f))
        .collect::<Vec<_>>()
        .join(",");
    record.push('\n');
    record
}

/// Split one line into fields.
///
/// # Errors
///
/// Returns a message if a quoted field is not terminated or a closing
/// quote is followed by something other than a separator.
pub fn parse_record(line: &str) -> Result<Vec<String>, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;
    let mut was_quoted = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => {
                    in_quotes = false;
                    if !matches!(chars.peek(), None | Some(',')) {
                        return Err(format!("unexpected character after closing quote in {line:?}"));
                    }
                }
                other => field.push(other),
            }
            continue;
        }

        match c {
            ',' => {
                fields.push(std::mem::take(&mut field));
                was_quoted = false;
            }
            '"' if field.is_empty() && !was_quoted => {
                in_quotes = true;
                was_quoted = true;
            }
            other => field.push(other),
        }
    }

    if in_quotes {
        return Err(format!("unterminated quoted field in {line:?}"));
    }
    fields.push(field);
    Ok(fields)
}

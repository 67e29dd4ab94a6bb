//! Catalog response scanner.
//!
//! The appdetails payload has a fixed, shallow shape, so existence and the
//! display name are pulled out with a targeted substring scan instead of a
//! JSON parser. Any missing marker on the existence path means "not found";
//! a name is either decoded completely or not at all.

/// Bytes after the `"success"` colon searched for the literal `true`.
const SUCCESS_WINDOW: usize = 50;

/// Ephemeral view over one fetch. `display_name` is only ever populated when
/// `exists` is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub exists: bool,
    pub display_name: Option<String>,
}

impl CatalogRecord {
    fn missing() -> Self {
        Self {
            exists: false,
            display_name: None,
        }
    }
}

/// Scan a raw appdetails response for the given AppID. The first occurrence
/// of the quoted identifier key wins.
pub fn scan(payload: &[u8], appid: &str) -> CatalogRecord {
    if payload.is_empty() || appid.is_empty() {
        return CatalogRecord::missing();
    }
    let text = String::from_utf8_lossy(payload);

    let key = format!("\"{}\"", appid);
    let Some(key_pos) = text.find(&key) else {
        return CatalogRecord::missing();
    };
    let Some(success_pos) = find_from(&text, key_pos, "\"success\"") else {
        return CatalogRecord::missing();
    };
    let Some(colon_pos) = find_from(&text, success_pos, ":") else {
        return CatalogRecord::missing();
    };

    let mut window_end = text.len().min(colon_pos + SUCCESS_WINDOW);
    while !text.is_char_boundary(window_end) {
        window_end -= 1;
    }
    if !text[colon_pos..window_end].contains("true") {
        return CatalogRecord::missing();
    }

    CatalogRecord {
        exists: true,
        display_name: extract_name(&text, success_pos),
    }
}

fn find_from(text: &str, start: usize, needle: &str) -> Option<usize> {
    text[start..].find(needle).map(|rel| start + rel)
}

/// Best-effort name extraction from the `data` section. A missing marker or
/// an empty string yields `None`, never a partial name.
fn extract_name(text: &str, success_pos: usize) -> Option<String> {
    let data_pos = find_from(text, success_pos, "\"data\"")?;
    let name_pos = find_from(text, data_pos, "\"name\"")?;
    let colon_pos = find_from(text, name_pos, ":")?;
    let quote_pos = find_from(text, colon_pos + 1, "\"")?;
    let name = decode_quoted(&text[quote_pos + 1..]);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Decode a quoted string body up to the first unescaped quote. `\"`, `\\`
/// and `\/` map to the literal character, `\n` and `\t` to their control
/// characters; any other backslash sequence passes the next character
/// through.
fn decode_quoted(s: &str) -> String {
    let mut out = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => break,
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(next) => out.push(next),
                None => break,
            },
            _ => out.push(c),
        }
    }
    out
}

//! Reader of captured page dumps.
//!
//! A dump consists of three sections separated by the first two newlines:
//! the double-quoted and escaped href, the double-quoted and escaped status code,
//! and the raw response body.
use crate::errors::{FindSimpageError, Result};
use crate::href::{self, Href};

/// A captured response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageDump {
    /// Identifier of the capture.
    pub id: u64,
    /// Requested href.
    pub href: String,
    /// Status code.
    pub code: String,
    /// Response body.
    pub body: String,
}

impl PageDump {
    /// Parses a dump.
    ///
    /// # Examples
    ///
    /// ```
    /// use find_simpage::dump::PageDump;
    ///
    /// let dump = PageDump::parse(3, "\"/item?id=1\"\n\"200\"\n<html></html>\n").unwrap();
    /// assert_eq!(dump.href, "/item?id=1");
    /// assert!(dump.is_ok());
    /// assert_eq!(dump.body, "<html></html>\n");
    /// ```
    pub fn parse(id: u64, text: &str) -> Result<Self> {
        let mut sections = text.splitn(3, '\n');
        let href = sections
            .next()
            .ok_or_else(|| FindSimpageError::input("The dump lacks the href line."))?;
        let code = sections
            .next()
            .ok_or_else(|| FindSimpageError::input("The dump lacks the status line."))?;
        let body = sections.next().unwrap_or_default();
        Ok(Self {
            id,
            href: undump(href.trim_end_matches('\r'))?,
            code: undump(code.trim_end_matches('\r'))?,
            body: body.to_string(),
        })
    }

    /// Checks if the status code is 200.
    pub fn is_ok(&self) -> bool {
        self.code == "200"
    }

    /// Decodes the href into its path and query.
    pub fn decode_href(&self) -> Result<Href> {
        href::decode(&self.href)
            .map_err(|e| FindSimpageError::input(format!("invalid href {:?}: {e}", self.href)))
    }
}

/// Parses a double-quoted string literal with backslash escapes.
///
/// # Examples
///
/// ```
/// use find_simpage::dump::undump;
///
/// assert_eq!(undump(r#""a\"b\\c\nあ\x41""#).unwrap(), "a\"b\\c\nあA");
/// ```
pub fn undump(literal: &str) -> Result<String> {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| FindSimpageError::input(format!("not a quoted string: {literal:?}")))?;

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let escaped = chars
            .next()
            .ok_or_else(|| FindSimpageError::input("dangling backslash"))?;
        match escaped {
            'n' => bytes.push(b'\n'),
            't' => bytes.push(b'\t'),
            'r' => bytes.push(b'\r'),
            'f' => bytes.push(0x0c),
            'v' => bytes.push(0x0b),
            'b' => bytes.push(0x08),
            'a' => bytes.push(0x07),
            'e' => bytes.push(0x1b),
            's' => bytes.push(b' '),
            'x' => {
                let hex = take_while_max(&mut chars, 2, |c| c.is_ascii_hexdigit());
                let byte = u8::from_str_radix(&hex, 16)
                    .map_err(|_| FindSimpageError::input("invalid \\x escape"))?;
                bytes.push(byte);
            }
            'u' => {
                let code = if chars.peek() == Some(&'{') {
                    chars.next();
                    let hex = take_while_max(&mut chars, 6, |c| c.is_ascii_hexdigit());
                    if chars.next() != Some('}') {
                        return Err(FindSimpageError::input("unterminated \\u{} escape"));
                    }
                    hex
                } else {
                    take_while_max(&mut chars, 4, |c| c.is_ascii_hexdigit())
                };
                let c = u32::from_str_radix(&code, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| FindSimpageError::input("invalid \\u escape"))?;
                let mut buf = [0; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            '0'..='7' => {
                let mut oct = escaped.to_string();
                oct.push_str(&take_while_max(&mut chars, 2, |c| ('0'..='7').contains(&c)));
                let byte = u8::from_str_radix(&oct, 8)
                    .map_err(|_| FindSimpageError::input("invalid octal escape"))?;
                bytes.push(byte);
            }
            // \" \\ \# and unknown escapes stand for themselves.
            c => {
                let mut buf = [0; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn take_while_max<I, P>(chars: &mut std::iter::Peekable<I>, max: usize, pred: P) -> String
where
    I: Iterator<Item = char>,
    P: Fn(char) -> bool,
{
    let mut taken = String::new();
    while taken.len() < max {
        match chars.peek() {
            Some(&c) if pred(c) => {
                taken.push(c);
                chars.next();
            }
            _ => break,
        }
    }
    taken
}

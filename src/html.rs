//! HTML entity decoding for HTML-only message bodies.
//!
//! Only entities are decoded. Tags are left in place; the digit tokenizer
//! treats `<`, `>` and attribute punctuation as boundaries, so markup never
//! merges with a code.
//!
//! Decoding follows the HTML5 rules browsers apply to text content:
//! numeric references and the legacy named references (`&amp`, `&nbsp`,
//! the Latin-1 set) are recognised without a closing `;`, so
//! `code:&nbsp123456` decodes to `code:\u{a0}123456`.

use std::borrow::Cow;

/// Longest entity name looked up before giving up.
const MAX_ENTITY_LEN: usize = 32;

/// Legacy entity names for U+00A0..=U+00FF, in code point order.
const LATIN1_ENTITIES: [&str; 96] = [
    "nbsp", "iexcl", "cent", "pound", "curren", "yen", "brvbar", "sect", "uml", "copy", "ordf",
    "laquo", "not", "shy", "reg", "macr", "deg", "plusmn", "sup2", "sup3", "acute", "micro",
    "para", "middot", "cedil", "sup1", "ordm", "raquo", "frac14", "frac12", "frac34", "iquest",
    "Agrave", "Aacute", "Acirc", "Atilde", "Auml", "Aring", "AElig", "Ccedil", "Egrave",
    "Eacute", "Ecirc", "Euml", "Igrave", "Iacute", "Icirc", "Iuml", "ETH", "Ntilde", "Ograve",
    "Oacute", "Ocirc", "Otilde", "Ouml", "times", "Oslash", "Ugrave", "Uacute", "Ucirc", "Uuml",
    "Yacute", "THORN", "szlig", "agrave", "aacute", "acirc", "atilde", "auml", "aring", "aelig",
    "ccedil", "egrave", "eacute", "ecirc", "euml", "igrave", "iacute", "icirc", "iuml", "eth",
    "ntilde", "ograve", "oacute", "ocirc", "otilde", "ouml", "divide", "oslash", "ugrave",
    "uacute", "ucirc", "uuml", "yacute", "thorn", "yuml",
];

/// Windows-1252 characters that numeric references in 0x80..=0x9F stand for.
const CP1252_C1: [char; 32] = [
    '\u{20ac}', '\u{81}', '\u{201a}', '\u{192}', '\u{201e}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{2c6}', '\u{2030}', '\u{160}', '\u{2039}', '\u{152}', '\u{8d}', '\u{17d}', '\u{8f}',
    '\u{90}', '\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{2dc}', '\u{2122}', '\u{161}', '\u{203a}', '\u{153}', '\u{9d}', '\u{17e}', '\u{178}',
];

/// Decodes HTML character references in `html`.
///
/// Numeric references (`&#39;`, `&#x27;`) and legacy named references are
/// decoded with or without the closing `;`; other named references from a
/// common subset need it. Numeric references to invalid code points become
/// U+FFFD, references to non-characters and most control characters are
/// dropped. Unknown references are kept verbatim.
///
/// # Example
///
/// ```
/// use inbox_otp::html::decode_entities;
///
/// assert_eq!(decode_entities("Here&#39;s your code:&nbsp;123456"), "Here's your code:\u{a0}123456");
/// assert_eq!(decode_entities("Your code:&nbsp123456"), "Your code:\u{a0}123456");
/// assert_eq!(decode_entities("&bogus; &hellip"), "&bogus; &hellip");
/// ```
#[must_use]
pub fn decode_entities(html: &str) -> Cow<'_, str> {
    if !html.contains('&') {
        return Cow::Borrowed(html);
    }

    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        match decode_reference(after) {
            Some((decoded, consumed)) => {
                out.extend(decoded);
                rest = &after[consumed..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

/// Decodes the reference at the start of `s` (just past the `&`).
///
/// Returns the replacement (`None` when the reference decodes to nothing)
/// and the number of bytes consumed.
fn decode_reference(s: &str) -> Option<(Option<char>, usize)> {
    match s.strip_prefix('#') {
        Some(numeric) => decode_numeric(numeric).map(|(c, len)| (c, len + 1)),
        None => decode_named(s).map(|(c, len)| (Some(c), len)),
    }
}

fn decode_numeric(s: &str) -> Option<(Option<char>, usize)> {
    let (digits_at, radix) = match s.as_bytes().first() {
        Some(b'x' | b'X') => (1, 16),
        _ => (0, 10),
    };
    let digits = &s[digits_at..];
    let digit_len = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if digit_len == 0 {
        return None;
    }

    let code = u32::from_str_radix(&digits[..digit_len], radix).unwrap_or(u32::MAX);
    let mut consumed = digits_at + digit_len;
    if digits[digit_len..].starts_with(';') {
        consumed += 1;
    }

    Some((numeric_char(code), consumed))
}

fn numeric_char(code: u32) -> Option<char> {
    match code {
        0 | 0xD800..=0xDFFF | 0x0011_0000.. => Some(char::REPLACEMENT_CHARACTER),
        0x0D => Some('\r'),
        0x80..=0x9F => usize::try_from(code - 0x80)
            .ok()
            .and_then(|i| CP1252_C1.get(i).copied()),
        0x01..=0x08 | 0x0B | 0x0E..=0x1F | 0x7F | 0xFDD0..=0xFDEF => None,
        _ if code & 0xFFFE == 0xFFFE => None,
        _ => char::from_u32(code),
    }
}

/// Decodes a named reference.
///
/// A `;`-terminated name is looked up whole. Otherwise the longest legacy
/// name prefixing the text wins and whatever follows it is left in place.
fn decode_named(s: &str) -> Option<(char, usize)> {
    let name_end = s
        .char_indices()
        .enumerate()
        .find(|&(n, (_, c))| n == MAX_ENTITY_LEN || ends_name(c))
        .map_or(s.len(), |(_, (i, _))| i);
    let name = &s[..name_end];
    if name.is_empty() {
        return None;
    }

    if s[name_end..].starts_with(';') {
        if let Some(c) = named_entity(name) {
            return Some((c, name_end + 1));
        }
    }

    (2..=name.len())
        .rev()
        .filter(|&len| name.is_char_boundary(len))
        .find_map(|len| legacy_entity(&name[..len]).map(|c| (c, len)))
}

fn ends_name(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0c' | ' ' | '<' | '&' | '#' | ';')
}

/// Named references that decode without a closing `;`.
fn legacy_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" | "AMP" => '&',
        "lt" | "LT" => '<',
        "gt" | "GT" => '>',
        "quot" | "QUOT" => '"',
        "COPY" => '\u{a9}',
        "REG" => '\u{ae}',
        _ => {
            let index = LATIN1_ENTITIES.iter().position(|&n| n == name)?;
            return u8::try_from(index).ok().map(|i| char::from(0xA0 + i));
        }
    };
    Some(c)
}

/// Named references that require a closing `;`.
fn named_entity(name: &str) -> Option<char> {
    if let Some(c) = legacy_entity(name) {
        return Some(c);
    }
    let c = match name {
        "apos" => '\'',
        "ensp" => '\u{2002}',
        "emsp" => '\u{2003}',
        "thinsp" => '\u{2009}',
        "zwnj" => '\u{200c}',
        "zwj" => '\u{200d}',
        "lrm" => '\u{200e}',
        "rlm" => '\u{200f}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "sbquo" => '\u{201a}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "bdquo" => '\u{201e}',
        "bull" => '\u{2022}',
        "hellip" => '\u{2026}',
        "trade" => '\u{2122}',
        "euro" => '\u{20ac}',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_borrowed() {
        let decoded = decode_entities("Your code is 123456");
        assert!(matches!(decoded, Cow::Borrowed(_)));
    }

    #[test]
    fn test_named_entities() {
        assert_eq!(
            decode_entities("&lt;b&gt;Tom &amp; Jerry&lt;/b&gt; &quot;hi&quot;"),
            "<b>Tom & Jerry</b> \"hi\""
        );
        assert_eq!(decode_entities("&hellip;&euro;&apos;"), "\u{2026}\u{20ac}'");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(decode_entities("Here&#39;s"), "Here's");
        assert_eq!(decode_entities("Here&#x27;s"), "Here's");
        assert_eq!(decode_entities("&#X41;&#66;"), "AB");
    }

    #[test]
    fn test_legacy_entities_without_semicolon() {
        assert_eq!(decode_entities("Your code:&nbsp123456"), "Your code:\u{a0}123456");
        assert_eq!(decode_entities("Tom &amp Jerry &lt3"), "Tom & Jerry <3");
        assert_eq!(decode_entities("&copy2025 &AMP"), "\u{a9}2025 &");
        // Longest legacy prefix wins, the tail stays.
        assert_eq!(decode_entities("&notit;"), "\u{ac}it;");
        assert_eq!(decode_entities("&nbspx"), "\u{a0}x");
    }

    #[test]
    fn test_numeric_without_semicolon() {
        assert_eq!(decode_entities("Here&#39s"), "Here's");
        assert_eq!(decode_entities("&#x41BC"), "\u{41bc}");
        assert_eq!(decode_entities("code&#32482913"), "code\u{fffd}");
        assert_eq!(decode_entities("code&#32 482913"), "code  482913");
    }

    #[test]
    fn test_invalid_code_points() {
        assert_eq!(decode_entities("&#0;"), "\u{fffd}");
        assert_eq!(decode_entities("&#xD800;"), "\u{fffd}");
        assert_eq!(decode_entities("&#99999999999;"), "\u{fffd}");
        assert_eq!(decode_entities("&#x80;&#150;"), "\u{20ac}\u{2013}");
        assert_eq!(decode_entities("a&#1;b&#xFFFF;c"), "abc");
    }

    #[test]
    fn test_unknown_references_kept() {
        assert_eq!(decode_entities("a &unknown; b"), "a &unknown; b");
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("trailing &"), "trailing &");
        assert_eq!(decode_entities("&#;"), "&#;");
        assert_eq!(decode_entities("&#xZZ;"), "&#xZZ;");
        assert_eq!(decode_entities("&hellip"), "&hellip");
    }

    #[test]
    fn test_entity_next_to_digits() {
        assert_eq!(
            decode_entities("code:&nbsp;482913&nbsp;expires"),
            "code:\u{a0}482913\u{a0}expires"
        );
    }

    #[test]
    fn test_multibyte_text_survives() {
        assert_eq!(decode_entities("código &amp; 認証"), "código & 認証");
        assert_eq!(decode_entities("&認証;"), "&認証;");
    }
}

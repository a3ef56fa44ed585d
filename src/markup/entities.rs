// WHY: Character references decode in place; anything unrecognized is copied
// through untouched so malformed input never loses text

use memchr::memchr;
use std::borrow::Cow;

/// Longest entity name we look for before giving up on a `&`
const MAX_ENTITY_LEN: usize = 32;

/// Decode all character references in a text segment
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }

    let bytes = input.as_bytes();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(amp_offset) = memchr(b'&', &bytes[pos..]) else {
            result.push_str(&input[pos..]);
            break;
        };

        // Copy everything before the reference
        result.push_str(&input[pos..pos + amp_offset]);
        pos += amp_offset;

        let window_end = (pos + 1 + MAX_ENTITY_LEN).min(bytes.len());
        match memchr(b';', &bytes[pos + 1..window_end]) {
            Some(semi_offset) => {
                let entity = &input[pos + 1..pos + 1 + semi_offset];
                if let Some(decoded) = decode_entity(entity) {
                    result.push(decoded);
                    pos += semi_offset + 2;
                } else {
                    // Unknown reference, keep the ampersand
                    result.push('&');
                    pos += 1;
                }
            }
            None => {
                result.push('&');
                pos += 1;
            }
        }
    }

    Cow::Owned(result)
}

/// Decode a single reference (without & and ;)
fn decode_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        return decode_numeric_entity(numeric);
    }

    let ch = match entity {
        "lt" => '<',
        "gt" => '>',
        "amp" => '&',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "shy" => '\u{00AD}',
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        "trade" => '\u{2122}',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "sbquo" => '\u{201A}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "bdquo" => '\u{201E}',
        "laquo" => '\u{00AB}',
        "raquo" => '\u{00BB}',
        "hellip" => '\u{2026}',
        "middot" => '\u{00B7}',
        "sect" => '\u{00A7}',
        "para" => '\u{00B6}',
        "deg" => '\u{00B0}',
        "iexcl" => '\u{00A1}',
        "iquest" => '\u{00BF}',
        "agrave" => 'à',
        "aacute" => 'á',
        "acirc" => 'â',
        "auml" => 'ä',
        "ccedil" => 'ç',
        "egrave" => 'è',
        "eacute" => 'é',
        "ecirc" => 'ê',
        "euml" => 'ë',
        "iacute" => 'í',
        "icirc" => 'î',
        "iuml" => 'ï',
        "ntilde" => 'ñ',
        "oacute" => 'ó',
        "ocirc" => 'ô',
        "ouml" => 'ö',
        "uacute" => 'ú',
        "ugrave" => 'ù',
        "ucirc" => 'û',
        "uuml" => 'ü',
        "szlig" => 'ß',
        "aelig" => 'æ',
        "oelig" => 'œ',
        "Agrave" => 'À',
        "Aacute" => 'Á',
        "Eacute" => 'É',
        "Egrave" => 'È',
        "Ccedil" => 'Ç',
        "Ntilde" => 'Ñ',
        "Ouml" => 'Ö',
        "Uuml" => 'Ü',
        "Auml" => 'Ä',
        _ => return None,
    };
    Some(ch)
}

/// Decode a numeric character reference body (after '#')
fn decode_numeric_entity(entity: &str) -> Option<char> {
    let codepoint = if let Some(hex) = entity.strip_prefix(['x', 'X']) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.parse::<u32>().ok()?
    };
    char::from_u32(codepoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities_borrows() {
        assert!(matches!(decode_entities("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_named_and_numeric() {
        assert_eq!(decode_entities("Fish &amp; Chips"), "Fish & Chips");
        assert_eq!(decode_entities("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode_entities("caf&eacute;&hellip;"), "café…");
    }

    #[test]
    fn test_unknown_and_unterminated_kept() {
        assert_eq!(decode_entities("&bogus; and &amp"), "&bogus; and &amp");
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("&#xZZ;"), "&#xZZ;");
    }
}

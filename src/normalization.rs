// WHY: standalone whitespace normalization shared by pages and sentences
// Buffer-reusing variants keep batch processing allocation-free

/// Normalize page content: strip carriage returns, collapse horizontal
/// whitespace to one space, collapse blank-line runs to exactly one blank line,
/// trim the ends. Single line breaks are kept.
pub fn normalize_page(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    normalize_page_into(text, &mut result);
    result
}

/// Normalize page content into supplied buffer to avoid allocation
pub fn normalize_page_into(text: &str, buffer: &mut String) {
    buffer.clear();
    buffer.reserve(text.len());

    let mut pending_space = false;
    let mut pending_newlines = 0usize;

    for ch in text.chars() {
        match ch {
            '\r' => {}
            '\n' => pending_newlines += 1,
            _ if ch.is_whitespace() => pending_space = true,
            _ => {
                // WHY: leading whitespace is dropped by only flushing once content exists
                if !buffer.is_empty() {
                    match pending_newlines {
                        0 if pending_space => buffer.push(' '),
                        0 => {}
                        1 => buffer.push('\n'),
                        _ => buffer.push_str("\n\n"),
                    }
                }
                pending_space = false;
                pending_newlines = 0;
                buffer.push(ch);
            }
        }
    }
}

/// Collapse every whitespace run (line breaks included) to a single space and trim.
/// Used for sentence strings.
pub fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    collapse_whitespace_into(text, &mut result);
    result
}

/// Collapse whitespace into supplied buffer
pub fn collapse_whitespace_into(text: &str, buffer: &mut String) {
    buffer.clear();
    buffer.reserve(text.len());

    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !buffer.is_empty() {
                buffer.push(' ');
            }
            pending_space = false;
            buffer.push(ch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page_blank_lines() {
        let input = "First paragraph.\r\n\r\n\r\n\r\nSecond   paragraph\nwraps here.\n\n\n";
        assert_eq!(normalize_page(input), "First paragraph.\n\nSecond paragraph\nwraps here.");
    }

    #[test]
    fn test_normalize_page_whitespace_only_lines_count_as_blank() {
        let input = "  one\n   \t \n\ttwo  ";
        assert_eq!(normalize_page(input), "one\n\ntwo");
    }

    #[test]
    fn test_normalize_page_tabs_and_spaces() {
        assert_eq!(normalize_page("a\t\t b \u{00A0} c"), "a b c");
    }

    #[test]
    fn test_normalize_page_buffer_reuse() {
        let mut buffer = String::new();
        normalize_page_into("x  y", &mut buffer);
        assert_eq!(buffer, "x y");
        normalize_page_into("\n\nz", &mut buffer);
        assert_eq!(buffer, "z");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  This is a\nsentence with\r\n\r\nbreaks.  "), "This is a sentence with breaks.");
        assert_eq!(collapse_whitespace(" \n "), "");
        assert_eq!(collapse_whitespace("Unicode\n世界\r\nok."), "Unicode 世界 ok.");
    }
}

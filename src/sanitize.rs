/// Strip control characters that strict XML parsers reject.
///
/// Tab, newline and carriage return survive, as does everything at or above
/// U+0020. Invalid UTF-8 is replaced rather than rejected.
pub fn sanitize(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .chars()
        .filter(|&c| is_allowed(c))
        .collect()
}

pub fn is_allowed(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || c >= '\u{20}'
}

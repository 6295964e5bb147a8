use std::fmt::Write;

fn push_escaped(out: &mut String, ch: char) {
    let mut buf = [0u8; 4];
    for byte in ch.encode_utf8(&mut buf).bytes() {
        let _ = write!(out, "%{byte:02X}");
    }
}

/// Percent-encode a query value the way browsers and the exchange's own pages do: unreserved
/// characters and `/` pass through, everything else (space included) becomes `%XX`.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-' | '~' | '/') {
            out.push(ch);
        } else {
            push_escaped(&mut out, ch);
        }
    }
    out
}

/// Turn an index or symbol name into a file-name-safe stem.
///
/// Letters, digits, spaces and `-_.&` are kept so names like `NIFTY 50` stay recognisable.
/// Anything else, path separators and `%` included, is written as `%XX`, so distinct names never
/// share a stem.
pub fn sanitize_identifier(name: &str) -> String {
    if name.is_empty() {
        return "%".to_string();
    }
    let dots_only = name.chars().all(|ch| ch == '.');

    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        let keep = ch.is_ascii_alphanumeric() || matches!(ch, ' ' | '-' | '_' | '.' | '&');
        if keep && !dots_only {
            slug.push(ch);
        } else {
            push_escaped(&mut slug, ch);
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_escapes_spaces_as_percent_twenty() {
        assert_eq!(quote("NIFTY 50"), "NIFTY%2050");
        assert_eq!(quote("M&M"), "M%26M");
        assert_eq!(quote("NIFTY50/VALUE 20"), "NIFTY50/VALUE%2020");
        assert_eq!(quote("BAJAJ-AUTO"), "BAJAJ-AUTO");
    }

    #[test]
    fn keeps_readable_names() {
        assert_eq!(sanitize_identifier("NIFTY 50"), "NIFTY 50");
        assert_eq!(sanitize_identifier("M&M"), "M&M");
        assert_eq!(sanitize_identifier("BAJAJ-AUTO"), "BAJAJ-AUTO");
    }

    #[test]
    fn neutralises_path_components() {
        assert_eq!(sanitize_identifier("../etc/passwd"), "..%2Fetc%2Fpasswd");
        assert_eq!(sanitize_identifier("NIFTY50/VALUE 20"), "NIFTY50%2FVALUE 20");
        assert_eq!(sanitize_identifier(".."), "%2E%2E");
        assert_eq!(sanitize_identifier(""), "%");
    }

    #[test]
    fn distinct_names_get_distinct_stems() {
        let names = ["A/B", "A_B", "A%2FB", "A:B", "..", "%2E%2E", "", "%"];
        let stems: std::collections::HashSet<_> =
            names.iter().map(|name| sanitize_identifier(name)).collect();
        assert_eq!(stems.len(), names.len());
    }
}

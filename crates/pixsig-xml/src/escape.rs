#![forbid(unsafe_code)]

//! Character escaping for canonicalization, and for the markup the
//! serializer cannot hand to `XmlWriter`.
//!
//! - Text: `&`, `<`, `>` and `\r`
//! - Attribute values: `&`, `<`, `"`, `\t`, `\n` and `\r`
//! - PI data: `\r`

/// Append `s` escaped as text content.
pub fn escape_text_into(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

/// Append `s` escaped as a double-quoted attribute value.
///
/// Whitespace is written as character references so attribute value
/// normalization on re-parse leaves it intact.
pub fn escape_attr_into(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

/// Escape processing instruction data.
pub fn escape_pi(s: &str) -> String {
    s.replace('\r', "&#xD;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escape_text(s: &str) -> String {
        let mut out = String::new();
        escape_text_into(s, &mut out);
        out
    }

    fn escape_attr(s: &str) -> String {
        let mut out = String::new();
        escape_attr_into(s, &mut out);
        out
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("1 < 2 & 3 > 0"), "1 &lt; 2 &amp; 3 &gt; 0");
        assert_eq!(escape_text("a\"b"), "a\"b");
        assert_eq!(escape_text("cr\r"), "cr&#xD;");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("R$ 10 > 5"), "R$ 10 > 5");
        assert_eq!(escape_attr("\"q\"&"), "&quot;q&quot;&amp;");
        assert_eq!(escape_attr("\t\n\r"), "&#x9;&#xA;&#xD;");
    }
}

//! Small HTML helpers.

/// Escapes text for use in element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Lowercase, dash-separated anchor id for a heading, e.g. `"Drop Rates (5*)"`
/// becomes `"drop-rates-5"`.
pub fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// ` name="value"` with the value escaped.
pub fn attr(name: &str, value: &str) -> String {
    format!(" {name}=\"{}\"", escape(value))
}

pub fn opt_attr(name: &str, value: Option<&str>) -> String {
    value.map(|value| attr(name, value)).unwrap_or_default()
}

/// `url` if it is relative or uses http(s) or mailto. Browsers skip
/// whitespace and control characters inside a scheme, so those are ignored
/// while looking for it.
pub fn safe_url(url: &str) -> Option<&str> {
    let compact: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();
    let end = compact.find([':', '/', '?', '#']).unwrap_or(compact.len());
    if !compact[end..].starts_with(':') {
        return Some(url);
    }
    let scheme = compact[..end].to_ascii_lowercase();
    matches!(scheme.as_str(), "http" | "https" | "mailto").then_some(url)
}

pub fn wrap(tag: &str, attrs: &str, content: &str) -> String {
    format!("<{tag}{attrs}>{content}</{tag}>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_safe_url() {
        assert_eq!(safe_url("https://x.io/a"), Some("https://x.io/a"));
        assert_eq!(safe_url("MAILTO:me@x.io"), Some("MAILTO:me@x.io"));
        assert_eq!(safe_url("/weapons/sword"), Some("/weapons/sword"));
        assert_eq!(safe_url("#drops"), Some("#drops"));
        assert_eq!(safe_url("a/b:c"), Some("a/b:c"));
        assert_eq!(safe_url("javascript:alert(1)"), None);
        assert_eq!(safe_url(" Java\tScript:alert(1)"), None);
        assert_eq!(safe_url("data:text/html,x"), None);
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Drop Rates (5*)"), "drop-rates-5");
        assert_eq!(slug("  Über Weapons  "), "über-weapons");
        assert_eq!(slug(""), "");
    }
}

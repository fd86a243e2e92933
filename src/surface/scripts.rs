//! Script bodies evaluated in the page.
//!
//! Each script is a function body: values come back through `return`.
//! Scroll scripts end with the target position so logs stay readable.

use serde_json::Value;

use crate::models::ScrollPosition;

/// Quote a string as a JavaScript literal.
fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

pub fn element_exists(selector: &str) -> String {
    format!("return document.querySelector({}) !== null;", js_string(selector))
}

pub fn region_height(selector: &str) -> String {
    format!(
        "const el = document.querySelector({}); return el ? el.scrollHeight : 0;",
        js_string(selector)
    )
}

pub fn document_height() -> String {
    "return document.body.scrollHeight;".to_string()
}

pub fn scroll_region_to(selector: &str, position: ScrollPosition) -> String {
    format!(
        "const el = document.querySelector({}); if (el) {{ el.scrollTop = {}; }}",
        js_string(selector),
        position
    )
}

pub fn scroll_document_to(position: ScrollPosition) -> String {
    format!("window.scrollTo(0, {});", position)
}

/// Remove every element matching `selector`; returns how many were removed.
pub fn remove_all(selector: &str) -> String {
    format!(
        "const nodes = document.querySelectorAll({}); nodes.forEach(n => n.remove()); return nodes.length;",
        js_string(selector)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_is_quoted() {
        assert_eq!(
            element_exists(r#"input[name="email"]"#),
            r#"return document.querySelector("input[name=\"email\"]") !== null;"#
        );
    }

    #[test]
    fn test_scroll_scripts_end_with_position() {
        assert!(scroll_region_to(".main", 800).ends_with("el.scrollTop = 800; }"));
        assert_eq!(scroll_document_to(1600), "window.scrollTo(0, 1600);");
    }
}

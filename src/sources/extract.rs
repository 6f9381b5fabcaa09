//! Best-effort element queries shared by the rendered layouts.
//!
//! Every helper returns an empty string instead of failing when the element
//! or attribute is missing.

use crate::utils::collapse_whitespace;
use scraper::{ElementRef, Selector};

/// Parse a selector known at compile time.
pub fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid built-in selector {selector}: {e}"))
}

/// Non-empty lines of `element`'s text, trimmed, in document order.
///
/// Separate text nodes always start a new line.
pub fn text_lines(element: ElementRef<'_>) -> Vec<String> {
    element
        .text()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Visible text of `element` with whitespace collapsed.
pub fn inner_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&text_lines(element).join(" "))
}

/// Attribute value of `element`, trimmed.
pub fn attr(element: ElementRef<'_>, name: &str) -> String {
    element.value().attr(name).map(str::trim).unwrap_or_default().to_string()
}

/// Text of the first descendant matching `selector`.
pub fn first_text(element: ElementRef<'_>, selector: &Selector) -> String {
    element.select(selector).next().map(inner_text).unwrap_or_default()
}

/// Text of the first descendant matching any of `selectors` (in order) whose
/// text passes `accept`.
pub fn first_text_where(
    element: ElementRef<'_>,
    selectors: &[Selector],
    accept: impl Fn(&str) -> bool,
) -> String {
    selectors
        .iter()
        .filter_map(|selector| element.select(selector).next())
        .map(inner_text)
        .find(|text| !text.is_empty() && accept(text))
        .unwrap_or_default()
}

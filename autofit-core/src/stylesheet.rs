//! Stylesheet text generation.
//!
//! Everything here is a pure function of its inputs so the output can be
//! checked without a live document.

use crate::scale::css_number;
use crate::{FitError, IgnoreRule};

/// Node id of the scroll suppression stylesheet.
pub const SCROLL_STYLE_ID: &str = "autofit-style";

/// Node id of the ignore rule stylesheet.
pub const IGNORE_STYLE_ID: &str = "ignoreStyle";

/// Scroll suppression rule injected unless scrolling is allowed.
pub const SCROLL_LOCK_CSS: &str = "body {overflow: hidden;}";

/// Scroll suppression stylesheet text for the given setting.
#[must_use]
pub fn scroll_css(allow_scroll: bool) -> &'static str {
    if allow_scroll {
        ""
    } else {
        SCROLL_LOCK_CSS
    }
}

/// Generated ignore stylesheet plus the rules that had to be skipped.
#[derive(Debug, Default)]
pub struct IgnoreSheet {
    /// Complete stylesheet text, rules in input order.
    pub text: String,
    /// Number of rules that produced CSS.
    pub applied: usize,
    /// One error per skipped rule.
    pub skipped: Vec<FitError>,
}

/// Effective scale for a rule at the given page scale.
///
/// Rules without an explicit scale counter the page scale so the element
/// renders at its natural size.
#[must_use]
pub fn effective_scale(rule: &IgnoreRule, page_scale: f64) -> f64 {
    rule.explicit_scale().unwrap_or(1.0 / page_scale)
}

/// Build the CSS block(s) for a single rule.
///
/// # Errors
///
/// Returns [`FitError::Selector`] when the rule has no usable selector.
pub fn rule_css(rule: &IgnoreRule, page_scale: f64) -> Result<String, FitError> {
    let selector = rule.selector();
    if selector.is_empty() {
        return Err(FitError::selector(
            selector,
            "found invalid or empty selector/object",
        ));
    }

    let scale = effective_scale(rule, page_scale);
    // Overrides only apply when the rule actually departs from the page scale.
    #[allow(clippy::float_cmp)]
    let departs = scale != page_scale;
    let width = rule.width().filter(|_| departs);
    let height = rule.height().filter(|_| departs);
    let font_size = rule.font_size().filter(|_| departs);

    let mut css = format!(
        "\n{selector} {{ transform: scale({})!important; transform-origin: 0 0;",
        css_number(scale)
    );
    if let Some(width) = width {
        css.push_str(&format!(" width: {width}!important;"));
    }
    if let Some(height) = height {
        css.push_str(&format!(" height: {height}!important;"));
    }
    css.push_str(" }");

    if let Some(font_size) = font_size {
        css.push_str(&format!(
            "\n{selector} div, {selector} span, {selector} a, {selector} * {{ font-size: {}px; }}",
            css_number(font_size)
        ));
    }
    Ok(css)
}

/// Build the whole ignore stylesheet for `rules` at `page_scale`.
///
/// Invalid rules are skipped and reported in [`IgnoreSheet::skipped`];
/// the remaining rules are still emitted in order.
#[must_use]
pub fn ignore_stylesheet(rules: &[IgnoreRule], page_scale: f64) -> IgnoreSheet {
    let mut sheet = IgnoreSheet::default();
    for rule in rules {
        match rule_css(rule, page_scale) {
            Ok(css) => {
                sheet.text.push_str(&css);
                sheet.applied += 1;
            }
            Err(err) => sheet.skipped.push(err),
        }
    }
    sheet
}

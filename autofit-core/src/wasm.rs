//! WebAssembly bindings for autofit-core.
//!
//! Exposes the pure parts of the engine (scale math, option parsing,
//! ignore stylesheet generation) to JavaScript. The live DOM binding
//! lives in `autofit-app`.

use wasm_bindgen::prelude::*;

use crate::{scale, stylesheet, FitOptions, IgnoreRule, Size};

/// Install the panic hook for readable errors in the console.
#[wasm_bindgen(js_name = installPanicHook)]
pub fn install_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Scale that fits a `dw`x`dh` design into a `cw`x`ch` viewport.
#[wasm_bindgen(js_name = computeScale)]
#[must_use]
pub fn compute_scale(cw: f64, ch: f64, dw: f64, dh: f64, limit: f64) -> f64 {
    scale::compute(Size::new(cw, ch), Size::new(dw, dh), limit).scale
}

/// Parse init options and return the canonical configuration as JSON.
///
/// # Errors
///
/// Returns an error string if the options are malformed or out of range.
#[wasm_bindgen(js_name = parseOptions)]
pub fn parse_options(json: &str) -> Result<String, String> {
    let config = FitOptions::from_json(json)
        .and_then(FitOptions::into_config)
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&config).map_err(|e| e.to_string())
}

/// Ignore stylesheet text for a JSON array of ignore rules at `page_scale`.
///
/// # Errors
///
/// Returns an error string if the rules are not valid JSON.
#[wasm_bindgen(js_name = ignoreStylesheet)]
pub fn ignore_stylesheet(rules_json: &str, page_scale: f64) -> Result<String, String> {
    let rules: Vec<IgnoreRule> = serde_json::from_str(rules_json).map_err(|e| e.to_string())?;
    Ok(stylesheet::ignore_stylesheet(&rules, page_scale).text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_scale_matches_half_viewport() {
        assert!((compute_scale(960.0, 540.0, 1920.0, 1080.0, 0.1) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn compute_scale_snaps_near_identity() {
        assert!((compute_scale(1850.0, 1040.0, 1920.0, 1080.0, 0.1) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_options_accepts_bare_selector() {
        let json = parse_options(r##""#app""##).expect("valid");
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value["el"], "#app");
        assert_eq!(value["dw"], 1920.0);
    }

    #[test]
    fn parse_options_rejects_garbage() {
        assert!(parse_options("{ not json").is_err());
        assert!(parse_options(r#"{"limit": 2}"#).is_err());
    }

    #[test]
    fn ignore_stylesheet_renders_rules() {
        let css = ignore_stylesheet(r#"[".badge"]"#, 0.5).expect("valid");
        assert!(css.contains(".badge { transform: scale(2)!important; transform-origin: 0 0; }"));
    }

    #[test]
    fn ignore_stylesheet_rejects_invalid_json() {
        assert!(ignore_stylesheet("[", 0.5).is_err());
    }
}

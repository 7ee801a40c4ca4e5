//! Init-time options and their canonical form.
//!
//! Options arrive either as a bare root selector or as a structured
//! object using the public field names (`el`, `dw`, `dh`, `resize`,
//! `ignore`, `transition`, `delay`, `limit`, `cssMode`, `allowScroll`,
//! `showInitTip`). Both shapes are parsed once into a [`FitConfig`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::{FitError, FitResult};

/// Default root element selector.
pub const DEFAULT_ROOT_SELECTOR: &str = "body";

/// Default design width in pixels.
pub const DEFAULT_DESIGN_WIDTH: f64 = 1920.0;

/// Default design height in pixels.
pub const DEFAULT_DESIGN_HEIGHT: f64 = 1080.0;

/// Default snap-to-identity tolerance.
pub const DEFAULT_SCALE_TOLERANCE: f64 = 0.1;

/// How the computed scale is applied to the root element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CssMode {
    /// `transform: scale(n)`.
    #[default]
    Scale,
    /// `zoom: n`; keeps pointer event offsets in layout coordinates.
    Zoom,
}

/// A per-element override that keeps an element out of the global scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IgnoreRule {
    /// Bare selector: counter-scale back to natural size.
    Selector(String),
    /// Selector with explicit overrides.
    Styled(IgnoreStyle),
}

/// Structured form of an [`IgnoreRule`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IgnoreStyle {
    /// Target selector. `dom` is accepted as a legacy alias.
    #[serde(rename = "el", alias = "dom", default)]
    pub selector: String,
    /// Explicit scale; defaults to the inverse of the page scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// CSS width, e.g. `"100px"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    /// CSS height, e.g. `"50%"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    /// Font size in pixels for text-bearing descendants.
    #[serde(
        rename = "fontSize",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub font_size: Option<f64>,
}

impl IgnoreRule {
    /// The selector this rule targets, trimmed.
    #[must_use]
    pub fn selector(&self) -> &str {
        match self {
            Self::Selector(selector) => selector.trim(),
            Self::Styled(style) => style.selector.trim(),
        }
    }

    /// Explicit scale, if one was supplied. Zero counts as absent.
    #[must_use]
    pub fn explicit_scale(&self) -> Option<f64> {
        match self {
            Self::Selector(_) => None,
            Self::Styled(style) => style.scale.filter(|s| *s != 0.0 && s.is_finite()),
        }
    }

    /// Explicit width, if non-empty.
    #[must_use]
    pub fn width(&self) -> Option<&str> {
        self.styled()
            .and_then(|s| s.width.as_deref())
            .filter(|w| !w.is_empty())
    }

    /// Explicit height, if non-empty.
    #[must_use]
    pub fn height(&self) -> Option<&str> {
        self.styled()
            .and_then(|s| s.height.as_deref())
            .filter(|h| !h.is_empty())
    }

    /// Explicit font size in pixels. Zero counts as absent.
    #[must_use]
    pub fn font_size(&self) -> Option<f64> {
        self.styled()
            .and_then(|s| s.font_size)
            .filter(|f| *f != 0.0 && f.is_finite())
    }

    fn styled(&self) -> Option<&IgnoreStyle> {
        match self {
            Self::Selector(_) => None,
            Self::Styled(style) => Some(style),
        }
    }
}

impl From<&str> for IgnoreRule {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_string())
    }
}

impl From<IgnoreStyle> for IgnoreRule {
    fn from(style: IgnoreStyle) -> Self {
        Self::Styled(style)
    }
}

/// Canonical configuration for one activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Selector of the element to scale.
    #[serde(rename = "el")]
    pub root_selector: String,
    /// Design width in pixels.
    #[serde(rename = "dw")]
    pub design_width: f64,
    /// Design height in pixels.
    #[serde(rename = "dh")]
    pub design_height: f64,
    /// Re-fit on viewport resize.
    #[serde(rename = "resize")]
    pub auto_resize: bool,
    /// Elements kept out of the global scale, in cascade order.
    #[serde(rename = "ignore")]
    pub ignore: Vec<IgnoreRule>,
    /// Root transition duration in seconds, applied after the first pass.
    #[serde(rename = "transition")]
    pub transition_seconds: f64,
    /// Resize debounce delay in milliseconds; 0 runs passes immediately.
    #[serde(rename = "delay", deserialize_with = "lenient_delay")]
    pub resize_delay_ms: u32,
    /// Scales within this distance of 1 snap to exactly 1.
    #[serde(rename = "limit")]
    pub scale_tolerance: f64,
    /// How the scale is written to the root element.
    #[serde(rename = "cssMode")]
    pub css_mode: CssMode,
    /// Leave page scrolling enabled.
    #[serde(rename = "allowScroll")]
    pub allow_scroll: bool,
    /// Log a notice when activation starts.
    #[serde(rename = "showInitTip")]
    pub announce: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            root_selector: DEFAULT_ROOT_SELECTOR.to_string(),
            design_width: DEFAULT_DESIGN_WIDTH,
            design_height: DEFAULT_DESIGN_HEIGHT,
            auto_resize: true,
            ignore: Vec::new(),
            transition_seconds: 0.0,
            resize_delay_ms: 0,
            scale_tolerance: DEFAULT_SCALE_TOLERANCE,
            css_mode: CssMode::Scale,
            allow_scroll: false,
            announce: true,
        }
    }
}

impl FitConfig {
    /// Default configuration targeting `root_selector`.
    #[must_use]
    pub fn new(root_selector: impl Into<String>) -> Self {
        Self {
            root_selector: root_selector.into(),
            ..Self::default()
        }
    }

    /// Set the design resolution.
    #[must_use]
    pub fn with_design(mut self, width: f64, height: f64) -> Self {
        self.design_width = width;
        self.design_height = height;
        self
    }

    /// Append an ignore rule.
    #[must_use]
    pub fn with_ignore(mut self, rule: impl Into<IgnoreRule>) -> Self {
        self.ignore.push(rule.into());
        self
    }

    /// Check ranges that the scale formula depends on.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::Configuration`] for an empty root selector,
    /// non-positive design dimensions, a tolerance outside `[0, 1]` or a
    /// negative transition.
    pub fn validate(&self) -> FitResult<()> {
        if self.root_selector.trim().is_empty() {
            return Err(FitError::Configuration("root selector is empty".into()));
        }
        if !(self.design_width.is_finite() && self.design_width > 0.0)
            || !(self.design_height.is_finite() && self.design_height > 0.0)
        {
            return Err(FitError::Configuration(format!(
                "design size must be positive, got {}x{}",
                self.design_width, self.design_height
            )));
        }
        if !(0.0..=1.0).contains(&self.scale_tolerance) {
            return Err(FitError::Configuration(format!(
                "limit must be within 0..=1, got {}",
                self.scale_tolerance
            )));
        }
        if !(self.transition_seconds.is_finite() && self.transition_seconds >= 0.0) {
            return Err(FitError::Configuration(format!(
                "transition must be a non-negative number of seconds, got {}",
                self.transition_seconds
            )));
        }
        Ok(())
    }
}

/// Options as supplied by the caller: a bare selector or a full object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FitOptions {
    /// Shorthand for `{ el: <selector> }`.
    Selector(String),
    /// Structured options; absent fields take their defaults.
    Options(FitConfig),
}

impl Default for FitOptions {
    fn default() -> Self {
        Self::Options(FitConfig::default())
    }
}

impl FitOptions {
    /// Parse options from JSON. An empty input means all defaults.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::InvalidOptions`] if the JSON does not match
    /// either option shape.
    pub fn from_json(json: &str) -> FitResult<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve into a validated [`FitConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`FitError::Configuration`] if validation fails.
    pub fn into_config(self) -> FitResult<FitConfig> {
        let config = match self {
            Self::Selector(selector) => FitConfig::new(selector),
            Self::Options(config) => config,
        };
        config.validate()?;
        Ok(config)
    }
}

impl From<&str> for FitOptions {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_string())
    }
}

impl From<FitConfig> for FitOptions {
    fn from(config: FitConfig) -> Self {
        Self::Options(config)
    }
}

/// Accept any JSON number for `delay`; fractions round, negatives and
/// non-finite values mean no delay.
fn lenient_delay<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = f64::deserialize(deserializer)?;
    if !ms.is_finite() || ms <= 0.0 {
        return Ok(0);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let ms = ms.round().min(f64::from(u32::MAX)) as u32;
    Ok(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_defaults() {
        let config = FitOptions::from_json("")
            .and_then(FitOptions::into_config)
            .expect("defaults are valid");
        assert_eq!(config, FitConfig::default());
        assert_eq!(config.root_selector, "body");
        assert!((config.design_width - 1920.0).abs() < f64::EPSILON);
        assert!((config.design_height - 1080.0).abs() < f64::EPSILON);
        assert!(config.auto_resize);
        assert!((config.scale_tolerance - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.css_mode, CssMode::Scale);
        assert!(!config.allow_scroll);
    }

    #[test]
    fn fractional_or_negative_delay_is_accepted() {
        let delay = |json: &str| {
            FitOptions::from_json(json)
                .and_then(FitOptions::into_config)
                .expect("valid")
                .resize_delay_ms
        };
        assert_eq!(delay(r#"{"delay": 150}"#), 150);
        assert_eq!(delay(r#"{"delay": 150.5}"#), 151);
        assert_eq!(delay(r#"{"delay": 149.4}"#), 149);
        assert_eq!(delay(r#"{"delay": -20}"#), 0);
        assert_eq!(delay(r#"{"delay": 1e12}"#), u32::MAX);
    }

    #[test]
    fn bare_string_is_root_selector() {
        let config = FitOptions::from_json(r##""#app""##)
            .and_then(FitOptions::into_config)
            .expect("valid");
        assert_eq!(config.root_selector, "#app");
        assert!((config.design_width - 1920.0).abs() < f64::EPSILON);
    }

    #[test]
    fn object_uses_public_field_names() {
        let json = r##"{
            "el": "#screen",
            "dw": 1280,
            "dh": 720,
            "resize": false,
            "transition": 0.3,
            "delay": 150,
            "limit": 0.05,
            "cssMode": "zoom",
            "allowScroll": true,
            "showInitTip": false,
            "ignore": [".badge", {"el": ".chart", "scale": 1.5, "width": "100px", "fontSize": 14}]
        }"##;
        let config = FitOptions::from_json(json)
            .and_then(FitOptions::into_config)
            .expect("valid");
        assert_eq!(config.root_selector, "#screen");
        assert!((config.design_width - 1280.0).abs() < f64::EPSILON);
        assert!(!config.auto_resize);
        assert_eq!(config.resize_delay_ms, 150);
        assert_eq!(config.css_mode, CssMode::Zoom);
        assert!(config.allow_scroll);
        assert!(!config.announce);
        assert_eq!(config.ignore.len(), 2);
        assert_eq!(config.ignore[0], IgnoreRule::Selector(".badge".into()));
        assert_eq!(config.ignore[1].selector(), ".chart");
        assert_eq!(config.ignore[1].explicit_scale(), Some(1.5));
        assert_eq!(config.ignore[1].width(), Some("100px"));
        assert_eq!(config.ignore[1].height(), None);
        assert_eq!(config.ignore[1].font_size(), Some(14.0));
    }

    #[test]
    fn dom_alias_is_accepted() {
        let rule: IgnoreRule = serde_json::from_str(r#"{"dom": ".legacy"}"#).expect("parses");
        assert_eq!(rule.selector(), ".legacy");
    }

    #[test]
    fn zero_and_empty_overrides_count_as_absent() {
        let rule = IgnoreRule::Styled(IgnoreStyle {
            selector: ".x".into(),
            scale: Some(0.0),
            width: Some(String::new()),
            height: None,
            font_size: Some(0.0),
        });
        assert_eq!(rule.explicit_scale(), None);
        assert_eq!(rule.width(), None);
        assert_eq!(rule.font_size(), None);
    }

    #[test]
    fn rejects_unknown_css_mode() {
        let result = FitOptions::from_json(r#"{"cssMode": "stretch"}"#);
        assert!(matches!(result, Err(FitError::InvalidOptions(_))));
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        assert!(FitConfig::new("").validate().is_err());
        assert!(FitConfig::default().with_design(0.0, 1080.0).validate().is_err());
        assert!(FitConfig::default()
            .with_design(f64::NAN, 1080.0)
            .validate()
            .is_err());

        let mut config = FitConfig::default();
        config.scale_tolerance = 1.5;
        assert!(matches!(config.validate(), Err(FitError::Configuration(_))));

        let mut config = FitConfig::default();
        config.transition_seconds = -1.0;
        assert!(config.validate().is_err());
    }
}

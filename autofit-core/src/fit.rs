//! Fit engine: scales the root element and maintains the ignore stylesheet.

use crate::scale::{self, css_number, ScaleOutcome};
use crate::stylesheet::{self, IGNORE_STYLE_ID, SCROLL_STYLE_ID};
use crate::{CssMode, Document, FitConfig, FitError, FitResult, IgnoreRule, Size};

/// Outcome of one scale pass.
#[derive(Debug)]
pub struct PassReport {
    /// Computed scale and root box.
    pub outcome: ScaleOutcome,
    /// Ignore rules written to the stylesheet.
    pub ignore_applied: usize,
    /// Ignore rules skipped this pass.
    pub skipped: Vec<FitError>,
}

impl PassReport {
    /// The published scale.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.outcome.scale
    }
}

/// Fits one root element to the viewport.
#[derive(Debug, Clone)]
pub struct FitEngine<E> {
    config: FitConfig,
    root: E,
}

impl<E: Clone + PartialEq + std::fmt::Debug> FitEngine<E> {
    /// Resolve the root element for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::Configuration`] if the root selector matches nothing.
    pub fn locate<D>(doc: &D, config: FitConfig) -> FitResult<Self>
    where
        D: Document<Element = E>,
    {
        let root = doc
            .query_first(&config.root_selector)
            .map_err(|e| FitError::Configuration(format!("'{}': {e}", config.root_selector)))?
            .ok_or_else(|| {
                FitError::Configuration(format!("'{}' is not exist", config.root_selector))
            })?;
        Ok(Self { config, root })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// The root element handle.
    #[must_use]
    pub fn root(&self) -> &E {
        &self.root
    }

    /// Inject the stylesheets and prepare the root box.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::Dom`] if the document rejects a write.
    pub fn install<D>(&self, doc: &mut D) -> FitResult<()>
    where
        D: Document<Element = E>,
    {
        doc.insert_stylesheet(SCROLL_STYLE_ID, stylesheet::scroll_css(self.config.allow_scroll))?;
        doc.insert_stylesheet(IGNORE_STYLE_ID, "")?;

        let design = self.design();
        doc.set_style(&self.root, "height", &px(design.height))?;
        doc.set_style(&self.root, "width", &px(design.width))?;
        doc.set_style(&self.root, "transform-origin", "0 0")?;
        if !self.config.allow_scroll {
            doc.set_style(&self.root, "overflow", "hidden")?;
        }
        Ok(())
    }

    /// Run one scale pass against the current viewport.
    ///
    /// Returns `None` without touching the document while the viewport has
    /// no area, e.g. before layout.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::Dom`] if the root or the ignore stylesheet cannot
    /// be written. Bad ignore rules do not fail the pass; they are returned in
    /// [`PassReport::skipped`].
    pub fn pass<D>(&self, doc: &mut D) -> FitResult<Option<PassReport>>
    where
        D: Document<Element = E>,
    {
        let viewport = doc.viewport_size();
        if viewport.is_empty() {
            tracing::warn!(
                width = viewport.width,
                height = viewport.height,
                "autofit: viewport has no area, pass skipped"
            );
            return Ok(None);
        }
        let outcome = scale::compute(viewport, self.design(), self.config.scale_tolerance);
        tracing::debug!(
            raw = outcome.raw,
            scale = outcome.scale,
            width = outcome.root.width,
            height = outcome.root.height,
            "Fit pass for viewport {}x{}",
            viewport.width,
            viewport.height
        );

        // Box before transform.
        doc.set_style(&self.root, "height", &px(outcome.root.height))?;
        doc.set_style(&self.root, "width", &px(outcome.root.width))?;
        match self.config.css_mode {
            CssMode::Zoom => doc.set_style(&self.root, "zoom", &css_number(outcome.scale))?,
            CssMode::Scale => doc.set_style(
                &self.root,
                "transform",
                &format!("scale({})", css_number(outcome.scale)),
            )?,
        }

        let (rules, mut skipped) = self.resolvable_rules(doc);
        let sheet = stylesheet::ignore_stylesheet(&rules, outcome.scale);
        skipped.extend(sheet.skipped);
        for err in &skipped {
            tracing::error!("autofit: {err}");
        }
        doc.set_stylesheet_text(IGNORE_STYLE_ID, &sheet.text)?;

        Ok(Some(PassReport {
            outcome,
            ignore_applied: sheet.applied,
            skipped,
        }))
    }

    /// Enable the configured root transition.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::Dom`] if the style write fails.
    pub fn apply_transition<D>(&self, doc: &mut D) -> FitResult<()>
    where
        D: Document<Element = E>,
    {
        let value = format!("{}s", css_number(self.config.transition_seconds));
        doc.set_style(&self.root, "transition", &value)?;
        Ok(())
    }

    fn design(&self) -> Size {
        Size::new(self.config.design_width, self.config.design_height)
    }

    /// Drop rules whose selector the document refuses to parse.
    fn resolvable_rules<D>(&self, doc: &D) -> (Vec<IgnoreRule>, Vec<FitError>)
    where
        D: Document<Element = E>,
    {
        let mut rules = Vec::with_capacity(self.config.ignore.len());
        let mut skipped = Vec::new();
        for rule in &self.config.ignore {
            let selector = rule.selector();
            if selector.is_empty() {
                // Reported by the stylesheet builder.
                rules.push(rule.clone());
                continue;
            }
            match doc.query_all(selector) {
                Ok(matches) => {
                    if matches.is_empty() {
                        tracing::debug!(selector, "Ignore rule matches no element yet");
                    }
                    rules.push(rule.clone());
                }
                Err(err) => skipped.push(FitError::selector(selector, err.to_string())),
            }
        }
        (rules, skipped)
    }
}

/// Remove everything [`FitEngine::install`] and passes added.
///
/// The root is located by `root_selector`, falling back to `fallback`.
///
/// # Errors
///
/// Returns [`FitError::Teardown`] on the first failing step.
pub fn teardown<D: Document>(doc: &mut D, root_selector: Option<&str>, fallback: &str) -> FitResult<()> {
    let fail = |e: crate::DomError| FitError::Teardown(e.to_string());

    doc.remove_stylesheet(SCROLL_STYLE_ID).map_err(fail)?;
    doc.remove_stylesheet(IGNORE_STYLE_ID).map_err(fail)?;

    let mut root = None;
    if let Some(selector) = root_selector {
        root = doc.query_first(selector).map_err(fail)?;
    }
    if root.is_none() {
        root = doc.query_first(fallback).map_err(fail)?;
    }
    if let Some(root) = root {
        doc.reset_style(&root).map_err(fail)?;
    }
    Ok(())
}

fn px(value: f64) -> String {
    format!("{}px", css_number(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;
    use crate::IgnoreStyle;

    fn host(width: f64, height: f64) -> MemoryHost {
        let mut host = MemoryHost::new(width, height);
        host.add_element(&["body"], Size::new(width, height));
        host
    }

    #[test]
    fn locate_fails_for_missing_root() {
        let host = host(960.0, 540.0);
        let result = FitEngine::locate(&host, FitConfig::new("#missing"));
        assert!(matches!(result, Err(FitError::Configuration(_))));
    }

    #[test]
    fn install_prepares_root_and_stylesheets() {
        let mut host = host(960.0, 540.0);
        let engine = FitEngine::locate(&host, FitConfig::default()).expect("body exists");
        engine.install(&mut host).expect("install");

        let root = *engine.root();
        assert_eq!(host.style(root, "width"), Some("1920px"));
        assert_eq!(host.style(root, "height"), Some("1080px"));
        assert_eq!(host.style(root, "transform-origin"), Some("0 0"));
        assert_eq!(host.style(root, "overflow"), Some("hidden"));
        assert_eq!(host.stylesheet(SCROLL_STYLE_ID), Some("body {overflow: hidden;}"));
        assert_eq!(host.stylesheet(IGNORE_STYLE_ID), Some(""));
    }

    #[test]
    fn allow_scroll_leaves_overflow_alone() {
        let mut host = host(960.0, 540.0);
        let mut config = FitConfig::default();
        config.allow_scroll = true;
        let engine = FitEngine::locate(&host, config).expect("body exists");
        engine.install(&mut host).expect("install");
        assert_eq!(host.style(*engine.root(), "overflow"), None);
        assert_eq!(host.stylesheet(SCROLL_STYLE_ID), Some(""));
    }

    #[test]
    fn pass_writes_box_and_transform() {
        let mut host = host(960.0, 540.0);
        let engine = FitEngine::locate(&host, FitConfig::default()).expect("body exists");
        engine.install(&mut host).expect("install");
        let report = engine.pass(&mut host).expect("pass").expect("sized viewport");

        assert!((report.scale() - 0.5).abs() < f64::EPSILON);
        let root = *engine.root();
        assert_eq!(host.style(root, "width"), Some("1920px"));
        assert_eq!(host.style(root, "height"), Some("1080px"));
        assert_eq!(host.style(root, "transform"), Some("scale(0.5)"));
        assert_eq!(host.style(root, "zoom"), None);
    }

    #[test]
    fn empty_viewport_skips_pass() {
        let mut host = host(960.0, 540.0);
        let config = FitConfig::default().with_ignore(".badge");
        let engine = FitEngine::locate(&host, config).expect("body exists");
        engine.install(&mut host).expect("install");
        host.set_viewport(0.0, 0.0);

        assert!(engine.pass(&mut host).expect("pass").is_none());
        let root = *engine.root();
        assert_eq!(host.style(root, "width"), Some("1920px"));
        assert_eq!(host.style(root, "transform"), None);
        assert_eq!(host.stylesheet(IGNORE_STYLE_ID), Some(""));
    }

    #[test]
    fn zoom_mode_sets_zoom_instead_of_transform() {
        let mut host = host(960.0, 540.0);
        let mut config = FitConfig::default();
        config.css_mode = CssMode::Zoom;
        let engine = FitEngine::locate(&host, config).expect("body exists");
        engine.install(&mut host).expect("install");
        engine.pass(&mut host).expect("pass");
        assert_eq!(host.style(*engine.root(), "zoom"), Some("0.5"));
        assert_eq!(host.style(*engine.root(), "transform"), None);
    }

    #[test]
    fn unparseable_ignore_selector_is_skipped() {
        let mut host = host(960.0, 540.0);
        let config = FitConfig::default()
            .with_ignore("div[broken")
            .with_ignore(IgnoreStyle {
                selector: ".ok".into(),
                ..IgnoreStyle::default()
            });
        let engine = FitEngine::locate(&host, config).expect("body exists");
        engine.install(&mut host).expect("install");
        let report = engine.pass(&mut host).expect("pass").expect("sized viewport");

        assert_eq!(report.ignore_applied, 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].is_recoverable());
        let sheet = host.stylesheet(IGNORE_STYLE_ID).expect("sheet exists");
        assert!(sheet.contains(".ok {"));
        assert!(!sheet.contains("broken"));
    }

    #[test]
    fn transition_is_written_in_seconds() {
        let mut host = host(960.0, 540.0);
        let mut config = FitConfig::default();
        config.transition_seconds = 0.3;
        let engine = FitEngine::locate(&host, config).expect("body exists");
        engine.apply_transition(&mut host).expect("transition");
        assert_eq!(host.style(*engine.root(), "transition"), Some("0.3s"));
    }

    #[test]
    fn teardown_falls_back_when_root_selector_is_gone() {
        let mut host = host(960.0, 540.0);
        let body = host.query_first("body").expect("valid").expect("exists");
        host.set_style(&body, "width", "10px").expect("write");
        teardown(&mut host, Some("#gone"), "body").expect("teardown");
        assert_eq!(host.style(body, "width"), None);
    }
}

//! Rectification: keep chosen elements at their natural on-screen size.
//!
//! Each target element gets an inverse transform of the page scale plus a
//! box resized from its cached original size, so what the user sees is
//! `original * level` no matter how the page is scaled.

use serde::{Deserialize, Serialize};

use crate::scale::css_number;
use crate::session::{PassContext, ScaleObserver};
use crate::{Document, FitError, FitResult, Host, Size};

/// Options for [`Rectifier::rectify`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RectifyOptions {
    /// Size from the cached original box; otherwise fill the parent by percentage.
    pub keep_ratio: bool,
    /// Extra zoom applied on top of the natural size.
    pub level: f64,
}

impl Default for RectifyOptions {
    fn default() -> Self {
        Self {
            keep_ratio: true,
            level: 1.0,
        }
    }
}

/// Box multiplier applied before the inverse transform.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn rectification_factor(page_scale: f64, level: f64) -> f64 {
    if page_scale == 1.0 {
        1.0
    } else {
        page_scale * level
    }
}

#[derive(Debug, Clone)]
struct CachedBox<E> {
    element: E,
    original: Size,
}

/// Tracks the single active rectification target.
#[derive(Debug, Clone)]
pub struct Rectifier<E> {
    target: Option<String>,
    options: RectifyOptions,
    active: bool,
    cache: Vec<CachedBox<E>>,
}

impl<E> Default for Rectifier<E> {
    fn default() -> Self {
        Self {
            target: None,
            options: RectifyOptions::default(),
            active: false,
            cache: Vec::new(),
        }
    }
}

impl<E: Clone + PartialEq + std::fmt::Debug> Rectifier<E> {
    /// Create an inactive rectifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a target is currently rectified.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The recorded target selector.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// The recorded options.
    #[must_use]
    pub fn options(&self) -> RectifyOptions {
        self.options
    }

    /// Cached original box of `element`, if one was recorded.
    #[must_use]
    pub fn original_size(&self, element: &E) -> Option<Size> {
        self.cache
            .iter()
            .find(|entry| entry.element == *element)
            .map(|entry| entry.original)
    }

    /// Number of cached original boxes.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Rectify every element matching `target` at `page_scale`.
    ///
    /// Any previous target is restored first. Returns the number of
    /// rectified elements.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::Selector`] for an empty or unmatched selector, in
    /// which case rectification stays inactive.
    pub fn rectify<D>(
        &mut self,
        doc: &mut D,
        page_scale: f64,
        target: &str,
        options: RectifyOptions,
    ) -> FitResult<usize>
    where
        D: Document<Element = E>,
    {
        if let Err(err) = self.unrectify(doc) {
            tracing::warn!("autofit: failed to restore previous rectification: {err}");
        }

        let target = target.trim();
        if target.is_empty() {
            self.target = None;
            return Err(FitError::selector(target, "bad selector"));
        }
        self.target = Some(target.to_string());
        self.options = options;
        self.apply(doc, page_scale)
    }

    /// Restore natural styles on the recorded target and deactivate.
    ///
    /// Does nothing when no target was ever recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be queried or restyled.
    pub fn unrectify<D>(&mut self, doc: &mut D) -> FitResult<()>
    where
        D: Document<Element = E>,
    {
        let Some(target) = self.target.as_deref() else {
            return Ok(());
        };
        self.active = false;
        self.cache.clear();

        for element in doc.query_all(target)? {
            doc.remove_style(&element, "width")?;
            doc.remove_style(&element, "height")?;
            doc.remove_style(&element, "transform")?;
        }
        Ok(())
    }

    /// Re-apply the recorded target at a new page scale, keeping cached originals.
    fn apply<D>(&mut self, doc: &mut D, page_scale: f64) -> FitResult<usize>
    where
        D: Document<Element = E>,
    {
        let Some(target) = self.target.clone() else {
            return Ok(0);
        };
        let elements = doc
            .query_all(&target)
            .map_err(|e| FitError::selector(target.as_str(), e.to_string()))?;
        if elements.is_empty() {
            return Err(FitError::selector(target, "elRectification found no element"));
        }
        // Elements that left the document lose their originals.
        self.cache.retain(|entry| elements.contains(&entry.element));

        let factor = rectification_factor(page_scale, self.options.level);
        let inverse = format!("scale({})", css_number(1.0 / page_scale));
        for element in &elements {
            let original = self.cached_or_measure(doc, element);
            let (width, height) = if self.options.keep_ratio {
                (
                    format!("{}px", css_number(original.width * factor)),
                    format!("{}px", css_number(original.height * factor)),
                )
            } else {
                let percent = format!("{}%", css_number(100.0 * factor));
                (percent.clone(), percent)
            };
            doc.set_style(element, "width", &width)?;
            doc.set_style(element, "height", &height)?;
            doc.set_style(element, "transform", &inverse)?;
            doc.set_style(element, "transform-origin", "0 0")?;
        }

        self.active = true;
        tracing::debug!(
            selector = target.as_str(),
            count = elements.len(),
            scale = page_scale,
            factor,
            "Rectified elements"
        );
        Ok(elements.len())
    }

    fn cached_or_measure<D>(&mut self, doc: &D, element: &E) -> Size
    where
        D: Document<Element = E>,
    {
        if let Some(original) = self.original_size(element) {
            return original;
        }
        let original = doc.client_size(element);
        self.cache.push(CachedBox {
            element: element.clone(),
            original,
        });
        original
    }
}

impl<H: Host> ScaleObserver<H> for Rectifier<H::Element> {
    fn after_pass(&mut self, host: &mut H, pass: &PassContext) {
        if !self.active {
            return;
        }
        if let Err(err) = self.apply(host, pass.scale) {
            tracing::error!("autofit: {err}");
        }
    }

    fn on_deactivate(&mut self, host: &mut H) {
        if !self.active {
            return;
        }
        if let Err(err) = self.unrectify(host) {
            tracing::error!("autofit: failed to turn rectification off: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryElementId, MemoryHost};

    fn setup() -> (MemoryHost, MemoryElementId) {
        let mut host = MemoryHost::new(960.0, 540.0);
        let card = host.add_element(&[".card"], Size::new(200.0, 100.0));
        (host, card)
    }

    #[test]
    fn factor_is_identity_at_native_scale() {
        assert!((rectification_factor(1.0, 3.0) - 1.0).abs() < f64::EPSILON);
        assert!((rectification_factor(0.5, 2.0) - 1.0).abs() < f64::EPSILON);
        assert!((rectification_factor(0.5, 1.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn keep_ratio_scales_cached_box() {
        let (mut host, card) = setup();
        let mut rectifier = Rectifier::new();
        let count = rectifier
            .rectify(&mut host, 0.5, ".card", RectifyOptions::default())
            .expect("rectify");

        assert_eq!(count, 1);
        assert!(rectifier.is_active());
        assert_eq!(host.style(card, "width"), Some("100px"));
        assert_eq!(host.style(card, "height"), Some("50px"));
        assert_eq!(host.style(card, "transform"), Some("scale(2)"));
        assert_eq!(host.style(card, "transform-origin"), Some("0 0"));
        assert_eq!(rectifier.original_size(&card), Some(Size::new(200.0, 100.0)));
    }

    #[test]
    fn fill_mode_uses_percentages() {
        let (mut host, card) = setup();
        let mut rectifier = Rectifier::new();
        let options = RectifyOptions {
            keep_ratio: false,
            level: 1.0,
        };
        rectifier
            .rectify(&mut host, 0.5, ".card", options)
            .expect("rectify");
        assert_eq!(host.style(card, "width"), Some("50%"));
        assert_eq!(host.style(card, "height"), Some("50%"));
    }

    #[test]
    fn empty_or_unmatched_target_stays_inactive() {
        let (mut host, _) = setup();
        let mut rectifier = Rectifier::new();

        let err = rectifier
            .rectify(&mut host, 0.5, "  ", RectifyOptions::default())
            .expect_err("empty selector");
        assert!(err.is_recoverable());
        assert!(!rectifier.is_active());

        let err = rectifier
            .rectify(&mut host, 0.5, ".nothing", RectifyOptions::default())
            .expect_err("no match");
        assert!(err.is_recoverable());
        assert!(!rectifier.is_active());
    }

    #[test]
    fn replay_drops_detached_elements_from_cache() {
        let (mut host, first) = setup();
        let second = host.add_element(&[".card"], Size::new(300.0, 150.0));
        let mut rectifier = Rectifier::new();
        rectifier
            .rectify(&mut host, 0.5, ".card", RectifyOptions::default())
            .expect("rectify");
        assert_eq!(rectifier.cached_len(), 2);

        host.detach(first);
        let pass = PassContext {
            scale: 0.25,
            running: true,
        };
        rectifier.after_pass(&mut host, &pass);

        assert!(rectifier.is_active());
        assert_eq!(rectifier.cached_len(), 1);
        assert_eq!(rectifier.original_size(&first), None);
        assert_eq!(rectifier.original_size(&second), Some(Size::new(300.0, 150.0)));
        assert_eq!(host.style(second, "width"), Some("75px"));
    }

    #[test]
    fn unrectify_without_target_is_noop() {
        let (mut host, _) = setup();
        let mut rectifier: Rectifier<MemoryElementId> = Rectifier::new();
        rectifier.unrectify(&mut host).expect("noop");
        assert!(!rectifier.is_active());
    }

    #[test]
    fn unrectify_clears_inline_overrides() {
        let (mut host, card) = setup();
        let mut rectifier = Rectifier::new();
        rectifier
            .rectify(&mut host, 0.5, ".card", RectifyOptions::default())
            .expect("rectify");
        rectifier.unrectify(&mut host).expect("unrectify");

        assert!(!rectifier.is_active());
        assert_eq!(host.style(card, "width"), None);
        assert_eq!(host.style(card, "height"), None);
        assert_eq!(host.style(card, "transform"), None);
        assert_eq!(rectifier.original_size(&card), None);
    }
}

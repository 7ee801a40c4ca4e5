//! In-memory host for headless use and tests.
//!
//! Elements are registered with the exact selectors they should match;
//! there is no selector engine. A selector with unbalanced brackets or a
//! dangling combinator is rejected as unparseable, the way a browser
//! would reject it.

use std::collections::BTreeMap;

use crate::host::{DomError, HostEvent, ResizeSignal, Timer, TimerTask};
use crate::{Document, Session, Size};

/// Handle to an element of a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryElementId(usize);

#[derive(Debug, Clone)]
struct MemoryElement {
    selectors: Vec<String>,
    natural: Size,
    style: BTreeMap<String, String>,
}

/// A pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    /// Handle returned by [`Timer::schedule`].
    pub handle: u32,
    /// Task to deliver.
    pub task: TimerTask,
    /// Requested delay.
    pub delay_ms: u32,
}

/// Headless document, timer and resize source.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    viewport: Size,
    elements: Vec<MemoryElement>,
    stylesheets: Vec<(String, String)>,
    subscribed: bool,
    timers: BTreeMap<u32, PendingTimer>,
    next_timer: u32,
    fail_removals: bool,
}

impl MemoryHost {
    /// Create an empty document with the given viewport.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            viewport: Size::new(width, height),
            elements: Vec::new(),
            stylesheets: Vec::new(),
            subscribed: false,
            timers: BTreeMap::new(),
            next_timer: 1,
            fail_removals: false,
        }
    }

    /// Add an element matching `selectors` with a natural box size.
    pub fn add_element(&mut self, selectors: &[&str], natural: Size) -> MemoryElementId {
        self.elements.push(MemoryElement {
            selectors: selectors.iter().map(ToString::to_string).collect(),
            natural,
            style: BTreeMap::new(),
        });
        MemoryElementId(self.elements.len() - 1)
    }

    /// Detach `element` so no selector matches it any more.
    pub fn detach(&mut self, element: MemoryElementId) {
        if let Some(e) = self.elements.get_mut(element.0) {
            e.selectors.clear();
        }
    }

    /// Change the viewport without notifying anyone.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Size::new(width, height);
    }

    /// Inline style property of `element`.
    #[must_use]
    pub fn style(&self, element: MemoryElementId, property: &str) -> Option<&str> {
        self.elements
            .get(element.0)
            .and_then(|e| e.style.get(property))
            .map(String::as_str)
    }

    /// Number of inline style properties on `element`.
    #[must_use]
    pub fn style_count(&self, element: MemoryElementId) -> usize {
        self.elements.get(element.0).map_or(0, |e| e.style.len())
    }

    /// Text of the stylesheet node `id`.
    #[must_use]
    pub fn stylesheet(&self, id: &str) -> Option<&str> {
        self.stylesheets
            .iter()
            .find(|(sheet_id, _)| sheet_id == id)
            .map(|(_, text)| text.as_str())
    }

    /// Number of stylesheet nodes.
    #[must_use]
    pub fn stylesheet_count(&self) -> usize {
        self.stylesheets.len()
    }

    /// Whether a resize listener is attached.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Timers that have not fired or been cancelled, oldest first.
    #[must_use]
    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.timers.values().copied().collect()
    }

    /// Remove and return every pending timer, oldest first.
    pub fn take_timers(&mut self) -> Vec<PendingTimer> {
        std::mem::take(&mut self.timers).into_values().collect()
    }

    /// Make stylesheet removal fail, to exercise teardown errors.
    pub fn fail_removals(&mut self, fail: bool) {
        self.fail_removals = fail;
    }

    fn check_selector(selector: &str) -> Result<(), DomError> {
        let selector = selector.trim();
        let balanced = |open: char, close: char| {
            selector.matches(open).count() == selector.matches(close).count()
        };
        let dangling = selector.ends_with(['>', '+', '~', ','])
            || selector.starts_with(['>', '+', '~', ',']);
        if selector.is_empty() || dangling || !balanced('[', ']') || !balanced('(', ')') {
            return Err(DomError::InvalidSelector(selector.to_string()));
        }
        Ok(())
    }

    fn parse_px(value: Option<&String>) -> Option<f64> {
        value?.strip_suffix("px")?.trim().parse().ok()
    }
}

impl Document for MemoryHost {
    type Element = MemoryElementId;

    fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>, DomError> {
        Self::check_selector(selector)?;
        let selector = selector.trim();
        Ok(self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.selectors.iter().any(|s| s == selector))
            .map(|(i, _)| MemoryElementId(i))
            .collect())
    }

    fn viewport_size(&self) -> Size {
        self.viewport
    }

    fn client_size(&self, element: &Self::Element) -> Size {
        let Some(e) = self.elements.get(element.0) else {
            return Size::default();
        };
        Size::new(
            Self::parse_px(e.style.get("width")).unwrap_or(e.natural.width),
            Self::parse_px(e.style.get("height")).unwrap_or(e.natural.height),
        )
    }

    fn set_style(
        &mut self,
        element: &Self::Element,
        property: &str,
        value: &str,
    ) -> Result<(), DomError> {
        let e = self
            .elements
            .get_mut(element.0)
            .ok_or_else(|| DomError::Host(format!("no element {}", element.0)))?;
        e.style.insert(property.to_string(), value.to_string());
        Ok(())
    }

    fn remove_style(&mut self, element: &Self::Element, property: &str) -> Result<(), DomError> {
        if let Some(e) = self.elements.get_mut(element.0) {
            e.style.remove(property);
        }
        Ok(())
    }

    fn reset_style(&mut self, element: &Self::Element) -> Result<(), DomError> {
        if let Some(e) = self.elements.get_mut(element.0) {
            e.style.clear();
        }
        Ok(())
    }

    fn insert_stylesheet(&mut self, id: &str, text: &str) -> Result<(), DomError> {
        self.stylesheets.retain(|(sheet_id, _)| sheet_id != id);
        self.stylesheets.push((id.to_string(), text.to_string()));
        Ok(())
    }

    fn set_stylesheet_text(&mut self, id: &str, text: &str) -> Result<(), DomError> {
        let sheet = self
            .stylesheets
            .iter_mut()
            .find(|(sheet_id, _)| sheet_id == id)
            .ok_or_else(|| DomError::MissingStylesheet(id.to_string()))?;
        sheet.1 = text.to_string();
        Ok(())
    }

    fn remove_stylesheet(&mut self, id: &str) -> Result<(), DomError> {
        if self.fail_removals {
            return Err(DomError::Host(format!("cannot detach '{id}'")));
        }
        self.stylesheets.retain(|(sheet_id, _)| sheet_id != id);
        Ok(())
    }
}

impl Timer for MemoryHost {
    type Handle = u32;

    fn schedule(&mut self, task: TimerTask, delay_ms: u32) -> Result<Self::Handle, DomError> {
        let handle = self.next_timer;
        self.next_timer += 1;
        self.timers.insert(
            handle,
            PendingTimer {
                handle,
                task,
                delay_ms,
            },
        );
        Ok(handle)
    }

    fn cancel(&mut self, handle: Self::Handle) {
        self.timers.remove(&handle);
    }
}

impl ResizeSignal for MemoryHost {
    fn subscribe_resize(&mut self) -> Result<(), DomError> {
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe_resize(&mut self) -> Result<(), DomError> {
        self.subscribed = false;
        Ok(())
    }
}

impl Session<MemoryHost> {
    /// Resize the viewport, delivering a resize event if a listener is attached.
    pub fn resize_to(&mut self, width: f64, height: f64) {
        self.host_mut().set_viewport(width, height);
        if self.host().is_subscribed() {
            self.dispatch(HostEvent::Resize);
        }
    }

    /// Fire every pending timer in scheduling order. Returns how many fired.
    pub fn run_timers(&mut self) -> usize {
        let due = self.host_mut().take_timers();
        for timer in &due {
            self.dispatch(HostEvent::Timer(timer.task));
        }
        due.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_matches_registered_selectors() {
        let mut host = MemoryHost::new(800.0, 600.0);
        let a = host.add_element(&[".card", "#first"], Size::new(10.0, 10.0));
        let b = host.add_element(&[".card"], Size::new(10.0, 10.0));

        assert_eq!(host.query_all(".card").expect("valid"), vec![a, b]);
        assert_eq!(host.query_first("#first").expect("valid"), Some(a));
        assert!(host.query_all(".none").expect("valid").is_empty());
    }

    #[test]
    fn malformed_selectors_are_rejected() {
        let host = MemoryHost::new(800.0, 600.0);
        for bad in ["", "div[", "a >", ":not(.x", ", .y"] {
            assert!(
                matches!(host.query_all(bad), Err(DomError::InvalidSelector(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn client_size_follows_inline_px() {
        let mut host = MemoryHost::new(800.0, 600.0);
        let el = host.add_element(&[".box"], Size::new(200.0, 100.0));
        assert_eq!(host.client_size(&el), Size::new(200.0, 100.0));

        host.set_style(&el, "width", "50px").expect("write");
        host.set_style(&el, "height", "50%").expect("write");
        assert_eq!(host.client_size(&el), Size::new(50.0, 100.0));
    }

    #[test]
    fn stylesheets_are_unique_by_id() {
        let mut host = MemoryHost::new(800.0, 600.0);
        host.insert_stylesheet("s", "a").expect("insert");
        host.insert_stylesheet("s", "b").expect("insert");
        assert_eq!(host.stylesheet_count(), 1);
        assert_eq!(host.stylesheet("s"), Some("b"));
        assert!(host.set_stylesheet_text("missing", "x").is_err());
        host.remove_stylesheet("missing").expect("missing is fine");
    }

    #[test]
    fn cancelled_timers_do_not_fire() {
        let mut host = MemoryHost::new(800.0, 600.0);
        let first = host.schedule(TimerTask::ResizePass, 100).expect("schedule");
        let second = host.schedule(TimerTask::ApplyTransition, 0).expect("schedule");
        host.cancel(first);

        let pending = host.pending_timers();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].handle, second);
        assert_eq!(pending[0].task, TimerTask::ApplyTransition);
    }
}

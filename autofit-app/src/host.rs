//! Browser host over `web-sys`.
//!
//! Resize listeners and timeouts call back into the session through a
//! [`Dispatcher`], which holds only a weak reference to it.

use std::cell::Cell;
use std::rc::Rc;

use autofit_core::{Document, DomError, HostEvent, ResizeSignal, Size, Timer, TimerTask};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlElement, HtmlStyleElement, Window};

/// Routes host notifications to the owning session.
pub type Dispatcher = Rc<dyn Fn(HostEvent)>;

struct PendingTimeout {
    id: i32,
    fired: Rc<Cell<bool>>,
    _callback: Closure<dyn FnMut()>,
}

/// Live browser document, timers and resize events.
pub struct WebHost {
    window: Window,
    document: web_sys::Document,
    dispatcher: Option<Dispatcher>,
    resize_listener: Option<Closure<dyn FnMut()>>,
    timeouts: Vec<PendingTimeout>,
}

impl WebHost {
    /// Bind to the global window and document.
    ///
    /// # Errors
    ///
    /// Returns an error outside a browser window context.
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window object"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("No document object"))?;
        Ok(Self {
            window,
            document,
            dispatcher: None,
            resize_listener: None,
            timeouts: Vec::new(),
        })
    }

    /// Set where resize and timer notifications are delivered.
    pub fn set_dispatcher(&mut self, dispatcher: Dispatcher) {
        self.dispatcher = Some(dispatcher);
    }

    fn dispatcher(&self) -> Result<Dispatcher, DomError> {
        self.dispatcher
            .clone()
            .ok_or_else(|| DomError::Host("host is not bound to a session".into()))
    }

    fn find_stylesheet(&self, id: &str) -> Option<web_sys::Element> {
        self.document.get_element_by_id(id)
    }
}

fn js_error(value: &JsValue) -> DomError {
    DomError::Host(
        value
            .as_string()
            .unwrap_or_else(|| format!("{value:?}")),
    )
}

impl Document for WebHost {
    type Element = HtmlElement;

    fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>, DomError> {
        let list = self
            .document
            .query_selector_all(selector)
            .map_err(|_| DomError::InvalidSelector(selector.to_string()))?;
        Ok((0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
            .collect())
    }

    fn viewport_size(&self) -> Size {
        self.document
            .document_element()
            .map(|root| Size::new(f64::from(root.client_width()), f64::from(root.client_height())))
            .unwrap_or_default()
    }

    fn client_size(&self, element: &Self::Element) -> Size {
        Size::new(
            f64::from(element.client_width()),
            f64::from(element.client_height()),
        )
    }

    fn set_style(
        &mut self,
        element: &Self::Element,
        property: &str,
        value: &str,
    ) -> Result<(), DomError> {
        element
            .style()
            .set_property(property, value)
            .map_err(|e| js_error(&e))
    }

    fn remove_style(&mut self, element: &Self::Element, property: &str) -> Result<(), DomError> {
        element
            .style()
            .remove_property(property)
            .map(|_| ())
            .map_err(|e| js_error(&e))
    }

    fn reset_style(&mut self, element: &Self::Element) -> Result<(), DomError> {
        element.style().set_css_text("");
        Ok(())
    }

    fn insert_stylesheet(&mut self, id: &str, text: &str) -> Result<(), DomError> {
        self.remove_stylesheet(id)?;
        let style = self
            .document
            .create_element("style")
            .map_err(|e| js_error(&e))?
            .dyn_into::<HtmlStyleElement>()
            .map_err(|_| DomError::Host("created element is not a <style>".into()))?;
        style.set_id(id);
        style.set_text_content(Some(text));
        let body = self
            .document
            .body()
            .ok_or_else(|| DomError::Host("document has no body".into()))?;
        body.append_child(&style).map_err(|e| js_error(&e))?;
        Ok(())
    }

    fn set_stylesheet_text(&mut self, id: &str, text: &str) -> Result<(), DomError> {
        let style = self
            .find_stylesheet(id)
            .ok_or_else(|| DomError::MissingStylesheet(id.to_string()))?;
        style.set_text_content(Some(text));
        Ok(())
    }

    fn remove_stylesheet(&mut self, id: &str) -> Result<(), DomError> {
        if let Some(style) = self.find_stylesheet(id) {
            style.remove();
        }
        Ok(())
    }
}

impl Timer for WebHost {
    type Handle = i32;

    fn schedule(&mut self, task: TimerTask, delay_ms: u32) -> Result<Self::Handle, DomError> {
        // Fired callbacks are finished by now; drop their closures.
        self.timeouts.retain(|t| !t.fired.get());

        let dispatcher = self.dispatcher()?;
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        let callback = Closure::<dyn FnMut()>::new(move || {
            dispatcher(HostEvent::Timer(task));
            flag.set(true);
        });

        let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
        let id = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                delay,
            )
            .map_err(|e| js_error(&e))?;
        self.timeouts.push(PendingTimeout {
            id,
            fired,
            _callback: callback,
        });
        Ok(id)
    }

    fn cancel(&mut self, handle: Self::Handle) {
        self.window.clear_timeout_with_handle(handle);
        self.timeouts.retain(|t| t.id != handle);
    }
}

impl ResizeSignal for WebHost {
    fn subscribe_resize(&mut self) -> Result<(), DomError> {
        if self.resize_listener.is_some() {
            return Ok(());
        }
        let dispatcher = self.dispatcher()?;
        let callback = Closure::<dyn FnMut()>::new(move || dispatcher(HostEvent::Resize));
        self.window
            .add_event_listener_with_callback("resize", callback.as_ref().unchecked_ref())
            .map_err(|e| js_error(&e))?;
        self.resize_listener = Some(callback);
        Ok(())
    }

    fn unsubscribe_resize(&mut self) -> Result<(), DomError> {
        if let Some(callback) = self.resize_listener.take() {
            self.window
                .remove_event_listener_with_callback("resize", callback.as_ref().unchecked_ref())
                .map_err(|e| js_error(&e))?;
        }
        Ok(())
    }
}

impl Drop for WebHost {
    fn drop(&mut self) {
        // The closures die with us; the browser must not call them afterwards.
        if let Err(err) = self.unsubscribe_resize() {
            tracing::warn!("autofit: resize listener left attached: {err}");
        }
        for timeout in self.timeouts.drain(..) {
            self.window.clear_timeout_with_handle(timeout.id);
        }
    }
}

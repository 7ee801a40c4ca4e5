//! # Autofit WASM Application
//!
//! This crate binds the autofit engine to the browser DOM so a page
//! designed for a fixed resolution fits any window.
//!
//! ## Usage
//!
//! Build for WASM:
//! ```bash
//! wasm-pack build --target web autofit-app
//! ```
//!
//! Then import in JavaScript:
//! ```javascript
//! import init, { Autofit } from './pkg/autofit_app.js';
//!
//! await init();
//! const autofit = new Autofit();
//! autofit.init({ el: '#app', dw: 1920, dh: 1080, ignore: ['.badge'] });
//! autofit.elRectification('.map', true, 1);
//! console.log(autofit.scale, autofit.isRunning);
//! autofit.off();
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod console;
pub mod host;

use std::{cell::RefCell, rc::Rc};

use autofit_core::{
    FitError, FitOptions, FitResult, HostEvent, RectifyOptions, Session, DEFAULT_ROOT_SELECTOR,
};
use wasm_bindgen::prelude::*;

pub use host::WebHost;

type SessionHandle = Rc<RefCell<Session<WebHost>>>;

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init_wasm() {
    console_error_panic_hook::set_once();
    console::init_logging(tracing::Level::INFO);
    tracing::debug!("autofit WASM initialized");
}

/// Turn the JS `options` argument into [`FitOptions`].
///
/// `undefined`/`null` mean all defaults, a string is the root selector,
/// anything else is read as an options object.
fn options_from_js(options: &JsValue) -> FitResult<FitOptions> {
    if options.is_undefined() || options.is_null() {
        return Ok(FitOptions::default());
    }
    if let Some(selector) = options.as_string() {
        return Ok(FitOptions::Selector(selector));
    }
    let json = js_sys::JSON::stringify(options)
        .map_err(|_| FitError::Configuration("options are not serializable".into()))?;
    FitOptions::from_json(&String::from(json))
}

/// Page fitting controller.
#[wasm_bindgen]
pub struct Autofit {
    session: SessionHandle,
}

#[wasm_bindgen]
impl Autofit {
    /// Create a controller bound to the current window.
    ///
    /// # Errors
    ///
    /// Returns an error outside a browser window context.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<Autofit, JsValue> {
        let session: SessionHandle = Rc::new(RefCell::new(Session::new(WebHost::new()?)));

        let weak = Rc::downgrade(&session);
        let dispatcher = Rc::new(move |event: HostEvent| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            // Events arrive on later ticks; a busy session means reentrancy.
            match session.try_borrow_mut() {
                Ok(mut session) => session.dispatch(event),
                Err(_) => tracing::warn!("autofit: dropped {event:?} while busy"),
            };
        });
        session.borrow_mut().host_mut().set_dispatcher(dispatcher);

        Ok(Self { session })
    }

    /// Start fitting. Accepts an options object, a root selector string,
    /// or nothing for the defaults. Returns whether fitting is running.
    pub fn init(&self, options: JsValue) -> bool {
        let options = match options_from_js(&options) {
            Ok(options) => options,
            Err(err) => {
                tracing::error!("autofit: {err}");
                return false;
            }
        };
        let mut session = self.session.borrow_mut();
        match session.activate(options) {
            Ok(Some(report)) => {
                tracing::debug!(scale = report.scale(), "autofit activated");
                true
            }
            Ok(None) => true,
            // Already reported by the session.
            Err(_) => false,
        }
    }

    /// Stop fitting and restore the page. `el` locates the root element
    /// when the active one cannot be found.
    pub fn off(&self, el: Option<String>) {
        let fallback = el.unwrap_or_else(|| DEFAULT_ROOT_SELECTOR.to_string());
        // Failures are logged by the session; it is stopped either way.
        let _ = self.session.borrow_mut().deactivate(&fallback);
    }

    /// Keep elements matching `el` at `level` times their natural size.
    ///
    /// With `keep_ratio` false the elements fill their parent instead.
    /// Returns the number of rectified elements.
    #[wasm_bindgen(js_name = elRectification)]
    pub fn el_rectification(&self, el: &str, keep_ratio: Option<bool>, level: Option<f64>) -> u32 {
        let defaults = RectifyOptions::default();
        let options = RectifyOptions {
            keep_ratio: keep_ratio.unwrap_or(defaults.keep_ratio),
            level: level.unwrap_or(defaults.level),
        };
        let count = self
            .session
            .borrow_mut()
            .rectify(el, options)
            .unwrap_or_default();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Stop rectifying and restore natural element styles.
    #[wasm_bindgen(js_name = offRectification)]
    pub fn off_rectification(&self) {
        if let Err(err) = self.session.borrow_mut().unrectify() {
            tracing::error!("autofit: {err}");
        }
    }

    /// Re-run a scale pass now. Returns the resulting scale.
    pub fn refit(&self) -> f64 {
        let mut session = self.session.borrow_mut();
        session.refit();
        session.scale()
    }

    /// Whether fitting is active.
    #[wasm_bindgen(getter, js_name = isRunning)]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.session.borrow().is_running()
    }

    /// Current page scale.
    #[wasm_bindgen(getter)]
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.session.borrow().scale()
    }
}

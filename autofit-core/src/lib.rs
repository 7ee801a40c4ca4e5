//! # Autofit Core
//!
//! Scales a page built for a fixed design resolution so it fits any
//! viewport, and keeps chosen elements at their natural size.
//! Compiles to WASM for true cross-platform portability.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  Session                    │
//! ├─────────────────────────────────────────────┤
//! │  Fit Engine       │  Rectifier              │
//! │  - Scale math     │  - Original box cache   │
//! │  - Root box       │  - Inverse transform    │
//! │  - Ignore sheet   │  - Replay on each pass  │
//! ├─────────────────────────────────────────────┤
//! │  Host: Document + Timer + ResizeSignal      │
//! │  (web-sys in autofit-app, MemoryHost here)  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use autofit_core::{FitConfig, IgnoreRule, MemoryHost, Session, Size};
//!
//! let mut host = MemoryHost::new(960.0, 540.0);
//! host.add_element(&["body"], Size::new(960.0, 540.0));
//!
//! let mut session = Session::new(host);
//! let config = FitConfig::default().with_ignore(IgnoreRule::from(".badge"));
//! let report = session.activate(config).expect("body exists").expect("sized viewport");
//! assert!((report.scale() - 0.5).abs() < f64::EPSILON);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod fit;
pub mod host;
pub mod memory;
pub mod rectify;
pub mod scale;
pub mod session;
pub mod stylesheet;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::{
    CssMode, FitConfig, FitOptions, IgnoreRule, IgnoreStyle, DEFAULT_ROOT_SELECTOR,
};
pub use error::{FitError, FitResult};
pub use fit::{FitEngine, PassReport};
pub use host::{Document, DomError, Host, HostEvent, ResizeSignal, Timer, TimerTask};
pub use memory::{MemoryElementId, MemoryHost};
pub use rectify::{Rectifier, RectifyOptions};
pub use scale::{ScaleOutcome, Size};
pub use session::{PassContext, RuntimeState, ScaleObserver, Session};

/// Autofit core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

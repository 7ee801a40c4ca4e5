//! Session: the runtime state of one activation and its lifecycle.
//!
//! A [`Session`] owns its host, the fit engine for the active
//! configuration and the rectifier. Resize notifications and timers
//! come back in through [`Session::dispatch`]. After every scale pass
//! the rectifier and any registered [`ScaleObserver`]s are notified.

use crate::fit::{self, FitEngine, PassReport};
use crate::rectify::{Rectifier, RectifyOptions};
use crate::{
    FitError, FitOptions, FitResult, Host, HostEvent, Timer, TimerTask, DEFAULT_ROOT_SELECTOR,
};

/// Published after each pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassContext {
    /// The page scale just applied.
    pub scale: f64,
    /// Whether the session is running.
    pub running: bool,
}

/// Something that follows the page scale.
pub trait ScaleObserver<H> {
    /// Called after every scale pass.
    fn after_pass(&mut self, host: &mut H, pass: &PassContext);

    /// Called while the session is being deactivated.
    fn on_deactivate(&mut self, _host: &mut H) {}
}

/// Runtime flags of a session.
#[derive(Debug)]
pub struct RuntimeState<T> {
    /// Whether fitting is active.
    pub is_running: bool,
    /// Most recently published scale.
    pub current_scale: f64,
    /// Root selector of the running activation.
    pub active_root: Option<String>,
    /// Whether a resize listener is attached.
    pub subscribed: bool,
    pending_pass: Option<T>,
    pending_transition: Option<T>,
}

impl<T> Default for RuntimeState<T> {
    fn default() -> Self {
        Self {
            is_running: false,
            current_scale: 1.0,
            active_root: None,
            subscribed: false,
            pending_pass: None,
            pending_transition: None,
        }
    }
}

impl<T> RuntimeState<T> {
    /// Whether a debounced pass is waiting to run.
    #[must_use]
    pub fn has_pending_pass(&self) -> bool {
        self.pending_pass.is_some()
    }
}

/// One fitted page.
pub struct Session<H: Host> {
    host: H,
    state: RuntimeState<<H as Timer>::Handle>,
    fit: Option<FitEngine<H::Element>>,
    rectifier: Rectifier<H::Element>,
    observers: Vec<Box<dyn ScaleObserver<H>>>,
}

impl<H: Host> Session<H> {
    /// Create an inactive session over `host`.
    #[must_use]
    pub fn new(host: H) -> Self {
        Self {
            host,
            state: RuntimeState::default(),
            fit: None,
            rectifier: Rectifier::new(),
            observers: Vec::new(),
        }
    }

    /// Whether the session is fitting the page.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    /// The current page scale (1 when inactive).
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.state.current_scale
    }

    /// Runtime flags.
    #[must_use]
    pub fn state(&self) -> &RuntimeState<<H as Timer>::Handle> {
        &self.state
    }

    /// The active fit engine, if any.
    #[must_use]
    pub fn fit(&self) -> Option<&FitEngine<H::Element>> {
        self.fit.as_ref()
    }

    /// The rectifier.
    #[must_use]
    pub fn rectifier(&self) -> &Rectifier<H::Element> {
        &self.rectifier
    }

    /// The host.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The host, mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Register an observer notified after every pass.
    pub fn observe(&mut self, observer: Box<dyn ScaleObserver<H>>) {
        self.observers.push(observer);
    }

    /// Start fitting the page.
    ///
    /// Once the new root is found, a running session is deactivated so the
    /// new options replace the old ones wholesale. A running session is
    /// left untouched when the new options are rejected.
    ///
    /// The report is `None` while the viewport has no area; the session still
    /// runs and fits on the next resize.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::Configuration`] or [`FitError::InvalidOptions`]
    /// when the options are unusable, and [`FitError::Dom`] if the host
    /// rejects the setup.
    pub fn activate(&mut self, options: impl Into<FitOptions>) -> FitResult<Option<PassReport>> {
        let config = options.into().into_config().inspect_err(|err| {
            tracing::error!("autofit: {err}");
        })?;

        let engine = FitEngine::locate(&self.host, config).inspect_err(|err| {
            tracing::error!("autofit: {err}");
        })?;

        if self.state.is_running {
            // Failures are already logged; the old activation is gone either way.
            let _ = self.deactivate(DEFAULT_ROOT_SELECTOR);
        }
        if engine.config().announce {
            tracing::info!("autofit is running");
        }
        let auto_resize = engine.config().auto_resize;
        let root_selector = engine.config().root_selector.clone();

        if let Err(err) = engine.install(&mut self.host) {
            tracing::error!("autofit: setup failed: {err}");
            let _ = fit::teardown(&mut self.host, Some(&root_selector), &root_selector);
            return Err(err);
        }
        let report = engine.pass(&mut self.host).inspect_err(|err| {
            tracing::error!("autofit: first pass failed: {err}");
        });
        let report = match report {
            Ok(report) => report,
            Err(err) => {
                let _ = fit::teardown(&mut self.host, Some(&root_selector), &root_selector);
                return Err(err);
            }
        };

        self.state.active_root = Some(root_selector);
        self.fit = Some(engine);
        if let Some(report) = &report {
            self.state.current_scale = report.scale();
            self.notify(report.scale());
        }

        if auto_resize {
            match self.host.subscribe_resize() {
                Ok(()) => self.state.subscribed = true,
                Err(err) => tracing::warn!("autofit: resize listener not attached: {err}"),
            }
        }
        // First jump is instant; later ones animate.
        match self.host.schedule(TimerTask::ApplyTransition, 0) {
            Ok(handle) => self.state.pending_transition = Some(handle),
            Err(err) => tracing::warn!("autofit: transition not scheduled: {err}"),
        }

        self.state.is_running = true;
        Ok(report)
    }

    /// Stop fitting and restore the page.
    ///
    /// The root is located by the active root selector, falling back to
    /// `fallback`. Calling this on an inactive session does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::Teardown`] if a step failed. The session is not
    /// running afterwards in every case.
    pub fn deactivate(&mut self, fallback: &str) -> FitResult<()> {
        if !self.state.is_running {
            return Ok(());
        }
        let result = self.teardown(fallback);
        self.state.is_running = false;
        self.state.current_scale = 1.0;
        self.state.active_root = None;
        self.fit = None;

        match result {
            Ok(()) => {
                tracing::info!("autofit is off");
                Ok(())
            }
            Err(err) => {
                tracing::error!("autofit: {err}");
                Err(err)
            }
        }
    }

    /// Deactivate using the default fallback root selector.
    ///
    /// # Errors
    ///
    /// See [`Session::deactivate`].
    pub fn off(&mut self) -> FitResult<()> {
        self.deactivate(DEFAULT_ROOT_SELECTOR)
    }

    fn teardown(&mut self, fallback: &str) -> FitResult<()> {
        if let Some(handle) = self.state.pending_pass.take() {
            self.host.cancel(handle);
        }
        if let Some(handle) = self.state.pending_transition.take() {
            self.host.cancel(handle);
        }
        let mut result = Ok(());
        if self.state.subscribed {
            self.state.subscribed = false;
            if let Err(err) = self.host.unsubscribe_resize() {
                result = Err(FitError::Teardown(err.to_string()));
            }
        }
        if result.is_ok() {
            result = fit::teardown(&mut self.host, self.state.active_root.as_deref(), fallback);
        }

        // Rectification is turned off even when the page could not be fully restored.
        ScaleObserver::on_deactivate(&mut self.rectifier, &mut self.host);
        for observer in &mut self.observers {
            observer.on_deactivate(&mut self.host);
        }
        result
    }

    /// Rectify `target` so it renders at `level` times its natural size.
    ///
    /// Works best-effort when the session is not running.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::Selector`] when the target is empty or unmatched.
    pub fn rectify(&mut self, target: &str, options: RectifyOptions) -> FitResult<usize> {
        if !self.state.is_running {
            tracing::error!("autofit: autofit has not been initialized yet");
        }
        self.rectifier
            .rectify(&mut self.host, self.state.current_scale, target, options)
            .inspect_err(|err| tracing::error!("autofit: {err}"))
    }

    /// Turn rectification off and restore the target's natural styles.
    ///
    /// # Errors
    ///
    /// Returns an error if the target could not be restyled.
    pub fn unrectify(&mut self) -> FitResult<()> {
        self.rectifier.unrectify(&mut self.host)
    }

    /// Route a host notification.
    pub fn dispatch(&mut self, event: HostEvent) {
        match event {
            HostEvent::Resize => self.on_resize(),
            HostEvent::Timer(task) => self.on_timer(task),
        }
    }

    /// Viewport changed: run a pass now or after the debounce delay.
    ///
    /// A pending debounced pass is always cancelled first.
    pub fn on_resize(&mut self) {
        if !self.state.is_running {
            return;
        }
        if let Some(handle) = self.state.pending_pass.take() {
            self.host.cancel(handle);
        }
        let delay = self.fit.as_ref().map_or(0, |f| f.config().resize_delay_ms);
        if delay == 0 {
            self.refit();
            return;
        }
        match self.host.schedule(TimerTask::ResizePass, delay) {
            Ok(handle) => self.state.pending_pass = Some(handle),
            Err(err) => {
                tracing::warn!("autofit: debounce timer failed, fitting now: {err}");
                self.refit();
            }
        }
    }

    /// A scheduled task came due.
    pub fn on_timer(&mut self, task: TimerTask) {
        match task {
            TimerTask::ResizePass => {
                self.state.pending_pass = None;
                if self.state.is_running {
                    self.refit();
                }
            }
            TimerTask::ApplyTransition => {
                self.state.pending_transition = None;
                if let Some(engine) = &self.fit {
                    if let Err(err) = engine.apply_transition(&mut self.host) {
                        tracing::warn!("autofit: {err}");
                    }
                }
            }
        }
    }

    /// Run a scale pass now and notify observers.
    ///
    /// Returns `None` when inactive, when the viewport has no area, or when
    /// the pass failed.
    pub fn refit(&mut self) -> Option<PassReport> {
        let engine = self.fit.as_ref()?;
        match engine.pass(&mut self.host) {
            Ok(Some(report)) => {
                self.state.current_scale = report.scale();
                self.notify(report.scale());
                Some(report)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::error!("autofit: {err}");
                None
            }
        }
    }

    fn notify(&mut self, scale: f64) {
        let pass = PassContext {
            scale,
            running: self.state.is_running,
        };
        self.rectifier.after_pass(&mut self.host, &pass);
        for observer in &mut self.observers {
            observer.after_pass(&mut self.host, &pass);
        }
    }
}

impl<H: Host + std::fmt::Debug> std::fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("state", &self.state)
            .field("fit", &self.fit)
            .field("rectifier", &self.rectifier)
            .field("observers", &self.observers.len())
            .finish()
    }
}

use anyhow::{Context, Result, ensure};

use crate::config::{CapabilityRequest, ConfigChooser, describe};
use crate::device::{Binding, ConfigDesc, ConfigId, ContextId, DeviceInfo, Driver, SurfaceId};
use crate::frame::{FrameImage, PixelExtractor};
use crate::render::Renderer;

use super::Current;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum State {
    /// Construction failed; every operation is a no-op.
    Invalid,
    Ready(Binding),
    Destroyed,
}

/// Off-screen render target with a fixed size.
///
/// Construction initializes the display, negotiates a configuration, creates
/// the context and pbuffer and binds them. Any failure leaves the buffer
/// invalid: `get_bitmap` then returns `None` and no further driver calls are
/// made.
///
/// `destroy` releases everything in reverse dependency order (unbind, surface,
/// context, display) exactly once. Dropping an undestroyed buffer does the same.
pub struct PixelBuffer<D: Driver> {
    driver: D,
    width: u32,
    height: u32,

    display_initialized: bool,
    config: Option<ConfigId>,
    context: Option<ContextId>,
    surface: Option<SurfaceId>,
    state: State,

    renderer: Option<Box<dyn Renderer>>,
}

impl<D: Driver> PixelBuffer<D> {
    pub fn new(driver: D, width: u32, height: u32, request: CapabilityRequest) -> Self {
        let mut buffer = Self {
            driver,
            width,
            height,
            display_initialized: false,
            config: None,
            context: None,
            surface: None,
            state: State::Invalid,
            renderer: None,
        };

        match buffer.open(request) {
            Ok(binding) => {
                log::info!("pixel buffer {width}x{height} ready ({binding:?})");
                buffer.state = State::Ready(binding);
            }
            Err(err) => {
                log::warn!("pixel buffer unavailable: {err:#}");
                buffer.release();
            }
        }
        buffer
    }

    fn open(&mut self, request: CapabilityRequest) -> Result<Binding> {
        ensure!(
            self.width > 0 && self.height > 0,
            "surface size must be positive, got {}x{}",
            self.width,
            self.height
        );

        self.driver
            .initialize()
            .context("failed to initialize display")?;
        self.display_initialized = true;

        let config = ConfigChooser::new(request)
            .choose(&self.driver)
            .context("no configuration satisfies the capability request")?;
        self.config = Some(config);

        let context = self
            .driver
            .create_context(config)
            .context("failed to create rendering context")?;
        self.context = Some(context);

        let surface = self
            .driver
            .create_pbuffer_surface(context, config, self.width, self.height)
            .context("failed to create pbuffer surface")?;
        self.surface = Some(surface);

        let binding = Binding { surface, context };
        self.driver
            .make_current(Some(binding))
            .context("failed to bind context")?;
        Ok(binding)
    }

    /// Installs `renderer` and runs its create and resize hooks.
    ///
    /// Ignored when the buffer is invalid or destroyed.
    pub fn set_renderer<R: Renderer + 'static>(&mut self, renderer: R) {
        let State::Ready(binding) = self.state else {
            log::debug!("renderer ignored: pixel buffer is not usable");
            return;
        };

        let mut renderer: Box<dyn Renderer> = Box::new(renderer);
        let mut current = Current::new(&mut self.driver, binding);
        renderer.on_create(&mut current);
        renderer.on_resize(&mut current, self.width, self.height);
        self.renderer = Some(renderer);
    }

    /// Draws one frame and reads it back, top row first.
    ///
    /// `None` when the buffer is unusable, no renderer is installed, or the
    /// readback fails.
    pub fn get_bitmap(&mut self) -> Option<FrameImage> {
        let State::Ready(binding) = self.state else {
            return None;
        };
        let renderer = self.renderer.as_mut()?;

        let mut current = Current::new(&mut self.driver, binding);
        renderer.on_draw(&mut current);
        match PixelExtractor::extract(&mut current, self.width, self.height) {
            Ok(frame) => Some(frame),
            Err(err) => {
                log::warn!("frame readback failed: {err:#}");
                None
            }
        }
    }

    /// Renderer, vendor and version strings of the bound context.
    pub fn device_info(&self) -> Option<DeviceInfo> {
        match self.state {
            State::Ready(_) => Some(DeviceInfo::query(&self.driver)),
            _ => None,
        }
    }

    /// Draws a final frame, then releases every resource. Later calls are
    /// no-ops.
    pub fn destroy(&mut self) {
        match self.state {
            State::Destroyed => {
                log::debug!("pixel buffer already destroyed");
                return;
            }
            State::Ready(binding) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.on_draw(&mut Current::new(&mut self.driver, binding));
                }
            }
            State::Invalid => {}
        }

        self.renderer = None;
        self.release();
        self.state = State::Destroyed;
        log::debug!("pixel buffer destroyed");
    }

    /// Unbind, surface, context, display. Only what was acquired is released.
    fn release(&mut self) {
        if self.context.is_some() {
            log_failure("unbind context", self.driver.make_current(None));
        }
        if let Some(surface) = self.surface.take() {
            log_failure("destroy surface", self.driver.destroy_surface(surface));
        }
        if let Some(context) = self.context.take() {
            log_failure("destroy context", self.driver.destroy_context(context));
        }
        if std::mem::take(&mut self.display_initialized) {
            log_failure("terminate display", self.driver.terminate());
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == State::Destroyed
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Negotiated configuration, while the buffer is usable.
    pub fn config(&self) -> Option<ConfigDesc> {
        match self.state {
            State::Ready(_) => describe(&self.driver, self.config?),
            _ => None,
        }
    }
}

impl<D: Driver> Drop for PixelBuffer<D> {
    fn drop(&mut self) {
        if self.is_valid() {
            log::warn!("pixel buffer dropped without destroy(); tearing down");
            self.destroy();
        }
    }
}

fn log_failure(step: &str, result: Result<()>) {
    if let Err(err) = result {
        log::warn!("{step} failed: {err:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{self, Call, MockDriver, rgba8};
    use crate::device::{ClearMask, StringName};

    /// Counts hook invocations and clears on every draw.
    #[derive(Default)]
    struct Recorder {
        hooks: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
    }

    impl Renderer for Recorder {
        fn on_create(&mut self, _gl: &mut Current<'_>) {
            self.hooks.borrow_mut().push("create".into());
        }

        fn on_resize(&mut self, _gl: &mut Current<'_>, width: u32, height: u32) {
            self.hooks.borrow_mut().push(format!("resize {width}x{height}"));
        }

        fn on_draw(&mut self, gl: &mut Current<'_>) {
            self.hooks.borrow_mut().push("draw".into());
            gl.clear(ClearMask::COLOR | ClearMask::DEPTH);
            gl.draw_arrays(0, 3);
        }
    }

    fn ready(width: u32, height: u32) -> (PixelBuffer<MockDriver>, mock::CallLog) {
        let driver = MockDriver::new(vec![rgba8(24, 8, 4)]);
        let log = driver.log();
        let buffer = PixelBuffer::new(driver, width, height, CapabilityRequest::rgba8(16, 0));
        assert!(buffer.is_valid());
        (buffer, log)
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn construction_binds_context_and_surface() {
        let (buffer, log) = ready(64, 64);
        let calls = mock::lifecycle(&log);

        assert_eq!(calls[0], Call::Initialize);
        assert!(calls.contains(&Call::CreatePbufferSurface {
            config: ConfigId::from_raw(0),
            width: 64,
            height: 64,
        }));
        assert!(matches!(calls.last(), Some(Call::MakeCurrent(Some(_)))));
        assert_eq!(buffer.config(), Some(rgba8(24, 8, 4)));
        assert_eq!(buffer.size(), (64, 64));
    }

    #[test]
    fn negotiation_failure_is_invalid_and_inert() {
        let driver = MockDriver::new(vec![rgba8(0, 0, 0)]);
        let log = driver.log();
        let mut buffer = PixelBuffer::new(driver, 16, 16, CapabilityRequest::rgba8(16, 0));

        assert!(!buffer.is_valid());
        assert_eq!(buffer.config(), None);
        assert_eq!(mock::count(&log, |c| matches!(c, Call::CreateContext(_))), 0);

        let before = log.borrow().len();
        buffer.set_renderer(Recorder::default());
        assert_eq!(buffer.get_bitmap(), None);
        assert_eq!(buffer.device_info(), None);
        buffer.destroy();
        assert_eq!(log.borrow().len(), before);
    }

    #[test]
    fn zero_size_never_touches_the_driver() {
        let driver = MockDriver::new(vec![rgba8(24, 8, 4)]);
        let log = driver.log();
        let buffer = PixelBuffer::new(driver, 0, 32, CapabilityRequest::default());

        assert!(!buffer.is_valid());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn surface_failure_releases_partial_state() {
        let mut driver = MockDriver::new(vec![rgba8(24, 8, 4)]);
        driver.fail_surface = true;
        let log = driver.log();
        let buffer = PixelBuffer::new(driver, 8, 8, CapabilityRequest::default());

        assert!(!buffer.is_valid());
        let tail: Vec<Call> = mock::lifecycle(&log).into_iter().rev().take(3).collect();
        assert_eq!(tail[0], Call::Terminate);
        assert!(matches!(tail[1], Call::DestroyContext(_)));
        assert_eq!(tail[2], Call::MakeCurrent(None));
        assert_eq!(mock::count(&log, |c| matches!(c, Call::DestroySurface(_))), 0);
    }

    #[test]
    fn initialize_failure_skips_terminate() {
        let mut driver = MockDriver::new(vec![rgba8(24, 8, 4)]);
        driver.fail_initialize = true;
        let log = driver.log();
        let buffer = PixelBuffer::new(driver, 8, 8, CapabilityRequest::default());

        assert!(!buffer.is_valid());
        assert_eq!(mock::lifecycle(&log), vec![Call::Initialize]);
    }

    // ── renderer + frames ─────────────────────────────────────────────────

    #[test]
    fn set_renderer_runs_create_then_resize() {
        let (mut buffer, _log) = ready(32, 16);
        let recorder = Recorder::default();
        let hooks = recorder.hooks.clone();

        buffer.set_renderer(recorder);
        assert_eq!(*hooks.borrow(), vec!["create".to_owned(), "resize 32x16".to_owned()]);
        buffer.destroy();
    }

    #[test]
    fn no_renderer_means_no_bitmap() {
        let (mut buffer, log) = ready(8, 8);
        assert_eq!(buffer.get_bitmap(), None);
        assert_eq!(mock::count(&log, |c| matches!(c, Call::ReadPixels(..))), 0);
        buffer.destroy();
    }

    #[test]
    fn bitmap_has_requested_size() {
        let (mut buffer, _log) = ready(12, 9);
        buffer.set_renderer(Recorder::default());

        let frame = buffer.get_bitmap().unwrap();
        assert_eq!((frame.width(), frame.height()), (12, 9));
        assert_eq!(frame.as_bytes().len(), 12 * 9 * 4);
        buffer.destroy();
    }

    #[test]
    fn consecutive_bitmaps_are_identical() {
        let (mut buffer, _log) = ready(16, 16);
        buffer.set_renderer(Recorder::default());

        let first = buffer.get_bitmap().unwrap();
        let second = buffer.get_bitmap().unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
        buffer.destroy();
    }

    #[test]
    fn device_info_comes_from_context() {
        let (mut buffer, _log) = ready(4, 4);
        let info = buffer.device_info().unwrap();
        assert_eq!(info.renderer, "mock renderer");
        assert_eq!(info.vendor, "mock vendor");
        buffer.destroy();
        assert_eq!(buffer.device_info(), None);
    }

    // ── teardown ──────────────────────────────────────────────────────────

    fn teardown(log: &mock::CallLog) -> Vec<Call> {
        let calls = mock::lifecycle(log);
        let start = calls
            .iter()
            .rposition(|c| matches!(c, Call::MakeCurrent(None)))
            .unwrap();
        calls[start..].to_vec()
    }

    #[test]
    fn destroy_releases_in_reverse_order() {
        let (mut buffer, log) = ready(8, 8);
        let binding = match buffer.state {
            State::Ready(b) => b,
            _ => unreachable!(),
        };
        buffer.destroy();

        assert_eq!(
            teardown(&log),
            vec![
                Call::MakeCurrent(None),
                Call::DestroySurface(binding.surface),
                Call::DestroyContext(binding.context),
                Call::Terminate,
            ]
        );
    }

    #[test]
    fn destroy_is_idempotent() {
        let (mut buffer, log) = ready(8, 8);
        buffer.destroy();
        buffer.destroy();
        drop(buffer);

        assert_eq!(mock::count(&log, |c| matches!(c, Call::MakeCurrent(None))), 1);
        assert_eq!(mock::count(&log, |c| matches!(c, Call::DestroySurface(_))), 1);
        assert_eq!(mock::count(&log, |c| matches!(c, Call::DestroyContext(_))), 1);
        assert_eq!(mock::count(&log, |c| *c == Call::Terminate), 1);
    }

    #[test]
    fn destroy_draws_a_final_frame_first() {
        let (mut buffer, log) = ready(8, 8);
        buffer.set_renderer(Recorder::default());
        buffer.destroy();

        let calls = log.borrow();
        let last_draw = calls.iter().rposition(|c| matches!(c, Call::DrawArrays(..))).unwrap();
        let unbind = calls.iter().rposition(|c| *c == Call::MakeCurrent(None)).unwrap();
        assert!(last_draw < unbind);
        assert!(buffer.is_destroyed());
    }

    #[test]
    fn drop_tears_down_a_live_buffer() {
        let (buffer, log) = ready(8, 8);
        drop(buffer);
        assert_eq!(teardown(&log).len(), 4);
        assert_eq!(mock::count(&log, |c| *c == Call::Terminate), 1);
    }

    #[test]
    fn bitmap_after_destroy_is_none() {
        let (mut buffer, _log) = ready(8, 8);
        buffer.set_renderer(Recorder::default());
        buffer.destroy();
        assert_eq!(buffer.get_bitmap(), None);
    }

    #[test]
    fn current_token_exposes_binding() {
        let (mut driver, binding) = mock::bound(2, 2);
        let current = Current::new(&mut driver, binding);
        assert_eq!(current.binding(), binding);
        let version = current.get_string(StringName::Version);
        assert_eq!(version.as_deref(), Some("mock 1.0"));
    }
}

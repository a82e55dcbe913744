//! Entrance animation driven by display-frame callbacks.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    #[default]
    CubicOut,
    CubicInOut,
}

impl Easing {
    /// Eased value of `t`, clamped to `[0, 1]`
    pub fn apply(&self, t: f64) -> f64 {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 1.0 };
        match self {
            Easing::Linear => t,
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Duration and curve of the grow-in effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntranceAnimation {
    pub duration_ms: f64,
    pub easing: Easing,
}

impl EntranceAnimation {
    pub fn new(duration_ms: f64, easing: Easing) -> Self {
        Self {
            duration_ms,
            easing,
        }
    }

    /// Eased progress after `elapsed_ms`; a zero duration finishes at once
    pub fn progress(&self, elapsed_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        self.easing.apply(elapsed_ms / self.duration_ms)
    }
}

impl Default for EntranceAnimation {
    fn default() -> Self {
        Self::new(600.0, Easing::CubicOut)
    }
}

/// Source of display-frame callbacks. Dropping the returned handle must
/// cancel the pending frame.
pub trait FrameScheduler: 'static {
    type Handle: 'static;

    /// Runs `callback` with a millisecond timestamp on the next frame
    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>) -> Self::Handle;
}

/// Browser frames via `requestAnimationFrame`
#[derive(Debug, Clone, Copy, Default)]
pub struct RafScheduler;

impl FrameScheduler for RafScheduler {
    type Handle = gloo::render::AnimationFrame;

    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>) -> Self::Handle {
        gloo::render::request_animation_frame(move |timestamp| callback(timestamp))
    }
}

struct LoopState<H> {
    identity: Option<u64>,
    generation: u64,
    started_at: Option<f64>,
    pending: Option<H>,
    progress: f64,
}

/// Frame loop that grows a chart in once per data identity.
///
/// Starting with a new identity cancels the running loop; starting again
/// with the current identity is a no-op.
pub struct AnimationLoop<S: FrameScheduler> {
    scheduler: Rc<S>,
    animation: EntranceAnimation,
    state: Rc<RefCell<LoopState<S::Handle>>>,
}

impl<S: FrameScheduler> AnimationLoop<S> {
    pub fn new(scheduler: S, animation: EntranceAnimation) -> Self {
        Self {
            scheduler: Rc::new(scheduler),
            animation,
            state: Rc::new(RefCell::new(LoopState {
                identity: None,
                generation: 0,
                started_at: None,
                pending: None,
                progress: 1.0,
            })),
        }
    }

    pub fn progress(&self) -> f64 {
        self.state.borrow().progress
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().pending.is_some()
    }

    /// Animates from 0 for `identity`, calling `on_frame` with the eased
    /// progress every frame until it reaches 1. Returns whether a new loop
    /// was started.
    pub fn start(&self, identity: u64, on_frame: impl Fn(f64) + 'static) -> bool {
        let generation = {
            let mut state = self.state.borrow_mut();
            if state.identity == Some(identity) {
                return false;
            }
            state.pending = None;
            state.identity = Some(identity);
            state.generation += 1;
            state.started_at = None;
            state.progress = 0.0;
            state.generation
        };
        debug!("Starting entrance animation for identity {:x}", identity);
        schedule(
            Rc::clone(&self.scheduler),
            Rc::clone(&self.state),
            self.animation,
            generation,
            Rc::new(on_frame),
        );
        true
    }

    /// Stops the loop; no further frame callbacks run
    pub fn cancel(&self) {
        let mut state = self.state.borrow_mut();
        state.pending = None;
        state.identity = None;
        state.generation += 1;
    }
}

impl<S: FrameScheduler> Drop for AnimationLoop<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn schedule<S: FrameScheduler>(
    scheduler: Rc<S>,
    state: Rc<RefCell<LoopState<S::Handle>>>,
    animation: EntranceAnimation,
    generation: u64,
    on_frame: Rc<dyn Fn(f64)>,
) {
    let callback: Box<dyn FnOnce(f64)> = {
        let scheduler = Rc::clone(&scheduler);
        let state = Rc::clone(&state);
        Box::new(move |timestamp: f64| {
            let progress = {
                let mut current = state.borrow_mut();
                if current.generation != generation {
                    return;
                }
                let started_at = *current.started_at.get_or_insert(timestamp);
                let progress = animation.progress(timestamp - started_at);
                current.progress = progress;
                if progress >= 1.0 {
                    current.pending = None;
                }
                progress
            };
            on_frame(progress);
            if progress < 1.0 {
                schedule(scheduler, state, animation, generation, on_frame);
            }
        })
    };

    let handle = scheduler.request_frame(callback);
    let mut current = state.borrow_mut();
    if current.generation == generation {
        current.pending = Some(handle);
    }
}

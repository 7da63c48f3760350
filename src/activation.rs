// ============================================================================
// ACTIVATION — edge-triggered, settle-delayed gate in front of capture+blur
// ============================================================================
//
// Pure state: no GPU objects live here.  The renderer feeds one `FrameInput`
// per frame and acts on the returned `FrameDecision`.

/// Region size in whole pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionSize {
    pub width: u32,
    pub height: u32,
}

impl RegionSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Where the renderer is in an activation episode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActivationState {
    /// No usable result and not timing.
    Idle,
    /// Timer running since `since` (seconds); no usable result yet.
    PendingCapture { since: f64 },
    /// A blurred result exists for the current region at its current size.
    /// `since` is the timestamp of the episode that produced it.
    Ready { since: f64 },
}

/// Per-frame inputs to the state machine.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
    pub active: bool,
    pub size: RegionSize,
    pub now: f64,
    pub settle_delay: f64,
}

/// What the renderer has to do this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameDecision {
    /// The region size differs from last frame: release the render targets.
    pub release_targets: bool,
    /// The settle delay has elapsed: run ensure → capture → blur now.
    pub capture_due: bool,
}

/// Notable transitions, reported for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Activated,
    Deactivated,
    Resized,
    BecameReady,
}

pub struct Activation {
    state: ActivationState,
    size: Option<RegionSize>,
    last_active: bool,
    last_transition: Option<Transition>,
}

impl Activation {
    pub fn new() -> Self {
        Self {
            state: ActivationState::Idle,
            size: None,
            last_active: false,
            last_transition: None,
        }
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ActivationState::Ready { .. })
    }

    /// Size recorded by the most recent frame, if any.
    pub fn size(&self) -> Option<RegionSize> {
        self.size
    }

    /// Take the transition produced by the last `advance`/`finish_capture`.
    pub fn take_transition(&mut self) -> Option<Transition> {
        self.last_transition.take()
    }

    /// Evaluate one frame.
    ///
    /// Order: size change, rising edge, falling edge, settle check.  The
    /// active flag is recorded last.
    pub fn advance(&mut self, input: FrameInput) -> FrameDecision {
        let mut decision = FrameDecision::default();
        self.last_transition = None;

        if self.size != Some(input.size) {
            let had_size = self.size.is_some();
            self.size = Some(input.size);
            decision.release_targets = true;
            // A resize while held active restarts the settle timer instead of
            // waiting for the next rising edge.
            self.state = if input.active && self.last_active {
                ActivationState::PendingCapture { since: input.now }
            } else {
                ActivationState::Idle
            };
            if had_size {
                self.last_transition = Some(Transition::Resized);
            }
        }

        if input.active && !self.last_active {
            self.state = ActivationState::PendingCapture { since: input.now };
            self.last_transition = Some(Transition::Activated);
        } else if !input.active && self.last_active {
            self.state = ActivationState::Idle;
            self.last_transition = Some(Transition::Deactivated);
        }

        if let ActivationState::PendingCapture { since } = self.state
            && input.active
            && input.now - since >= input.settle_delay
        {
            decision.capture_due = true;
        }

        self.last_active = input.active;
        decision
    }

    /// Report the outcome of a capture the last decision asked for.
    ///
    /// Failure keeps the original timestamp, so the next frame retries
    /// without restarting the delay.
    pub fn finish_capture(&mut self, succeeded: bool) {
        if let ActivationState::PendingCapture { since } = self.state
            && succeeded
        {
            self.state = ActivationState::Ready { since };
            self.last_transition = Some(Transition::BecameReady);
        }
    }

    /// The device went away: a ready result no longer exists, but the episode
    /// already settled, so it goes back to pending with its old timestamp.
    pub fn invalidate_result(&mut self) {
        if let ActivationState::Ready { since } = self.state {
            self.state = ActivationState::PendingCapture { since };
        }
    }
}

impl Default for Activation {
    fn default() -> Self {
        Self::new()
    }
}

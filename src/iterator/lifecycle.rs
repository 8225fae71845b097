use crossbeam_channel::Sender;

use crate::util::{Result, Status};

/// State of a range iterator.
///
/// ```text
///          begin_advance            finish_advance
///   Idle ───────────────→ Advancing ──────────────→ Idle
///    │                        │
///    │ request_end            │ request_end
///    ↓                        ↓
///  EndPending ←───────────────┘
///    │
///    │ mark_ended (resources released)
///    ↓
///  Ended
/// ```
///
/// `EndPending` covers both an end running right now and one waiting for an
/// in-flight advance. `Ended` is terminal and implies the iterator's
/// resources are gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Advancing,
    EndPending,
    Ended,
}

/// What a caller of [`Lifecycle::request_end`] must do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndDecision {
    /// No advance is in flight, release resources now.
    Now,
    /// An advance is in flight; the end runs once its batch is delivered.
    Deferred,
    /// An end already happened or is already scheduled.
    AlreadyEnded,
}

/// Serializes advances and ends of one iterator.
///
/// Holds no resources itself; callers guard it with a mutex and act on the
/// transitions it reports.
#[derive(Debug)]
pub struct Lifecycle {
    state: LifecycleState,
    /// Completions of pending ends, fired by [`Lifecycle::mark_ended`]
    end_waiters: Vec<Sender<Result<bool>>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Lifecycle {
            state: LifecycleState::Idle,
            end_waiters: Vec::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether no further advance or seek will be accepted.
    pub fn is_ending(&self) -> bool {
        matches!(
            self.state,
            LifecycleState::EndPending | LifecycleState::Ended
        )
    }

    pub fn begin_advance(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Idle => {
                self.state = LifecycleState::Advancing;
                Ok(())
            },
            LifecycleState::Advancing => {
                Err(Status::busy("an advance is already in progress"))
            },
            LifecycleState::EndPending | LifecycleState::Ended => Err(Status::already_ended()),
        }
    }

    /// Seeks are only accepted between advances.
    pub fn check_seek(&self) -> Result<()> {
        match self.state {
            LifecycleState::Idle => Ok(()),
            LifecycleState::Advancing => {
                Err(Status::busy("cannot seek while an advance is in progress"))
            },
            LifecycleState::EndPending | LifecycleState::Ended => Err(Status::already_ended()),
        }
    }

    /// Leave `Advancing`. Returns true when an end was requested meanwhile
    /// and must now be carried out.
    pub fn finish_advance(&mut self) -> bool {
        match self.state {
            LifecycleState::Advancing => {
                self.state = LifecycleState::Idle;
                false
            },
            LifecycleState::EndPending => true,
            LifecycleState::Idle | LifecycleState::Ended => false,
        }
    }

    /// Ask to end. On `Now` and `Deferred`, `waiter` is notified by
    /// [`Lifecycle::mark_ended`]; on `AlreadyEnded` it is dropped.
    pub fn request_end(&mut self, waiter: Option<Sender<Result<bool>>>) -> EndDecision {
        let decision = match self.state {
            LifecycleState::Idle => EndDecision::Now,
            LifecycleState::Advancing => EndDecision::Deferred,
            LifecycleState::EndPending | LifecycleState::Ended => {
                return EndDecision::AlreadyEnded;
            },
        };
        self.state = LifecycleState::EndPending;
        self.end_waiters.extend(waiter);
        decision
    }

    /// Wait for an end someone else already started.
    ///
    /// Returns false, dropping `waiter`, if no end is under way.
    pub fn join_end(&mut self, waiter: Sender<Result<bool>>) -> bool {
        if self.state != LifecycleState::EndPending {
            return false;
        }
        self.end_waiters.push(waiter);
        true
    }

    /// Enter `Ended` and notify deferred end waiters.
    pub fn mark_ended(&mut self) {
        self.state = LifecycleState::Ended;
        for waiter in self.end_waiters.drain(..) {
            // The waiter may have stopped listening.
            let _ = waiter.send(Ok(true));
        }
    }
}

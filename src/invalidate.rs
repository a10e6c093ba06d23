//! Tracks how much work the next draw or measure request has to do.

/// A configuration change made through one of the surface setters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Change {
    Text,
    Font,
    Color,
    Alignment,
    WritingDirection,
    FrameWidth,
}

impl Change {
    /// The least severe state that accounts for this change.
    ///
    /// Color and alignment never move line breaks, so re-painting the
    /// existing pages is enough. Everything else may.
    pub fn required(self) -> Invalidation {
        match self {
            Change::Color | Change::Alignment => Invalidation::NeedsRerender,
            Change::Text | Change::Font | Change::WritingDirection | Change::FrameWidth => {
                Invalidation::NeedsRepaginate
            }
        }
    }
}

/// Pending work, ordered by severity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Invalidation {
    Clean,
    NeedsRerender,
    NeedsRepaginate,
}

impl Default for Invalidation {
    fn default() -> Self {
        Invalidation::NeedsRepaginate
    }
}

/// State machine deciding between full repagination, in-place re-render,
/// or nothing.
///
/// The state only escalates until [`InvalidationController::mark_clean`] is
/// called after a successful refresh.
#[derive(Debug, Default)]
pub struct InvalidationController {
    state: Invalidation,
}

impl InvalidationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Invalidation {
        self.state
    }

    pub fn is_clean(&self) -> bool {
        self.state == Invalidation::Clean
    }

    /// Records a change, escalating the pending work if needed.
    pub fn record(&mut self, change: Change) -> Invalidation {
        self.escalate(change.required())
    }

    /// Raises the state to at least `to`.
    pub fn escalate(&mut self, to: Invalidation) -> Invalidation {
        if to > self.state {
            log::debug!("Invalidation escalated from {:?} to {:?}", self.state, to);
            self.state = to;
        }
        self.state
    }

    /// Marks the pending work as done.
    pub fn mark_clean(&mut self) {
        self.state = Invalidation::Clean;
    }
}

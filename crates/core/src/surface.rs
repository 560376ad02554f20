//! Injected UI capability interfaces.
//!
//! The host application owns the rendering of alerts, confirmation prompts
//! and scrolling; the form controller only calls into these traits at its
//! decision points. Tests substitute recording fakes.

/// Fire-and-forget notification surface.
pub trait Notifier: Send + Sync {
    /// A completed operation the user asked for.
    fn success(&self, message: &str);
    /// A failed operation the user asked for.
    fn failure(&self, message: &str);
    /// A non-fatal notice, e.g. validation feedback or a degraded list.
    fn warning(&self, message: &str);
}

/// Blocking yes/no prompt.
pub trait Confirmer: Send + Sync {
    /// Returns `true` when the user confirms the question.
    fn confirm(&self, question: &str) -> bool;
}

/// Non-notification UI side effects requested by the controller.
pub trait UiSurface: Send + Sync {
    /// Bring the form into view, e.g. after entering edit mode.
    fn scroll_to_form(&self);
}

/// A `UiSurface` that does nothing, for hosts without a scrollable view.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSurface;

impl UiSurface for NoopSurface {
    fn scroll_to_form(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityChange {
    Shown,
    Hidden,
    Unchanged,
}

/// Tracks whether the overlay is on screen. Hiding an already hidden overlay
/// is a no-op rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayState {
    visible: bool,
}

impl OverlayState {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn on_show(&mut self) -> VisibilityChange {
        if self.visible {
            return VisibilityChange::Unchanged;
        }
        self.visible = true;
        VisibilityChange::Shown
    }

    pub fn on_hide(&mut self) -> VisibilityChange {
        if !self.visible {
            return VisibilityChange::Unchanged;
        }
        self.visible = false;
        VisibilityChange::Hidden
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Idle,
    Focused(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Next,
    Prev,
    Confirm,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Moved(usize),
    Emit(usize),
    Hide,
    Ignored,
}

/// Single focus cursor over whatever list or grid page is currently rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    len: usize,
    focus: Focus,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            len: 0,
            focus: Focus::Idle,
        }
    }
}

impl Navigator {
    pub fn for_len(len: usize) -> Self {
        let mut navigator = Self::default();
        navigator.reset(len);
        navigator
    }

    /// Called for every newly rendered view.
    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.focus = if len == 0 {
            Focus::Idle
        } else {
            Focus::Focused(0)
        };
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn cursor(&self) -> Option<usize> {
        match self.focus {
            Focus::Idle => None,
            Focus::Focused(cursor) => Some(cursor),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn apply(&mut self, action: NavAction) -> NavOutcome {
        match action {
            NavAction::Next => self.step(1),
            NavAction::Prev => self.step(-1),
            NavAction::Confirm => self.cursor().map_or(NavOutcome::Ignored, NavOutcome::Emit),
            NavAction::Cancel => NavOutcome::Hide,
        }
    }

    /// Direct slot addressing for the grid. Slots outside the item count are inert.
    pub fn select(&mut self, slot: usize) -> NavOutcome {
        if slot >= self.len {
            return NavOutcome::Ignored;
        }
        self.focus = Focus::Focused(slot);
        NavOutcome::Emit(slot)
    }

    fn step(&mut self, direction: i32) -> NavOutcome {
        let Focus::Focused(cursor) = self.focus else {
            return NavOutcome::Ignored;
        };
        let next = if direction < 0 {
            (cursor + self.len - 1) % self.len
        } else {
            (cursor + 1) % self.len
        };
        self.focus = Focus::Focused(next);
        NavOutcome::Moved(next)
    }
}

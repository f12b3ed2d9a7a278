//! Stable-state button debouncing.
//!
//! A raw level must persist for the whole debounce window before the
//! reported state changes.  The buttons are wired active-low with
//! pull-ups, so the scan task inverts the raw line level before feeding
//! this filter: `true` in means "contact closed".

/// Default debounce window.
pub const DEBOUNCE_WINDOW_MS: u64 = 30;

pub struct DebouncedInput {
    window_ms: u64,
    reported: bool,
    candidate: bool,
    candidate_since: u64,
}

impl DebouncedInput {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            reported: false,
            candidate: false,
            candidate_since: 0,
        }
    }

    /// Feed one raw sample; returns the debounced pressed state.
    pub fn update(&mut self, raw_pressed: bool, now_ms: u64) -> bool {
        if raw_pressed != self.candidate {
            self.candidate = raw_pressed;
            self.candidate_since = now_ms;
        }
        if self.candidate != self.reported
            && now_ms.saturating_sub(self.candidate_since) >= self.window_ms
        {
            self.reported = self.candidate;
        }
        self.reported
    }

    pub fn pressed(&self) -> bool {
        self.reported
    }
}

impl Default for DebouncedInput {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW_MS)
    }
}

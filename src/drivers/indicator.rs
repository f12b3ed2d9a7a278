//! Indicator lamp engine.
//!
//! Lamp 0 is system health, lamp 1 tracks the mode.  A latched shutdown
//! alarm overrides everything with a 250 ms wig-wag so the fault is
//! visible across a yard at night.
//!
//! | Condition          | Lamp 0        | Lamp 1                      |
//! |--------------------|---------------|-----------------------------|
//! | normal             | green         | mode colour                 |
//! | warning            | yellow        | mode colour                 |
//! | shutdown           | green/yellow wig-wag, alternating every 250 ms |

use crate::ports::Rgb;
use crate::world::Mode;

pub const COLOUR_OFF: Rgb = (0, 0, 0);
pub const COLOUR_GREEN: Rgb = (0, 255, 0);
pub const COLOUR_YELLOW: Rgb = (255, 200, 0);
pub const COLOUR_RED: Rgb = (255, 0, 0);
pub const COLOUR_BLUE: Rgb = (0, 80, 255);
pub const COLOUR_WHITE: Rgb = (180, 180, 180);

const WIG_WAG_PERIOD_MS: u32 = 250;

pub struct IndicatorEngine {
    phase_ms: u32,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self { phase_ms: 0 }
    }

    /// Advance by `delta_ms` and produce the lamp colours.
    pub fn tick(&mut self, delta_ms: u32, mode: Mode, warning: bool, shutdown: bool) -> [Rgb; 2] {
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms);

        if shutdown {
            return if (self.phase_ms / WIG_WAG_PERIOD_MS) % 2 == 0 {
                [COLOUR_GREEN, COLOUR_YELLOW]
            } else {
                [COLOUR_YELLOW, COLOUR_GREEN]
            };
        }

        let health = if warning { COLOUR_YELLOW } else { COLOUR_GREEN };
        let mode_lamp = match mode {
            Mode::Cooling => COLOUR_BLUE,
            Mode::Heating => COLOUR_RED,
            Mode::Defrost => COLOUR_YELLOW,
            Mode::Null | Mode::Alarm => COLOUR_WHITE,
        };
        [health, mode_lamp]
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_cooling_is_green_blue() {
        let mut engine = IndicatorEngine::new();
        assert_eq!(
            engine.tick(200, Mode::Cooling, false, false),
            [COLOUR_GREEN, COLOUR_BLUE]
        );
    }

    #[test]
    fn mode_lamp_tracks_each_mode() {
        let mut engine = IndicatorEngine::new();
        assert_eq!(engine.tick(200, Mode::Heating, false, false)[1], COLOUR_RED);
        assert_eq!(engine.tick(200, Mode::Defrost, false, false)[1], COLOUR_YELLOW);
        assert_eq!(engine.tick(200, Mode::Null, false, false)[1], COLOUR_WHITE);
    }

    #[test]
    fn warning_turns_health_yellow_only() {
        let mut engine = IndicatorEngine::new();
        assert_eq!(
            engine.tick(200, Mode::Cooling, true, false),
            [COLOUR_YELLOW, COLOUR_BLUE]
        );
    }

    #[test]
    fn shutdown_wig_wags_every_250ms() {
        let mut engine = IndicatorEngine::new();
        let a = engine.tick(200, Mode::Alarm, false, true);
        let b = engine.tick(250, Mode::Alarm, false, true);
        assert_ne!(a, b, "lamps must swap across a period boundary");
        assert!(a == [COLOUR_GREEN, COLOUR_YELLOW] || a == [COLOUR_YELLOW, COLOUR_GREEN]);
        // The two lamps always disagree while wig-wagging.
        assert_ne!(a[0], a[1]);
        assert_ne!(b[0], b[1]);
    }

    #[test]
    fn wig_wag_overrides_warning_state() {
        let mut engine = IndicatorEngine::new();
        let lamps = engine.tick(0, Mode::Cooling, true, true);
        assert!(lamps == [COLOUR_GREEN, COLOUR_YELLOW] || lamps == [COLOUR_YELLOW, COLOUR_GREEN]);
    }
}

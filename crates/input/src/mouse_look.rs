use glam::Vec2;

/// Turns absolute pointer positions into look deltas.
///
/// While look is disabled every position only resynchronizes the last known
/// pointer, so enabling look later does not produce a jump. Screen Y grows
/// downwards; the returned Y delta is inverted so moving the pointer up looks
/// up.
#[derive(Debug, Clone)]
pub struct MouseLook {
    last_position: Vec2,
    enabled: bool,
}

impl MouseLook {
    /// Start with the pointer assumed at `initial`, usually the window center.
    pub fn new(initial: Vec2) -> Self {
        Self {
            last_position: initial,
            enabled: false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn last_position(&self) -> Vec2 {
        self.last_position
    }

    /// Feed a new pointer position. Returns the look delta when enabled.
    pub fn cursor_moved(&mut self, position: Vec2) -> Option<Vec2> {
        let previous = std::mem::replace(&mut self.last_position, position);
        if !self.enabled {
            return None;
        }
        Some(Vec2::new(position.x - previous.x, previous.y - position.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_only_resyncs() {
        let mut look = MouseLook::new(Vec2::new(512.0, 384.0));
        assert_eq!(look.cursor_moved(Vec2::new(600.0, 300.0)), None);
        assert_eq!(look.last_position(), Vec2::new(600.0, 300.0));
    }

    #[test]
    fn enabled_reports_inverted_y() {
        let mut look = MouseLook::new(Vec2::ZERO);
        look.set_enabled(true);
        let delta = look.cursor_moved(Vec2::new(10.0, -4.0)).unwrap();
        assert_eq!(delta, Vec2::new(10.0, 4.0));
    }

    #[test]
    fn enabling_after_movement_does_not_jump() {
        let mut look = MouseLook::new(Vec2::ZERO);
        look.cursor_moved(Vec2::new(900.0, 700.0));
        look.set_enabled(true);
        let delta = look.cursor_moved(Vec2::new(901.0, 700.0)).unwrap();
        assert_eq!(delta, Vec2::new(1.0, 0.0));
    }
}

use std::collections::BTreeSet;

/// Direction of a camera movement command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MoveDirection {
    Forward,
    Backward,
    /// Strafe left.
    Left,
    /// Strafe right.
    Right,
    /// Along world up, independent of pitch.
    Up,
    /// Along world down, independent of pitch.
    Down,
}

impl MoveDirection {
    pub const ALL: [Self; 6] = [
        Self::Forward,
        Self::Backward,
        Self::Left,
        Self::Right,
        Self::Up,
        Self::Down,
    ];
}

/// A high-level action produced from raw device input.
///
/// The viewer consumes actions, never raw key codes, so the windowing layer
/// can be swapped without touching camera logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Move while the binding is held.
    Move(MoveDirection),
    /// Request an orderly shutdown.
    Quit,
}

/// Movement actions currently held down.
///
/// Filled from key press/release events as they arrive and read once per
/// frame. Ordered iteration keeps the applied movement order stable.
#[derive(Debug, Clone, Default)]
pub struct ActionState {
    held: BTreeSet<MoveDirection>,
    quit_requested: bool,
}

impl ActionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press or release of the binding for `action`.
    pub fn apply(&mut self, action: Action, pressed: bool) {
        match action {
            Action::Move(direction) => {
                if pressed {
                    self.held.insert(direction);
                } else {
                    self.held.remove(&direction);
                }
            }
            Action::Quit => {
                if pressed {
                    self.quit_requested = true;
                }
            }
        }
    }

    pub fn is_held(&self, direction: MoveDirection) -> bool {
        self.held.contains(&direction)
    }

    /// Held directions in a fixed order.
    pub fn held(&self) -> impl Iterator<Item = MoveDirection> + '_ {
        self.held.iter().copied()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Drop every held direction, e.g. when the window loses focus and
    /// release events would be missed.
    pub fn release_all(&mut self) {
        if !self.held.is_empty() {
            tracing::debug!(count = self.held.len(), "releasing held movement");
        }
        self.held.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release() {
        let mut state = ActionState::new();
        state.apply(Action::Move(MoveDirection::Forward), true);
        state.apply(Action::Move(MoveDirection::Left), true);
        assert!(state.is_held(MoveDirection::Forward));
        state.apply(Action::Move(MoveDirection::Forward), false);
        assert!(!state.is_held(MoveDirection::Forward));
        assert_eq!(state.held().collect::<Vec<_>>(), vec![MoveDirection::Left]);
    }

    #[test]
    fn held_iterates_in_stable_order() {
        let mut state = ActionState::new();
        state.apply(Action::Move(MoveDirection::Down), true);
        state.apply(Action::Move(MoveDirection::Forward), true);
        assert_eq!(
            state.held().collect::<Vec<_>>(),
            vec![MoveDirection::Forward, MoveDirection::Down]
        );
    }

    #[test]
    fn quit_latches_on_press_only() {
        let mut state = ActionState::new();
        state.apply(Action::Quit, false);
        assert!(!state.quit_requested());
        state.apply(Action::Quit, true);
        state.apply(Action::Quit, false);
        assert!(state.quit_requested());
    }

    #[test]
    fn release_all_clears_movement() {
        let mut state = ActionState::new();
        for direction in MoveDirection::ALL {
            state.apply(Action::Move(direction), true);
        }
        state.release_all();
        assert_eq!(state.held().count(), 0);
    }
}

//! Packed parse-table cells and terminal-use masks.
//!
//! Every cell of the merged parse table is a single `u32`: the low three bits
//! hold the action kind, the remaining bits hold the action parameter (target
//! state for shift and goto, production index for reduce). A zeroed cell is
//! the error action, so a freshly allocated table is all errors.

/// The terminal may be shifted by the fragment that owns it.
pub const TERMINAL_EXCLUSIVELY_SHIFTABLE: u8 = 0b001;
/// The terminal may appear as layout.
pub const TERMINAL_EXCLUSIVELY_LAYOUT: u8 = 0b010;
/// The terminal may appear as a transparent prefix.
pub const TERMINAL_EXCLUSIVELY_PREFIX: u8 = 0b100;
/// Initial value of every terminal-use entry before any appearance is seen.
pub const TERMINAL_USES_UNCONSTRAINED: u8 =
    TERMINAL_EXCLUSIVELY_SHIFTABLE | TERMINAL_EXCLUSIVELY_LAYOUT | TERMINAL_EXCLUSIVELY_PREFIX;

/// A decoded parse-table cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EngineAction {
    #[default]
    Error,
    Accept,
    Shift(u32),
    Reduce(u32),
    Goto(u32),
}

impl EngineAction {
    const KIND_BITS: u32 = 3;
    const KIND_MASK: u32 = (1 << Self::KIND_BITS) - 1;

    const KIND_ERROR: u32 = 0;
    const KIND_ACCEPT: u32 = 1;
    const KIND_SHIFT: u32 = 2;
    const KIND_REDUCE: u32 = 3;
    const KIND_GOTO: u32 = 4;

    /// Largest parameter a packed cell can carry.
    pub const MAX_PARAMETER: u32 = u32::MAX >> Self::KIND_BITS;

    /// Numeric kind tag stored in the low bits of a packed cell.
    #[inline]
    pub fn kind(&self) -> u32 {
        match self {
            EngineAction::Error => Self::KIND_ERROR,
            EngineAction::Accept => Self::KIND_ACCEPT,
            EngineAction::Shift(_) => Self::KIND_SHIFT,
            EngineAction::Reduce(_) => Self::KIND_REDUCE,
            EngineAction::Goto(_) => Self::KIND_GOTO,
        }
    }

    #[inline]
    pub fn parameter(&self) -> u32 {
        match self {
            EngineAction::Error | EngineAction::Accept => 0,
            EngineAction::Shift(p) | EngineAction::Reduce(p) | EngineAction::Goto(p) => *p,
        }
    }

    /// Packs the action into a table cell.
    ///
    /// Returns `None` when the parameter exceeds [`Self::MAX_PARAMETER`].
    pub fn encode(self) -> Option<u32> {
        let parameter = self.parameter();
        if parameter > Self::MAX_PARAMETER {
            return None;
        }
        Some((parameter << Self::KIND_BITS) | self.kind())
    }

    /// Unpacks a table cell. Unknown kind tags decode to [`EngineAction::Error`].
    pub fn decode(cell: u32) -> Self {
        let parameter = cell >> Self::KIND_BITS;
        match cell & Self::KIND_MASK {
            Self::KIND_ACCEPT => EngineAction::Accept,
            Self::KIND_SHIFT => EngineAction::Shift(parameter),
            Self::KIND_REDUCE => EngineAction::Reduce(parameter),
            Self::KIND_GOTO => EngineAction::Goto(parameter),
            _ => EngineAction::Error,
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, EngineAction::Error)
    }

    /// True for the actions a terminal lookahead can trigger.
    #[inline]
    pub fn is_terminal_action(&self) -> bool {
        matches!(
            self,
            EngineAction::Accept | EngineAction::Shift(_) | EngineAction::Reduce(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_cell_is_error() {
        assert_eq!(EngineAction::decode(0), EngineAction::Error);
        assert_eq!(EngineAction::Error.encode(), Some(0));
    }

    #[test]
    fn kinds_do_not_collide() {
        let cells = [
            EngineAction::Accept.encode().unwrap(),
            EngineAction::Shift(7).encode().unwrap(),
            EngineAction::Reduce(7).encode().unwrap(),
            EngineAction::Goto(7).encode().unwrap(),
        ];
        for (i, a) in cells.iter().enumerate() {
            for b in &cells[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(EngineAction::decode(cells[1]), EngineAction::Shift(7));
        assert_eq!(EngineAction::decode(cells[3]), EngineAction::Goto(7));
    }

    #[test]
    fn parameter_limit() {
        let max = EngineAction::MAX_PARAMETER;
        let cell = EngineAction::Reduce(max).encode().unwrap();
        assert_eq!(EngineAction::decode(cell), EngineAction::Reduce(max));
        assert_eq!(EngineAction::Shift(max + 1).encode(), None);
    }

    #[test]
    fn unknown_kind_decodes_to_error() {
        assert_eq!(EngineAction::decode((5 << 3) | 7), EngineAction::Error);
    }

    #[test]
    fn unconstrained_has_all_bits() {
        assert_eq!(TERMINAL_USES_UNCONSTRAINED, 0b111);
        assert!(EngineAction::Shift(1).is_terminal_action());
        assert!(!EngineAction::Goto(1).is_terminal_action());
    }
}

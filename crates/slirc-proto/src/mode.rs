//! IRC mode string parsing.
//!
//! Mode strings such as `+o-v alice bob` are turned into a flat list of
//! [`ModeChange`]s. Channel modes that carry a parameter consume the next
//! argument; removing the limit (`-l`) is the one parameter mode that does
//! not.

/// Channel modes that take an argument when set.
///
/// Membership grants (`q a o h v`), list modes (`b`), key (`k`) and limit (`l`).
const ARG_MODES: &str = "abhkloqv";

/// Channel modes that grant a membership status to a nick.
const MEMBERSHIP_MODES: &str = "qaohv";

/// Whether a mode is being set or unset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModeDirection {
    /// `+`
    Add,
    /// `-`
    Remove,
}

/// One mode flag change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeChange {
    /// Set or unset.
    pub direction: ModeDirection,
    /// Mode letter.
    pub mode: char,
    /// Argument consumed by this mode, if any.
    pub arg: Option<String>,
}

impl ModeChange {
    /// Whether this change grants or revokes a membership status.
    pub fn is_membership(&self) -> bool {
        MEMBERSHIP_MODES.contains(self.mode)
    }
}

/// Map a membership prefix glyph from a member list to its mode letter.
///
/// `~` owner, `&` admin, `@` op, `%` halfop, `+` voice.
pub fn prefix_glyph_mode(glyph: char) -> Option<char> {
    match glyph {
        '~' => Some('q'),
        '&' => Some('a'),
        '@' => Some('o'),
        '%' => Some('h'),
        '+' => Some('v'),
        _ => None,
    }
}

/// Parse a user mode string like `+iw-x`.
///
/// Letters before any sign are treated as additions.
pub fn parse_user_modes(modestring: &str) -> Vec<ModeChange> {
    let mut direction = ModeDirection::Add;
    let mut res = Vec::new();

    for c in modestring.chars() {
        match c {
            '+' => direction = ModeDirection::Add,
            '-' => direction = ModeDirection::Remove,
            _ => res.push(ModeChange {
                direction,
                mode: c,
                arg: None,
            }),
        }
    }
    res
}

/// Parse a channel mode string and its arguments.
///
/// A parameter mode whose argument is missing yields `arg: None` rather
/// than an error; servers echo list queries such as `+b` without a mask.
pub fn parse_channel_modes<S: AsRef<str>>(modestring: &str, args: &[S]) -> Vec<ModeChange> {
    let mut direction = ModeDirection::Add;
    let mut args = args.iter().map(|a| a.as_ref().to_string());
    let mut res = Vec::new();

    for c in modestring.chars() {
        match c {
            '+' => direction = ModeDirection::Add,
            '-' => direction = ModeDirection::Remove,
            _ => {
                let takes_arg =
                    ARG_MODES.contains(c) && !(direction == ModeDirection::Remove && c == 'l');
                let arg = if takes_arg { args.next() } else { None };
                res.push(ModeChange {
                    direction,
                    mode: c,
                    arg,
                });
            }
        }
    }
    res
}

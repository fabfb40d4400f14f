//! Command parser for inbound host messages
//!
//! One canonical schema is understood:
//!
//! ```text
//! Move <angle_degrees> <distance_cm> <power>
//! ```
//!
//! A rotation-only command is `Move <angle> 0 <power>`. Legacy keywords such
//! as `Turn <power> <angle>` are rejected as unknown rather than guessed at.

use std::fmt;

/// Keyword of a turn-then-translate command
pub const MOVE_KEYWORD: &str = "Move";

const MOVE_FIELDS: usize = 3;

/// A decoded motion request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionRequest {
    /// Rotation before translating, degrees; positive turns right (clockwise)
    pub turn_degrees: f64,
    /// Straight-line travel after the turn, cm; negative drives backward
    pub move_distance: f64,
    /// Power magnitude applied to both phases
    pub power: f64,
}

impl MotionRequest {
    pub fn new(turn_degrees: f64, move_distance: f64, power: f64) -> Self {
        MotionRequest {
            turn_degrees,
            move_distance,
            power,
        }
    }

    /// True when neither phase has anything to do
    pub fn is_noop(&self) -> bool {
        self.turn_degrees == 0.0 && self.move_distance == 0.0
    }
}

impl fmt::Display for MotionRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            MOVE_KEYWORD, self.turn_degrees, self.move_distance, self.power
        )
    }
}

/// Reasons an inbound message is rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The first token is not a known command keyword
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Missing, non-numeric or out-of-range fields
    #[error("malformed fields in '{0}'")]
    MalformedFields(String),
}

/// Parse one inbound message
///
/// Returns `Ok(None)` for an empty message; that is the "nothing pending"
/// signal of the mailbox, not an error.
pub fn parse(raw: &str) -> Result<Option<MotionRequest>, ParseError> {
    let message = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    let mut tokens = message.split_whitespace();
    let keyword = match tokens.next() {
        Some(keyword) => keyword,
        None => return Ok(None),
    };

    if keyword != MOVE_KEYWORD {
        return Err(ParseError::UnknownCommand(keyword.to_string()));
    }

    let mut fields = [0.0_f64; MOVE_FIELDS];
    for field in fields.iter_mut() {
        *field = tokens
            .next()
            .and_then(|token| token.parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .ok_or_else(|| ParseError::MalformedFields(message.to_string()))?;
    }

    let request = MotionRequest::new(fields[0], fields[1], fields[2]);

    if request.power < 0.0 {
        return Err(ParseError::MalformedFields(message.to_string()));
    }

    Ok(Some(request))
}

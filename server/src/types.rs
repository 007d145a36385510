//! Message records and the values stamped onto them at ingest.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

/// Session identities are drawn from `0..IDENTITY_SPACE`, one per colour.
pub const IDENTITY_SPACE: u32 = 0xFF_FFFF;

// ═══════════════════════════════════════════════════════════════
// Message records
// ═══════════════════════════════════════════════════════════════

/// A message as it lives in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub colour: Colour,
    pub position: Position,
}

impl Message {
    /// Age relative to `now`. Negative if the clock stepped backwards.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

/// A stamped submission, not yet assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub colour: Colour,
    pub position: Position,
}

impl NewMessage {
    pub fn into_message(self, id: Uuid) -> Message {
        Message {
            id,
            text: self.text,
            created_at: self.created_at,
            colour: self.colour,
            position: self.position,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// Colour
// ═══════════════════════════════════════════════════════════════

/// Display colour derived from a session identity, e.g. `#123abc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Colour(String);

impl Colour {
    pub fn from_identity(identity: u32) -> Self {
        Self(format!("#{identity:06x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════
// Screen position
// ═══════════════════════════════════════════════════════════════

/// Screen position in percent of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const X_RANGE: (f64, f64) = (10.0, 90.0);
    pub const Y_RANGE: (f64, f64) = (5.0, 85.0);

    /// Uniform over the message area, rounded to two decimals.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let (x_lo, x_hi) = Self::X_RANGE;
        let (y_lo, y_hi) = Self::Y_RANGE;
        Self {
            x: round2(rng.gen_range(x_lo..=x_hi)),
            y: round2(rng.gen_range(y_lo..=y_hi)),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn colour_is_fixed_width_hex() {
        assert_eq!(Colour::from_identity(0x123ABC).as_str(), "#123abc");
        assert_eq!(Colour::from_identity(0xAB).as_str(), "#0000ab");
        assert_eq!(Colour::from_identity(0).to_string(), "#000000");
    }

    proptest! {
        #[test]
        fn position_stays_in_message_area(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let p = Position::random(&mut rng);
            prop_assert!((10.0..=90.0).contains(&p.x));
            prop_assert!((5.0..=85.0).contains(&p.y));
            prop_assert!(((p.x * 100.0).round() - p.x * 100.0).abs() < 1e-6);
            prop_assert!(((p.y * 100.0).round() - p.y * 100.0).abs() < 1e-6);
        }
    }
}

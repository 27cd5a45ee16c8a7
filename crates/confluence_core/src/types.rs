use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::path::PathBuf;
use std::str::FromStr;

/// Number of usable track slots. Slot arrays are `SLOTS + 1` long so that
/// slot `i` lives at index `i`; index 0 is a sentinel meaning "no previous
/// track" and stays zero/empty for the life of the session.
pub const SLOTS: usize = 5;

// ---------------------------------------------------------------------------
// Ms
// ---------------------------------------------------------------------------

/// A millisecond position or duration on the output timeline.
///
/// Negative values are representable: a LIAM relative offset below zero means
/// "start |v| ms after the previous track's end" (a silence gap).
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct Ms(pub i64);

impl Ms {
    pub const ZERO: Self = Self(0);

    /// Clamp to the timeline origin. Resolved starts are never negative.
    pub fn clamped(self) -> Self {
        Self(self.0.max(0))
    }

    pub fn as_seconds(&self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl Add for Ms {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Ms {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Ms {
    /// `m:ss`, rounded to the nearest second, clamped at zero (the format the
    /// operator sees next to each slot).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = ((self.0.max(0) as f64) / 1000.0).round() as i64;
        write!(f, "{}:{:02}", total_secs / 60, total_secs % 60)
    }
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Placement semantics for the output timeline. Exactly one is active.
///
/// Switching modes never erases the inactive representation's stored offsets;
/// it only changes which representation is authoritative.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Absolute placement: each slot's start is given directly in ms from
    /// timeline zero.
    #[default]
    Tao,
    /// Relative-to-end placement: each slot's start is an offset before (or,
    /// when negative, after) the previous slot's end.
    Liam,
    /// End-to-end with zero gap and zero crossfade. Offsets and crossfades
    /// are ignored by contract.
    Concat,
}

impl Mode {
    /// The mode vocabulary the rendering service understands. It only
    /// distinguishes absolute from relative-to-end; the concat engine is told
    /// "tao" and ignores offsets entirely.
    pub fn wire_mode(self) -> WireMode {
        match self {
            Mode::Liam => WireMode::Liam,
            Mode::Tao | Mode::Concat => WireMode::Tao,
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tao" => Ok(Mode::Tao),
            "liam" => Ok(Mode::Liam),
            "concat" => Ok(Mode::Concat),
            other => Err(format!("unknown mode: {other} (expected tao|liam|concat)")),
        }
    }
}

/// Wire-level placement mode. Never "concat".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WireMode {
    Tao,
    Liam,
}

// ---------------------------------------------------------------------------
// Ambience
// ---------------------------------------------------------------------------

/// Generated ambience bed mixed under the tracks, orthogonal to placement.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Ambience {
    #[default]
    None,
    Water,
    Wind,
    Pads,
}

impl FromStr for Ambience {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Ambience::None),
            "water" => Ok(Ambience::Water),
            "wind" => Ok(Ambience::Wind),
            "pads" => Ok(Ambience::Pads),
            other => Err(format!(
                "unknown ambience: {other} (expected none|water|wind|pads)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// TrackSlot
// ---------------------------------------------------------------------------

/// One of the five track slots feeding the output timeline.
///
/// Both offset representations are stored at all times; the session mode
/// decides which one is live. `duration_ms == 0` means "not yet measured".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackSlot {
    pub file: Option<PathBuf>,
    pub duration_ms: Ms,
    pub offset_abs_ms: Ms,
    pub offset_rel_ms: Ms,
    pub crossfade_ms: Ms,
    pub gain_db: f64,
    pub pan: f64,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The whole mutable timeline state: one instance per session, single writer,
/// discarded on exit. Durations are written only from service responses;
/// offsets and crossfades only from operator edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub mode: Mode,
    pub ambience: Ambience,
    pub ambience_gain_db: f64,
    pub slots: [TrackSlot; SLOTS + 1],
}

impl Session {
    pub fn new() -> Self {
        let mut slots: [TrackSlot; SLOTS + 1] = Default::default();
        // Stock spacing: each track nominally enters 14 s after the previous
        // one, with a 5 s crossfade and a gentle stereo spread.
        let offsets = [0, 0, 14_000, 28_000, 42_000, 56_000];
        let pans = [0.0, 0.0, -0.35, 0.35, -0.2, 0.2];
        for i in 2..=SLOTS {
            slots[i].offset_abs_ms = Ms(offsets[i]);
            slots[i].offset_rel_ms = Ms(offsets[i]);
            slots[i].crossfade_ms = Ms(5_000);
        }
        for i in 1..=SLOTS {
            slots[i].pan = pans[i];
        }
        Self {
            mode: Mode::Tao,
            ambience: Ambience::None,
            ambience_gain_db: -24.0,
            slots,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_add_sub() {
        assert_eq!(Ms(5_000) + Ms(3_000), Ms(8_000));
        assert_eq!(Ms(5_000) - Ms(8_000), Ms(-3_000));
    }

    #[test]
    fn ms_clamped() {
        assert_eq!(Ms(-250).clamped(), Ms::ZERO);
        assert_eq!(Ms(250).clamped(), Ms(250));
    }

    #[test]
    fn ms_display() {
        assert_eq!(Ms::ZERO.to_string(), "0:00");
        assert_eq!(Ms(14_000).to_string(), "0:14");
        assert_eq!(Ms(61_000).to_string(), "1:01");
        assert_eq!(Ms(61_400).to_string(), "1:01");
        // Negative offsets are gaps, not positions; display floors at zero.
        assert_eq!(Ms(-5_000).to_string(), "0:00");
    }

    #[test]
    fn ms_serde_transparent() {
        let json = serde_json::to_string(&Ms(14_000)).unwrap();
        assert_eq!(json, "14000");
        let back: Ms = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Ms(14_000));
    }

    #[test]
    fn mode_wire_vocabulary_never_concat() {
        assert_eq!(Mode::Tao.wire_mode(), WireMode::Tao);
        assert_eq!(Mode::Liam.wire_mode(), WireMode::Liam);
        assert_eq!(Mode::Concat.wire_mode(), WireMode::Tao);
    }

    #[test]
    fn mode_parse() {
        assert_eq!("TAO".parse::<Mode>().unwrap(), Mode::Tao);
        assert_eq!("liam".parse::<Mode>().unwrap(), Mode::Liam);
        assert!("splice".parse::<Mode>().is_err());
    }

    #[test]
    fn mode_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Mode::Liam).unwrap(), "\"liam\"");
        assert_eq!(serde_json::to_string(&WireMode::Tao).unwrap(), "\"tao\"");
    }

    #[test]
    fn session_defaults() {
        let s = Session::new();
        assert_eq!(s.mode, Mode::Tao);
        assert_eq!(s.ambience, Ambience::None);
        assert!((s.ambience_gain_db - -24.0).abs() < f64::EPSILON);
        // Anchor slot and sentinel carry no offset or crossfade.
        assert_eq!(s.slots[0].offset_abs_ms, Ms::ZERO);
        assert_eq!(s.slots[1].offset_abs_ms, Ms::ZERO);
        assert_eq!(s.slots[1].crossfade_ms, Ms::ZERO);
        assert_eq!(s.slots[2].offset_abs_ms, Ms(14_000));
        assert_eq!(s.slots[5].offset_rel_ms, Ms(56_000));
        assert_eq!(s.slots[3].crossfade_ms, Ms(5_000));
        // Durations start unknown.
        for slot in &s.slots {
            assert_eq!(slot.duration_ms, Ms::ZERO);
            assert!(slot.file.is_none());
        }
    }

    #[test]
    fn session_serde_roundtrip() {
        let mut s = Session::new();
        s.mode = Mode::Liam;
        s.slots[2].duration_ms = Ms(10_000);
        s.slots[2].file = Some(PathBuf::from("/tmp/m2.wav"));
        let json = serde_json::to_string(&s).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}

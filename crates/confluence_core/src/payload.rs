//! Assembles the exact request bodies sent to the rendering service.
//!
//! Wire arrays are five entries long, index 0 = slot 1. The slot-1 entry for
//! offsets and crossfades is always zero: slot 1 is the timeline anchor.

use crate::types::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Operation / Engine
// ---------------------------------------------------------------------------

/// What the caller is about to ask the service for. Preview is the only
/// operation that requests the full-length render stream back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Preview,
    Render,
}

impl Operation {
    fn preview_full(self) -> bool {
        matches!(self, Operation::Preview)
    }
}

/// Which rendering pass the service should run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Mix,
    Concat,
}

/// Which offset representation travels in this payload. Exactly one of the
/// two offset arrays is ever present.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OffsetMode {
    #[serde(rename = "abs")]
    Abs,
    #[serde(rename = "relative_end")]
    RelativeEnd,
}

// ---------------------------------------------------------------------------
// MixPayload
// ---------------------------------------------------------------------------

/// Request body for the preview and render operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MixPayload {
    pub engine: Engine,
    pub mode: WireMode,
    pub ambience: Ambience,
    pub amb_gain_db: f64,
    pub gains_db: [f64; SLOTS],
    pub pan: [f64; SLOTS],
    pub xf_ms: [i64; SLOTS],
    pub offset_mode: OffsetMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offsets_ms: Option<[i64; SLOTS]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel_ms: Option<[i64; SLOTS]>,
    pub preview_full: bool,
}

impl MixPayload {
    /// Build the payload for `op` from the current session state.
    ///
    /// `engine_override` forces the concat engine without switching modes
    /// (quick-listen of a concat-style pass); the offset representation still
    /// follows the local mode.
    pub fn build(session: &Session, op: Operation, engine_override: Option<Engine>) -> Self {
        let engine = engine_override.unwrap_or(match session.mode {
            Mode::Concat => Engine::Concat,
            _ => Engine::Mix,
        });

        let mut gains_db = [0.0; SLOTS];
        let mut pan = [0.0; SLOTS];
        let mut xf_ms = [0i64; SLOTS];
        for i in 1..=SLOTS {
            gains_db[i - 1] = session.slots[i].gain_db;
            pan[i - 1] = session.slots[i].pan;
            if i > 1 {
                xf_ms[i - 1] = session.slots[i].crossfade_ms.clamped().0;
            }
        }

        let (offset_mode, offsets_ms, rel_ms) = match session.mode {
            Mode::Liam => {
                let mut rel = [0i64; SLOTS];
                for i in 2..=SLOTS {
                    // Relative offsets keep their sign: negative means a gap.
                    rel[i - 1] = session.slots[i].offset_rel_ms.0;
                }
                (OffsetMode::RelativeEnd, None, Some(rel))
            }
            Mode::Tao | Mode::Concat => {
                let mut abs = [0i64; SLOTS];
                for i in 2..=SLOTS {
                    abs[i - 1] = session.slots[i].offset_abs_ms.clamped().0;
                }
                (OffsetMode::Abs, Some(abs), None)
            }
        };

        Self {
            engine,
            mode: session.mode.wire_mode(),
            ambience: session.ambience,
            amb_gain_db: session.ambience_gain_db,
            gains_db,
            pan,
            xf_ms,
            offset_mode,
            offsets_ms,
            rel_ms,
            preview_full: op.preview_full(),
        }
    }
}

// ---------------------------------------------------------------------------
// ExportPayload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Wav,
    Mp3,
    Flac,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(ExportFormat::Wav),
            "mp3" => Ok(ExportFormat::Mp3),
            "flac" => Ok(ExportFormat::Flac),
            other => Err(format!("unknown format: {other} (expected wav|mp3|flac)")),
        }
    }
}

/// Request body for the export operation. Exports re-encode the last
/// rendered mix server-side; no timeline state travels with them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportPayload {
    pub format: ExportFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
    pub mono: bool,
}

impl ExportPayload {
    pub fn new(format: ExportFormat, mono: bool) -> Self {
        let bitrate = match format {
            ExportFormat::Mp3 => Some("192k".to_string()),
            _ => None,
        };
        Self {
            format,
            bitrate,
            mono,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_offsets() -> Session {
        let mut s = Session::new();
        s.apply_durations(&[10_000, 10_000, 10_000, 10_000, 10_000]);
        s
    }

    #[test]
    fn tao_payload_carries_absolute_offsets_only() {
        let mut s = session_with_offsets();
        s.set_mode(Mode::Tao);
        let p = MixPayload::build(&s, Operation::Render, None);

        assert_eq!(p.engine, Engine::Mix);
        assert_eq!(p.mode, WireMode::Tao);
        assert_eq!(p.offset_mode, OffsetMode::Abs);
        assert_eq!(p.offsets_ms, Some([0, 14_000, 28_000, 42_000, 56_000]));
        assert_eq!(p.rel_ms, None);
        assert!(!p.preview_full);
    }

    #[test]
    fn liam_payload_carries_relative_offsets_only() {
        let mut s = session_with_offsets();
        s.set_mode(Mode::Liam);
        s.set_offset(3, Ms(-5_000)).unwrap();
        let p = MixPayload::build(&s, Operation::Preview, None);

        assert_eq!(p.mode, WireMode::Liam);
        assert_eq!(p.offset_mode, OffsetMode::RelativeEnd);
        // Negative relative offsets travel as-is.
        assert_eq!(p.rel_ms, Some([0, 14_000, -5_000, 42_000, 56_000]));
        assert_eq!(p.offsets_ms, None);
        assert!(p.preview_full);
    }

    #[test]
    fn payload_never_contains_both_offset_arrays() {
        let mut s = session_with_offsets();
        for mode in [Mode::Tao, Mode::Liam, Mode::Concat] {
            s.set_mode(mode);
            for op in [Operation::Preview, Operation::Render] {
                let p = MixPayload::build(&s, op, None);
                assert!(
                    p.offsets_ms.is_some() != p.rel_ms.is_some(),
                    "exactly one offset array must be present ({mode:?}, {op:?})"
                );
            }
        }
    }

    #[test]
    fn concat_mode_selects_concat_engine_and_tao_wire_mode() {
        let mut s = session_with_offsets();
        s.set_mode(Mode::Concat);
        let p = MixPayload::build(&s, Operation::Render, None);

        assert_eq!(p.engine, Engine::Concat);
        // The service has no concat offset vocabulary; it is told "tao" and
        // the concat engine ignores the offsets.
        assert_eq!(p.mode, WireMode::Tao);
        assert_eq!(p.offset_mode, OffsetMode::Abs);
    }

    #[test]
    fn engine_override_forces_concat_without_mode_switch() {
        let mut s = session_with_offsets();
        s.set_mode(Mode::Liam);
        let p = MixPayload::build(&s, Operation::Preview, Some(Engine::Concat));

        assert_eq!(p.engine, Engine::Concat);
        // Local mode untouched, offsets still shaped by LIAM.
        assert_eq!(s.mode, Mode::Liam);
        assert_eq!(p.offset_mode, OffsetMode::RelativeEnd);
    }

    #[test]
    fn slot_one_entries_are_always_zero() {
        let mut s = session_with_offsets();
        for mode in [Mode::Tao, Mode::Liam, Mode::Concat] {
            s.set_mode(mode);
            let p = MixPayload::build(&s, Operation::Render, None);
            assert_eq!(p.xf_ms[0], 0);
            if let Some(abs) = p.offsets_ms {
                assert_eq!(abs[0], 0);
            }
            if let Some(rel) = p.rel_ms {
                assert_eq!(rel[0], 0);
            }
        }
    }

    #[test]
    fn crossfades_always_included() {
        let mut s = session_with_offsets();
        s.set_crossfade(2, Ms(3_000)).unwrap();
        for mode in [Mode::Tao, Mode::Liam, Mode::Concat] {
            s.set_mode(mode);
            let p = MixPayload::build(&s, Operation::Render, None);
            assert_eq!(p.xf_ms, [0, 3_000, 5_000, 5_000, 5_000]);
        }
    }

    #[test]
    fn serialized_payload_omits_absent_offset_array() {
        let mut s = session_with_offsets();
        s.set_mode(Mode::Liam);
        let json = serde_json::to_string(&MixPayload::build(&s, Operation::Preview, None)).unwrap();
        assert!(json.contains("\"rel_ms\""));
        assert!(!json.contains("\"offsets_ms\""));
        assert!(json.contains("\"offset_mode\":\"relative_end\""));
        assert!(json.contains("\"mode\":\"liam\""));
    }

    #[test]
    fn export_payload_bitrate_only_for_mp3() {
        let wav = ExportPayload::new(ExportFormat::Wav, false);
        assert_eq!(wav.bitrate, None);
        let mp3 = ExportPayload::new(ExportFormat::Mp3, true);
        assert_eq!(mp3.bitrate.as_deref(), Some("192k"));
        assert!(mp3.mono);

        let json = serde_json::to_string(&wav).unwrap();
        assert!(!json.contains("bitrate"));
        assert!(json.contains("\"format\":\"wav\""));
    }
}

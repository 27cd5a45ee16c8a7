//! Converts between the two offset representations and derives the absolute
//! start of every slot on the output timeline.
//!
//! Everything here is a pure function over its inputs: safe to call on every
//! display refresh, and never an error. Unknown durations (0) simply flow
//! through the chain, so LIAM results computed before all durations are
//! measured are estimates the caller should label as provisional.

use crate::types::*;

/// Resolve the absolute start of every slot under the session's active mode.
/// Index 0 is the sentinel and always 0.
///
/// LIAM chains strictly from slot 1 upward: slot `i` starts at the previous
/// slot's resolved end minus its relative offset, clamped at timeline zero.
/// TAO reads the absolute offsets directly with no duration dependency.
/// CONCAT lays tracks end to end; the real placement is owned by the
/// rendering service, this is only the display estimate.
pub fn resolve_starts(session: &Session) -> [Ms; SLOTS + 1] {
    match session.mode {
        Mode::Tao => {
            let mut starts = [Ms::ZERO; SLOTS + 1];
            for i in 2..=SLOTS {
                starts[i] = session.slots[i].offset_abs_ms.clamped();
            }
            starts
        }
        Mode::Liam => {
            let durations = slot_field(session, |s| s.duration_ms);
            let rel = slot_field(session, |s| s.offset_rel_ms);
            rel_to_abs(&durations, &rel)
        }
        Mode::Concat => {
            let mut starts = [Ms::ZERO; SLOTS + 1];
            for i in 2..=SLOTS {
                starts[i] = starts[i - 1] + session.slots[i - 1].duration_ms;
            }
            starts
        }
    }
}

/// Convert relative-to-end offsets into absolute starts given the known
/// durations. `rel[i] > 0` starts slot `i` that many ms before the previous
/// slot's end; negative values open a gap after it. Slot 1 anchors at 0.
pub fn rel_to_abs(durations: &[Ms; SLOTS + 1], rel: &[Ms; SLOTS + 1]) -> [Ms; SLOTS + 1] {
    let mut abs = [Ms::ZERO; SLOTS + 1];
    for i in 2..=SLOTS {
        abs[i] = (abs[i - 1] + durations[i - 1] - rel[i]).clamped();
    }
    abs
}

/// Inverse of [`rel_to_abs`]: recover the relative offsets that would place
/// each slot at the given absolute starts. Exact as long as no start was
/// clamped during the forward conversion.
pub fn abs_to_rel(durations: &[Ms; SLOTS + 1], abs: &[Ms; SLOTS + 1]) -> [Ms; SLOTS + 1] {
    let mut rel = [Ms::ZERO; SLOTS + 1];
    for i in 2..=SLOTS {
        rel[i] = abs[i - 1] + durations[i - 1] - abs[i];
    }
    rel
}

/// Theoretical length of a zero-gap concatenation of all measured tracks.
pub fn total_concat_ms(session: &Session) -> Ms {
    let mut total = Ms::ZERO;
    for i in 1..=SLOTS {
        total = total + session.slots[i].duration_ms;
    }
    total
}

fn slot_field(session: &Session, f: impl Fn(&TrackSlot) -> Ms) -> [Ms; SLOTS + 1] {
    let mut out = [Ms::ZERO; SLOTS + 1];
    for i in 1..=SLOTS {
        out[i] = f(&session.slots[i]);
    }
    out
}

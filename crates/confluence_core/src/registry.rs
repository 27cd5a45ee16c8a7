use crate::error::{CoreError, Result};
use crate::types::*;
use std::path::PathBuf;

impl Session {
    /// Snapshot accessor for a slot. Slot 0 is the sentinel and not
    /// addressable here.
    pub fn slot(&self, slot: usize) -> Result<&TrackSlot> {
        check_slot(slot)?;
        Ok(&self.slots[slot])
    }

    /// Attach or detach a source file. The handle is opaque to the core; the
    /// rendering service is the only component that ever opens it.
    pub fn set_file(&mut self, slot: usize, file: Option<PathBuf>) -> Result<()> {
        check_slot(slot)?;
        self.slots[slot].file = file;
        Ok(())
    }

    /// Store a measured duration. Only service responses should land here;
    /// negative inputs are clamped since 0 is the "unknown" sentinel.
    pub fn set_duration(&mut self, slot: usize, ms: Ms) -> Result<()> {
        check_slot(slot)?;
        self.slots[slot].duration_ms = ms.clamped();
        Ok(())
    }

    /// Bulk import of a durations query response, ordered slot 1..=5.
    pub fn apply_durations(&mut self, durations_ms: &[i64]) {
        for (i, &d) in durations_ms.iter().take(SLOTS).enumerate() {
            self.slots[i + 1].duration_ms = Ms(d).clamped();
        }
    }

    /// Write an offset for a slot into whichever representation the current
    /// mode makes authoritative. The other representation keeps its stored
    /// value so the operator can toggle modes without losing entries.
    pub fn set_offset(&mut self, slot: usize, ms: Ms) -> Result<()> {
        check_slot(slot)?;
        if slot == 1 {
            return Err(CoreError::AnchorSlot);
        }
        match self.mode {
            Mode::Liam => self.slots[slot].offset_rel_ms = ms,
            Mode::Tao | Mode::Concat => self.slots[slot].offset_abs_ms = ms.clamped(),
        }
        Ok(())
    }

    /// Crossfade between a slot and its immediate predecessor. Slot 1 has no
    /// predecessor.
    pub fn set_crossfade(&mut self, slot: usize, ms: Ms) -> Result<()> {
        check_slot(slot)?;
        if slot == 1 {
            return Err(CoreError::AnchorSlot);
        }
        self.slots[slot].crossfade_ms = ms.clamped();
        Ok(())
    }

    pub fn set_gain(&mut self, slot: usize, db: f64) -> Result<()> {
        check_slot(slot)?;
        self.slots[slot].gain_db = db;
        Ok(())
    }

    pub fn set_pan(&mut self, slot: usize, pan: f64) -> Result<()> {
        check_slot(slot)?;
        self.slots[slot].pan = pan.clamp(-1.0, 1.0);
        Ok(())
    }

    /// Switch placement mode. Total, side-effect free beyond `mode` itself:
    /// both offset representations survive the transition untouched.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }
}

fn check_slot(slot: usize) -> Result<()> {
    if (1..=SLOTS).contains(&slot) {
        Ok(())
    } else {
        Err(CoreError::InvalidSlot(slot))
    }
}

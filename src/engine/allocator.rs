use crate::MAX_VOICES;

/// Ownership of one voice slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocationRecord {
    /// `None` while the slot is free.
    pub channel: Option<u8>,
    /// Issue time of the last allocation. Unique across the pool's lifetime.
    pub timestamp: u64,
    /// Key still held.
    pub gate: bool,
}

impl AllocationRecord {
    pub fn is_free(&self) -> bool {
        self.channel.is_none()
    }

    /// Owned by `channel` and no longer gated.
    pub fn is_released(&self) -> bool {
        self.channel.is_some() && !self.gate
    }

    /// Steal priority: lower goes first.
    fn class(&self) -> u8 {
        match (self.channel, self.gate) {
            (None, _) => 0,
            (Some(_), false) => 1,
            (Some(_), true) => 2,
        }
    }
}

/// Fixed-capacity list of slot indices in steal order.
#[derive(Debug, Clone, Copy)]
pub struct Candidates {
    slots: [usize; MAX_VOICES],
    len: usize,
}

impl Candidates {
    pub fn as_slice(&self) -> &[usize] {
        &self.slots[..self.len]
    }

    pub fn first(&self) -> Option<usize> {
        self.as_slice().first().copied()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Tracks which channel owns each voice slot and picks slots for new notes.
///
/// Priority for a new note: any free slot, then the oldest released slot,
/// then the oldest slot outright. A channel already at its polyphony limit
/// only competes against itself: candidates are restricted to its own
/// slots with the same released-before-gated order.
#[derive(Debug, Clone)]
pub struct VoicePool {
    records: [AllocationRecord; MAX_VOICES],
    clock: u64,
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new()
    }
}

impl VoicePool {
    pub fn new() -> Self {
        Self {
            records: [AllocationRecord::default(); MAX_VOICES],
            clock: 0,
        }
    }

    pub fn record(&self, slot: usize) -> Option<&AllocationRecord> {
        self.records.get(slot)
    }

    pub fn records(&self) -> &[AllocationRecord; MAX_VOICES] {
        &self.records
    }

    /// Slots currently owned by `channel`.
    pub fn owned_by(&self, channel: u8) -> usize {
        self.records
            .iter()
            .filter(|r| r.channel == Some(channel))
            .count()
    }

    pub fn active_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_free()).count()
    }

    /// The channel's most recently allocated slot.
    pub fn most_recent(&self, channel: u8) -> Option<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.channel == Some(channel))
            .max_by_key(|(_, r)| r.timestamp)
            .map(|(slot, _)| slot)
    }

    /// Slots a new note on `channel` could take, best first.
    pub fn steal_candidates(&self, channel: u8, channel_limit: usize) -> Candidates {
        let restrict = self.owned_by(channel) >= channel_limit.max(1);

        let mut slots = [0usize; MAX_VOICES];
        let mut len = 0;
        for (slot, record) in self.records.iter().enumerate() {
            if !restrict || record.channel == Some(channel) {
                slots[len] = slot;
                len += 1;
            }
        }

        let records = &self.records;
        slots[..len].sort_unstable_by_key(|&slot| {
            let r = &records[slot];
            // Free slots keep index order; the rest go oldest first.
            let age = if r.is_free() { 0 } else { r.timestamp };
            (r.class(), age, slot)
        });

        Candidates { slots, len }
    }

    /// Claim a slot for a new note. Never fails: when nothing is free a
    /// sounding slot is taken over.
    pub fn allocate(&mut self, channel: u8, channel_limit: usize) -> usize {
        let slot = self.steal_candidates(channel, channel_limit).first().unwrap_or(0);
        self.clock += 1;
        self.records[slot] = AllocationRecord {
            channel: Some(channel),
            timestamp: self.clock,
            gate: true,
        };
        slot
    }

    /// Key up: the slot stays owned until its voice goes silent.
    pub fn release(&mut self, slot: usize) {
        if let Some(record) = self.records.get_mut(slot) {
            record.gate = false;
        }
    }

    /// Voice went silent.
    pub fn free(&mut self, slot: usize) {
        if let Some(record) = self.records.get_mut(slot) {
            record.channel = None;
            record.gate = false;
        }
    }

    /// Latest timestamp issued.
    pub fn clock(&self) -> u64 {
        self.clock
    }
}

//! Camera session arbitration.
//!
//! One physical camera is shared by three mode slots. `CameraSessions` tracks
//! the lifecycle of each slot and hands back the [`SessionCommand`]s the app
//! must forward to the camera capability. At most one slot is ever open
//! (anything other than [`SessionState::Closed`]).

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanSlot {
    Single,
    Batch,
    Upload,
}

impl ScanSlot {
    pub const ALL: [ScanSlot; 3] = [ScanSlot::Single, ScanSlot::Batch, ScanSlot::Upload];

    const fn index(self) -> usize {
        match self {
            Self::Single => 0,
            Self::Batch => 1,
            Self::Upload => 2,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Batch => "batch",
            Self::Upload => "upload",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Closed,
    Starting,
    Active,
    Paused,
}

impl SessionState {
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionCommand {
    Start(ScanSlot),
    Pause(ScanSlot),
    Resume(ScanSlot),
    Stop(ScanSlot),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SlotSession {
    state: SessionState,
    /// The shell holds a scanner instance for this slot, so a resume may
    /// reacquire the stream without a new permission prompt.
    warm: bool,
    /// Camera acquisition failed; no automatic restarts until retried.
    unavailable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraSessions {
    slots: [SlotSession; 3],
}

impl CameraSessions {
    #[must_use]
    pub fn state(&self, slot: ScanSlot) -> SessionState {
        self.slots[slot.index()].state
    }

    #[must_use]
    pub fn is_unavailable(&self, slot: ScanSlot) -> bool {
        self.slots[slot.index()].unavailable
    }

    /// The slot currently holding the camera, if any.
    #[must_use]
    pub fn open_slot(&self) -> Option<ScanSlot> {
        ScanSlot::ALL
            .into_iter()
            .find(|slot| self.state(*slot).is_open())
    }

    /// Decoded frames are only acted on for the slot that is actively scanning.
    #[must_use]
    pub fn accepts_decodes(&self, slot: ScanSlot) -> bool {
        self.state(slot) == SessionState::Active
    }

    /// Makes `slot` the scanning slot: every other slot is stopped first, then
    /// the target is resumed when it still has a scanner instance, or started.
    /// `fresh` forces a full restart of the target.
    pub fn activate(&mut self, slot: ScanSlot, fresh: bool) -> Vec<SessionCommand> {
        let mut commands: Vec<SessionCommand> = ScanSlot::ALL
            .into_iter()
            .filter(|other| *other != slot)
            .filter_map(|other| self.stop(other))
            .collect();

        if fresh {
            commands.extend(self.stop(slot));
            self.slots[slot.index()].warm = false;
        }

        let session = self.slots[slot.index()];
        if session.unavailable {
            debug!(slot = slot.as_str(), "camera unavailable, awaiting manual retry");
            return commands;
        }

        match session.state {
            SessionState::Starting | SessionState::Active => {}
            SessionState::Paused => commands.extend(self.resume(slot)),
            SessionState::Closed if session.warm => {
                self.set_state(slot, SessionState::Starting);
                commands.push(SessionCommand::Resume(slot));
            }
            SessionState::Closed => {
                self.set_state(slot, SessionState::Starting);
                commands.push(SessionCommand::Start(slot));
            }
        }

        info!(slot = slot.as_str(), fresh, ?commands, "camera slot activated");
        commands
    }

    /// The shell acquired the camera for `slot`. When the slot was stopped in
    /// the meantime the fresh handle is released straight away.
    pub fn started(&mut self, slot: ScanSlot) -> Option<SessionCommand> {
        let session = &mut self.slots[slot.index()];
        session.warm = true;
        session.unavailable = false;
        match session.state {
            SessionState::Starting => {
                session.state = SessionState::Active;
                None
            }
            SessionState::Active | SessionState::Paused => None,
            SessionState::Closed => {
                warn!(slot = slot.as_str(), "camera opened for a closed slot, releasing");
                Some(SessionCommand::Stop(slot))
            }
        }
    }

    /// Camera acquisition failed (permission denied, no device).
    pub fn start_failed(&mut self, slot: ScanSlot) {
        let session = &mut self.slots[slot.index()];
        session.state = SessionState::Closed;
        session.warm = false;
        session.unavailable = true;
        warn!(slot = slot.as_str(), "camera unavailable");
    }

    /// A resume found no usable handle: fall back to a fresh start, unless the
    /// slot was closed while the resume was in flight.
    pub fn handle_lost(&mut self, slot: ScanSlot) -> Option<SessionCommand> {
        let session = &mut self.slots[slot.index()];
        session.warm = false;
        if session.state.is_open() {
            debug!(slot = slot.as_str(), "scanner handle lost, restarting");
            session.state = SessionState::Starting;
            Some(SessionCommand::Start(slot))
        } else {
            None
        }
    }

    pub fn pause(&mut self, slot: ScanSlot) -> Option<SessionCommand> {
        if self.state(slot) == SessionState::Active {
            self.set_state(slot, SessionState::Paused);
            Some(SessionCommand::Pause(slot))
        } else {
            None
        }
    }

    /// Resumes a paused slot, or reopens a slot whose handle was dropped.
    /// Slots waiting on a manual camera retry stay closed.
    pub fn resume(&mut self, slot: ScanSlot) -> Vec<SessionCommand> {
        match self.state(slot) {
            SessionState::Paused => {
                self.set_state(slot, SessionState::Active);
                vec![SessionCommand::Resume(slot)]
            }
            SessionState::Closed if !self.is_unavailable(slot) => self.activate(slot, false),
            SessionState::Closed | SessionState::Starting | SessionState::Active => Vec::new(),
        }
    }

    /// Releases the camera for `slot`. Stopping a closed slot is a no-op.
    pub fn stop(&mut self, slot: ScanSlot) -> Option<SessionCommand> {
        if self.state(slot).is_open() {
            self.set_state(slot, SessionState::Closed);
            Some(SessionCommand::Stop(slot))
        } else {
            None
        }
    }

    /// User-initiated retry after the camera was unavailable.
    pub fn retry(&mut self, slot: ScanSlot) -> Vec<SessionCommand> {
        self.slots[slot.index()].unavailable = false;
        self.activate(slot, true)
    }

    fn set_state(&mut self, slot: ScanSlot, state: SessionState) {
        self.slots[slot.index()].state = state;
    }
}

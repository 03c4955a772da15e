//! Lobby state machine: who is in the session, what they are called, and
//! whether they are ready.
//!
//! The lobby never touches sockets. Every command returns a [`LobbyOutcome`]
//! telling the session what to send and when to remove someone.

use log::{debug, info};
use shared::protocol::Command;
use shared::{default_participant_name, RoomSnapshot, RosterEntry, HOST_PARTICIPANT_ID};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Lobby,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: u32,
    pub name: String,
    pub ready: bool,
}

impl Participant {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: default_participant_name(id),
            ready: false,
        }
    }
}

/// What the session must do after the lobby handled a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyOutcome {
    /// The roster changed and should be broadcast now.
    RosterChanged,
    /// The participant asked to leave; remove it once the receive pass ends.
    LeaveRequested(u32),
    /// The session moved from lobby to active play.
    Started,
    /// Understood but nothing to do.
    Ignored,
    /// Not a lobby command; hand it to the gameplay layer untouched.
    Forward,
}

pub struct LobbySessionManager {
    /// Ordered by ID so roster snapshots are stable
    participants: BTreeMap<u32, Participant>,
    phase: SessionPhase,
    room_broadcast_interval: f32,
    room_timer: f32,
}

impl LobbySessionManager {
    pub fn new(room_broadcast_interval: f32) -> Self {
        Self {
            participants: BTreeMap::new(),
            phase: SessionPhase::Lobby,
            room_broadcast_interval,
            room_timer: 0.0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    /// Registers a participant under its placeholder name.
    pub fn add_participant(&mut self, id: u32) {
        self.participants
            .entry(id)
            .or_insert_with(|| Participant::new(id));
    }

    /// Registers the hosting process as participant 0.
    pub fn add_host(&mut self, name: &str) {
        let host = self
            .participants
            .entry(HOST_PARTICIPANT_ID)
            .or_insert_with(|| Participant::new(HOST_PARTICIPANT_ID));
        host.name = name.to_string();
        host.ready = false;
    }

    pub fn remove_participant(&mut self, id: u32) -> bool {
        self.participants.remove(&id).is_some()
    }

    pub fn participant(&self, id: u32) -> Option<&Participant> {
        self.participants.get(&id)
    }

    /// Participant IDs in ascending order.
    pub fn participant_ids(&self) -> Vec<u32> {
        self.participants.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Renames a participant. Empty names are ignored. Returns true when the
    /// participant exists.
    pub fn set_name(&mut self, id: u32, name: &str) -> bool {
        match self.participants.get_mut(&id) {
            Some(participant) => {
                if !name.is_empty() {
                    participant.name = name.to_string();
                }
                true
            }
            None => false,
        }
    }

    pub fn set_ready(&mut self, id: u32, ready: bool) -> bool {
        match self.participants.get_mut(&id) {
            Some(participant) => {
                participant.ready = ready;
                true
            }
            None => false,
        }
    }

    /// Moves to active play. Returns false if already active.
    pub fn start(&mut self) -> bool {
        if self.phase == SessionPhase::Active {
            return false;
        }
        self.phase = SessionPhase::Active;
        true
    }

    pub fn handle_command(&mut self, from: u32, command: &str, payload: &str) -> LobbyOutcome {
        let Some(command) = Command::parse(command) else {
            return LobbyOutcome::Forward;
        };

        match command {
            Command::Join => {
                let Some(participant) = self.participants.get_mut(&from) else {
                    return LobbyOutcome::Ignored;
                };
                if !payload.is_empty() {
                    participant.name = payload.to_string();
                }
                participant.ready = false;
                info!("JOIN from {} as '{}'", from, participant.name);
                LobbyOutcome::RosterChanged
            }
            Command::Ready => {
                let ready = payload == "1";
                if !self.set_ready(from, ready) {
                    return LobbyOutcome::Ignored;
                }
                info!("READY {} = {}", from, ready);
                LobbyOutcome::RosterChanged
            }
            Command::Leave => {
                if self.participants.contains_key(&from) {
                    LobbyOutcome::LeaveRequested(from)
                } else {
                    LobbyOutcome::Ignored
                }
            }
            Command::Start => {
                if self.start() {
                    info!("START requested by {}", from);
                    LobbyOutcome::Started
                } else {
                    debug!("START from {} ignored: already active", from);
                    LobbyOutcome::Ignored
                }
            }
            _ => LobbyOutcome::Forward,
        }
    }

    pub fn roster(&self) -> RoomSnapshot {
        RoomSnapshot {
            players: self
                .participants
                .values()
                .map(|p| RosterEntry {
                    id: p.id,
                    name: p.name.clone(),
                    ready: p.ready,
                })
                .collect(),
        }
    }

    /// Advances the periodic roster timer; true when a broadcast is due.
    pub fn tick_room_timer(&mut self, dt: f32) -> bool {
        self.room_timer += dt;
        if self.room_timer < self.room_broadcast_interval {
            return false;
        }
        self.room_timer = 0.0;
        true
    }

    /// Forgets everyone and returns to the lobby phase.
    pub fn reset(&mut self) {
        self.participants.clear();
        self.phase = SessionPhase::Lobby;
        self.room_timer = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;

    fn lobby_with(ids: &[u32]) -> LobbySessionManager {
        let mut lobby = LobbySessionManager::new(0.5);
        for id in ids {
            lobby.add_participant(*id);
        }
        lobby
    }

    #[test]
    fn test_new_participant_has_placeholder_name() {
        let lobby = lobby_with(&[3]);
        let p = lobby.participant(3).unwrap();
        assert_eq!(p.name, "Player3");
        assert!(!p.ready);
    }

    #[test]
    fn test_join_sets_name_and_clears_ready() {
        let mut lobby = lobby_with(&[1]);
        lobby.set_ready(1, true);

        assert_eq!(
            lobby.handle_command(1, "JOIN", "Alice"),
            LobbyOutcome::RosterChanged
        );
        let p = lobby.participant(1).unwrap();
        assert_eq!(p.name, "Alice");
        assert!(!p.ready);
    }

    #[test]
    fn test_join_with_empty_name_keeps_placeholder() {
        let mut lobby = lobby_with(&[2]);
        assert_eq!(lobby.handle_command(2, "JOIN", ""), LobbyOutcome::RosterChanged);
        assert_eq!(lobby.participant(2).unwrap().name, "Player2");
    }

    #[test]
    fn test_ready_flag() {
        let mut lobby = lobby_with(&[1]);
        lobby.handle_command(1, "READY", "1");
        assert!(lobby.participant(1).unwrap().ready);
        lobby.handle_command(1, "READY", "0");
        assert!(!lobby.participant(1).unwrap().ready);
        lobby.handle_command(1, "READY", "yes");
        assert!(!lobby.participant(1).unwrap().ready);
    }

    #[test]
    fn test_leave_is_deferred() {
        let mut lobby = lobby_with(&[1, 2]);
        assert_eq!(
            lobby.handle_command(1, "LEAVE", ""),
            LobbyOutcome::LeaveRequested(1)
        );
        // Still listed until the session applies the removal.
        assert!(lobby.participant(1).is_some());
        assert!(lobby.remove_participant(1));
        assert!(!lobby.remove_participant(1));
        assert_eq!(lobby.participant_ids(), vec![2]);
    }

    #[test]
    fn test_commands_from_unknown_sender() {
        let mut lobby = lobby_with(&[1]);
        assert_eq!(lobby.handle_command(9, "JOIN", "X"), LobbyOutcome::Ignored);
        assert_eq!(lobby.handle_command(9, "READY", "1"), LobbyOutcome::Ignored);
        assert_eq!(lobby.handle_command(9, "LEAVE", ""), LobbyOutcome::Ignored);
    }

    #[test]
    fn test_start_transitions_once() {
        let mut lobby = lobby_with(&[1]);
        assert_eq!(lobby.phase(), SessionPhase::Lobby);
        assert_eq!(lobby.handle_command(1, "START", ""), LobbyOutcome::Started);
        assert!(lobby.is_active());
        assert_eq!(lobby.handle_command(1, "START", ""), LobbyOutcome::Ignored);
    }

    #[test]
    fn test_gameplay_commands_are_forwarded() {
        let mut lobby = lobby_with(&[1]);
        assert_eq!(
            lobby.handle_command(1, "INPUTW", "0,1,0,0"),
            LobbyOutcome::Forward
        );
        assert_eq!(lobby.handle_command(1, "FIRE", ""), LobbyOutcome::Forward);
        assert_eq!(lobby.handle_command(1, "EMOTE", "wave"), LobbyOutcome::Forward);
    }

    #[test]
    fn test_roster_is_ordered_and_includes_host() {
        let mut lobby = lobby_with(&[2, 1]);
        lobby.add_host("Host");
        lobby.handle_command(2, "JOIN", "Bob");

        let roster = lobby.roster();
        let ids: Vec<u32> = roster.players.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(roster.get(0).unwrap().name, "Host");
        assert_eq!(roster.get(2).unwrap().name, "Bob");
    }

    #[test]
    fn test_room_timer() {
        let mut lobby = LobbySessionManager::new(0.5);
        assert!(!lobby.tick_room_timer(0.2));
        assert!(!lobby.tick_room_timer(0.2));
        assert!(lobby.tick_room_timer(0.2));
        assert!(!lobby.tick_room_timer(0.2));
    }

    #[test]
    fn test_reset() {
        let mut lobby = lobby_with(&[1, 2]);
        lobby.start();
        lobby.reset();
        assert!(lobby.is_empty());
        assert_eq!(lobby.phase(), SessionPhase::Lobby);
    }

    #[test]
    fn test_random_interleavings_keep_roster_consistent() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let mut lobby = LobbySessionManager::new(0.5);
            let mut expected: BTreeSet<u32> = BTreeSet::new();
            let mut next_id = 1;

            for _ in 0..40 {
                match rng.gen_range(0..4) {
                    0 => {
                        lobby.add_participant(next_id);
                        expected.insert(next_id);
                        next_id += 1;
                    }
                    op => {
                        if next_id == 1 {
                            continue;
                        }
                        let id = rng.gen_range(1..next_id);
                        let outcome = match op {
                            1 => lobby.handle_command(id, "JOIN", "n"),
                            2 => lobby.handle_command(id, "READY", "1"),
                            _ => lobby.handle_command(id, "LEAVE", ""),
                        };
                        if let LobbyOutcome::LeaveRequested(leaver) = outcome {
                            lobby.remove_participant(leaver);
                            expected.remove(&leaver);
                        }
                    }
                }

                let roster = lobby.roster();
                let ids: Vec<u32> = roster.players.iter().map(|p| p.id).collect();
                let unique: BTreeSet<u32> = ids.iter().copied().collect();
                assert_eq!(ids.len(), unique.len());
                assert_eq!(unique, expected);
            }
        }
    }
}

//! Read-only mirror of what the host last told us
//!
//! Nothing here simulates. Positions and hit points are copied from `STATE`,
//! names and ready flags from `ROOM`; presentation code reads them and reacts
//! to the changes reported by [`WorldView::apply_state`].

use crate::network::ClientEvent;
use shared::{ActorSnapshot, RoomSnapshot, RosterEntry, StateSnapshot};
use std::collections::BTreeMap;

/// Something presentation code may want to animate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActorChange {
    Appeared { id: u32 },
    Damaged { id: u32, amount: i32, hp: i32 },
    /// Hit points went back up, so the actor died and respawned
    Respawned { id: u32 },
    Vanished { id: u32 },
}

#[derive(Debug, Default)]
pub struct WorldView {
    roster: RoomSnapshot,
    actors: BTreeMap<u32, ActorSnapshot>,
    started: bool,
    connected: bool,
    states_received: u64,
}

impl WorldView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one client event into the view.
    pub fn apply(&mut self, event: &ClientEvent) -> Vec<ActorChange> {
        match event {
            ClientEvent::Room(room) => {
                self.connected = true;
                self.roster = room.clone();
                Vec::new()
            }
            ClientEvent::Start => {
                self.started = true;
                Vec::new()
            }
            ClientEvent::State(state) => self.apply_state(state),
            ClientEvent::Command { .. } => Vec::new(),
            ClientEvent::Disconnected => {
                self.connected = false;
                self.started = false;
                self.actors.clear();
                Vec::new()
            }
        }
    }

    /// Replaces every actor with the snapshot and reports what changed.
    pub fn apply_state(&mut self, state: &StateSnapshot) -> Vec<ActorChange> {
        let mut changes = Vec::new();
        let mut next = BTreeMap::new();

        for actor in &state.players {
            match self.actors.get(&actor.id) {
                None => changes.push(ActorChange::Appeared { id: actor.id }),
                Some(previous) if actor.hp < previous.hp => changes.push(ActorChange::Damaged {
                    id: actor.id,
                    amount: previous.hp - actor.hp,
                    hp: actor.hp,
                }),
                Some(previous) if actor.hp > previous.hp => {
                    changes.push(ActorChange::Respawned { id: actor.id })
                }
                Some(_) => {}
            }
            next.insert(actor.id, *actor);
        }

        for id in self.actors.keys() {
            if !next.contains_key(id) {
                changes.push(ActorChange::Vanished { id: *id });
            }
        }

        self.actors = next;
        self.states_received += 1;
        changes
    }

    pub fn actor(&self, id: u32) -> Option<&ActorSnapshot> {
        self.actors.get(&id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &ActorSnapshot> {
        self.actors.values()
    }

    pub fn roster(&self) -> &RoomSnapshot {
        &self.roster
    }

    /// Our own ID, guessed from the roster by display name.
    ///
    /// The protocol never tells a client its ID, so duplicate names make this
    /// ambiguous; the lowest matching ID wins.
    pub fn find_by_name(&self, name: &str) -> Option<u32> {
        self.roster
            .players
            .iter()
            .filter(|p| p.name == name)
            .map(|p| p.id)
            .min()
    }

    pub fn all_ready(&self) -> bool {
        !self.roster.players.is_empty() && self.roster.players.iter().all(|p: &RosterEntry| p.ready)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn states_received(&self) -> u64 {
        self.states_received
    }
}

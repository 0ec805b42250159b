//! Client-side mirror of the relay's player table

use shared::{Message, PlayerId, Pose};
use std::collections::BTreeMap;

/// Change produced by applying one server message
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    Assigned(PlayerId),
    Joined(PlayerId, Pose),
    Moved(PlayerId, Pose),
    Left(PlayerId),
}

#[derive(Debug, Default)]
pub struct PeerWorld {
    own_id: Option<PlayerId>,
    own_pose: Pose,
    peers: BTreeMap<PlayerId, Pose>,
}

impl PeerWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity assigned by the server's INIT, once received
    pub fn own_id(&self) -> Option<PlayerId> {
        self.own_id
    }

    pub fn own_pose(&self) -> Pose {
        self.own_pose
    }

    pub fn set_own_pose(&mut self, pose: Pose) {
        self.own_pose = pose;
    }

    pub fn peer(&self, id: PlayerId) -> Option<Pose> {
        self.peers.get(&id).copied()
    }

    pub fn peers(&self) -> impl Iterator<Item = (PlayerId, Pose)> + '_ {
        self.peers.iter().map(|(id, pose)| (*id, *pose))
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Applies a server message
    ///
    /// Echoes of our own UPDATEs and anything that is not about a peer are
    /// ignored. An UPDATE for an unknown peer adds it.
    pub fn apply(&mut self, message: &Message) -> Option<PeerEvent> {
        match *message {
            Message::Init { id, pose } => {
                self.own_id = Some(id);
                self.own_pose = pose;
                self.peers.remove(&id);
                Some(PeerEvent::Assigned(id))
            }
            Message::Spawn { id, pose } if Some(id) != self.own_id => {
                self.peers.insert(id, pose);
                Some(PeerEvent::Joined(id, pose))
            }
            Message::Update { id, pose } if Some(id) != self.own_id => {
                self.peers.insert(id, pose);
                Some(PeerEvent::Moved(id, pose))
            }
            Message::Despawn { id } => self.peers.remove(&id).map(|_| PeerEvent::Left(id)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_assigns_identity() {
        let mut world = PeerWorld::new();
        let event = world.apply(&Message::Init {
            id: 3,
            pose: Pose::default(),
        });

        assert_eq!(event, Some(PeerEvent::Assigned(3)));
        assert_eq!(world.own_id(), Some(3));
        assert_eq!(world.peer_count(), 0);
    }

    #[test]
    fn test_spawn_update_despawn() {
        let mut world = PeerWorld::new();
        world.apply(&Message::Init {
            id: 0,
            pose: Pose::default(),
        });

        world.apply(&Message::Spawn {
            id: 1,
            pose: Pose::default(),
        });
        let moved = world.apply(&Message::Update {
            id: 1,
            pose: Pose::new(1.0, 2.0, 3.0, 4.0),
        });
        assert_eq!(moved, Some(PeerEvent::Moved(1, Pose::new(1.0, 2.0, 3.0, 4.0))));
        assert_eq!(world.peer(1), Some(Pose::new(1.0, 2.0, 3.0, 4.0)));

        assert_eq!(world.apply(&Message::Despawn { id: 1 }), Some(PeerEvent::Left(1)));
        assert_eq!(world.peer(1), None);
        assert_eq!(world.apply(&Message::Despawn { id: 1 }), None);
    }

    #[test]
    fn test_own_echo_ignored() {
        let mut world = PeerWorld::new();
        world.apply(&Message::Init {
            id: 2,
            pose: Pose::default(),
        });
        world.set_own_pose(Pose::new(5.0, 0.0, 0.0, 0.0));

        let event = world.apply(&Message::Update {
            id: 2,
            pose: Pose::new(5.0, 0.0, 0.0, 0.0),
        });
        assert_eq!(event, None);
        assert_eq!(world.peer_count(), 0);
        assert_eq!(world.own_pose(), Pose::new(5.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_other_text_ignored() {
        let mut world = PeerWorld::new();
        assert_eq!(world.apply(&Message::Other("hello".into())), None);
    }

    #[test]
    fn test_peers_in_identity_order() {
        let mut world = PeerWorld::new();
        for id in [4, 1, 3] {
            world.apply(&Message::Spawn {
                id,
                pose: Pose::default(),
            });
        }
        let ids: Vec<PlayerId> = world.peers().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }
}

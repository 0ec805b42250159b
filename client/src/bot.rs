//! Headless bot that random-walks around and logs what its peers do

use crate::network::RelayClient;
use crate::world::{PeerEvent, PeerWorld};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Message, Pose};
use std::io;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};

/// Moves `pose` by up to `step` along each horizontal axis and turns it a little
///
/// Negative steps count by magnitude; a non-finite step does not move at all.
pub fn random_step<R: Rng>(pose: Pose, rng: &mut R, step: f32) -> Pose {
    let step = if step.is_finite() { step.abs() } else { 0.0 };
    let turn = rng.gen_range(-15.0..=15.0);
    Pose {
        x: pose.x + rng.gen_range(-step..=step),
        y: pose.y,
        z: pose.z + rng.gen_range(-step..=step),
        rotation_y: (pose.rotation_y + turn).rem_euclid(360.0),
    }
}

pub struct Bot {
    client: RelayClient,
    world: PeerWorld,
    rng: StdRng,
    step: f32,
}

impl Bot {
    pub fn new(client: RelayClient, step: f32) -> Self {
        Self {
            client,
            world: PeerWorld::new(),
            rng: StdRng::from_entropy(),
            step,
        }
    }

    pub fn world(&self) -> &PeerWorld {
        &self.world
    }

    /// Sends `rate` updates per second until `duration` elapses (or forever)
    ///
    /// Updates only start once INIT has arrived. Returns when the server
    /// closes the connection or the duration is up.
    pub async fn run(&mut self, rate: u32, duration: Option<Duration>) -> io::Result<()> {
        let mut ticker = interval(Duration::from_secs_f32(1.0 / rate.max(1) as f32));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let deadline = duration.map(|d| Instant::now() + d);

        loop {
            if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                info!("Run time elapsed, leaving");
                return Ok(());
            }

            tokio::select! {
                received = self.client.recv() => {
                    let message = received?;
                    self.handle(&message);
                },
                _ = ticker.tick() => {
                    self.send_update().await?;
                },
            }
        }
    }

    fn handle(&mut self, message: &Message) {
        match self.world.apply(message) {
            Some(PeerEvent::Assigned(id)) => info!("Assigned identity {}", id),
            Some(PeerEvent::Joined(id, pose)) => {
                info!("Player {} joined at {} ({} peers)", id, pose, self.world.peer_count())
            }
            Some(PeerEvent::Left(id)) => {
                info!("Player {} left ({} peers)", id, self.world.peer_count())
            }
            Some(PeerEvent::Moved(id, pose)) => debug!("Player {} moved to {}", id, pose),
            None => debug!("Received: {}", message),
        }
    }

    async fn send_update(&mut self) -> io::Result<()> {
        let Some(id) = self.world.own_id() else {
            return Ok(());
        };

        let pose = random_step(self.world.own_pose(), &mut self.rng, self.step);
        self.world.set_own_pose(pose);
        self.client.send(&Message::Update { id, pose }).await
    }
}

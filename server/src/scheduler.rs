//! Periodic world maintenance: wild creature spawning and despawning.

use crate::catalog::Catalog;
use crate::world::World;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Handles to the two maintenance tasks. Dropping it leaves them running.
pub struct Scheduler {
    spawn: JoinHandle<()>,
    despawn: JoinHandle<()>,
}

impl Scheduler {
    /// Starts the spawn and despawn loops. Neither fires until its first full
    /// period has elapsed.
    pub fn start(
        world: World,
        catalog: Arc<Catalog>,
        spawn_every: Duration,
        despawn_every: Duration,
    ) -> Self {
        info!(
            "Spawning every {:?}, despawning every {:?}",
            spawn_every, despawn_every
        );

        let spawn = {
            let world = world.clone();
            tokio::spawn(async move {
                run_spawn_loop(world, catalog, spawn_every).await;
            })
        };
        let despawn = tokio::spawn(async move {
            run_despawn_loop(world, despawn_every).await;
        });

        Self { spawn, despawn }
    }

    pub fn abort(&self) {
        self.spawn.abort();
        self.despawn.abort();
    }
}

async fn run_spawn_loop(world: World, catalog: Arc<Catalog>, period: Duration) {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Skip the first tick since it fires immediately
    timer.tick().await;

    loop {
        timer.tick().await;
        world.spawn_tick(&catalog).await;
    }
}

async fn run_despawn_loop(world: World, period: Duration) {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer.tick().await;

    loop {
        timer.tick().await;
        world.despawn_tick().await;
    }
}

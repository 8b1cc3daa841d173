//! Stand-in for the pointer-drag collaborator: a thread that slides the obstacle sideways.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use smartrockets_core::{Rect, SharedObstacle};
use tracing::debug;

/// How often the drift thread moves the obstacle.
pub const DRIFT_INTERVAL: Duration = Duration::from_millis(16);

/// Slide `obstacle` horizontally by `velocity`, bouncing off the edges of `bounds`.
///
/// Returns the moved rectangle and the (possibly reversed) velocity.
#[must_use]
pub fn drift_step(obstacle: Rect, velocity: f32, bounds: Rect) -> (Rect, f32) {
    let max_x = bounds.x + bounds.width - obstacle.width;
    let next_x = obstacle.x + velocity;
    if next_x < bounds.x {
        (obstacle.moved_to(bounds.x, obstacle.y), velocity.abs())
    } else if next_x > max_x {
        (obstacle.moved_to(max_x.max(bounds.x), obstacle.y), -velocity.abs())
    } else {
        (obstacle.moved_to(next_x, obstacle.y), velocity)
    }
}

/// Handle to the running drift thread.
pub struct ObstacleDrift {
    handle: thread::JoinHandle<()>,
}

impl ObstacleDrift {
    /// Start moving `obstacle` by `velocity` units every [`DRIFT_INTERVAL`] until `stop` is raised.
    pub fn spawn(
        obstacle: SharedObstacle,
        velocity: f32,
        bounds: Rect,
        stop: Arc<AtomicBool>,
    ) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("smartrockets-obstacle-drift".into())
            .spawn(move || {
                let mut velocity = velocity;
                while !stop.load(Ordering::Relaxed) {
                    let (moved, next_velocity) = drift_step(obstacle.snapshot(), velocity, bounds);
                    obstacle.move_to(moved.x, moved.y);
                    velocity = next_velocity;
                    thread::sleep(DRIFT_INTERVAL);
                }
                debug!(obstacle = ?obstacle.snapshot(), "obstacle drift stopped");
            })
            .context("failed to spawn obstacle drift thread")?;
        Ok(Self { handle })
    }

    /// Wait for the thread to observe the stop flag and exit.
    pub fn join(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|err| anyhow!("obstacle drift thread panicked: {err:?}"))
    }
}

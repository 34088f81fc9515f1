//! Smoothed camera follow. Produces the world-space top-left corner the
//! renderer centers its projection on.

use rr_core::config::Tuning;

/// Vertical target moves only when the player drifts more than this.
const DEAD_ZONE_Y: f32 = 2.0;
/// Lerp factor per fixed step.
const SMOOTHING_FACTOR: f32 = 0.15;
/// The camera never scrolls below this, so the ground stays near the bottom
/// of the screen instead of centering on a grounded player.
const CAMERA_FLOOR_Y: f32 = 100.0;
/// Within this of the target the camera snaps, killing sub-pixel shimmer.
const SNAP_DISTANCE: f32 = 0.5;

pub struct CameraFollow {
    pub x: f32,
    pub y: f32,
    target_x: f32,
    target_y: f32,
    viewport_width: f32,
    viewport_height: f32,
}

impl CameraFollow {
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            x: 0.0,
            y: CAMERA_FLOOR_Y,
            target_x: 0.0,
            target_y: CAMERA_FLOOR_Y,
            viewport_width,
            viewport_height,
        }
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    /// One fixed step of follow: retarget on the player's center, then lerp
    /// toward it with a snap once close.
    pub fn update(&mut self, player_x: f32, player_y: f32, tuning: &Tuning) {
        self.target_x = player_x + tuning.player_size * 0.5 - self.viewport_width * 0.5;
        self.target_x = self
            .target_x
            .clamp(0.0, (tuning.world_width - self.viewport_width).max(0.0));

        let desired_y = player_y + tuning.player_size * 0.5 - self.viewport_height * 0.5;
        if (desired_y - self.target_y).abs() > DEAD_ZONE_Y {
            self.target_y = desired_y;
        }
        if self.target_y > CAMERA_FLOOR_Y {
            self.target_y = CAMERA_FLOOR_Y;
        }
        self.target_y = self.target_y.clamp(tuning.camera_min_y, tuning.camera_max_y);

        self.x += (self.target_x - self.x) * SMOOTHING_FACTOR;
        self.y += (self.target_y - self.y) * SMOOTHING_FACTOR;

        if (self.x - self.target_x).abs() < SNAP_DISTANCE {
            self.x = self.target_x;
        }
        if (self.y - self.target_y).abs() < SNAP_DISTANCE {
            self.y = self.target_y;
        }
    }

    /// Hard-centers on the player with no smoothing. Used on level load and
    /// respawn so the view never lerps across the whole world.
    pub fn snap_to(&mut self, player_x: f32, player_y: f32, tuning: &Tuning) {
        self.update(player_x, player_y, tuning);
        self.x = self.target_x;
        self.y = self.target_y;
    }

    /// Rounded for pixel-aligned rendering.
    pub fn position(&self) -> (f32, f32) {
        (self.x.round(), self.y.round())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> Tuning {
        Tuning::default()
    }

    #[test]
    fn converges_onto_a_stationary_target() {
        let t = tuning();
        let mut camera = CameraFollow::new(1280.0, 720.0);
        // Grounded player: the vertical target hits the camera floor.
        let player_y = t.ground_y - t.player_size;
        for _ in 0..200 {
            camera.update(2000.0, player_y, &t);
        }
        assert_eq!(camera.x, 2000.0 + 16.0 - 640.0);
        assert_eq!(camera.y, CAMERA_FLOOR_Y, "low targets clamp to the camera floor");
    }

    #[test]
    fn horizontal_target_clamps_to_world_edges() {
        let t = tuning();
        let mut camera = CameraFollow::new(1280.0, 720.0);
        for _ in 0..200 {
            camera.update(0.0, 300.0, &t);
        }
        assert_eq!(camera.x, 0.0);

        for _ in 0..200 {
            camera.update(t.world_width - t.player_size, 300.0, &t);
        }
        assert_eq!(camera.x, t.world_width - 1280.0);
    }

    #[test]
    fn dead_zone_ignores_small_vertical_drift() {
        let t = tuning();
        let mut camera = CameraFollow::new(1280.0, 720.0);
        camera.snap_to(100.0, -800.0, &t);
        let settled_y = camera.y;

        // One pixel of drift stays inside the dead zone.
        camera.update(100.0, -801.0, &t);
        assert_eq!(camera.y, settled_y);

        // A real fall moves the target.
        for _ in 0..200 {
            camera.update(100.0, -900.0, &t);
        }
        assert_ne!(camera.y, settled_y);
    }

    #[test]
    fn follows_a_high_climb_within_world_limits() {
        let t = tuning();
        let mut camera = CameraFollow::new(1280.0, 720.0);
        for _ in 0..400 {
            camera.update(100.0, t.camera_min_y - 1000.0, &t);
        }
        assert_eq!(camera.y, t.camera_min_y);
    }

    #[test]
    fn snap_to_lands_on_target_immediately() {
        let t = tuning();
        let mut camera = CameraFollow::new(1280.0, 720.0);
        camera.snap_to(3000.0, 300.0, &t);
        assert_eq!(camera.x, 3000.0 + 16.0 - 640.0);
    }

    #[test]
    fn position_is_pixel_rounded() {
        let t = tuning();
        let mut camera = CameraFollow::new(1280.0, 720.0);
        camera.update(333.0, 300.0, &t);
        let (x, y) = camera.position();
        assert_eq!(x, x.round());
        assert_eq!(y, y.round());
    }
}

use glam::{Mat4, Vec2};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Screen-space 2D camera. `position` is the world coordinate of the
/// viewport's **top-left** corner, with world y growing downward, matching
/// the simulation's coordinate system. The projection flips y so that
/// increasing world y moves down the screen.
pub struct Camera2D {
    pub position: Vec2,
    pub viewport: (u32, u32),
}

impl Camera2D {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            position: Vec2::ZERO,
            viewport: (viewport_width, viewport_height),
        }
    }

    pub fn build_uniform(&self) -> CameraUniform {
        let w = self.viewport.0 as f32;
        let h = self.viewport.1 as f32;

        // bottom > top in world units flips the y axis for the y-down world.
        let proj = Mat4::orthographic_rh(
            self.position.x,
            self.position.x + w,
            self.position.y + h,
            self.position.y,
            -1.0,
            1.0,
        );

        CameraUniform {
            view_proj: proj.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(camera: &Camera2D, world: Vec2) -> Vec2 {
        let uniform = camera.build_uniform();
        let m = Mat4::from_cols_array_2d(&uniform.view_proj);
        let clip = m * world.extend(0.0).extend(1.0);
        Vec2::new(clip.x, clip.y)
    }

    #[test]
    fn top_left_corner_maps_to_upper_left_clip() {
        let camera = Camera2D::new(800, 600);
        let clip = project(&camera, Vec2::new(0.0, 0.0));
        assert!((clip.x - (-1.0)).abs() < 1e-5);
        assert!((clip.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn world_y_down_maps_to_screen_down() {
        let camera = Camera2D::new(800, 600);
        let above = project(&camera, Vec2::new(400.0, 100.0));
        let below = project(&camera, Vec2::new(400.0, 500.0));
        // Larger world y ends up lower on screen (smaller clip y).
        assert!(below.y < above.y);
    }

    #[test]
    fn scrolling_shifts_projection() {
        let mut camera = Camera2D::new(800, 600);
        camera.position = Vec2::new(1000.0, 0.0);
        let clip = project(&camera, Vec2::new(1000.0, 0.0));
        assert!((clip.x - (-1.0)).abs() < 1e-5);
        assert!((clip.y - 1.0).abs() < 1e-5);
    }
}

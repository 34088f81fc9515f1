//! Simulation tuning: every constant the physics and AI cores consume.
//!
//! The whole set travels as one immutable struct passed by reference into the
//! player and mob update paths. Nothing in the simulation reads ambient
//! globals, so tests can run the core under alternate tunings (small worlds,
//! disabled coyote jump, etc.) without touching process state.
//!
//! Units: world coordinates are pixels with y growing downward. Velocities
//! are pixels **per fixed step**, not per second — the simulation integrates
//! once per fixed tick and never scales by wall-clock delta.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // --- World ---------------------------------------------------------
    pub world_width: f32,
    /// World-space y of the ground line. Entities rest with their bottom
    /// edge on this line.
    pub ground_y: f32,
    pub player_size: f32,

    // --- Player physics ------------------------------------------------
    pub gravity: f32,
    pub move_speed: f32,
    /// Negative: y grows downward.
    pub jump_velocity: f32,
    /// Cap on downward speed while clinging to a wall.
    pub wall_slide_speed: f32,
    pub wall_jump_velocity_x: f32,
    pub wall_jump_velocity_y: f32,
    /// Number of fixed steps the wall-jump horizontal override lasts.
    pub wall_jump_frames: u32,
    /// Maximum gap between the player's top and a block's underside for a
    /// ceiling grab to connect.
    pub glide_grab_distance: f32,

    // --- Policy flags (historical variants disagree; defaults pin ours) -
    /// Releasing a ceiling grab grants a one-shot jump shortly after.
    pub glide_coyote_jump: bool,
    /// Wall-riding engages only while moving downward; when false it
    /// engages during an active jump instead.
    pub wall_ride_requires_fall: bool,

    // --- Mobs ----------------------------------------------------------
    pub stomp_bounce_velocity: f32,
    /// The player's bottom must be above the mob's vertical center plus
    /// this margin for an overlap to count as a stomp.
    pub stomp_margin: f32,
    pub walker_jump_velocity: f32,
    pub walker_detection_range: f32,
    /// Outer radius of the single-aggressor selection policy. Wider than
    /// the walker detection range so the nearest mob keeps its permission
    /// while closing in.
    pub aggro_range: f32,
    pub zombie_chase_range: f32,
    pub zombie_lose_range: f32,
    pub zombie_chase_multiplier: f32,
    pub zombie_jump_velocity: f32,

    // --- Camera --------------------------------------------------------
    pub camera_min_y: f32,
    pub camera_max_y: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            world_width: 5000.0,
            ground_y: 650.0,
            player_size: 32.0,
            gravity: 0.9,
            move_speed: 4.0,
            jump_velocity: -15.0,
            wall_slide_speed: 2.0,
            wall_jump_velocity_x: 10.0,
            wall_jump_velocity_y: -13.0,
            wall_jump_frames: 8,
            glide_grab_distance: 50.0,
            glide_coyote_jump: true,
            wall_ride_requires_fall: true,
            stomp_bounce_velocity: -15.0,
            stomp_margin: 15.0,
            walker_jump_velocity: -12.0,
            walker_detection_range: 300.0,
            aggro_range: 600.0,
            zombie_chase_range: 350.0,
            zombie_lose_range: 500.0,
            zombie_chase_multiplier: 1.5,
            zombie_jump_velocity: -15.0,
            camera_min_y: -5000.0,
            camera_max_y: 700.0,
        }
    }
}

pub fn load_tuning_from_path(path: &Path) -> Result<Tuning, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let tuning: Tuning = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse tuning JSON {}: {e}", path.display()))?;
    validate_tuning(&tuning)?;
    Ok(tuning)
}

fn validate_tuning(tuning: &Tuning) -> Result<(), String> {
    if tuning.world_width <= 0.0 || tuning.player_size <= 0.0 {
        return Err("Tuning validation failed: world_width and player_size must be > 0".to_string());
    }
    if tuning.gravity <= 0.0 {
        return Err("Tuning validation failed: gravity must be > 0".to_string());
    }
    if tuning.zombie_lose_range <= tuning.zombie_chase_range {
        return Err(
            "Tuning validation failed: zombie_lose_range must exceed zombie_chase_range (hysteresis)"
                .to_string(),
        );
    }
    Ok(())
}

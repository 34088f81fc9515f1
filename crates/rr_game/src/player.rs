//! Player physics and control core.
//!
//! One call to [`Player::update`] advances the player by exactly one fixed
//! step, in a strict order that the collision tie-break rules depend on:
//! horizontal movement, glide pin or gravity, world-floor clamp, block pass,
//! mob pass, then jump/glide input handling last so it reacts to the collision
//! state established earlier in the same step. Velocities are in pixels per
//! step; nothing here scales by delta time.

use rr_core::config::Tuning;
use rr_core::input::MoveIntent;

use crate::block::{Block, BlockType};
use crate::geometry::{Overlaps, Rect};
use crate::mob::Mob;

/// The player's vertical contact state. Exactly one holds at a time; the
/// update re-derives it from actual contact every step, so there is no flag
/// bookkeeping at transition sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalState {
    Grounded,
    Airborne,
    /// Clinging to the underside of the block at this index into the level's
    /// block vector. The level owns the block; the index dies with the level.
    Gliding { block: usize },
    WallRiding { wall_on_left: bool },
}

pub struct Player {
    pub x: f32,
    pub y: f32,
    pub vy: f32,
    pub facing_right: bool,
    pub state: VerticalState,
    /// Kept separate from `state` because an active jump outlives wall
    /// contact and the walker AI reads it to decide when to hop.
    pub jumping: bool,
    /// One-shot permission to jump shortly after leaving a glide ceiling.
    pub has_glide_jump: bool,
    forced_vx: f32,
    forced_frames: u32,
    spawn_x: f32,
    spawn_y: f32,
    just_died: bool,
}

impl Player {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            vy: 0.0,
            facing_right: true,
            state: VerticalState::Airborne,
            jumping: false,
            has_glide_jump: false,
            forced_vx: 0.0,
            forced_frames: 0,
            spawn_x: x,
            spawn_y: y,
            just_died: false,
        }
    }

    pub fn rect(&self, tuning: &Tuning) -> Rect {
        Rect::new(self.x, self.y, tuning.player_size, tuning.player_size)
    }

    pub fn is_grounded(&self) -> bool {
        matches!(self.state, VerticalState::Grounded)
    }

    pub fn is_gliding(&self) -> bool {
        matches!(self.state, VerticalState::Gliding { .. })
    }

    pub fn is_wall_riding(&self) -> bool {
        matches!(self.state, VerticalState::WallRiding { .. })
    }

    pub fn state_label(&self) -> &'static str {
        match self.state {
            VerticalState::Grounded => "grounded",
            VerticalState::Airborne => "airborne",
            VerticalState::Gliding { .. } => "gliding",
            VerticalState::WallRiding { wall_on_left: true } => "wall-ride L",
            VerticalState::WallRiding { wall_on_left: false } => "wall-ride R",
        }
    }

    /// One-shot death signal; consumed by the orchestrator to reset mobs.
    pub fn take_just_died(&mut self) -> bool {
        std::mem::take(&mut self.just_died)
    }

    pub fn update(&mut self, intent: MoveIntent, blocks: &[Block], mobs: &[Mob], tuning: &Tuning) {
        // The frame starts airborne; the clamps and the block pass
        // re-establish grounded or riding state from actual contact. A glide
        // survives until the pin check or the input handling releases it.
        if !self.is_gliding() {
            self.state = VerticalState::Airborne;
        }

        // 1. Horizontal movement. A forced window overrides input entirely.
        if self.forced_frames > 0 {
            self.x += self.forced_vx;
            self.forced_frames -= 1;
        } else {
            if intent.left && !intent.right {
                self.x -= tuning.move_speed;
                self.facing_right = false;
            }
            if intent.right && !intent.left {
                self.x += tuning.move_speed;
                self.facing_right = true;
            }
        }
        self.x = self.x.clamp(0.0, tuning.world_width - tuning.player_size);

        // 2. Glide pin or gravity integration.
        if let VerticalState::Gliding { block } = self.state {
            self.update_glide(block, blocks, tuning);
        } else {
            self.vy += tuning.gravity;
            self.y += self.vy;
        }

        // 3. World floor clamp.
        if self.y >= tuning.ground_y - tuning.player_size {
            self.y = tuning.ground_y - tuning.player_size;
            self.vy = 0.0;
            self.jumping = false;
            self.state = VerticalState::Grounded;
            self.has_glide_jump = false;
        }

        // 4. Block pass.
        self.resolve_block_collisions(blocks, tuning);

        // 5. Mob pass.
        self.resolve_mob_collisions(mobs, tuning);

        // 6. Input handling, reacting to this step's collision state.
        self.handle_jump_inputs(intent, blocks, tuning);
    }

    fn update_glide(&mut self, block_index: usize, blocks: &[Block], tuning: &Tuning) {
        let Some(block) = blocks.get(block_index) else {
            self.release_glide(tuning);
            return;
        };
        let still_under = self.x + tuning.player_size > block.rect.x && self.x < block.rect.right();
        if still_under {
            self.y = block.rect.bottom();
            self.vy = 0.0;
            self.jumping = false;
        } else {
            // Slipped off the edge of the ceiling.
            self.release_glide(tuning);
        }
    }

    fn release_glide(&mut self, tuning: &Tuning) {
        self.state = VerticalState::Airborne;
        self.has_glide_jump = tuning.glide_coyote_jump;
    }

    fn resolve_block_collisions(&mut self, blocks: &[Block], tuning: &Tuning) {
        for block in blocks {
            if !self.rect(tuning).intersects(&block.rect) {
                continue;
            }
            match block.kind {
                BlockType::Deadly => {
                    self.kill();
                    return;
                }
                BlockType::Finish => continue,
                _ => self.resolve_block(&block.rect, tuning),
            }
        }
    }

    /// Minimum-overlap resolution with directional gating. Branch order
    /// matters on exact ties: top, then bottom, then left, then right.
    fn resolve_block(&mut self, rect: &Rect, tuning: &Tuning) {
        let overlaps = Overlaps::between(&self.rect(tuning), rect);
        let min = overlaps.min();

        if min == overlaps.top && self.vy >= 0.0 {
            // Landing.
            self.y = rect.y - tuning.player_size;
            self.vy = 0.0;
            self.jumping = false;
            self.state = VerticalState::Grounded;
            self.has_glide_jump = false;
        } else if min == overlaps.bottom && self.vy < 0.0 && !self.is_gliding() {
            // Head against the block's underside.
            self.y = rect.bottom();
            self.vy = 0.0;
        } else if min == overlaps.left {
            self.x = rect.x - tuning.player_size;
            self.try_wall_ride(false, tuning);
            self.has_glide_jump = false;
        } else if min == overlaps.right {
            self.x = rect.right();
            self.try_wall_ride(true, tuning);
            self.has_glide_jump = false;
        }
    }

    fn try_wall_ride(&mut self, wall_on_left: bool, tuning: &Tuning) {
        let engaged = if tuning.wall_ride_requires_fall {
            self.vy > 0.0
        } else {
            self.jumping
        };
        if engaged && self.forced_frames == 0 {
            self.state = VerticalState::WallRiding { wall_on_left };
            if self.vy > tuning.wall_slide_speed {
                self.vy = tuning.wall_slide_speed;
            }
        }
    }

    fn resolve_mob_collisions(&mut self, mobs: &[Mob], tuning: &Tuning) {
        for mob in mobs {
            if !mob.is_alive() {
                continue;
            }
            let mob_rect = mob.rect();
            if !self.rect(tuning).intersects(&mob_rect) {
                continue;
            }
            // A walker the player is in the middle of stomping is left to the
            // walker's own update, which kills the mob and bounces the player.
            if matches!(mob, Mob::Walker(_)) && self.is_stomping(mob_rect.center_y(), tuning) {
                continue;
            }
            self.kill();
            return;
        }
    }

    /// The stomp predicate: falling, with the player's feet above the mob's
    /// vertical center (plus a forgiveness margin).
    pub fn is_stomping(&self, mob_center_y: f32, tuning: &Tuning) -> bool {
        self.vy > 0.0 && self.y + tuning.player_size < mob_center_y + tuning.stomp_margin
    }

    /// Applied by a walker when the stomp lands.
    pub fn apply_stomp_bounce(&mut self, tuning: &Tuning) {
        self.vy = tuning.stomp_bounce_velocity;
        self.jumping = true;
        self.state = VerticalState::Airborne;
    }

    fn handle_jump_inputs(&mut self, intent: MoveIntent, blocks: &[Block], tuning: &Tuning) {
        if intent.up && (self.is_grounded() || self.has_glide_jump) && !self.jumping {
            self.vy = tuning.jump_velocity;
            self.jumping = true;
            self.state = VerticalState::Airborne;
            self.has_glide_jump = false;
        } else if intent.up {
            if let VerticalState::WallRiding { wall_on_left } = self.state {
                self.apply_wall_jump(wall_on_left, tuning);
            }
        }

        if intent.down {
            if !self.is_gliding() {
                self.try_grab_ceiling(blocks, tuning);
            }
        } else if self.is_gliding() {
            // Letting go of the ceiling grants the coyote bonus.
            self.release_glide(tuning);
        }
    }

    fn apply_wall_jump(&mut self, wall_on_left: bool, tuning: &Tuning) {
        self.vy = tuning.wall_jump_velocity_y;
        self.forced_vx = if wall_on_left {
            tuning.wall_jump_velocity_x
        } else {
            -tuning.wall_jump_velocity_x
        };
        self.forced_frames = tuning.wall_jump_frames;
        self.jumping = true;
        self.state = VerticalState::Airborne;
    }

    fn try_grab_ceiling(&mut self, blocks: &[Block], tuning: &Tuning) {
        for (index, block) in blocks.iter().enumerate() {
            let horizontal =
                self.x + tuning.player_size > block.rect.x && self.x < block.rect.right();
            if !horizontal {
                continue;
            }
            let underside = block.rect.bottom();
            let within_reach =
                underside <= self.y && self.y - underside <= tuning.glide_grab_distance;
            if within_reach && block.is_solid_surface() {
                self.state = VerticalState::Gliding { block: index };
                self.y = underside;
                self.vy = 0.0;
                self.jumping = false;
                self.has_glide_jump = false;
                // First match wins; scan order is the level's block order.
                break;
            }
        }
    }

    /// Death and respawn. Also triggered by a walker's side-contact check.
    pub(crate) fn kill(&mut self) {
        log::info!(
            "Player died, respawning at ({:.0}, {:.0})",
            self.spawn_x,
            self.spawn_y
        );
        self.x = self.spawn_x;
        self.y = self.spawn_y;
        self.vy = 0.0;
        self.state = VerticalState::Airborne;
        self.jumping = false;
        self.has_glide_jump = false;
        self.forced_vx = 0.0;
        self.forced_frames = 0;
        self.just_died = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mob::{Walker, Zombie};

    fn tuning() -> Tuning {
        Tuning::default()
    }

    fn no_input() -> MoveIntent {
        MoveIntent::default()
    }

    fn intent(left: bool, right: bool, up: bool, down: bool) -> MoveIntent {
        MoveIntent {
            left,
            right,
            up,
            down,
        }
    }

    fn block_at(x: f32, y: f32, w: f32, h: f32) -> Block {
        Block::new(Rect::new(x, y, w, h), BlockType::Normal)
    }

    #[test]
    fn rest_on_block_top_is_idempotent() {
        let t = tuning();
        let blocks = vec![block_at(100.0, 400.0, 200.0, 32.0)];
        let mut player = Player::new(150.0, 400.0 - t.player_size);
        player.update(no_input(), &blocks, &[], &t);
        assert_eq!(player.x, 150.0);
        assert_eq!(player.y, 400.0 - t.player_size);
        assert_eq!(player.vy, 0.0);
        assert!(player.is_grounded());
    }

    #[test]
    fn ground_clamp_snaps_and_grounds() {
        let t = tuning();
        let mut player = Player::new(100.0, t.ground_y - 10.0);
        player.update(no_input(), &[], &[], &t);
        assert_eq!(player.y, t.ground_y - t.player_size);
        assert_eq!(player.vy, 0.0);
        assert!(player.is_grounded());
    }

    #[test]
    fn minimum_overlap_prefers_landing_over_side_push() {
        let t = tuning();
        // Wide, shallow penetration from above: top overlap is the smallest.
        let blocks = vec![block_at(0.0, 300.0, 500.0, 100.0)];
        let mut player = Player::new(200.0, 300.0 - t.player_size + 4.0);
        player.vy = 5.0;
        player.update(no_input(), &blocks, &[], &t);
        assert_eq!(player.y, 300.0 - t.player_size);
        assert_eq!(player.x, 200.0);
        assert!(player.is_grounded());
    }

    #[test]
    fn deadly_block_resets_to_spawn_and_stops_pass() {
        let t = tuning();
        // Deadly first, then a normal block that would otherwise push the
        // player; the pass must stop at the deadly hit.
        let mut deadly = block_at(190.0, 280.0, 64.0, 64.0);
        deadly.kind = BlockType::Deadly;
        let blocks = vec![deadly, block_at(180.0, 280.0, 100.0, 100.0)];
        let mut player = Player::new(200.0, 300.0);
        player.update(no_input(), &blocks, &[], &t);
        assert_eq!(player.x, 200.0);
        assert_eq!(player.y, 300.0);
        assert!(player.take_just_died());
        assert!(!player.take_just_died(), "signal is one-shot");
    }

    #[test]
    fn finish_block_is_pass_through() {
        let t = tuning();
        let mut finish = block_at(180.0, 280.0, 100.0, 100.0);
        finish.kind = BlockType::Finish;
        let blocks = vec![finish];
        let mut player = Player::new(200.0, 300.0);
        player.update(no_input(), &blocks, &[], &t);
        // Only gravity moved the player; the finish block applied no
        // correction and no death.
        assert_eq!(player.x, 200.0);
        assert_eq!(player.y, 300.0 + t.gravity);
        assert!(!player.take_just_died());
    }

    #[test]
    fn both_directions_held_cancel_out() {
        let t = tuning();
        let mut player = Player::new(200.0, 100.0);
        player.update(intent(true, true, false, false), &[], &[], &t);
        assert_eq!(player.x, 200.0);
    }

    #[test]
    fn horizontal_position_clamped_to_world() {
        let t = tuning();
        let mut player = Player::new(1.0, 100.0);
        player.update(intent(true, false, false, false), &[], &[], &t);
        assert_eq!(player.x, 0.0);

        let mut player = Player::new(t.world_width - t.player_size - 1.0, 100.0);
        player.update(intent(false, true, false, false), &[], &[], &t);
        assert_eq!(player.x, t.world_width - t.player_size);
    }

    #[test]
    fn standard_jump_from_ground() {
        let t = tuning();
        let mut player = Player::new(100.0, t.ground_y - t.player_size);
        player.update(intent(false, false, true, false), &[], &[], &t);
        assert_eq!(player.vy, t.jump_velocity);
        assert!(player.jumping);
        assert!(!player.is_grounded());
    }

    #[test]
    fn falling_against_wall_enters_wall_ride_and_caps_speed() {
        let t = tuning();
        // Tall wall occupying x 100..132.
        let blocks = vec![block_at(100.0, 0.0, 32.0, 600.0)];
        let mut player = Player::new(130.0, 300.0);
        player.vy = 8.0;
        player.update(no_input(), &blocks, &[], &t);
        assert_eq!(player.x, 132.0, "pushed out of the wall");
        assert!(matches!(
            player.state,
            VerticalState::WallRiding { wall_on_left: true }
        ));
        assert_eq!(player.vy, t.wall_slide_speed);
    }

    #[test]
    fn wall_jump_overrides_input_for_fixed_frames() {
        let t = tuning();
        let blocks = vec![block_at(100.0, 0.0, 32.0, 600.0)];
        let mut player = Player::new(130.0, 300.0);
        player.vy = 8.0;

        // Establish wall contact, then hold left+up so the wall jump fires
        // while the player is pressed into the wall.
        player.update(no_input(), &blocks, &[], &t);
        player.update(intent(true, false, true, false), &blocks, &[], &t);
        assert_eq!(player.vy, t.wall_jump_velocity_y);
        assert!(player.jumping);

        // The override moves the player right by exactly the wall-jump
        // velocity each step despite the held left input.
        let mut expected_x = player.x;
        for _ in 0..t.wall_jump_frames {
            let before = player.x;
            player.update(intent(true, false, false, false), &[], &[], &t);
            expected_x += t.wall_jump_velocity_x;
            assert_eq!(player.x, expected_x);
            assert_eq!(player.x - before, t.wall_jump_velocity_x);
        }

        // Window exhausted: input applies again.
        let before = player.x;
        player.update(intent(true, false, false, false), &[], &[], &t);
        assert_eq!(player.x, before - t.move_speed);
    }

    #[test]
    fn wall_ride_policy_can_require_active_jump() {
        let mut t = tuning();
        t.wall_ride_requires_fall = false;
        let blocks = vec![block_at(100.0, 0.0, 32.0, 600.0)];

        // Falling without a jump: no ride under this policy.
        let mut player = Player::new(130.0, 300.0);
        player.vy = 8.0;
        player.update(no_input(), &blocks, &[], &t);
        assert!(!player.is_wall_riding());

        // Same contact during an active jump: rides.
        let mut player = Player::new(130.0, 300.0);
        player.vy = 8.0;
        player.jumping = true;
        player.update(no_input(), &blocks, &[], &t);
        assert!(player.is_wall_riding());
    }

    #[test]
    fn ceiling_grab_snaps_to_underside() {
        let t = tuning();
        // Ceiling underside at y=132; player hovering 28 below it.
        let blocks = vec![block_at(80.0, 100.0, 200.0, 32.0)];
        let mut player = Player::new(150.0, 160.0);
        player.update(intent(false, false, false, true), &blocks, &[], &t);
        assert_eq!(player.y, 132.0);
        assert_eq!(player.vy, 0.0);
        assert_eq!(player.state, VerticalState::Gliding { block: 0 });

        // Holding down keeps the pin in place.
        player.update(intent(false, false, false, true), &blocks, &[], &t);
        assert_eq!(player.y, 132.0);
    }

    #[test]
    fn ceiling_grab_ignores_blocks_out_of_reach() {
        let t = tuning();
        let blocks = vec![block_at(80.0, 100.0, 200.0, 32.0)];
        let mut player = Player::new(150.0, 132.0 + t.glide_grab_distance + 20.0);
        player.update(intent(false, false, false, true), &blocks, &[], &t);
        assert!(!player.is_gliding());
    }

    #[test]
    fn ceiling_grab_skips_deadly_and_finish_blocks() {
        let t = tuning();
        let mut deadly = block_at(80.0, 100.0, 200.0, 32.0);
        deadly.kind = BlockType::Deadly;
        let mut finish = block_at(80.0, 60.0, 200.0, 32.0);
        finish.kind = BlockType::Finish;
        let blocks = vec![deadly, finish];
        let mut player = Player::new(150.0, 160.0);
        player.update(intent(false, false, false, true), &blocks, &[], &t);
        assert!(!player.is_gliding());
    }

    #[test]
    fn glide_release_grants_coyote_jump() {
        let t = tuning();
        let blocks = vec![block_at(80.0, 100.0, 200.0, 32.0)];
        let mut player = Player::new(150.0, 160.0);
        player.update(intent(false, false, false, true), &blocks, &[], &t);
        assert!(player.is_gliding());

        // Release down: airborne with the one-shot bonus.
        player.update(no_input(), &blocks, &[], &t);
        assert!(!player.is_gliding());
        assert!(player.has_glide_jump);

        // The bonus allows a mid-air jump and is then consumed.
        player.update(intent(false, false, true, false), &blocks, &[], &t);
        assert_eq!(player.vy, t.jump_velocity);
        assert!(!player.has_glide_jump);
    }

    #[test]
    fn glide_coyote_jump_can_be_disabled() {
        let mut t = tuning();
        t.glide_coyote_jump = false;
        let blocks = vec![block_at(80.0, 100.0, 200.0, 32.0)];
        let mut player = Player::new(150.0, 160.0);
        player.update(intent(false, false, false, true), &blocks, &[], &t);
        assert!(player.is_gliding());

        player.update(no_input(), &blocks, &[], &t);
        assert!(!player.has_glide_jump);
    }

    #[test]
    fn sliding_off_glide_block_releases_the_pin() {
        let t = tuning();
        let blocks = vec![block_at(80.0, 100.0, 100.0, 32.0)];
        let mut player = Player::new(150.0, 160.0);
        player.update(intent(false, false, false, true), &blocks, &[], &t);
        assert!(player.is_gliding());

        // Walk right past the ceiling's edge while still holding down.
        for _ in 0..20 {
            player.update(intent(false, true, false, true), &blocks, &[], &t);
            if !player.is_gliding() {
                break;
            }
        }
        assert!(!player.is_gliding());
        assert!(player.has_glide_jump);
    }

    #[test]
    fn touching_zombie_kills_player() {
        let t = tuning();
        let mobs = vec![Mob::Zombie(Zombie::new(200.0, 300.0, 1.5))];
        let mut player = Player::new(210.0, 300.0);
        player.update(no_input(), &[], &mobs, &t);
        assert!(player.take_just_died());
        assert_eq!(player.x, 210.0, "respawn at spawn point");
    }

    #[test]
    fn stomping_walker_overlap_is_deferred_to_the_walker() {
        let t = tuning();
        // Player falling onto the walker's head.
        let mobs = vec![Mob::Walker(Walker::new(200.0, 332.0, 2.0))];
        let mut player = Player::new(200.0, 332.0 - t.player_size + 2.0);
        player.vy = 6.0;
        player.update(no_input(), &[], &mobs, &t);
        assert!(!player.take_just_died());
    }

    #[test]
    fn dead_mobs_are_ignored() {
        let t = tuning();
        let mut walker = Walker::new(200.0, 300.0, 2.0);
        walker.is_alive = false;
        let mobs = vec![Mob::Walker(walker)];
        let mut player = Player::new(210.0, 300.0);
        player.update(no_input(), &[], &mobs, &t);
        assert!(!player.take_just_died());
    }

    #[test]
    fn head_bump_stops_upward_motion() {
        let t = tuning();
        // Ceiling overhead; player moving up into it.
        let blocks = vec![block_at(100.0, 200.0, 200.0, 32.0)];
        let mut player = Player::new(150.0, 232.0 - 4.0);
        player.vy = -10.0;
        player.update(no_input(), &blocks, &[], &t);
        assert_eq!(player.y, 232.0);
        assert_eq!(player.vy, 0.0);
    }
}

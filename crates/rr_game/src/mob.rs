//! Mob simulation: patrolling walkers and state-machine zombies.
//!
//! Mobs integrate with the same per-step velocity convention as the player
//! and resolve against blocks with the same minimum-overlap rule. Deadly and
//! finish blocks are gameplay triggers for the player only; mobs walk
//! straight through them.

use std::cmp::Ordering;

use rr_core::config::Tuning;

use crate::block::Block;
use crate::geometry::{Overlaps, Rect};
use crate::player::Player;

pub const MOB_SIZE: f32 = 32.0;

/// A ground mob that paces in place until the player comes into detection
/// range, then walks straight at them and hops when the player jumps.
#[derive(Debug)]
pub struct Walker {
    pub x: f32,
    pub y: f32,
    pub vy: f32,
    pub speed: f32,
    /// -1, 0 or 1. Zero while idle.
    pub direction: f32,
    pub is_active: bool,
    pub is_alive: bool,
    pub on_ground: bool,
    spawn_x: f32,
    spawn_y: f32,
}

impl Walker {
    pub fn new(x: f32, y: f32, speed: f32) -> Self {
        Self {
            x,
            y,
            vy: 0.0,
            speed,
            direction: 0.0,
            is_active: false,
            is_alive: true,
            on_ground: false,
            spawn_x: x,
            spawn_y: y,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, MOB_SIZE, MOB_SIZE)
    }

    /// Back to the spawn point, idle and alive. Called when the player dies.
    pub fn reset(&mut self) {
        self.x = self.spawn_x;
        self.y = self.spawn_y;
        self.vy = 0.0;
        self.direction = 0.0;
        self.is_active = false;
        self.is_alive = true;
        self.on_ground = false;
    }

    /// One fixed step. `can_aggro` is the single-aggressor permission; a
    /// walker that is denied it stands still no matter how close the player
    /// gets.
    pub fn update(&mut self, player: &mut Player, blocks: &[Block], can_aggro: bool, tuning: &Tuning) {
        if !self.is_alive {
            return;
        }

        let dx = player.x - self.x;
        if dx.abs() < tuning.walker_detection_range && can_aggro {
            self.is_active = true;
            self.direction = if dx > 0.0 { 1.0 } else { -1.0 };
            // Mirror the player's jumps so the walker stays a threat in the
            // air as well as on the ground.
            if player.jumping && self.on_ground {
                self.vy = tuning.walker_jump_velocity;
                self.on_ground = false;
            }
        } else {
            self.is_active = false;
            self.direction = 0.0;
        }

        self.check_player_collision(player, tuning);
        if !self.is_alive {
            return;
        }

        if self.is_active {
            self.x += self.speed * self.direction;
        }

        self.vy += tuning.gravity;
        self.y += self.vy;
        self.on_ground = false;

        if self.y >= tuning.ground_y - MOB_SIZE {
            self.y = tuning.ground_y - MOB_SIZE;
            self.vy = 0.0;
            self.on_ground = true;
        }

        self.resolve_block_collisions(blocks, tuning);
    }

    fn check_player_collision(&mut self, player: &mut Player, tuning: &Tuning) {
        if !player.rect(tuning).intersects(&self.rect()) {
            return;
        }
        if player.is_stomping(self.rect().center_y(), tuning) {
            self.is_alive = false;
            player.apply_stomp_bounce(tuning);
            log::info!("Walker stomped at ({:.0}, {:.0})", self.x, self.y);
        } else {
            player.kill();
        }
    }

    fn resolve_block_collisions(&mut self, blocks: &[Block], tuning: &Tuning) {
        for block in blocks {
            if !block.is_solid_surface() || !self.rect().intersects(&block.rect) {
                continue;
            }
            let overlaps = Overlaps::between(&self.rect(), &block.rect);
            let min = overlaps.min();

            if min == overlaps.top && self.vy >= 0.0 {
                self.y = block.rect.y - MOB_SIZE;
                self.vy = 0.0;
                self.on_ground = true;
            } else if min == overlaps.bottom && self.vy < 0.0 {
                self.y = block.rect.bottom();
                self.vy = 0.0;
            } else if min == overlaps.left {
                self.x = block.rect.x - MOB_SIZE;
                self.jump_over_obstacle(tuning);
            } else if min == overlaps.right {
                self.x = block.rect.right();
                self.jump_over_obstacle(tuning);
            }
        }
    }

    fn jump_over_obstacle(&mut self, tuning: &Tuning) {
        if self.on_ground {
            self.vy = tuning.walker_jump_velocity;
            self.on_ground = false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZombieState {
    Patrol,
    Chase,
}

/// Range-hysteresis transition rule: enter chase inside the chase range,
/// give up only past the (wider) lose range. Pure so the band is testable
/// without a world around it.
pub fn next_zombie_state(state: ZombieState, player_distance: f32, tuning: &Tuning) -> ZombieState {
    match state {
        ZombieState::Patrol if player_distance < tuning.zombie_chase_range => ZombieState::Chase,
        ZombieState::Chase if player_distance > tuning.zombie_lose_range => ZombieState::Patrol,
        state => state,
    }
}

/// A mob that patrols a platform edge-to-edge and switches into a faster
/// chase when the player gets close. Unlike walkers, zombies manage their own
/// aggro with the range hysteresis above and never stomp-die.
#[derive(Debug)]
pub struct Zombie {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub speed: f32,
    /// -1 or 1. Patrol heading, kept across state changes.
    pub direction: f32,
    pub state: ZombieState,
    pub is_alive: bool,
    pub on_ground: bool,
    spawn_x: f32,
    spawn_y: f32,
}

impl Zombie {
    pub fn new(x: f32, y: f32, speed: f32) -> Self {
        Self {
            x,
            y,
            vx: speed,
            vy: 0.0,
            speed,
            direction: 1.0,
            state: ZombieState::Patrol,
            is_alive: true,
            on_ground: false,
            spawn_x: x,
            spawn_y: y,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, MOB_SIZE, MOB_SIZE)
    }

    pub fn reset(&mut self) {
        self.x = self.spawn_x;
        self.y = self.spawn_y;
        self.direction = 1.0;
        self.vx = self.speed;
        self.vy = 0.0;
        self.state = ZombieState::Patrol;
        self.is_alive = true;
        self.on_ground = false;
    }

    pub fn update(&mut self, player: &Player, blocks: &[Block], tuning: &Tuning) {
        if !self.is_alive {
            return;
        }

        // Behavior: a state change spends the step on the transition, the new
        // state's movement starts next step. Physics still runs below.
        let distance = (player.x - self.x).abs();
        let next = next_zombie_state(self.state, distance, tuning);
        if next != self.state {
            self.state = next;
            self.enter_state(next);
        } else {
            match self.state {
                ZombieState::Patrol => {
                    if !self.ground_in_front(blocks, tuning) {
                        self.turn_around();
                    }
                }
                ZombieState::Chase => {
                    let chase_speed = self.speed * tuning.zombie_chase_multiplier;
                    if player.x < self.x {
                        self.vx = -chase_speed;
                        self.direction = -1.0;
                    } else {
                        self.vx = chase_speed;
                        self.direction = 1.0;
                    }
                    if self.on_ground && self.should_jump(player, blocks, tuning) {
                        self.vy = tuning.zombie_jump_velocity;
                        self.on_ground = false;
                    }
                }
            }
        }

        self.vy += tuning.gravity;
        self.x += self.vx;
        self.y += self.vy;
        self.on_ground = false;

        if self.y >= tuning.ground_y - MOB_SIZE {
            self.y = tuning.ground_y - MOB_SIZE;
            self.vy = 0.0;
            self.on_ground = true;
        }

        self.resolve_block_collisions(blocks, tuning);
    }

    fn enter_state(&mut self, state: ZombieState) {
        match state {
            // Resume pacing along the stored heading.
            ZombieState::Patrol => self.vx = self.direction * self.speed,
            ZombieState::Chase => {}
        }
    }

    fn turn_around(&mut self) {
        self.direction = -self.direction;
        self.vx = self.direction * self.speed;
    }

    /// Probes one pixel below the leading foot. The world floor counts as
    /// ground everywhere, so ledge turning only matters on raised platforms.
    fn ground_in_front(&self, blocks: &[Block], tuning: &Tuning) -> bool {
        let check_x = if self.direction > 0.0 {
            self.x + MOB_SIZE + 10.0
        } else {
            self.x - 10.0
        };
        let check_y = self.y + MOB_SIZE + 2.0;
        if check_y >= tuning.ground_y {
            return true;
        }
        let probe = Rect::new(check_x, check_y, 1.0, 1.0);
        blocks.iter().any(|block| probe.intersects(&block.rect))
    }

    /// Jump either because the player is clearly above, or because a block is
    /// right in front of the leading edge.
    fn should_jump(&self, player: &Player, blocks: &[Block], tuning: &Tuning) -> bool {
        if player.y < self.y - 50.0 && (player.x - self.x).abs() < 100.0 {
            return true;
        }
        let check_x = if self.direction > 0.0 {
            self.x + MOB_SIZE + 5.0
        } else {
            self.x - 5.0
        };
        let probe = Rect::new(check_x, self.y + MOB_SIZE - 10.0, 5.0, 10.0);
        blocks.iter().any(|block| probe.intersects(&block.rect))
    }

    fn resolve_block_collisions(&mut self, blocks: &[Block], tuning: &Tuning) {
        for block in blocks {
            if !block.is_solid_surface() || !self.rect().intersects(&block.rect) {
                continue;
            }
            let overlaps = Overlaps::between(&self.rect(), &block.rect);
            let min = overlaps.min();

            if min == overlaps.top && self.vy >= 0.0 {
                self.y = block.rect.y - MOB_SIZE;
                self.vy = 0.0;
                self.on_ground = true;
            } else if min == overlaps.bottom && self.vy < 0.0 {
                self.y = block.rect.bottom();
                self.vy = 0.0;
            } else if min == overlaps.left {
                self.x = block.rect.x - MOB_SIZE;
                self.on_wall_hit(tuning);
            } else if min == overlaps.right {
                self.x = block.rect.right();
                self.on_wall_hit(tuning);
            }
        }
    }

    fn on_wall_hit(&mut self, tuning: &Tuning) {
        match self.state {
            ZombieState::Patrol => self.turn_around(),
            ZombieState::Chase => {
                if self.on_ground {
                    self.vy = tuning.zombie_jump_velocity;
                    self.on_ground = false;
                }
            }
        }
    }
}

#[derive(Debug)]
pub enum Mob {
    Walker(Walker),
    Zombie(Zombie),
}

impl Mob {
    pub fn rect(&self) -> Rect {
        match self {
            Mob::Walker(w) => w.rect(),
            Mob::Zombie(z) => z.rect(),
        }
    }

    pub fn x(&self) -> f32 {
        match self {
            Mob::Walker(w) => w.x,
            Mob::Zombie(z) => z.x,
        }
    }

    pub fn is_alive(&self) -> bool {
        match self {
            Mob::Walker(w) => w.is_alive,
            Mob::Zombie(z) => z.is_alive,
        }
    }

    pub fn reset(&mut self) {
        match self {
            Mob::Walker(w) => w.reset(),
            Mob::Zombie(z) => z.reset(),
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Mob::Walker(_) => "walker",
            Mob::Zombie(_) => "zombie",
        }
    }

    /// One fixed step. The aggro permission only matters to walkers; zombies
    /// run their own range hysteresis.
    pub fn update(&mut self, player: &mut Player, blocks: &[Block], can_aggro: bool, tuning: &Tuning) {
        match self {
            Mob::Walker(w) => w.update(player, blocks, can_aggro, tuning),
            Mob::Zombie(z) => z.update(player, blocks, tuning),
        }
    }
}

/// Pick the single mob allowed to aggro this step: the living one nearest to
/// the player along x, if any is within the aggro range.
pub fn select_aggro_target(mobs: &[Mob], player_x: f32, tuning: &Tuning) -> Option<usize> {
    mobs.iter()
        .enumerate()
        .filter(|(_, mob)| mob.is_alive())
        .map(|(i, mob)| (i, (mob.x() - player_x).abs()))
        .filter(|(_, distance)| *distance < tuning.aggro_range)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .map(|(i, _)| i)
}

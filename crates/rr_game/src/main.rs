//! Ridge Runner -- main loop and application entry point.
//!
//! Architecture: winit drives the event loop via `ApplicationHandler`. All
//! simulation runs inside `RedrawRequested` using a **fixed-timestep** model
//! (see `TimeState`):
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. `while should_step()` -- consume fixed-dt slices for deterministic simulation
//!   3. Rebuild the quad mesh from the level + entities
//!   4. Upload camera uniform, issue draw calls, composite egui overlay
//!
//! Hot reload: the current level file is watched via mtime polling and
//! reloaded at frame boundaries (between fixed steps). An optional tuning
//! JSON overrides the built-in physics constants at startup.

mod block;
mod camera;
mod geometry;
mod level;
mod mob;
mod player;
#[cfg(test)]
mod replay;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use camera::CameraFollow;
use geometry::Rect;
use level::{load_level_from_path, Level, LevelWatcher};
use mob::{select_aggro_target, Mob};
use player::Player;
use rr_core::config::{load_tuning_from_path, Tuning};
use rr_core::input::{InputState, Key};
use rr_core::time::TimeState;
use rr_devtools::{DebugOverlay, OverlayStats};
use rr_platform::window::PlatformConfig;
use rr_render::{Camera2D, GpuContext, QuadPipeline, QuadVertex, Texture};

const LEVEL_ROTATION: &[&str] = &[
    "assets/levels/plains.txt",
    "assets/levels/cliffs.txt",
    "assets/levels/caverns.txt",
];
const TUNING_PATH: &str = "assets/tuning.json";
const WHITE_ASSET: &str = "__white";

const BRICK_COLOR: [f32; 4] = [0.545, 0.271, 0.075, 1.0];
const DEADLY_COLOR: [f32; 4] = [0.86, 0.08, 0.08, 1.0];
const FINISH_COLOR: [f32; 4] = [1.0, 0.84, 0.0, 1.0];
const DOOR_COLOR: [f32; 4] = [0.42, 0.26, 0.13, 1.0];
const NPC_COLOR: [f32; 4] = [0.25, 0.45, 0.9, 1.0];
const WALKER_GROUNDED_COLOR: [f32; 4] = [0.7, 0.0, 0.0, 1.0];
const WALKER_AIRBORNE_COLOR: [f32; 4] = [1.0, 0.3, 0.3, 1.0];
const ZOMBIE_COLOR: [f32; 4] = [0.18, 0.545, 0.34, 1.0];
const PLAYER_COLOR: [f32; 4] = [0.86, 0.08, 0.24, 1.0];
const WALL_RIDE_AURA_COLOR: [f32; 4] = [0.0, 1.0, 1.0, 0.5];
const GLIDE_AURA_COLOR: [f32; 4] = [0.58, 0.0, 0.83, 0.5];

/// A contiguous run of indices that share the same texture binding.
/// Draw calls are merged when consecutive quads use the same texture,
/// minimizing GPU bind-group switches during the render pass.
#[derive(Debug, Clone)]
struct DrawCall {
    texture_key: Arc<str>,
    index_start: u32,
    index_count: u32,
}

struct QuadSpec<'a> {
    texture_key: &'a str,
    rect: Rect,
    color: [f32; 4],
}

struct GpuQuadTexture {
    bind_group: wgpu::BindGroup,
}

/// All mutable engine state lives here. Constructed lazily in
/// `ApplicationHandler::resumed` once the window and GPU surface are
/// available.
///
/// Ownership is split into three conceptual groups:
///  - **Core systems** (time, input, camera) -- updated every frame
///  - **Content** (tuning, level, textures) -- loaded from disk, hot-reloadable
///  - **GPU resources** (vertex/index/camera buffers, draw calls) -- rebuilt per frame
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    time: TimeState,
    input: InputState,
    camera: Camera2D,
    camera_follow: CameraFollow,
    quad_pipeline: QuadPipeline,
    debug_overlay: DebugOverlay,

    // --- Gameplay content --------------------------------------------------
    tuning: Tuning,
    level_rotation: Vec<PathBuf>,
    current_level_path: PathBuf,
    level_watcher: LevelWatcher,
    level: Level,
    player: Player,
    level_elapsed: f64,
    best_times: HashMap<String, f64>,
    /// The end zone has been reached; simulation halts until Enter.
    won: bool,
    /// Level the winning end zone points at, when it names one.
    pending_target: Option<String>,
    aggro_index: Option<usize>,
    last_step_dx: f32,
    paused: bool,
    single_step_requested: bool,
    textures: HashMap<Arc<str>, GpuQuadTexture>,

    // --- Per-frame GPU mesh state ------------------------------------------
    // The quad mesh is rebuilt on the CPU each frame, then streamed into
    // these GPU buffers. Buffers grow (power-of-two) but never shrink.
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    mesh_vertex_capacity: usize,
    mesh_index_capacity: usize,
    draw_calls: Vec<DrawCall>,
    quad_count: usize,
}

impl EngineState {
    fn new(window: Arc<Window>) -> Self {
        let gpu = GpuContext::new(window.clone());
        let time = TimeState::new();
        let input = InputState::new();
        let quad_pipeline = QuadPipeline::new(&gpu.device, gpu.surface_format);
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);

        let tuning = if Path::new(TUNING_PATH).exists() {
            match load_tuning_from_path(Path::new(TUNING_PATH)) {
                Ok(tuning) => {
                    log::info!("Tuning loaded from '{}'", TUNING_PATH);
                    tuning
                }
                Err(err) => {
                    log::error!("Tuning load failed, using defaults: {err}");
                    Tuning::default()
                }
            }
        } else {
            Tuning::default()
        };

        let level_rotation: Vec<PathBuf> = LEVEL_ROTATION.iter().map(PathBuf::from).collect();
        let current_level_path = level_rotation[0].clone();
        let level_watcher = LevelWatcher::new(current_level_path.clone());
        let level = load_level_from_path(&current_level_path, &tuning).unwrap_or_else(|err| {
            panic!(
                "Failed to load initial level '{}': {}",
                current_level_path.display(),
                err
            );
        });
        let player = Player::new(level.start_x, level.start_y);
        let mut camera_follow = CameraFollow::new(gpu.size.0 as f32, gpu.size.1 as f32);
        camera_follow.snap_to(player.x, player.y, &tuning);
        let camera = Camera2D::new(gpu.size.0, gpu.size.1);

        let camera_uniform = camera.build_uniform();
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group = quad_pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);
        let vertex_buffer = create_vertex_buffer(&gpu.device, 1);
        let index_buffer = create_index_buffer(&gpu.device, 1);

        let mut state = Self {
            window,
            gpu,
            time,
            input,
            camera,
            camera_follow,
            quad_pipeline,
            debug_overlay,
            tuning,
            level_rotation,
            current_level_path,
            level_watcher,
            level,
            player,
            level_elapsed: 0.0,
            best_times: HashMap::new(),
            won: false,
            pending_target: None,
            aggro_index: None,
            last_step_dx: 0.0,
            paused: false,
            single_step_requested: false,
            textures: HashMap::new(),
            vertex_buffer,
            index_buffer,
            camera_buffer,
            camera_bind_group,
            mesh_vertex_capacity: 0,
            mesh_index_capacity: 0,
            draw_calls: Vec::new(),
            quad_count: 0,
        };

        // Startup order matters: load textures before building the first mesh.
        state.ensure_textures_for_level();
        state.ensure_mesh_capacity(4, 6);
        state.rebuild_level_mesh();
        state
    }

    /// Switch to a level file. On failure the current level keeps running.
    fn switch_level(&mut self, path: PathBuf, spawn_override: Option<(f32, f32)>, reason: &str) {
        match load_level_from_path(&path, &self.tuning) {
            Ok(level) => {
                self.level_watcher = LevelWatcher::new(path.clone());
                self.level = level;
                self.current_level_path = path;
                let (spawn_x, spawn_y) = match spawn_override {
                    // Overrides come file-style: x plus height above ground.
                    Some((x, height)) => (
                        x,
                        self.tuning.ground_y - height - self.tuning.player_size,
                    ),
                    None => (self.level.start_x, self.level.start_y),
                };
                self.player = Player::new(spawn_x, spawn_y);
                self.camera_follow
                    .snap_to(self.player.x, self.player.y, &self.tuning);
                self.level_elapsed = 0.0;
                self.won = false;
                self.pending_target = None;
                self.aggro_index = None;
                self.ensure_textures_for_level();
                log::info!(
                    "Level loaded ({reason}): {} ('{}')",
                    self.current_level_path.display(),
                    self.level.name
                );
            }
            Err(err) => {
                log::error!("Level load failed ({reason}): {err}");
            }
        }
    }

    fn restart_level(&mut self, reason: &str) {
        let path = self.current_level_path.clone();
        self.switch_level(path, None, reason);
    }

    /// Advance past a won level: either to the end zone's named target or to
    /// the next file in the rotation, wrapping at the end.
    fn advance_level(&mut self) {
        if let Some(target) = self.pending_target.take() {
            let path = resolve_level_path(&target);
            self.switch_level(path, None, "end zone target");
            return;
        }
        let next_index = self
            .level_rotation
            .iter()
            .position(|p| *p == self.current_level_path)
            .map(|i| (i + 1) % self.level_rotation.len())
            .unwrap_or(0);
        let path = self.level_rotation[next_index].clone();
        self.switch_level(path, None, "rotation advance");
    }

    /// One fixed simulation step: player, aggro selection, mobs, camera,
    /// then door and end zone triggers.
    fn step_simulation(&mut self) {
        let intent = self.input.move_intent();
        let x_before = self.player.x;

        let Level { blocks, mobs, .. } = &mut self.level;
        self.player.update(intent, blocks, mobs, &self.tuning);

        self.aggro_index = select_aggro_target(mobs, self.player.x, &self.tuning);
        for (index, mob) in mobs.iter_mut().enumerate() {
            mob.update(
                &mut self.player,
                blocks,
                self.aggro_index == Some(index),
                &self.tuning,
            );
        }

        if self.player.take_just_died() {
            for mob in mobs.iter_mut() {
                mob.reset();
            }
            self.camera_follow
                .snap_to(self.player.x, self.player.y, &self.tuning);
        }

        self.last_step_dx = self.player.x - x_before;
        self.level_elapsed += self.time.fixed_dt;
        self.camera_follow
            .update(self.player.x, self.player.y, &self.tuning);

        // Doors are edge-triggered on E so holding it cannot bounce the
        // player back and forth between paired doors.
        if self.input.is_just_pressed(Key::E) {
            let player_rect = self.player.rect(&self.tuning);
            let door = self
                .level
                .doors
                .iter()
                .find(|door| player_rect.intersects(&door.rect))
                .cloned();
            if let Some(door) = door {
                let path = resolve_level_path(&door.target_level);
                self.switch_level(path, door.target_spawn, "door");
                return;
            }
        }

        let player_rect = self.player.rect(&self.tuning);
        let reached = self
            .level
            .end_zones
            .iter()
            .find(|zone| player_rect.intersects(&zone.rect))
            .cloned();
        if let Some(zone) = reached {
            self.won = true;
            self.pending_target = zone.target_level;
            let best = self
                .best_times
                .entry(self.level.name.clone())
                .or_insert(self.level_elapsed);
            if self.level_elapsed < *best {
                *best = self.level_elapsed;
            }
            log::info!(
                "Level '{}' complete in {:.1}s (best {:.1}s)",
                self.level.name,
                self.level_elapsed,
                *best
            );
        }
    }

    fn ensure_textures_for_level(&mut self) {
        let mut required_assets = HashSet::new();
        for image in &self.level.background_images {
            required_assets.insert(image.path.clone());
        }
        for block in &self.level.blocks {
            if let Some(texture) = &block.texture {
                required_assets.insert(texture.clone());
            }
        }
        for npc in &self.level.npcs {
            if let Some(image) = &npc.image {
                required_assets.insert(image.clone());
            }
        }

        for asset_path in required_assets {
            if self.textures.contains_key(asset_path.as_str()) {
                continue;
            }
            let texture = load_texture_asset(
                &self.gpu.device,
                &self.gpu.queue,
                &self.quad_pipeline,
                &asset_path,
            );
            self.textures.insert(Arc::from(asset_path), texture);
        }

        if !self.textures.contains_key(WHITE_ASSET) {
            let texture = Texture::from_rgba8(
                &self.gpu.device,
                &self.gpu.queue,
                &[255, 255, 255, 255],
                1,
                1,
                "white",
            );
            let bind_group = self
                .quad_pipeline
                .create_texture_bind_group(&self.gpu.device, &texture);
            self.textures
                .insert(Arc::from(WHITE_ASSET), GpuQuadTexture { bind_group });
        }
    }

    fn rebuild_level_mesh(&mut self) {
        // Build a single CPU-side mesh each frame from the level + entities,
        // then stream it into GPU buffers.
        let (vertices, indices, draw_calls) = self.build_mesh();
        self.ensure_mesh_capacity(vertices.len(), indices.len());
        self.quad_count = vertices.len() / 4;
        self.draw_calls = draw_calls;

        if !vertices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }
        if !indices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&indices));
        }
    }

    fn build_mesh(&self) -> (Vec<QuadVertex>, Vec<u32>, Vec<DrawCall>) {
        let quad_estimate = self.level.blocks.len()
            + self.level.background_images.len()
            + self.level.doors.len()
            + self.level.npcs.len()
            + self.level.mobs.len()
            + 8; // ground, strip, player, aura, eye
        let mut vertices = Vec::with_capacity(quad_estimate * 4);
        let mut indices = Vec::with_capacity(quad_estimate * 6);
        let mut draw_calls = Vec::with_capacity(16);
        let size = self.tuning.player_size;

        // Back-to-front: backgrounds, ground, static level pieces, mobs,
        // then the player on top.
        for image in &self.level.background_images {
            add_quad(
                &mut vertices,
                &mut indices,
                &mut draw_calls,
                QuadSpec {
                    texture_key: &image.path,
                    rect: image.rect,
                    color: [1.0, 1.0, 1.0, 1.0],
                },
            );
        }

        let ground_band = Rect::new(0.0, self.tuning.ground_y, self.tuning.world_width, 600.0);
        add_quad(
            &mut vertices,
            &mut indices,
            &mut draw_calls,
            QuadSpec {
                texture_key: WHITE_ASSET,
                rect: ground_band,
                color: self.level.ground_color,
            },
        );
        // Darker strip along the ground line for visual depth.
        let strip_color = [
            self.level.ground_color[0] * 0.6,
            self.level.ground_color[1] * 0.6,
            self.level.ground_color[2] * 0.6,
            1.0,
        ];
        add_quad(
            &mut vertices,
            &mut indices,
            &mut draw_calls,
            QuadSpec {
                texture_key: WHITE_ASSET,
                rect: Rect::new(0.0, self.tuning.ground_y, self.tuning.world_width, 6.0),
                color: strip_color,
            },
        );

        for door in &self.level.doors {
            add_quad(
                &mut vertices,
                &mut indices,
                &mut draw_calls,
                QuadSpec {
                    texture_key: WHITE_ASSET,
                    rect: door.rect,
                    color: DOOR_COLOR,
                },
            );
        }

        for block in &self.level.blocks {
            let (texture_key, color) = match block.kind {
                block::BlockType::Normal => (WHITE_ASSET, BRICK_COLOR),
                block::BlockType::Deadly => (WHITE_ASSET, DEADLY_COLOR),
                block::BlockType::Finish => (WHITE_ASSET, FINISH_COLOR),
                block::BlockType::Colored => (
                    WHITE_ASSET,
                    block.color.unwrap_or([1.0, 1.0, 1.0, 1.0]),
                ),
                block::BlockType::Textured => (
                    block.texture.as_deref().unwrap_or(WHITE_ASSET),
                    [1.0, 1.0, 1.0, 1.0],
                ),
            };
            add_quad(
                &mut vertices,
                &mut indices,
                &mut draw_calls,
                QuadSpec {
                    texture_key,
                    rect: block.rect,
                    color,
                },
            );
        }

        for npc in &self.level.npcs {
            let texture_key = npc.image.as_deref().unwrap_or(WHITE_ASSET);
            let color = if npc.image.is_some() {
                [1.0, 1.0, 1.0, 1.0]
            } else {
                NPC_COLOR
            };
            add_quad(
                &mut vertices,
                &mut indices,
                &mut draw_calls,
                QuadSpec {
                    texture_key,
                    rect: npc.rect,
                    color,
                },
            );
        }

        for mob in &self.level.mobs {
            if !mob.is_alive() {
                continue;
            }
            let color = match mob {
                Mob::Walker(walker) if walker.on_ground => WALKER_GROUNDED_COLOR,
                Mob::Walker(_) => WALKER_AIRBORNE_COLOR,
                Mob::Zombie(_) => ZOMBIE_COLOR,
            };
            add_quad(
                &mut vertices,
                &mut indices,
                &mut draw_calls,
                QuadSpec {
                    texture_key: WHITE_ASSET,
                    rect: mob.rect(),
                    color,
                },
            );
        }

        // Wall-ride and glide get a translucent aura behind the player quad.
        let aura_color = if self.player.is_wall_riding() {
            Some(WALL_RIDE_AURA_COLOR)
        } else if self.player.is_gliding() {
            Some(GLIDE_AURA_COLOR)
        } else {
            None
        };
        if let Some(color) = aura_color {
            add_quad(
                &mut vertices,
                &mut indices,
                &mut draw_calls,
                QuadSpec {
                    texture_key: WHITE_ASSET,
                    rect: Rect::new(
                        self.player.x - 5.0,
                        self.player.y - 5.0,
                        size + 10.0,
                        size + 10.0,
                    ),
                    color,
                },
            );
        }
        add_quad(
            &mut vertices,
            &mut indices,
            &mut draw_calls,
            QuadSpec {
                texture_key: WHITE_ASSET,
                rect: self.player.rect(&self.tuning),
                color: PLAYER_COLOR,
            },
        );
        // An eye marks the facing direction.
        let eye_x = if self.player.facing_right {
            self.player.x + size - 12.0
        } else {
            self.player.x + 4.0
        };
        add_quad(
            &mut vertices,
            &mut indices,
            &mut draw_calls,
            QuadSpec {
                texture_key: WHITE_ASSET,
                rect: Rect::new(eye_x, self.player.y + 8.0, 8.0, 8.0),
                color: [1.0, 1.0, 1.0, 1.0],
            },
        );

        (vertices, indices, draw_calls)
    }

    fn ensure_mesh_capacity(&mut self, vertex_count: usize, index_count: usize) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.mesh_vertex_capacity {
            self.mesh_vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.mesh_vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.mesh_index_capacity {
            self.mesh_index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.mesh_index_capacity);
        }
    }

    fn overlay_stats(&self) -> OverlayStats {
        let mobs_alive = self.level.mobs.iter().filter(|m| m.is_alive()).count();
        let aggro_label = self
            .aggro_index
            .and_then(|i| self.level.mobs.get(i).map(|m| (i, m)))
            .map(|(i, mob)| format!("{} #{i}", mob.kind_label()));
        OverlayStats {
            draw_calls: self.draw_calls.len() as u32,
            quad_count: self.quad_count as u32,
            level_name: self.level.name.clone(),
            level_elapsed: self.level_elapsed,
            level_best: self.best_times.get(&self.level.name).copied(),
            player_position: (self.player.x, self.player.y),
            player_velocity: (self.last_step_dx, self.player.vy),
            player_state_label: self.player.state_label().to_string(),
            mob_count: self.level.mobs.len() as u32,
            mobs_alive: mobs_alive as u32,
            aggro_label,
            glide_allowed: self.level.glide_allowed,
            paused: self.paused,
        }
    }
}

struct App {
    config: PlatformConfig,
    state: Option<EngineState>,
}

impl App {
    fn new() -> Self {
        Self {
            config: PlatformConfig::default(),
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = rr_platform::window::create_window(event_loop, &self.config);
        log::info!(
            "Window created: {}x{}",
            self.config.width,
            self.config.height
        );
        self.state = Some(EngineState::new(window));
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.camera.viewport = (w, h);
                    state.camera_follow.set_viewport(w as f32, h as f32);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(engine_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(engine_key),
                            ElementState::Released => state.input.key_up(engine_key),
                        }
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                state.input.mouse_position = (position.x, position.y);
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }

                // Fixed-step simulation phase.
                state.time.begin_frame();

                while state.time.should_step() {
                    if state.input.is_just_pressed(Key::Escape) {
                        event_loop.exit();
                        return;
                    }
                    if state.input.is_just_pressed(Key::F3) {
                        state.debug_overlay.toggle();
                    }
                    if state.input.is_just_pressed(Key::R) {
                        state.restart_level("manual trigger (R)");
                    } else if state.level_watcher.should_reload() {
                        state.restart_level("file watcher");
                    }
                    if state.won && state.input.is_just_pressed(Key::Enter) {
                        state.advance_level();
                    }

                    // Skip simulation when paused (unless single-step requested)
                    // or while waiting on the victory screen.
                    if state.paused && !state.single_step_requested {
                        break;
                    }
                    state.single_step_requested = false;
                    if state.won {
                        continue;
                    }

                    state.step_simulation();
                }
                state.time.end_frame();

                // Render phase reads finalized simulation state from this frame.
                state.rebuild_level_mesh();
                let (cam_x, cam_y) = state.camera_follow.position();
                state.camera.position.x = cam_x;
                state.camera.position.y = cam_y;
                let camera_uniform = state.camera.build_uniform();
                state.gpu.queue.write_buffer(
                    &state.camera_buffer,
                    0,
                    bytemuck::cast_slice(&[camera_uniform]),
                );

                let Some((output, view)) = state.gpu.begin_frame() else {
                    return;
                };

                let stats = state.overlay_stats();
                let (egui_primitives, egui_textures_delta, overlay_actions) = state
                    .debug_overlay
                    .prepare(&state.window, &state.time, Some(stats));

                if overlay_actions.toggle_pause {
                    state.paused = !state.paused;
                    log::info!(
                        "Simulation {}",
                        if state.paused { "PAUSED" } else { "RESUMED" }
                    );
                }
                if overlay_actions.single_step {
                    state.single_step_requested = true;
                }
                if overlay_actions.restart_level {
                    state.restart_level("overlay button");
                }
                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [state.gpu.size.0, state.gpu.size.1],
                    pixels_per_point: state.window.scale_factor() as f32,
                };

                let mut encoder =
                    state
                        .gpu
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Render Encoder"),
                        });

                {
                    let sky = state.level.sky_color;
                    let clear_color = wgpu::Color {
                        r: sky[0] as f64,
                        g: sky[1] as f64,
                        b: sky[2] as f64,
                        a: 1.0,
                    };
                    let mut last_bound_texture_key: Option<&Arc<str>> = None;
                    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Level Render Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(clear_color),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    });

                    render_pass.set_pipeline(&state.quad_pipeline.render_pipeline);
                    render_pass.set_bind_group(0, &state.camera_bind_group, &[]);
                    render_pass.set_vertex_buffer(0, state.vertex_buffer.slice(..));
                    render_pass
                        .set_index_buffer(state.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                    for draw in &state.draw_calls {
                        // Untextured quads and missing assets both fall back
                        // to the shared white pixel.
                        let texture = state
                            .textures
                            .get(&draw.texture_key)
                            .or_else(|| state.textures.get(WHITE_ASSET));
                        if let Some(texture) = texture {
                            let need_rebind = match last_bound_texture_key {
                                Some(last) => **last != *draw.texture_key,
                                None => true,
                            };
                            if need_rebind {
                                render_pass.set_bind_group(1, &texture.bind_group, &[]);
                                last_bound_texture_key = Some(&draw.texture_key);
                            }
                            render_pass.draw_indexed(
                                draw.index_start..(draw.index_start + draw.index_count),
                                0,
                                0..1,
                            );
                        }
                    }
                }

                state.debug_overlay.upload(
                    &state.gpu.device,
                    &state.gpu.queue,
                    &mut encoder,
                    &egui_primitives,
                    &egui_textures_delta,
                    &screen_descriptor,
                );

                {
                    let mut egui_pass = encoder
                        .begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("egui Render Pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: &view,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Load,
                                    store: wgpu::StoreOp::Store,
                                },
                            })],
                            depth_stencil_attachment: None,
                            ..Default::default()
                        })
                        .forget_lifetime();

                    state
                        .debug_overlay
                        .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
                }

                state.debug_overlay.cleanup(&egui_textures_delta);

                state.gpu.queue.submit(std::iter::once(encoder.finish()));
                output.present();

                // Only clear edge-triggered input (just_pressed / just_released)
                // after at least one fixed step consumed it. Otherwise a press
                // that lands on a frame with 0 simulation steps is silently lost.
                if state.time.steps_this_frame > 0 {
                    state.input.end_frame();
                }
            }

            _ => {}
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<QuadVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Level Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Level Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn add_quad(
    vertices: &mut Vec<QuadVertex>,
    indices: &mut Vec<u32>,
    draw_calls: &mut Vec<DrawCall>,
    spec: QuadSpec<'_>,
) {
    let left = spec.rect.x;
    let right = spec.rect.right();
    let top = spec.rect.y;
    let bottom = spec.rect.bottom();
    let base_index = vertices.len() as u32;

    vertices.push(QuadVertex {
        position: [left, bottom],
        tex_coords: [0.0, 1.0],
        color: spec.color,
    });
    vertices.push(QuadVertex {
        position: [right, bottom],
        tex_coords: [1.0, 1.0],
        color: spec.color,
    });
    vertices.push(QuadVertex {
        position: [right, top],
        tex_coords: [1.0, 0.0],
        color: spec.color,
    });
    vertices.push(QuadVertex {
        position: [left, top],
        tex_coords: [0.0, 0.0],
        color: spec.color,
    });

    let draw_start = indices.len() as u32;
    indices.extend_from_slice(&[
        base_index,
        base_index + 1,
        base_index + 2,
        base_index,
        base_index + 2,
        base_index + 3,
    ]);

    push_draw_call(draw_calls, Arc::from(spec.texture_key), draw_start, 6);
}

/// Append a draw call, merging with the previous one when the texture matches
/// and indices are contiguous. This is the core of the batching strategy:
/// almost everything uses the shared white pixel, so a whole level typically
/// collapses into a handful of `draw_indexed` calls.
fn push_draw_call(
    draw_calls: &mut Vec<DrawCall>,
    texture_key: Arc<str>,
    index_start: u32,
    index_count: u32,
) {
    if let Some(last) = draw_calls.last_mut() {
        let contiguous = last.index_start + last.index_count == index_start;
        if *last.texture_key == *texture_key && contiguous {
            last.index_count += index_count;
            return;
        }
    }
    draw_calls.push(DrawCall {
        texture_key,
        index_start,
        index_count,
    });
}

fn load_texture_asset(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipeline: &QuadPipeline,
    asset_path: &str,
) -> GpuQuadTexture {
    let texture = match std::fs::read(asset_path) {
        Ok(bytes) => Texture::from_bytes(device, queue, &bytes, asset_path),
        Err(err) => {
            log::warn!(
                "Failed to read texture '{}': {}. Falling back to white pixel.",
                asset_path,
                err
            );
            Texture::from_rgba8(device, queue, &[255, 255, 255, 255], 1, 1, asset_path)
        }
    };
    let bind_group = pipeline.create_texture_bind_group(device, &texture);
    GpuQuadTexture { bind_group }
}

/// Level references inside level files are bare file names.
fn resolve_level_path(name: &str) -> PathBuf {
    if name.contains('/') || name.contains('\\') {
        PathBuf::from(name)
    } else {
        Path::new("assets/levels").join(name)
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::Space => Some(Key::Space),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::KeyE => Some(Key::E),
        KeyCode::KeyR => Some(Key::R),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Ridge Runner starting...");

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app).expect("Event loop error");
}

//! Level text format loader.
//!
//! Line-oriented, comma-separated directives; `#` starts a comment. All file
//! y-coordinates are heights above the ground line and get converted to
//! absolute world y here, so the simulation only ever sees world coordinates.
//!
//! Unknown directives are skipped with a warning so older level files keep
//! loading; malformed numeric fields fail the whole load with a line-numbered
//! message and the orchestrator keeps the previous level running.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rr_core::config::Tuning;

use crate::block::{Block, BlockType};
use crate::geometry::Rect;
use crate::mob::{Mob, Walker, Zombie};

pub const DEFAULT_SKY_COLOR: [f32; 4] = [0.529, 0.808, 0.922, 1.0]; // #87CEEB
pub const DEFAULT_GROUND_COLOR: [f32; 4] = [0.133, 0.545, 0.133, 1.0]; // #228B22

#[derive(Debug, Clone)]
pub struct Door {
    pub rect: Rect,
    pub target_level: String,
    /// Optional spawn override, stored file-style (x, height above ground).
    pub target_spawn: Option<(f32, f32)>,
}

#[derive(Debug, Clone)]
pub struct Npc {
    pub rect: Rect,
    pub image: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct EndZone {
    pub rect: Rect,
    /// Level file the zone advances to; `None` means "next in the rotation".
    pub target_level: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BackgroundImage {
    pub path: String,
    pub rect: Rect,
}

#[derive(Debug)]
pub struct Level {
    pub name: String,
    pub sky_color: [f32; 4],
    pub ground_color: [f32; 4],
    pub glide_allowed: bool,
    pub start_x: f32,
    pub start_y: f32,
    pub blocks: Vec<Block>,
    pub background_images: Vec<BackgroundImage>,
    pub doors: Vec<Door>,
    pub npcs: Vec<Npc>,
    pub end_zones: Vec<EndZone>,
    pub mobs: Vec<Mob>,
}

impl Level {
    fn empty(tuning: &Tuning) -> Self {
        Self {
            name: "Unnamed level".to_string(),
            sky_color: DEFAULT_SKY_COLOR,
            ground_color: DEFAULT_GROUND_COLOR,
            glide_allowed: false,
            start_x: 50.0,
            start_y: tuning.ground_y - tuning.player_size,
            blocks: Vec::new(),
            background_images: Vec::new(),
            doors: Vec::new(),
            npcs: Vec::new(),
            end_zones: Vec::new(),
            mobs: Vec::new(),
        }
    }
}

pub fn load_level_from_path(path: &Path, tuning: &Tuning) -> Result<Level, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    parse_level(&raw, tuning).map_err(|e| format!("Failed to parse {}: {e}", path.display()))
}

fn parse_level(text: &str, tuning: &Tuning) -> Result<Level, String> {
    let mut level = Level::empty(tuning);
    let ground_y = tuning.ground_y;

    for (line_index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = line_index + 1;
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        let directive = parts[0].to_ascii_lowercase();

        if let Some(kind) = directive.strip_prefix("mob_") {
            parse_mob(&mut level, kind, &parts, line_no, tuning)?;
            continue;
        }

        match directive.as_str() {
            "name" => level.name = field(&parts, 1, line_no, "name")?.to_string(),
            "sky" => level.sky_color = parse_hex_color(field(&parts, 1, line_no, "sky")?, line_no)?,
            "ground" => {
                level.ground_color = parse_hex_color(field(&parts, 1, line_no, "ground")?, line_no)?
            }
            "glide" => level.glide_allowed = field(&parts, 1, line_no, "glide")? == "true",
            "start" => {
                level.start_x = parse_f32(&parts, 1, line_no)?;
                let y_above_ground = parse_f32(&parts, 2, line_no)?;
                level.start_y = ground_y - y_above_ground - tuning.player_size;
            }
            "image" | "background" => {
                let path = field(&parts, 1, line_no, "image path")?.to_string();
                let rect = parse_rect(&parts, 2, line_no, ground_y)?;
                level.background_images.push(BackgroundImage { path, rect });
            }
            "block" | "bloc" | "bloc_colored" => {
                let rect = parse_rect(&parts, 1, line_no, ground_y)?;
                level.blocks.push(parse_block_suffix(rect, &parts, line_no)?);
            }
            "porte" => {
                let rect = parse_rect(&parts, 1, line_no, ground_y)?;
                let target_level = field(&parts, 5, line_no, "door target")?.to_string();
                let target_spawn = if parts.len() > 7 {
                    Some((parse_f32(&parts, 6, line_no)?, parse_f32(&parts, 7, line_no)?))
                } else {
                    None
                };
                level.doors.push(Door {
                    rect,
                    target_level,
                    target_spawn,
                });
            }
            "fin" => {
                let rect = parse_rect(&parts, 1, line_no, ground_y)?;
                // The visual finish block collides but never resolves; the
                // zone rectangle is the real trigger.
                level.blocks.push(Block::new(rect, BlockType::Finish));
                let target_level = parts.get(5).map(|s| s.to_string());
                level.end_zones.push(EndZone { rect, target_level });
            }
            "npc" => {
                let rect = parse_rect(&parts, 1, line_no, ground_y)?;
                let image = match field(&parts, 5, line_no, "npc image")? {
                    "null" => None,
                    path => Some(path.to_string()),
                };
                // Messages may themselves contain commas.
                let message = parts.get(6..).unwrap_or(&[]).join(",");
                level.npcs.push(Npc {
                    rect,
                    image,
                    message,
                });
            }
            other => {
                log::warn!("Line {line_no}: unknown directive '{other}', skipping");
            }
        }
    }

    Ok(level)
}

fn parse_mob(
    level: &mut Level,
    kind: &str,
    parts: &[&str],
    line_no: usize,
    tuning: &Tuning,
) -> Result<(), String> {
    let x = parse_f32(parts, 1, line_no)?;
    let y_above_ground = parse_f32(parts, 2, line_no)?;
    let speed = parse_f32(parts, 3, line_no)?;
    let y = tuning.ground_y - y_above_ground - 32.0;

    match kind {
        "walker" => level.mobs.push(Mob::Walker(Walker::new(x, y, speed))),
        "zombie" => level.mobs.push(Mob::Zombie(Zombie::new(x, y, speed))),
        other => log::warn!("Line {line_no}: unknown mob kind '{other}', skipping"),
    }
    Ok(())
}

/// Parse `x, y_above_ground, w, h` starting at `start` and convert to an
/// absolute world-space rectangle.
fn parse_rect(parts: &[&str], start: usize, line_no: usize, ground_y: f32) -> Result<Rect, String> {
    let x = parse_f32(parts, start, line_no)?;
    let y_above_ground = parse_f32(parts, start + 1, line_no)?;
    let w = parse_f32(parts, start + 2, line_no)?;
    let h = parse_f32(parts, start + 3, line_no)?;
    if w <= 0.0 || h <= 0.0 {
        return Err(format!("line {line_no}: rectangle size must be positive"));
    }
    Ok(Rect::new(x, ground_y - y_above_ground - h, w, h))
}

fn parse_block_suffix(rect: Rect, parts: &[&str], line_no: usize) -> Result<Block, String> {
    match parts.get(5) {
        None => Ok(Block::new(rect, BlockType::Normal)),
        Some(extra) if extra.starts_with('#') => {
            Ok(Block::colored(rect, parse_hex_color(extra, line_no)?))
        }
        Some(extra) if extra.eq_ignore_ascii_case("deadly") => {
            Ok(Block::new(rect, BlockType::Deadly))
        }
        Some(extra) if extra.eq_ignore_ascii_case("finish") => {
            Ok(Block::new(rect, BlockType::Finish))
        }
        Some(extra) => Ok(Block::textured(rect, extra.to_string())),
    }
}

fn field<'a>(parts: &[&'a str], index: usize, line_no: usize, what: &str) -> Result<&'a str, String> {
    parts
        .get(index)
        .copied()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("line {line_no}: missing {what} (field {index})"))
}

fn parse_f32(parts: &[&str], index: usize, line_no: usize) -> Result<f32, String> {
    let raw = field(parts, index, line_no, "numeric value")?;
    raw.parse::<f32>()
        .map_err(|_| format!("line {line_no}: invalid number '{raw}' (field {index})"))
}

fn parse_hex_color(raw: &str, line_no: usize) -> Result<[f32; 4], String> {
    let hex = raw.strip_prefix('#').unwrap_or(raw);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("line {line_no}: invalid color '{raw}'"));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map(|v| v as f32 / 255.0)
            .map_err(|_| format!("line {line_no}: invalid color '{raw}'"))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?, 1.0])
}

pub struct LevelWatcher {
    level_path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl LevelWatcher {
    pub fn new(level_path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&level_path);
        Self {
            level_path,
            last_seen_modified,
        }
    }

    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.level_path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

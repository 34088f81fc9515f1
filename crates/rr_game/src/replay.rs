use crate::mob::Mob;
use rr_core::input::MoveIntent;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    pub fn expanded_intents(&self) -> Vec<MoveIntent> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for _ in 0..frame.repeat.max(1) {
                out.push(MoveIntent {
                    left: frame.left,
                    right: frame.right,
                    up: frame.up,
                    down: frame.down,
                });
            }
        }
        out
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(replay)
}

const fn default_repeat() -> u32 {
    1
}

/// Drive a player through a scripted run against static level content. Mobs
/// are updated alongside the player with the usual aggro selection.
pub fn run_replay(
    player: &mut crate::player::Player,
    mobs: &mut [Mob],
    blocks: &[crate::block::Block],
    intents: &[MoveIntent],
    tuning: &rr_core::config::Tuning,
) {
    for intent in intents {
        player.update(*intent, blocks, mobs, tuning);
        let aggro = crate::mob::select_aggro_target(mobs, player.x, tuning);
        for (index, mob) in mobs.iter_mut().enumerate() {
            mob.update(player, blocks, aggro == Some(index), tuning);
        }
        if player.take_just_died() {
            for mob in mobs.iter_mut() {
                mob.reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockType};
    use crate::geometry::Rect;
    use crate::mob::Walker;
    use crate::player::Player;
    use rr_core::config::Tuning;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "rr_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn sample_blocks() -> Vec<Block> {
        vec![
            Block::new(Rect::new(300.0, 500.0, 200.0, 32.0), BlockType::Normal),
            Block::new(Rect::new(700.0, 400.0, 32.0, 250.0), BlockType::Normal),
        ]
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "frames": [
                { "right": true, "repeat": 3 },
                { "up": true }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let expanded = replay.expanded_intents();
        assert_eq!(expanded.len(), 4);
        assert!(expanded[3].up);
        assert!(expanded[0].right && !expanded[0].up);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn empty_replay_is_rejected() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay");
        assert!(err.contains("empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let path = temp_file_path("deterministic");
        fs::write(
            &path,
            r#"{
              "frames": [
                { "right": true, "repeat": 60 },
                { "right": true, "up": true },
                { "right": true, "repeat": 120 },
                { "left": true, "repeat": 45 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let intents = replay.expanded_intents();
        let tuning = Tuning::default();
        let blocks = sample_blocks();

        let mut run_a = Player::new(50.0, tuning.ground_y - tuning.player_size);
        let mut mobs_a = vec![Mob::Walker(Walker::new(900.0, tuning.ground_y - 32.0, 2.0))];
        let mut run_b = Player::new(50.0, tuning.ground_y - tuning.player_size);
        let mut mobs_b = vec![Mob::Walker(Walker::new(900.0, tuning.ground_y - 32.0, 2.0))];

        run_replay(&mut run_a, &mut mobs_a, &blocks, &intents, &tuning);
        run_replay(&mut run_b, &mut mobs_b, &blocks, &intents, &tuning);

        assert_eq!(run_a.x, run_b.x);
        assert_eq!(run_a.y, run_b.y);
        assert_eq!(run_a.vy, run_b.vy);
        assert_eq!(run_a.state, run_b.state);
        assert_eq!(mobs_a[0].x(), mobs_b[0].x());
        assert_eq!(mobs_a[0].is_alive(), mobs_b[0].is_alive());
    }

    #[test]
    fn scripted_jump_returns_to_the_ground() {
        let tuning = Tuning::default();
        let mut player = Player::new(50.0, tuning.ground_y - tuning.player_size);
        let replay = ReplaySequence {
            frames: vec![
                ReplayFrame {
                    left: false,
                    right: false,
                    up: true,
                    down: false,
                    repeat: 1,
                },
                ReplayFrame {
                    left: false,
                    right: false,
                    up: false,
                    down: false,
                    repeat: 120,
                },
            ],
        };

        run_replay(
            &mut player,
            &mut [],
            &[],
            &replay.expanded_intents(),
            &tuning,
        );

        assert!(player.is_grounded());
        assert_eq!(player.y, tuning.ground_y - tuning.player_size);
        assert_eq!(player.x, 50.0, "no horizontal input, no horizontal drift");
    }
}

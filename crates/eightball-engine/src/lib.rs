pub mod ai;
pub mod api;
pub mod bridge;
pub mod core;
pub mod engine;
pub mod error;
pub mod input;
pub mod rules;

// Re-export key types at crate root for convenience
pub use ai::difficulty::{DifficultyProfile, DifficultyTier};
pub use ai::planner::{Evaluation, ShotPlanner};
pub use api::config::{MatchConfig, PhysicsConfig, RuleConfig};
pub use api::types::{EndReason, Mode, PerSide, ShotData, Side, Spin, Target};
pub use bridge::protocol::{write_frame, BallFrame, HudFrame, PROTOCOL_VERSION};
pub use bridge::wire::{MatchComplete, WireEvent};
pub use core::ball::{Ball, BallGroup, BALL_COUNT, CUE, EIGHT};
pub use core::physics::{simulate, ShotOutcome, Simulation, StepStatus};
pub use core::table::Table;
pub use core::time::FixedTimestep;
pub use engine::facade::{Engine, ShotSource};
pub use engine::hud::{HudPlayer, HudSnapshot};
pub use engine::observer::{EngineObserver, NullObserver, RecordingObserver};
pub use error::{ConfigError, ShotRejection, WireError};
pub use input::queue::{InputEvent, InputQueue};
pub use rules::referee::{Foul, Ruling};
pub use rules::state::{GameState, MatchStats, Phase, PlayerState, ShotKind};

pub mod difficulty;
pub mod planner;

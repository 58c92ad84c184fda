pub mod ball;
pub mod geometry;
pub mod physics;
pub mod rng;
pub mod table;
pub mod time;

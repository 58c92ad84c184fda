pub mod facade;
pub mod hud;
pub mod observer;
pub mod schedule;

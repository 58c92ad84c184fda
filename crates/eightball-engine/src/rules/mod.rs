pub mod referee;
pub mod state;

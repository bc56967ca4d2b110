pub mod player;
pub mod server;

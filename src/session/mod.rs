//! Request handling for online characters

pub mod handler;

pub use handler::LfgService;

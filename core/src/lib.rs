pub mod speedwire;

pub mod config;
pub mod gate;
pub mod pipeline;
pub mod publisher;
pub mod summary;

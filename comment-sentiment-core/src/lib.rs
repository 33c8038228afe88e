pub mod analysis;
pub mod classifier;
pub mod config;
pub mod models;
pub mod normalize;
pub mod report;
pub mod table;
pub mod youtube;

pub mod commands;
pub mod fs;

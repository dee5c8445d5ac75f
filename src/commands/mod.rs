// src/commands/mod.rs
//! Command handlers for the porter CLI

mod pack;
mod publish;

pub use pack::cmd_pack;
pub use publish::cmd_publish;

//! Command line front end for canopy category groups and trees

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod output;
pub mod permissions;
pub mod templates;

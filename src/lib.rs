//! Spritestage - layout validation and render-to-assembly handoff
//!
//! This library sits between a frame-rendering front-end and a sheet
//! assembler. It provides functionality to:
//! - Validate a proposed rows/columns sheet layout against frame count
//!   and accepted texture sizes
//! - Allocate a unique, collision-free staging directory per export run
//! - Write (and parse back) the line-oriented manifest handed to the
//!   downstream assembly step

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod layout;
pub mod manifest;
pub mod staging;

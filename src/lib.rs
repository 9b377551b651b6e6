//! Reads a Gerber X2/X3 command stream and resolves it into a flat scene of positioned
//! graphical objects. See `processor::Processor` for the state machine at the heart of this
//! crate and `file_processor::process` for the top-level entry point.

pub mod aperture;
pub mod config;
pub mod error;
pub mod file_processor;
pub mod geometry;
pub mod graphics_state;
pub mod handlers;
pub mod lexing;
pub mod macros;
pub mod object;
pub mod processor;
pub mod serialize;
pub mod shunting_yard;
pub mod stream;

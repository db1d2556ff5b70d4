//! ts-core: Command-line front end for thinkstream.
//!
//! Configuration, preference persistence, audio input, and terminal
//! rendering around the `ts-backend` pipeline. Exposed as a library for
//! testing.

pub mod ask;
pub mod audio;
pub mod config;
pub mod flow;
pub mod prefs;
pub mod render;

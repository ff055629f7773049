//! Presentation-agnostic boundary adapters. The engine itself is callable
//! from any front end; this crate ships a CSV batch interface for the CLI.

pub mod csv;

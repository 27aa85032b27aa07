//! Terminal map directory of women working in STEM across Bolivia.
//!
//! The directory is loaded once from CSV ([`data`]), filtered and spread out
//! for display ([`query`]) and drawn with braille outlines ([`map`], [`ui`]).
//! Contact suggestions go to an append-only CSV ([`submission`]).

pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod error;
pub mod map;
pub mod query;
pub mod submission;
pub mod ui;

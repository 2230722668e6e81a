//! Item-oriented plumbing shared by the CSV reader and writer.

pub mod item;

pub mod step;

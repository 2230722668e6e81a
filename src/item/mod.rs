/// This module provides the CSV item reader and writer and the types they share.
pub mod csv;

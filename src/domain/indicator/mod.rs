//! Technical indicators computed over a price column.
//!
//! Each indicator returns one value per input row; rows inside the warm-up
//! period are `None`.

pub mod sma;

pub use sma::simple_moving_average;

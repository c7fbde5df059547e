//! Line source implementations

pub mod reader;
pub mod replay;

pub use reader::ReaderSource;
pub use replay::ReplaySource;

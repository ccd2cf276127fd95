pub mod decoder;
pub mod scanner;
pub mod source;

pub use decoder::{SymphoniaFactory, SymphoniaSource};
pub use scanner::{find_silence_in, find_silence_out, ScanConfig, NOT_FOUND};
pub use source::{SampleSource, SourceFactory};

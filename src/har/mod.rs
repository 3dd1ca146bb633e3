pub mod convert;
pub mod model;

pub use convert::{default_output_path, Conversion, ConversionReport, HarConverter};

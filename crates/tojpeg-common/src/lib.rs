pub mod color;
pub mod error;
pub mod format;
pub mod naming;

pub use color::Background;
pub use error::{Error, Result};
pub use format::{SourceFormat, SUPPORTED_EXTENSIONS};
pub use naming::{default_output_dir, prepare_output_dir, OutputNamer, Suffix};

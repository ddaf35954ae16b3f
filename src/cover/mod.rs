pub mod chrome;
pub mod export;
pub mod pdf;
pub mod sheet;

pub use chrome::ChromeRasterizer;
pub use export::{CoverRasterizer, ExportError, ExportFile, Exporter, PageImage};
pub use sheet::CoverSheet;

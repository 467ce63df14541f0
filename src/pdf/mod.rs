pub mod document;
pub mod sheet;
pub mod xobject;

pub use document::PdfDocument;

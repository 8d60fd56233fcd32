mod document;
pub mod persist;

pub use document::BdmDocument;

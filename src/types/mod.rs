pub mod diagram;
pub mod table;

pub use diagram::{DiagramNode, Position, RelationKind, Relationship};
pub use table::{Bucket, Column, MetadataEntry, Table, DESCRIPTION_KEY};

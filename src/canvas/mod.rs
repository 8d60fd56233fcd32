mod adapter;
mod gesture;
pub mod scene;
pub mod widget;

pub use adapter::CanvasAdapter;
pub use gesture::{CanvasEvent, PointerButton, PointerEvent, PointerKind};
pub use scene::Scene;
pub use widget::{GraphWidget, Selection};

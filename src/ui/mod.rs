pub mod page_view;
pub mod preview;
mod terminal_guard;

pub use page_view::{PageView, Projection};
pub use preview::Preview;

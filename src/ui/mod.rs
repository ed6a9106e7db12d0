mod chrome;
mod layout;
mod overlay;

pub use chrome::draw_chrome;
pub use layout::{UiLayout, centered_rect, split_layout};
pub use overlay::{draw_loading_overlay, draw_toast_overlay};

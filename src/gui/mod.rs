//! The terminal front end: how scenes are drawn, how keys map to kiosk
//! inputs, and the device picker.

mod device_selector;
mod error;
mod input;
mod scene_view;
mod terminal;

pub use device_selector::device_selector;
pub use error::KioskGuiError;
pub use input::{map_key, KioskInput};
pub use scene_view::render_scene;
pub use terminal::Tui;

//! The three kiosk applications, each a set of [Screen](crate::screen::Screen)s
//! wired into a [ScreenController](crate::screen::ScreenController).
//!
//! - [scale]: the weighing display next to the BLE scale.
//! - [recipe]: the tablet that tells the scale what to weigh next.
//! - [robot]: the robot assistant walkthrough with its help overlay.

pub mod recipe;
pub mod robot;
pub mod scale;

//! KioskLink drives the screens of a small kitchen exhibit. A kitchen scale
//! streams readings over a BLE-UART bridge, a recipe tablet tells the scale
//! what to weigh next, and a robot assistant walks visitors through a short
//! sequence of screens while a remote robot reports what it is doing.
//!
//! The crate splits into three layers:
//!
//! - the device side: [transport] finds and talks to a device,
//!   [line_framer] turns its fragments back into lines and
//!   [weight_message_decoder] reads weights out of them;
//! - the weighing logic in [weight_session], which knows nothing about
//!   screens;
//! - the presentation side: [screen] runs a flow of screens over a
//!   [scene], the [flows] module builds the three kiosks, and [gui] draws
//!   them in a terminal.
//!
//! Messages between kiosks are described in [remote] and carried by [feed].

#![warn(missing_docs)]
pub mod args;
pub mod config;
pub mod dummy_scale;
pub mod feed;
pub mod flows;
pub mod gui;
pub mod line_framer;
pub mod remote;
pub mod scene;
pub mod screen;
pub mod serial_link;
pub mod transport;
pub mod weight_message_decoder;
pub mod weight_session;

//! Connects to a scale and logs every line it sends, along with the weight
//! decoded from it. Handy for checking a bridge before putting it in a kiosk.

use clap::Parser;
use env_logger::Env;
use kiosklink::{
    args::MonitorArgs,
    config::KioskConfig,
    dummy_scale::DummyScale,
    gui::{device_selector, Tui},
    line_framer::LineFramer,
    serial_link::SerialAdapter,
    transport::{Adapter, DeviceInfo, SelectionCriteria, TransportLink},
    weight_message_decoder::decode_line,
};
use log::{error, info, warn};
use std::{cell::RefCell, error::Error, rc::Rc, thread, time::Duration};

// Example:
// RUST_LOG=debug cargo run --bin monitor -- --dummy --send tare

const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn pick_device(devices: Vec<DeviceInfo>) -> Option<DeviceInfo> {
    let _tui = match Tui::enter() {
        Ok(tui) => tui,
        Err(e) => {
            error!("Could not open the device selector: {}", e);
            return None;
        }
    };
    device_selector(devices).unwrap_or_else(|e| {
        error!("Device selector failed: {}", e);
        None
    })
}

fn monitor<A: Adapter>(
    mut link: TransportLink<A>,
    args: &MonitorArgs,
    name_prefix: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let framer = Rc::new(RefCell::new(LineFramer::new()));
    framer
        .borrow_mut()
        .on_line_received(|line| match decode_line(line) {
            Some(grams) => info!("{:?} -> {} g", line, grams),
            None => info!("{:?}", line),
        });

    let feed = framer.clone();
    link.on_fragment(move |text| feed.borrow_mut().feed(text));
    link.on_disconnect(move || {
        let leftover = framer.borrow().buffered().to_owned();
        if !leftover.is_empty() {
            warn!("Dropping unterminated {:?}", leftover);
        }
        framer.borrow_mut().clear();
    });

    let mut criteria = SelectionCriteria::any().with_chooser(pick_device);
    if let Some(port) = &args.port {
        criteria = criteria.with_path(port);
    }
    if let Some(prefix) = name_prefix {
        criteria = criteria.with_name_prefix(prefix);
    }

    let device = link.connect(criteria)?;
    info!("Listening to {} ({})", device.name, device.path.display());

    if let Some(line) = &args.send {
        link.send_line(line)?;
        info!("Sent {:?}", line);
    }

    while link.is_connected() {
        link.poll();
        thread::sleep(POLL_INTERVAL);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = MonitorArgs::parse();
    let config = KioskConfig::load_from_path(&args.config);
    let name_prefix = config.scale.name_prefix.as_deref();

    if args.dummy {
        monitor(TransportLink::new(DummyScale::default()), &args, name_prefix)
    } else {
        let adapter = SerialAdapter::new(config.scale.baud_rate);
        monitor(TransportLink::new(adapter), &args, name_prefix)
    }
}

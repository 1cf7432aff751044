//! Runs one of the kiosk flows full screen in the terminal.

mod app;

use app::{App, DeviceFilter};
use clap::Parser;
use env_logger::{Env, Target};
use kiosklink::{
    args::{FlowCommand, KioskArgs},
    config::KioskConfig,
    dummy_scale::DummyScale,
    feed::{spawn_feed, Publisher},
    flows::{
        recipe, robot,
        scale::{self, ScaleScreenId},
    },
    gui::Tui,
    serial_link::SerialAdapter,
    transport::{Adapter, TransportLink},
};
use std::{error::Error, fmt::Debug, fs::File, hash::Hash, path::Path, time::Instant};

// Example:
// cargo run --bin kiosk -- scale --dummy --feed /tmp/scale.fifo --log kiosk.log
// cargo run --bin kiosk -- recipe --publish /tmp/scale.fifo

fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    // Without a log file everything goes to stderr, right on top of the UI.
    let default_level = if log_file.is_some() { "info" } else { "error" };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(default_level));
    if let Some(path) = log_file {
        builder.target(Target::Pipe(Box::new(File::create(path)?)));
    }
    builder.init();
    Ok(())
}

fn run<Id, A, F>(mut app: App<Id, A>, args: &KioskArgs, setup: F) -> Result<(), Box<dyn Error>>
where
    Id: Copy + Eq + Hash + Debug + 'static,
    A: Adapter,
    F: FnOnce(&mut App<Id, A>),
{
    if let Some(path) = &args.feed {
        app = app.with_feed(spawn_feed(path));
    }

    let mut tui = Tui::enter()?;
    app.start(Instant::now());
    setup(&mut app);
    tui.terminal().clear()?;
    app.run(tui.terminal())?;
    Ok(())
}

fn prepare_scale<A: Adapter>(app: &mut App<ScaleScreenId, A>, has_feed: bool, auto_connect: bool) {
    if has_feed {
        scale::show_feed_attached(app.controller_mut().scene_mut());
    }
    if auto_connect {
        app.connect();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = KioskArgs::parse();
    init_logging(args.log.as_deref())?;

    let config = KioskConfig::load_from_path(&args.config);
    let publisher = Publisher::new(args.publish.clone());

    match &args.command {
        FlowCommand::Scale(cmd) => {
            let filter = DeviceFilter {
                port: cmd.port.clone(),
                name_prefix: config.scale.name_prefix.clone(),
            };
            let has_feed = args.feed.is_some();
            let auto_connect = cmd.dummy || cmd.port.is_some();

            let controller = scale::build(&config.scale);
            if cmd.dummy {
                let link = TransportLink::new(DummyScale::default());
                run(
                    App::new(controller, publisher).with_link(link, filter),
                    &args,
                    |app| prepare_scale(app, has_feed, auto_connect),
                )
            } else {
                let link = TransportLink::new(SerialAdapter::new(config.scale.baud_rate));
                run(
                    App::new(controller, publisher).with_link(link, filter),
                    &args,
                    |app| prepare_scale(app, has_feed, auto_connect),
                )
            }
        }
        FlowCommand::Recipe => {
            let app = App::<_, SerialAdapter>::new(recipe::build(&config.recipe), publisher);
            run(app, &args, |_| {})
        }
        FlowCommand::Robot => {
            let app = App::<_, SerialAdapter>::new(robot::build(&config.robot), publisher);
            run(app, &args, |_| {})
        }
    }
}

use crossterm::event::{self, Event};
use kiosklink::{
    feed::Publisher,
    gui::{device_selector, map_key, render_scene, KioskGuiError, KioskInput},
    line_framer::LineFramer,
    remote::RemoteMessage,
    screen::ScreenController,
    transport::{Adapter, LinkState, SelectionCriteria, TransportLink},
};
use log::{error, info, warn};
use ratatui::{prelude::*, widgets::*};
use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt::Debug,
    hash::Hash,
    path::PathBuf,
    rc::Rc,
    sync::mpsc::{Receiver, TryRecvError},
    time::{Duration, Instant},
};

const TICK_RATE: Duration = Duration::from_millis(16);

/// Which device `c` connects to.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    pub port: Option<PathBuf>,
    pub name_prefix: Option<String>,
}

impl DeviceFilter {
    fn criteria(&self) -> SelectionCriteria {
        let mut criteria = SelectionCriteria::any().with_chooser(|devices| {
            device_selector(devices).unwrap_or_else(|e| {
                error!("Device selector failed: {}", e);
                None
            })
        });
        if let Some(port) = &self.port {
            criteria = criteria.with_path(port);
        }
        if let Some(prefix) = &self.name_prefix {
            criteria = criteria.with_name_prefix(prefix.as_str());
        }
        criteria
    }
}

/// One running kiosk: a screen flow plus whatever feeds it.
pub struct App<Id, A: Adapter> {
    controller: ScreenController<Id>,
    link: Option<TransportLink<A>>,
    filter: DeviceFilter,
    lines: Rc<RefCell<VecDeque<String>>>,
    feed: Option<Receiver<String>>,
    publisher: Publisher,
    last_error: Option<String>,
}

impl<Id, A> App<Id, A>
where
    Id: Copy + Eq + Hash + Debug + 'static,
    A: Adapter,
{
    pub fn new(controller: ScreenController<Id>, publisher: Publisher) -> Self {
        App {
            controller,
            link: None,
            filter: DeviceFilter::default(),
            lines: Rc::new(RefCell::new(VecDeque::new())),
            feed: None,
            publisher,
            last_error: None,
        }
    }

    /// Attaches a device. Its lines go to the active screen.
    pub fn with_link(self, mut link: TransportLink<A>, filter: DeviceFilter) -> Self {
        let lines = self.lines.clone();
        let framer = Rc::new(RefCell::new(LineFramer::new()));
        framer
            .borrow_mut()
            .on_line_received(move |line| lines.borrow_mut().push_back(line.to_owned()));

        let feed = framer.clone();
        link.on_fragment(move |text| feed.borrow_mut().feed(text));
        link.on_connect(|device| info!("{} attached", device.name));
        link.on_disconnect(move || framer.borrow_mut().clear());

        App {
            link: Some(link),
            filter,
            ..self
        }
    }

    /// Attaches the incoming message feed.
    pub fn with_feed(self, feed: Receiver<String>) -> Self {
        App {
            feed: Some(feed),
            ..self
        }
    }

    pub fn controller_mut(&mut self) -> &mut ScreenController<Id> {
        &mut self.controller
    }

    pub fn start(&mut self, now: Instant) {
        self.controller.start(now);
    }

    /// Connects the device, asking the user if several match.
    pub fn connect(&mut self) {
        let Some(link) = self.link.as_mut() else {
            info!("This kiosk has no device to connect to");
            return;
        };
        self.last_error = match link.connect(self.filter.criteria()) {
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), KioskGuiError> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;

            if event::poll(TICK_RATE)? {
                if let Event::Key(key) = event::read()? {
                    match map_key(key) {
                        Some(KioskInput::Quit) => break,
                        Some(KioskInput::Connect) => {
                            self.connect();
                            // The selector may have drawn over everything.
                            terminal.clear()?;
                        }
                        Some(input) => self.on_input(input, Instant::now()),
                        None => {}
                    }
                }
            }

            self.on_tick(Instant::now());
        }

        if let Some(link) = self.link.as_mut() {
            link.disconnect();
        }
        Ok(())
    }

    fn on_input(&mut self, input: KioskInput, now: Instant) {
        match input {
            KioskInput::Advance => {
                self.controller.advance(now);
            }
            KioskInput::Back => {
                self.controller.back(now);
            }
            KioskInput::Action(n) => self.controller.action(n, now),
            KioskInput::Disconnect => {
                if let Some(link) = self.link.as_mut() {
                    link.disconnect();
                }
            }
            KioskInput::Connect | KioskInput::Quit => {}
        }
    }

    fn on_tick(&mut self, now: Instant) {
        if let Some(link) = self.link.as_mut() {
            link.poll();
        }
        let lines: Vec<String> = self.lines.borrow_mut().drain(..).collect();
        for line in lines {
            self.controller.on_line(&line, now);
        }

        self.drain_feed(now);
        self.controller.tick(now);

        for message in self.controller.take_outbox() {
            if let Err(e) = self.publisher.publish(&message) {
                error!("Could not publish {:?}: {}", message, e);
            }
        }
    }

    fn drain_feed(&mut self, now: Instant) {
        let Some(feed) = self.feed.as_ref() else {
            return;
        };
        loop {
            match feed.try_recv() {
                Ok(text) => {
                    if let Some(message) = RemoteMessage::parse(&text) {
                        self.controller.on_remote(&message, now);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Message feed closed");
                    self.feed = None;
                    break;
                }
            }
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(frame.size());
        render_scene(
            frame,
            chunks[0],
            self.controller.scene(),
            self.controller.overlay_visible(),
        );
        frame.render_widget(Paragraph::new(self.status_line()), chunks[1]);
    }

    fn status_line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        if let Some(link) = &self.link {
            let (text, color) = match link.state() {
                LinkState::Connected => (
                    format!(" Scale: {} ", link.device_name().unwrap_or("?")),
                    Color::Green,
                ),
                LinkState::Connecting => (" Scale: connecting ".to_owned(), Color::Yellow),
                LinkState::Disconnected => (" Scale: disconnected ".to_owned(), Color::Red),
            };
            spans.push(Span::styled(text, Style::default().fg(color)));
        }
        spans.push(Span::raw(if self.feed.is_some() {
            " Feed: attached "
        } else {
            " Feed: none "
        }));
        if let Some(e) = &self.last_error {
            spans.push(Span::styled(
                format!(" {} ", e),
                Style::default().fg(Color::Red),
            ));
        }
        spans.push(Span::styled(
            " <Left>/<Right> navigate  <1-9> select  <c> connect  <d> disconnect  <q> quit",
            Style::default().fg(Color::DarkGray),
        ));
        Line::from(spans)
    }
}

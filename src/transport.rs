//! The duplex character link to the scale.
//!
//! A [`TransportLink`] owns exactly one connection at a time to a device
//! found through an [`Adapter`]. Outbound payloads are cut into chunks of at
//! most [`MTU`] bytes and written one after the other. Inbound bytes are read
//! on a listener thread, decoded to text, and handed back to the owning thread
//! through [`TransportLink::poll`], which is where the registered handlers
//! run. Nothing the handlers touch ever crosses a thread boundary.

use log::{debug, error, info, warn};

use std::{
    borrow::Cow,
    fmt,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc,
    },
    thread::{self, JoinHandle},
};

/// Largest write the BLE-UART characteristic accepts in one go.
pub const MTU: usize = 20;

/// Where the link is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No device attached; writes are refused.
    Disconnected,
    /// Discovery and handshake in progress.
    Connecting,
    /// A device is attached and the listener is running.
    Connected,
}

/// A device the adapter can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Short human-readable name, used for prefix matching.
    pub name: String,
    /// Where the adapter finds the device.
    pub path: PathBuf,
}

impl DeviceInfo {
    /// Names the device after the last component of its path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { name, path }
    }
}

/// Asked to pick one device when several match. Returning `None` cancels the
/// connection attempt.
pub type Chooser = Box<dyn FnMut(Vec<DeviceInfo>) -> Option<DeviceInfo>>;

/// Which device [`TransportLink::connect`] should open.
#[derive(Default)]
pub struct SelectionCriteria {
    path: Option<PathBuf>,
    name_prefix: Option<String>,
    chooser: Option<Chooser>,
}

impl SelectionCriteria {
    /// Matches every device the adapter reports.
    pub fn any() -> Self {
        Self::default()
    }

    /// Only the device at exactly this path.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Only devices whose name starts with `prefix`.
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    /// Lets the user pick when more than one device matches. Without a
    /// chooser the first match wins.
    pub fn with_chooser<F>(mut self, chooser: F) -> Self
    where
        F: FnMut(Vec<DeviceInfo>) -> Option<DeviceInfo> + 'static,
    {
        self.chooser = Some(Box::new(chooser));
        self
    }

    fn matches(&self, device: &DeviceInfo) -> bool {
        let path_ok = self.path.as_ref().map_or(true, |p| *p == device.path);
        let name_ok = self
            .name_prefix
            .as_ref()
            .map_or(true, |prefix| device.name.starts_with(prefix.as_str()));
        path_ok && name_ok
    }

    fn select(&mut self, devices: Vec<DeviceInfo>) -> Option<DeviceInfo> {
        let mut candidates: Vec<DeviceInfo> =
            devices.into_iter().filter(|d| self.matches(d)).collect();
        match (candidates.len(), self.chooser.as_mut()) {
            (0, _) => None,
            (1, _) | (_, None) => Some(candidates.swap_remove(0)),
            (_, Some(chooser)) => chooser(candidates),
        }
    }
}

impl fmt::Debug for SelectionCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionCriteria")
            .field("path", &self.path)
            .field("name_prefix", &self.name_prefix)
            .field("chooser", &self.chooser.is_some())
            .finish()
    }
}

/// Everything that can go wrong on the link. None of these are fatal; the
/// caller reports them and lets the user try again.
#[derive(Debug)]
pub enum LinkError {
    /// No device matched, or the platform cannot enumerate devices at all.
    DeviceUnavailable(String),
    /// A device was found but would not open.
    ConnectionRefused(io::Error),
    /// A write was attempted without a connection.
    NotConnected,
    /// The connection failed while writing.
    Transport(io::Error),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use LinkError as LE;
        let msg = match self {
            LE::DeviceUnavailable(why) => Cow::from(format!("device unavailable: {}", why)),
            LE::ConnectionRefused(error) => Cow::from(format!("connection refused: {}", error)),
            LE::NotConnected => Cow::from("not connected to a device"),
            LE::Transport(error) => Cow::from(format!("transport error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for LinkError {}

/// Discovers and opens devices. One implementation per kind of hardware.
pub trait Adapter {
    /// The open connection this adapter produces.
    type Port: Port;

    /// Lists the devices currently reachable.
    fn discover(&self) -> Result<Vec<DeviceInfo>, LinkError>;

    /// Opens `device`, performing whatever handshake the hardware needs.
    fn open(&self, device: &DeviceInfo) -> Result<Self::Port, LinkError>;
}

/// An open byte channel to a device.
pub trait Port {
    /// Writes one chunk, returning once the transport accepted it.
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// A reading half that can live on the listener thread. Reads should time
    /// out periodically (`TimedOut` or `WouldBlock`) so the listener can
    /// notice a local disconnect; `Ok(0)` means the device went away.
    fn reader(&self) -> io::Result<Box<dyn Read + Send>>;
}

/// Turns raw reads into text without tearing multi-byte characters that
/// straddle two reads.
#[derive(Debug, Default)]
pub struct FragmentDecoder {
    pending: Vec<u8>,
}

impl FragmentDecoder {
    /// Decodes as much of `pending + bytes` as possible. An incomplete UTF-8
    /// sequence at the end is held back for the next call; invalid bytes
    /// become U+FFFD.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    text.push_str(s);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                    }
                }
            }
        }

        text
    }
}

enum LinkEvent {
    Fragment(String),
    Closed,
}

type FragmentHandler = Box<dyn FnMut(&str)>;
type ConnectHandler = Box<dyn FnMut(&DeviceInfo)>;
type DisconnectHandler = Box<dyn FnMut()>;

struct Listener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Listener {
    fn spawn(reader: Box<dyn Read + Send>, tx: Sender<LinkEvent>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let th_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || listen(reader, th_stop, tx));
        Self {
            stop,
            handle: Some(handle),
        }
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Listener thread panicked");
            }
        }
    }
}

fn listen(mut reader: Box<dyn Read + Send>, stop: Arc<AtomicBool>, tx: Sender<LinkEvent>) {
    let mut buffer = [0; 256];
    let mut decoder = FragmentDecoder::default();

    while !stop.load(Ordering::Relaxed) {
        match reader.read(&mut buffer) {
            Ok(0) => {
                debug!("Device closed the link");
                let _ = tx.send(LinkEvent::Closed);
                return;
            }
            Ok(n) => {
                let text = decoder.decode(&buffer[..n]);
                if !text.is_empty() && tx.send(LinkEvent::Fragment(text)).is_err() {
                    return;
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut
                        | io::ErrorKind::WouldBlock
                        | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                warn!("Read from device failed: {}", e);
                let _ = tx.send(LinkEvent::Closed);
                return;
            }
        }
    }
}

/// A connection to one device plus the handlers that react to it.
///
/// Every connection gets its own event channel, so once a connection is torn
/// down nothing its listener produced afterwards can reach the handlers. That
/// is what makes the disconnection handler fire exactly once per disconnect.
pub struct TransportLink<A: Adapter> {
    adapter: A,
    state: LinkState,
    port: Option<A::Port>,
    device: Option<DeviceInfo>,
    events: Option<Receiver<LinkEvent>>,
    listener: Option<Listener>,
    on_fragment: Option<FragmentHandler>,
    on_connect: Option<ConnectHandler>,
    on_disconnect: Option<DisconnectHandler>,
}

impl<A: Adapter> TransportLink<A> {
    /// A disconnected link that will find devices through `adapter`.
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            state: LinkState::Disconnected,
            port: None,
            device: None,
            events: None,
            listener: None,
            on_fragment: None,
            on_connect: None,
            on_disconnect: None,
        }
    }

    /// Handler for decoded inbound text, in arrival order.
    pub fn on_fragment<F: FnMut(&str) + 'static>(&mut self, handler: F) {
        self.on_fragment = Some(Box::new(handler));
    }

    /// Handler called once a connection is up.
    pub fn on_connect<F: FnMut(&DeviceInfo) + 'static>(&mut self, handler: F) {
        self.on_connect = Some(Box::new(handler));
    }

    /// Handler called once for every disconnect, local or remote.
    pub fn on_disconnect<F: FnMut() + 'static>(&mut self, handler: F) {
        self.on_disconnect = Some(Box::new(handler));
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Whether writes are currently allowed.
    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// Name of the connected device, if any.
    pub fn device_name(&self) -> Option<&str> {
        self.device.as_ref().map(|d| d.name.as_str())
    }

    /// Finds a device matching `criteria`, opens it and starts listening.
    ///
    /// An existing connection is closed first.
    pub fn connect(&mut self, mut criteria: SelectionCriteria) -> Result<DeviceInfo, LinkError> {
        if self.state == LinkState::Connected {
            info!("Replacing connection to {:?}", self.device_name());
            self.disconnect();
        }

        self.state = LinkState::Connecting;
        match self.open(&mut criteria) {
            Ok((device, port, reader)) => {
                let (tx, rx) = mpsc::channel();
                self.listener = Some(Listener::spawn(reader, tx));
                self.events = Some(rx);
                self.port = Some(port);
                self.device = Some(device.clone());
                self.state = LinkState::Connected;
                info!("Connected to {}", device.name);

                if let Some(handler) = self.on_connect.as_mut() {
                    handler(&device);
                }
                Ok(device)
            }
            Err(e) => {
                error!("Connection failed: {}", e);
                self.state = LinkState::Disconnected;
                Err(e)
            }
        }
    }

    fn open(
        &mut self,
        criteria: &mut SelectionCriteria,
    ) -> Result<(DeviceInfo, A::Port, Box<dyn Read + Send>), LinkError> {
        debug!("Requesting device matching {:?}", criteria);
        let devices = self.adapter.discover()?;
        let device = criteria.select(devices).ok_or_else(|| {
            LinkError::DeviceUnavailable("no matching device was selected".to_owned())
        })?;

        debug!("Opening {}", device.path.display());
        let port = self.adapter.open(&device)?;
        let reader = port.reader().map_err(LinkError::ConnectionRefused)?;
        Ok((device, port, reader))
    }

    /// Writes `bytes` in chunks of at most [`MTU`], each one accepted before
    /// the next is issued.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let port = match (self.state, self.port.as_mut()) {
            (LinkState::Connected, Some(port)) => port,
            _ => return Err(LinkError::NotConnected),
        };

        for chunk in bytes.chunks(MTU) {
            port.write_chunk(chunk).map_err(|e| {
                warn!("Send failed: {}", e);
                LinkError::Transport(e)
            })?;
        }
        Ok(())
    }

    /// Sends `line` followed by a newline.
    pub fn send_line(&mut self, line: &str) -> Result<(), LinkError> {
        self.send(format!("{}\n", line).as_bytes())
    }

    /// Closes the connection. Calling this while disconnected does nothing.
    pub fn disconnect(&mut self) {
        if self.state == LinkState::Disconnected {
            return;
        }
        self.teardown();
        info!("Disconnected from device");
        self.notify_disconnect();
    }

    /// Dispatches whatever the listener has produced since the last call.
    /// Returns the number of events handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;

        while let Some(rx) = self.events.as_ref() {
            match rx.try_recv() {
                Ok(LinkEvent::Fragment(text)) => {
                    handled += 1;
                    debug!("Fragment {:?}", text);
                    if let Some(handler) = self.on_fragment.as_mut() {
                        handler(&text);
                    }
                }
                Ok(LinkEvent::Closed) => {
                    handled += 1;
                    info!("Device disconnected");
                    self.teardown();
                    self.notify_disconnect();
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Listener died without saying goodbye.
                    warn!("Listener stopped unexpectedly");
                    self.teardown();
                    self.notify_disconnect();
                }
            }
        }

        handled
    }

    fn teardown(&mut self) {
        self.events = None;
        if let Some(mut listener) = self.listener.take() {
            listener.stop();
        }
        self.port = None;
        self.device = None;
        self.state = LinkState::Disconnected;
    }

    fn notify_disconnect(&mut self) {
        if let Some(handler) = self.on_disconnect.as_mut() {
            handler();
        }
    }
}

impl<A: Adapter> Drop for TransportLink<A> {
    fn drop(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            listener.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy_scale::ChannelReader;
    use std::{
        cell::{Cell, RefCell},
        rc::Rc,
        sync::Mutex,
        time::{Duration, Instant},
    };

    type Writes = Arc<Mutex<Vec<Vec<u8>>>>;

    /// Adapter whose inbound side is fed by the test through a channel.
    /// Dropping the sender looks like the device going away.
    struct MockAdapter {
        devices: Vec<DeviceInfo>,
        refuse: bool,
        crash_reads: bool,
        writes: Writes,
        inbound: Mutex<Option<Receiver<Vec<u8>>>>,
    }

    /// A reader whose listener dies before it can report a close.
    struct CrashingReader;

    impl Read for CrashingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            panic!("reader crashed");
        }
    }

    struct MockPort {
        writes: Writes,
        reader: Mutex<Option<Box<dyn Read + Send>>>,
        fail_writes: bool,
    }

    impl MockAdapter {
        fn new(names: &[&str]) -> (Self, Sender<Vec<u8>>) {
            let (tx, rx) = mpsc::channel();
            let adapter = Self {
                devices: names
                    .iter()
                    .map(|n| DeviceInfo::from_path(format!("/dev/{}", n)))
                    .collect(),
                refuse: false,
                crash_reads: false,
                writes: Arc::new(Mutex::new(Vec::new())),
                inbound: Mutex::new(Some(rx)),
            };
            (adapter, tx)
        }
    }

    impl Adapter for MockAdapter {
        type Port = MockPort;

        fn discover(&self) -> Result<Vec<DeviceInfo>, LinkError> {
            Ok(self.devices.clone())
        }

        fn open(&self, _device: &DeviceInfo) -> Result<MockPort, LinkError> {
            if self.refuse {
                return Err(LinkError::ConnectionRefused(io::Error::from(
                    io::ErrorKind::ConnectionRefused,
                )));
            }
            let reader: Box<dyn Read + Send> = match self.inbound.lock().unwrap().take() {
                _ if self.crash_reads => Box::new(CrashingReader),
                Some(rx) => Box::new(ChannelReader::new(rx, Duration::from_millis(5))),
                None => Box::new(io::empty()),
            };
            Ok(MockPort {
                writes: Arc::clone(&self.writes),
                reader: Mutex::new(Some(reader)),
                fail_writes: false,
            })
        }
    }

    impl Port for MockPort {
        fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
            if self.fail_writes {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            self.writes.lock().unwrap().push(chunk.to_vec());
            Ok(())
        }

        fn reader(&self) -> io::Result<Box<dyn Read + Send>> {
            self.reader
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists))
        }
    }

    fn poll_until<A: Adapter>(link: &mut TransportLink<A>, mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() {
            assert!(Instant::now() < deadline, "timed out waiting for link events");
            link.poll();
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn send_splits_into_mtu_chunks_in_order() {
        let (adapter, _tx) = MockAdapter::new(&["scale"]);
        let writes = Arc::clone(&adapter.writes);
        let mut link = TransportLink::new(adapter);
        link.connect(SelectionCriteria::any()).unwrap();

        let payload: Vec<u8> = (0..45).collect();
        link.send(&payload).unwrap();

        let writes = writes.lock().unwrap();
        let sizes: Vec<usize> = writes.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![20, 20, 5]);
        assert_eq!(writes.concat(), payload);
    }

    #[test]
    fn send_line_appends_newline() {
        let (adapter, _tx) = MockAdapter::new(&["scale"]);
        let writes = Arc::clone(&adapter.writes);
        let mut link = TransportLink::new(adapter);
        link.connect(SelectionCriteria::any()).unwrap();

        link.send_line("tare").unwrap();
        assert_eq!(writes.lock().unwrap().concat(), b"tare\n");
    }

    #[test]
    fn send_requires_connection() {
        let (adapter, _tx) = MockAdapter::new(&["scale"]);
        let mut link = TransportLink::new(adapter);
        assert!(matches!(link.send(b"hi"), Err(LinkError::NotConnected)));
    }

    #[test]
    fn write_failure_surfaces_as_transport_error() {
        let (adapter, _tx) = MockAdapter::new(&["scale"]);
        let mut link = TransportLink::new(adapter);
        link.connect(SelectionCriteria::any()).unwrap();
        if let Some(port) = link.port.as_mut() {
            port.fail_writes = true;
        }

        assert!(matches!(link.send(b"hello"), Err(LinkError::Transport(_))));
        assert!(link.is_connected());
    }

    #[test]
    fn listener_dying_silently_counts_as_disconnect() {
        let (mut adapter, _tx) = MockAdapter::new(&["scale"]);
        adapter.crash_reads = true;
        let mut link = TransportLink::new(adapter);
        let disconnects = Rc::new(Cell::new(0));
        let count = disconnects.clone();
        link.on_disconnect(move || count.set(count.get() + 1));

        link.connect(SelectionCriteria::any()).unwrap();
        poll_until(&mut link, || disconnects.get() > 0);

        assert_eq!(link.state(), LinkState::Disconnected);
        assert!(matches!(link.send(b"hi"), Err(LinkError::NotConnected)));
        link.poll();
        link.disconnect();
        assert_eq!(disconnects.get(), 1);
    }

    #[test]
    fn no_matching_device_is_unavailable() {
        let (adapter, _tx) = MockAdapter::new(&["ttyS0", "ttyS1"]);
        let mut link = TransportLink::new(adapter);
        let res = link.connect(SelectionCriteria::any().with_name_prefix("ttyACM"));
        assert!(matches!(res, Err(LinkError::DeviceUnavailable(_))));
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[test]
    fn refused_handshake_leaves_link_disconnected() {
        let (mut adapter, _tx) = MockAdapter::new(&["scale"]);
        adapter.refuse = true;
        let mut link = TransportLink::new(adapter);
        let res = link.connect(SelectionCriteria::any());
        assert!(matches!(res, Err(LinkError::ConnectionRefused(_))));
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[test]
    fn chooser_picks_among_several_matches() {
        let (adapter, _tx) = MockAdapter::new(&["ttyACM0", "ttyACM1", "ttyS0"]);
        let mut link = TransportLink::new(adapter);
        let offered = Rc::new(RefCell::new(Vec::new()));
        let seen = offered.clone();

        let device = link
            .connect(
                SelectionCriteria::any()
                    .with_name_prefix("ttyACM")
                    .with_chooser(move |devices| {
                        seen.borrow_mut().extend(devices.iter().map(|d| d.name.clone()));
                        devices.into_iter().last()
                    }),
            )
            .unwrap();

        assert_eq!(*offered.borrow(), vec!["ttyACM0", "ttyACM1"]);
        assert_eq!(device.name, "ttyACM1");
        assert_eq!(link.device_name(), Some("ttyACM1"));
    }

    #[test]
    fn cancelled_chooser_is_unavailable() {
        let (adapter, _tx) = MockAdapter::new(&["a", "b"]);
        let mut link = TransportLink::new(adapter);
        let res = link.connect(SelectionCriteria::any().with_chooser(|_| None));
        assert!(matches!(res, Err(LinkError::DeviceUnavailable(_))));
    }

    #[test]
    fn explicit_path_selects_device() {
        let (adapter, _tx) = MockAdapter::new(&["a", "b"]);
        let mut link = TransportLink::new(adapter);
        let device = link
            .connect(SelectionCriteria::any().with_path("/dev/b"))
            .unwrap();
        assert_eq!(device.name, "b");
    }

    #[test]
    fn connect_handler_sees_device() {
        let (adapter, _tx) = MockAdapter::new(&["scale"]);
        let mut link = TransportLink::new(adapter);
        let name = Rc::new(RefCell::new(None));
        let sink = name.clone();
        link.on_connect(move |d| *sink.borrow_mut() = Some(d.name.clone()));

        link.connect(SelectionCriteria::any()).unwrap();
        assert_eq!(name.borrow().as_deref(), Some("scale"));
    }

    #[test]
    fn local_disconnect_is_idempotent_and_reported_once() {
        let (adapter, _tx) = MockAdapter::new(&["scale"]);
        let mut link = TransportLink::new(adapter);
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        link.on_disconnect(move || c.set(c.get() + 1));

        link.connect(SelectionCriteria::any()).unwrap();
        link.disconnect();
        link.disconnect();
        link.poll();

        assert_eq!(count.get(), 1);
        assert_eq!(link.state(), LinkState::Disconnected);
        assert!(matches!(link.send(b"x"), Err(LinkError::NotConnected)));
    }

    #[test]
    fn inbound_fragments_reach_handler_in_order() {
        let (adapter, tx) = MockAdapter::new(&["scale"]);
        let mut link = TransportLink::new(adapter);
        let received = Rc::new(RefCell::new(String::new()));
        let sink = received.clone();
        link.on_fragment(move |text| sink.borrow_mut().push_str(text));
        link.connect(SelectionCriteria::any()).unwrap();

        tx.send(b"Weight: 1".to_vec()).unwrap();
        tx.send(b"23.5\nWei".to_vec()).unwrap();
        tx.send(b"ght: 124\n".to_vec()).unwrap();

        let expected = "Weight: 123.5\nWeight: 124\n";
        poll_until(&mut link, || received.borrow().as_str() == expected);
    }

    #[test]
    fn remote_disconnect_is_reported_once() {
        let (adapter, tx) = MockAdapter::new(&["scale"]);
        let mut link = TransportLink::new(adapter);
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        link.on_disconnect(move || c.set(c.get() + 1));
        link.connect(SelectionCriteria::any()).unwrap();

        drop(tx);
        poll_until(&mut link, || count.get() == 1);

        link.disconnect();
        link.poll();
        assert_eq!(count.get(), 1);
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[test]
    fn decoder_passes_ascii_through() {
        let mut decoder = FragmentDecoder::default();
        assert_eq!(decoder.decode(b"Weight: 5\n"), "Weight: 5\n");
    }

    #[test]
    fn decoder_joins_split_multibyte_characters() {
        let bytes = "Gewicht: 5 µg\n".as_bytes();
        let split = bytes.iter().position(|&b| b == 0xC2).unwrap() + 1;

        let mut decoder = FragmentDecoder::default();
        let first = decoder.decode(&bytes[..split]);
        let second = decoder.decode(&bytes[split..]);

        assert_eq!(first, "Gewicht: 5 ");
        assert_eq!(format!("{}{}", first, second), "Gewicht: 5 µg\n");
    }

    #[test]
    fn decoder_replaces_invalid_bytes() {
        let mut decoder = FragmentDecoder::default();
        assert_eq!(decoder.decode(b"a\xFFb"), "a\u{FFFD}b");
    }
}

//! A pretend BLE-UART scale, so the kiosk can be run and tested without the
//! real hardware on the desk.
//!
//! The [`DummyScale`] adapter reports a single device. Opening it starts a
//! thread that simulates someone pouring an ingredient onto the scale: the
//! raw reading climbs from a resting value towards a full load, holds there,
//! drops back, and starts over. Every reading goes out as a `Weight: <n>`
//! line, chopped into randomly sized pieces no larger than the transport
//! MTU, the same way notifications from the real scale arrive.

use crate::transport::{Adapter, DeviceInfo, LinkError, Port, MTU};
use log::debug;
use rand::prelude::*;
use std::{
    io::{self, Read},
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

/// Path the dummy device is reported under.
pub const DUMMY_PATH: &str = "dummy/DummyScale";

/// A blocking [`Read`] over a channel of byte buffers.
///
/// Reads time out after `timeout` with [`io::ErrorKind::TimedOut`], and once
/// every sender is gone they return `Ok(0)`, which is how a closed device
/// looks to the link's listener.
#[derive(Debug)]
pub struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    timeout: Duration,
}

impl ChannelReader {
    /// Wraps `rx`, waiting at most `timeout` per read.
    pub fn new(rx: Receiver<Vec<u8>>, timeout: Duration) -> Self {
        Self {
            rx,
            pending: Vec::new(),
            timeout,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.rx.recv_timeout(self.timeout) {
                Ok(bytes) => self.pending = bytes,
                Err(RecvTimeoutError::Timeout) => return Err(io::ErrorKind::TimedOut.into()),
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// How the simulated pour behaves.
#[derive(Debug, Clone, PartialEq)]
pub struct DummyScale {
    resting: f64,
    load: f64,
    pour_rate: f64,
    hold_ticks: u32,
    noise: f64,
    period: Duration,
}

impl Default for DummyScale {
    fn default() -> Self {
        Self::builder()
    }
}

impl DummyScale {
    /// Starts from the defaults: a 17 kg resting reading (the load cell on
    /// the kiosk is never at zero), 550 g poured at 15 g per reading, ten
    /// readings a second.
    pub fn builder() -> Self {
        DummyScale {
            resting: 17000.0,
            load: 550.0,
            pour_rate: 15.0,
            hold_ticks: 30,
            noise: 0.5,
            period: Duration::from_millis(100),
        }
    }

    /// Raw reading with nothing on the scale.
    pub fn resting(self, resting: f64) -> Self {
        DummyScale { resting, ..self }
    }

    /// How much gets poured before the cycle resets.
    pub fn load(self, load: f64) -> Self {
        DummyScale { load, ..self }
    }

    /// Grams added per reading while pouring.
    pub fn pour_rate(self, pour_rate: f64) -> Self {
        DummyScale { pour_rate, ..self }
    }

    /// Readings spent at full load before resetting.
    pub fn hold_ticks(self, hold_ticks: u32) -> Self {
        DummyScale { hold_ticks, ..self }
    }

    /// Peak of the uniform noise added to each reading.
    pub fn noise(self, noise: f64) -> Self {
        DummyScale { noise, ..self }
    }

    /// Time between readings.
    pub fn period(self, period: Duration) -> Self {
        DummyScale { period, ..self }
    }
}

impl Adapter for DummyScale {
    type Port = DummyScalePort;

    fn discover(&self) -> Result<Vec<DeviceInfo>, LinkError> {
        Ok(vec![DeviceInfo::from_path(DUMMY_PATH)])
    }

    fn open(&self, device: &DeviceInfo) -> Result<DummyScalePort, LinkError> {
        if device.path.to_string_lossy() != DUMMY_PATH {
            return Err(LinkError::ConnectionRefused(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a dummy scale", device.path.display()),
            )));
        }
        Ok(DummyScalePort::start(self.clone()))
    }
}

/// The open connection to a [`DummyScale`]. Dropping it stops the simulation.
pub struct DummyScalePort {
    handle: Option<thread::JoinHandle<()>>,
    stop_tx: Sender<()>,
    reader: Mutex<Option<ChannelReader>>,
    written: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl DummyScalePort {
    fn start(profile: DummyScale) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (data_tx, data_rx) = mpsc::channel::<Vec<u8>>();
        let timeout = profile.period.max(Duration::from_millis(10));

        let handle = thread::spawn(move || {
            let mut rng = thread_rng();
            let mut poured = 0.0;
            let mut held = 0;
            loop {
                if stop_rx.try_recv().is_ok() {
                    break;
                }

                let reading = profile.resting + poured + rng.gen_range(-1.0..=1.0) * profile.noise;
                let line = format!("Weight: {:.1}\n", reading);
                for piece in fragment(line.as_bytes(), &mut rng) {
                    if data_tx.send(piece).is_err() {
                        debug!("Dummy scale reader went away");
                        return;
                    }
                }

                if poured < profile.load {
                    poured = (poured + profile.pour_rate).min(profile.load);
                } else if held < profile.hold_ticks {
                    held += 1;
                } else {
                    poured = 0.0;
                    held = 0;
                }

                spin_sleep::sleep(profile.period);
            }
        });

        DummyScalePort {
            handle: Some(handle),
            stop_tx,
            reader: Mutex::new(Some(ChannelReader::new(data_rx, timeout))),
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every chunk written to the scale so far, in order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.written
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }
}

impl Port for DummyScalePort {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        debug!("Dummy scale received {:?}", String::from_utf8_lossy(chunk));
        self.written
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "dummy scale poisoned"))?
            .push(chunk.to_vec());
        Ok(())
    }

    fn reader(&self) -> io::Result<Box<dyn Read + Send>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "dummy scale poisoned"))?
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::AlreadyExists, "reader already taken"))?;
        Ok(Box::new(reader))
    }
}

impl Drop for DummyScalePort {
    fn drop(&mut self) {
        // The thread also exits on its own once the reader is gone, so a
        // failed send here is fine.
        let _ = self.stop_tx.send(());
        if let Some(thread) = self.handle.take() {
            let _ = thread.join();
        }
    }
}

/// Cuts `bytes` into consecutive pieces of 1..=MTU bytes.
fn fragment<R: Rng>(bytes: &[u8], rng: &mut R) -> Vec<Vec<u8>> {
    let mut pieces = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let n = rng.gen_range(1..=MTU.min(rest.len()));
        let (head, tail) = rest.split_at(n);
        pieces.push(head.to_vec());
        rest = tail;
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_framer::LineFramer;
    use crate::transport::{SelectionCriteria, TransportLink};
    use crate::weight_message_decoder::decode_line;
    use std::{cell::RefCell, rc::Rc, time::Instant};

    #[test]
    fn fragments_reassemble_and_respect_mtu() {
        let mut rng = StdRng::seed_from_u64(7);
        let line = b"Weight: 17123.4\nWeight: 17124.0\n";
        for _ in 0..50 {
            let pieces = fragment(line, &mut rng);
            assert!(pieces.iter().all(|p| !p.is_empty() && p.len() <= MTU));
            assert_eq!(pieces.concat(), line.to_vec());
        }
    }

    #[test]
    fn channel_reader_splits_large_buffers() {
        let (tx, rx) = mpsc::channel();
        let mut reader = ChannelReader::new(rx, Duration::from_millis(10));
        tx.send(b"abcdef".to_vec()).unwrap();

        let mut buf = [0; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");

        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        drop(tx);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn refuses_unknown_paths() {
        let scale = DummyScale::builder();
        let res = scale.open(&DeviceInfo::from_path("/dev/ttyACM0"));
        assert!(matches!(res, Err(LinkError::ConnectionRefused(_))));
    }

    #[test]
    fn writes_are_recorded() {
        let scale = DummyScale::builder().period(Duration::from_millis(5));
        let mut port = scale.open(&DeviceInfo::from_path(DUMMY_PATH)).unwrap();
        port.write_chunk(b"tare").unwrap();
        port.write_chunk(b"\n").unwrap();
        assert_eq!(port.written(), vec![b"tare".to_vec(), b"\n".to_vec()]);
    }

    #[test]
    fn link_and_framer_recover_readings() {
        let scale = DummyScale::builder()
            .resting(100.0)
            .load(50.0)
            .pour_rate(10.0)
            .noise(0.0)
            .period(Duration::from_millis(2));
        let mut link = TransportLink::new(scale);

        let readings = Rc::new(RefCell::new(Vec::new()));
        let sink = readings.clone();
        let framer = Rc::new(RefCell::new(LineFramer::new()));
        framer.borrow_mut().on_line_received(move |line| {
            sink.borrow_mut().push(decode_line(line));
        });
        let feed = framer.clone();
        link.on_fragment(move |text| feed.borrow_mut().feed(text));

        link.connect(SelectionCriteria::any()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while readings.borrow().len() < 6 {
            assert!(Instant::now() < deadline, "dummy scale too slow");
            link.poll();
            thread::sleep(Duration::from_millis(1));
        }
        link.disconnect();

        let readings = readings.borrow();
        assert_eq!(
            readings[..6].to_vec(),
            vec![
                Some(100.0),
                Some(110.0),
                Some(120.0),
                Some(130.0),
                Some(140.0),
                Some(150.0)
            ]
        );
    }
}

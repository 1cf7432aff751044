//! Reassembles the text fragments that come off the BLE-UART link into whole
//! lines.
//!
//! The link delivers whatever the radio happened to pack into a notification,
//! so a single reading like `Weight: 123.5\n` can arrive as `Wei`, `ght: 12`
//! and `3.5\n`. The [`LineFramer`] buffers the pieces and hands every complete,
//! trimmed, non-empty line to its handler exactly once, in arrival order.
//!
//! Lines are terminated by `\n`. A bare `\r` is also accepted, but only after
//! every `\n` in the buffer has been consumed; scales that send `\r\n` still
//! produce one line per reading because the trim removes the stray `\r`.

/// Callback invoked with every complete line.
pub type LineHandler = Box<dyn FnMut(&str)>;

/// Accumulates fragments and emits complete lines.
#[derive(Default)]
pub struct LineFramer {
    buffer: String,
    on_line: Option<LineHandler>,
}

impl LineFramer {
    /// Creates a framer with an empty buffer and no handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler that receives complete lines, replacing any
    /// previous one.
    pub fn on_line_received<F>(&mut self, handler: F)
    where
        F: FnMut(&str) + 'static,
    {
        self.on_line = Some(Box::new(handler));
    }

    /// Appends `fragment` to the buffer and emits every line it completes.
    ///
    /// When this returns the buffer holds no delimiter, only the partial text
    /// of the line still in flight.
    pub fn feed(&mut self, fragment: &str) {
        self.buffer.push_str(fragment);
        self.drain('\n');
        self.drain('\r');
    }

    /// Drops any buffered partial line without emitting it.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// The partial line retained for the next fragment.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    fn drain(&mut self, delimiter: char) {
        while let Some(idx) = self.buffer.find(delimiter) {
            let line = self.buffer[..idx].trim().to_owned();
            self.buffer.drain(..idx + delimiter.len_utf8());

            if line.is_empty() {
                continue;
            }
            // Lines are consumed even with nobody listening, otherwise the
            // buffer would grow for as long as the scale keeps talking.
            if let Some(handler) = self.on_line.as_mut() {
                handler(&line);
            }
        }
    }
}

impl std::fmt::Debug for LineFramer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineFramer")
            .field("buffer", &self.buffer)
            .field("has_handler", &self.on_line.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    fn collecting_framer() -> (LineFramer, Rc<RefCell<Vec<String>>>) {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let sink = lines.clone();
        let mut framer = LineFramer::new();
        framer.on_line_received(move |line| sink.borrow_mut().push(line.to_owned()));
        (framer, lines)
    }

    #[test]
    fn single_line_survives_every_split_point() {
        let input = "  Weight: 123.5 \n";
        for split in 0..=input.len() {
            let (mut framer, lines) = collecting_framer();
            framer.feed(&input[..split]);
            framer.feed(&input[split..]);
            assert_eq!(*lines.borrow(), vec!["Weight: 123.5"], "split at {split}");
            assert_eq!(framer.buffered(), "");
        }
    }

    #[test]
    fn byte_at_a_time_matches_one_shot() {
        let input = "Weight: 123.5\nWeight: 124\n";

        let (mut whole, whole_lines) = collecting_framer();
        whole.feed(input);

        let (mut trickle, trickle_lines) = collecting_framer();
        for c in input.chars() {
            trickle.feed(&c.to_string());
        }

        assert_eq!(*whole_lines.borrow(), vec!["Weight: 123.5", "Weight: 124"]);
        assert_eq!(*whole_lines.borrow(), *trickle_lines.borrow());
    }

    #[test]
    fn two_feeds_match_one_combined_feed() {
        let (mut split, split_lines) = collecting_framer();
        split.feed("Weight: 123.5\n");
        split.feed("Weight: 124\n");

        let (mut combined, combined_lines) = collecting_framer();
        combined.feed("Weight: 123.5\nWeight: 124\n");

        assert_eq!(*split_lines.borrow(), *combined_lines.borrow());
    }

    #[test]
    fn blank_lines_are_dropped() {
        let (mut framer, lines) = collecting_framer();
        framer.feed("\n   \n\t\nWeight: 5\n \n");
        assert_eq!(*lines.borrow(), vec!["Weight: 5"]);
    }

    #[test]
    fn unterminated_text_is_retained() {
        let (mut framer, lines) = collecting_framer();
        framer.feed("Weight: 1");
        assert!(lines.borrow().is_empty());
        assert_eq!(framer.buffered(), "Weight: 1");

        framer.feed("0\n");
        assert_eq!(*lines.borrow(), vec!["Weight: 10"]);
    }

    #[test]
    fn carriage_returns_are_split_after_newlines() {
        let (mut framer, lines) = collecting_framer();
        framer.feed("a\rb\nc\rpartial");
        // The newline pass sees "a\rb" as one line; the \r pass then splits
        // what is left.
        assert_eq!(*lines.borrow(), vec!["a\rb", "c"]);
        assert_eq!(framer.buffered(), "partial");
    }

    #[test]
    fn crlf_yields_one_line_per_reading() {
        let (mut framer, lines) = collecting_framer();
        framer.feed("Weight: 1\r\nWeight: 2\r\n");
        assert_eq!(*lines.borrow(), vec!["Weight: 1", "Weight: 2"]);
    }

    #[test]
    fn clear_discards_partial_line() {
        let (mut framer, lines) = collecting_framer();
        framer.feed("Weight: 99");
        framer.clear();
        framer.feed("Weight: 7\n");
        assert_eq!(*lines.borrow(), vec!["Weight: 7"]);
    }

    #[test]
    fn drains_without_a_handler() {
        let mut framer = LineFramer::new();
        framer.feed("one\ntwo\nthr");
        assert_eq!(framer.buffered(), "thr");
    }
}

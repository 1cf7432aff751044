//! Turns raw scale readings into what the kiosk shows: how much of the
//! current ingredient has been poured, how close that is to the target, and
//! when particular fractions of the target are crossed.
//!
//! Readings are raw load-cell values. A target message tares the session:
//! the latest raw reading becomes the zero reference and the weight shown to
//! the user is measured from there, floored to 10 g steps and never negative.
//!
//! Nothing here touches the screen. Every update returns the
//! [`SessionEvent`]s it caused and the caller decides what to draw.

use crate::weight_message_decoder::decode_line;
use log::{debug, warn};

/// Granularity of the displayed weight, in grams.
pub const DISPLAY_STEP: f64 = 10.0;

/// Something observable that a reading or a new target caused.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A new target arrived and the scale was tared.
    Tared {
        /// What is being weighed now.
        ingredient: String,
        /// Grams to pour.
        target: f64,
    },
    /// The displayed weight was recomputed.
    Progress {
        /// Tared weight, floored to [`DISPLAY_STEP`], never negative.
        visible: f64,
        /// `visible / target`, clamped to `0..=1`; 0 without a target.
        ratio: f64,
    },
    /// The watcher at `ratio` crossed its threshold for this tare cycle.
    ThresholdCrossed {
        /// Fraction of the target the watcher was set at.
        ratio: f64,
    },
    /// The displayed weight reached the target for the first time since the
    /// last tare.
    TargetReached {
        /// Displayed weight at the moment it happened.
        visible: f64,
    },
}

/// Fires once per tare cycle when the reading passes a fraction of the
/// target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Watcher {
    ratio: f64,
    fired_this_cycle: bool,
}

impl Watcher {
    /// Fraction of the target this watcher is set at.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Whether it already fired since the last tare.
    pub fn fired(&self) -> bool {
        self.fired_this_cycle
    }
}

/// Tare, target and threshold state for one scale.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSession {
    offset: f64,
    max_weight: f64,
    current: f64,
    ingredient: Option<String>,
    watchers: Vec<Watcher>,
    target_reached: bool,
}

impl Default for WeightSession {
    /// The kiosk's load cell idles around 17 kg, so that is where the
    /// session starts until the first target arrives.
    fn default() -> Self {
        Self::new(17000.0, 500.0, 17000.0)
    }
}

impl WeightSession {
    /// A session with the given tare reference, target and last reading, and
    /// no watchers.
    pub fn new(offset: f64, max_weight: f64, current: f64) -> Self {
        Self {
            offset,
            max_weight,
            current,
            ingredient: None,
            watchers: Vec::new(),
            target_reached: false,
        }
    }

    /// Replaces the watchers with one per ratio, kept in ascending order.
    /// Ratios outside `0..=1` are skipped.
    pub fn with_watchers(mut self, ratios: &[f64]) -> Self {
        let mut watchers: Vec<Watcher> = ratios
            .iter()
            .filter(|&&ratio| {
                let ok = (0.0..=1.0).contains(&ratio);
                if !ok {
                    warn!("Ignoring watcher ratio {} outside 0..=1", ratio);
                }
                ok
            })
            .map(|&ratio| Watcher {
                ratio,
                fired_this_cycle: false,
            })
            .collect();
        watchers.sort_by(|a, b| a.ratio.total_cmp(&b.ratio));
        self.watchers = watchers;
        self
    }

    /// Tare reference, in raw grams.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Target weight for the current ingredient.
    pub fn max_weight(&self) -> f64 {
        self.max_weight
    }

    /// Last accepted raw reading.
    pub fn current_value(&self) -> f64 {
        self.current
    }

    /// Ingredient named by the last target message.
    pub fn ingredient(&self) -> Option<&str> {
        self.ingredient.as_deref()
    }

    /// The watchers in ascending ratio order.
    pub fn watchers(&self) -> &[Watcher] {
        &self.watchers
    }

    /// `max(0, floor((current - offset) / 10) * 10)`.
    pub fn visible_value(&self) -> f64 {
        (((self.current - self.offset) / DISPLAY_STEP).floor() * DISPLAY_STEP).max(0.0)
    }

    /// How full the progress bar is, `0..=1`. Zero when there is no target.
    pub fn progress_ratio(&self) -> f64 {
        if self.max_weight <= 0.0 {
            return 0.0;
        }
        (self.visible_value() / self.max_weight).clamp(0.0, 1.0)
    }

    /// Starts a new weighing: the target becomes `target`, the latest reading
    /// becomes the zero reference, and every watcher is rearmed.
    ///
    /// A second target before the first one was reached simply replaces it.
    pub fn on_target_set(&mut self, ingredient: &str, target: f64) -> Vec<SessionEvent> {
        let target = if target.is_finite() {
            target
        } else {
            warn!("Target for {} is not a number, treating as 0", ingredient);
            0.0
        };

        self.max_weight = target;
        self.offset = self.current;
        self.ingredient = Some(ingredient.to_owned());
        self.target_reached = false;
        for watcher in self.watchers.iter_mut() {
            watcher.fired_this_cycle = false;
        }

        debug!(
            "Tared at {} for {} g of {}",
            self.offset, self.max_weight, ingredient
        );
        vec![SessionEvent::Tared {
            ingredient: ingredient.to_owned(),
            target,
        }]
    }

    /// Takes a raw reading. Non-finite readings are dropped.
    pub fn on_reading(&mut self, raw: f64) -> Vec<SessionEvent> {
        if !raw.is_finite() {
            warn!("Dropping non-finite reading {}", raw);
            return Vec::new();
        }

        self.current = raw;
        let visible = self.visible_value();
        let mut events = Vec::new();

        for watcher in self.watchers.iter_mut() {
            let threshold = self.offset + watcher.ratio * self.max_weight;
            if !watcher.fired_this_cycle && raw >= threshold {
                watcher.fired_this_cycle = true;
                events.push(SessionEvent::ThresholdCrossed {
                    ratio: watcher.ratio,
                });
            }
        }

        events.push(SessionEvent::Progress {
            visible,
            ratio: self.progress_ratio(),
        });

        if self.max_weight > 0.0 && visible >= self.max_weight && !self.target_reached {
            self.target_reached = true;
            events.push(SessionEvent::TargetReached { visible });
        }

        events
    }

    /// Decodes one framed line and, if it is a reading, applies it.
    pub fn on_line(&mut self, line: &str) -> Vec<SessionEvent> {
        match decode_line(line) {
            Some(raw) => self.on_reading(raw),
            None => {
                debug!("Ignoring line {:?}", line);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATIOS: [f64; 5] = [0.6, 0.7, 0.8, 0.9, 1.0];

    fn crossed(events: &[SessionEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::ThresholdCrossed { ratio } => Some(*ratio),
                _ => None,
            })
            .collect()
    }

    fn progress(events: &[SessionEvent]) -> Option<f64> {
        events.iter().find_map(|e| match e {
            SessionEvent::Progress { visible, .. } => Some(*visible),
            _ => None,
        })
    }

    #[test]
    fn visible_value_is_floored_to_ten() {
        let mut session = WeightSession::new(100.0, 400.0, 100.0);
        let events = session.on_reading(300.0);
        assert_eq!(progress(&events), Some(200.0));

        session.on_reading(309.9);
        assert_eq!(session.visible_value(), 200.0);
        assert_eq!(session.progress_ratio(), 0.5);
    }

    #[test]
    fn visible_value_never_negative() {
        let mut session = WeightSession::new(100.0, 400.0, 100.0);
        let events = session.on_reading(99.0);
        assert_eq!(progress(&events), Some(0.0));
        assert_eq!(session.progress_ratio(), 0.0);
    }

    #[test]
    fn target_set_tares_to_latest_reading() {
        let mut session = WeightSession::default();
        session.on_reading(600.0);
        let events = session.on_target_set("Flour", 550.0);

        assert_eq!(
            events,
            vec![SessionEvent::Tared {
                ingredient: "Flour".to_owned(),
                target: 550.0
            }]
        );
        assert_eq!(session.max_weight(), 550.0);
        assert_eq!(session.offset(), 600.0);
        assert_eq!(session.visible_value(), 0.0);
        assert_eq!(session.ingredient(), Some("Flour"));
    }

    #[test]
    fn each_watcher_fires_once_per_cycle() {
        let mut session = WeightSession::new(0.0, 100.0, 0.0).with_watchers(&RATIOS);

        let fired: Vec<Vec<f64>> = [50.0, 65.0, 75.0, 95.0, 100.0]
            .iter()
            .map(|&w| crossed(&session.on_reading(w)))
            .collect();
        assert_eq!(
            fired,
            vec![vec![], vec![0.6], vec![0.7], vec![0.8, 0.9], vec![1.0]]
        );

        // Going down and up again inside the same cycle refires nothing.
        assert!(crossed(&session.on_reading(10.0)).is_empty());
        assert!(crossed(&session.on_reading(100.0)).is_empty());
        assert!(session.watchers().iter().all(Watcher::fired));
    }

    #[test]
    fn new_target_rearms_watchers() {
        let mut session = WeightSession::new(0.0, 100.0, 0.0).with_watchers(&RATIOS);
        session.on_reading(95.0);

        session.on_reading(0.0);
        session.on_target_set("Water", 100.0);
        assert!(session.watchers().iter().all(|w| !w.fired()));

        let events = session.on_reading(95.0);
        assert_eq!(crossed(&events), vec![0.6, 0.7, 0.8, 0.9]);
    }

    #[test]
    fn watchers_are_kept_sorted_and_valid() {
        let session = WeightSession::default().with_watchers(&[0.9, 1.5, 0.6, -0.1, 0.7]);
        let ratios: Vec<f64> = session.watchers().iter().map(Watcher::ratio).collect();
        assert_eq!(ratios, vec![0.6, 0.7, 0.9]);
    }

    #[test]
    fn target_reached_is_edge_triggered() {
        let mut session = WeightSession::new(0.0, 100.0, 0.0);
        let reached = |events: &[SessionEvent]| {
            events
                .iter()
                .any(|e| matches!(e, SessionEvent::TargetReached { .. }))
        };

        assert!(!reached(&session.on_reading(90.0)));
        assert!(reached(&session.on_reading(104.0)));
        assert!(!reached(&session.on_reading(120.0)));
        assert!(!reached(&session.on_reading(50.0)));
        assert!(!reached(&session.on_reading(110.0)));

        session.on_reading(0.0);
        session.on_target_set("Salt", 10.0);
        assert!(reached(&session.on_reading(10.0)));
    }

    #[test]
    fn zero_target_does_not_divide_or_complete() {
        let mut session = WeightSession::new(0.0, 0.0, 0.0);
        let events = session.on_reading(50.0);
        assert_eq!(
            events.last(),
            Some(&SessionEvent::Progress {
                visible: 50.0,
                ratio: 0.0
            })
        );
    }

    #[test]
    fn non_finite_readings_are_ignored() {
        let mut session = WeightSession::new(0.0, 100.0, 42.0);
        assert!(session.on_reading(f64::NAN).is_empty());
        assert!(session.on_reading(f64::INFINITY).is_empty());
        assert_eq!(session.current_value(), 42.0);
    }

    #[test]
    fn lines_are_decoded_before_use() {
        let mut session = WeightSession::new(17000.0, 500.0, 17000.0);
        assert!(session.on_line("calibrating...").is_empty());
        let events = session.on_line("Weight: 17123.4");
        assert_eq!(progress(&events), Some(120.0));
    }
}

//! The screen state machine that drives every kiosk flow.
//!
//! A flow is a set of [`Screen`]s keyed by an application-defined id type.
//! Exactly one screen is active. Entering a screen loads a fresh [`Scene`],
//! issues a new [`EntryToken`] and runs the screen's entry routine, which
//! binds where "next" and "previous" lead and may schedule deferred steps.
//!
//! Anything that happens later on behalf of a screen (a deferred step, a
//! reaction to a remote message) is tagged with the token it was scheduled
//! under and only delivered while that token is still current. Leaving a
//! screen therefore silences everything it left behind.
//!
//! The controller never looks at the clock. Every entry point takes `now`,
//! so the binaries pass `Instant::now()` and tests pass whatever they like.

use crate::{
    remote::{RemoteMessage, RobotStatus, TargetMessage},
    scene::Scene,
};
use log::{debug, info, warn};
use std::{
    collections::HashMap,
    fmt::Debug,
    hash::Hash,
    mem,
    time::{Duration, Instant},
};

// Transitions requested from entry routines may chain; this bounds the chain.
const MAX_CHAINED_ENTRIES: usize = 16;

/// Generation number issued on every screen entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntryToken(u64);

/// Where "next" and "previous" lead from the active screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bindings<Id> {
    /// Target of [`ScreenController::advance`].
    pub next: Option<Id>,
    /// Target of [`ScreenController::back`].
    pub previous: Option<Id>,
}

impl<Id> Default for Bindings<Id> {
    fn default() -> Self {
        Bindings {
            next: None,
            previous: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Deferred {
    token: EntryToken,
    due: Instant,
    step: u32,
}

/// One screen of a flow.
///
/// Only [`Screen::scene`] and [`Screen::enter`] are required; the rest
/// default to ignoring the input.
pub trait Screen<Id> {
    /// Name of the scene loaded when this screen is entered.
    fn scene(&self) -> &str;

    /// Runs on every entry, with a freshly loaded scene and no bindings.
    fn enter(&mut self, cx: &mut EntryContext<'_, Id>);

    /// A step scheduled with [`EntryContext::defer`] came due.
    fn resume(&mut self, _step: u32, _cx: &mut EntryContext<'_, Id>) {}

    /// A message arrived from the bus.
    fn on_remote(&mut self, _message: &RemoteMessage, _cx: &mut EntryContext<'_, Id>) {}

    /// A line arrived from the connected device.
    fn on_line(&mut self, _line: &str, _cx: &mut EntryContext<'_, Id>) {}

    /// Numbered input `n` (the `1`-`9` keys).
    fn on_action(&mut self, _n: u8, _cx: &mut EntryContext<'_, Id>) {}
}

/// What a screen may touch while handling something.
pub struct EntryContext<'a, Id> {
    now: Instant,
    token: EntryToken,
    bindings: &'a mut Bindings<Id>,
    pending: &'a mut Vec<Deferred>,
    scene: &'a mut Scene,
    outbox: &'a mut Vec<TargetMessage>,
    overlay: &'a mut bool,
    request: Option<Id>,
}

impl<'a, Id: Copy> EntryContext<'a, Id> {
    /// Makes "next" lead to `id`.
    pub fn bind_next(&mut self, id: Id) {
        self.bindings.next = Some(id);
    }

    /// Makes "previous" lead to `id`.
    pub fn bind_previous(&mut self, id: Id) {
        self.bindings.previous = Some(id);
    }

    /// Schedules [`Screen::resume`] with `step` after `delay`, for as long as
    /// this entry stays current.
    pub fn defer(&mut self, delay: Duration, step: u32) {
        self.pending.push(Deferred {
            token: self.token,
            due: self.now + delay,
            step,
        });
    }

    /// Asks for a transition to `id` once the handler returns. The last
    /// request wins.
    pub fn request(&mut self, id: Id) {
        self.request = Some(id);
    }

    /// The active scene.
    pub fn scene(&self) -> &Scene {
        &*self.scene
    }

    /// The active scene, for updating.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut *self.scene
    }

    /// Queues `message` for publishing on the bus.
    pub fn publish(&mut self, message: TargetMessage) {
        self.outbox.push(message);
    }

    /// Shows or hides the modal overlay.
    pub fn set_overlay(&mut self, visible: bool) {
        *self.overlay = visible;
    }
}

#[derive(Debug, Clone)]
struct OverlayCodes {
    show: Vec<RobotStatus>,
    clear: RobotStatus,
}

/// Owns the screens of one flow and routes every input to the active one.
pub struct ScreenController<Id> {
    screens: HashMap<Id, Box<dyn Screen<Id>>>,
    initial: Id,
    active: Id,
    token: EntryToken,
    bindings: Bindings<Id>,
    pending: Vec<Deferred>,
    idle: Option<(Id, Duration)>,
    deadline: Option<Instant>,
    overlay_codes: Option<OverlayCodes>,
    overlay: bool,
    scene: Scene,
    outbox: Vec<TargetMessage>,
}

impl<Id> ScreenController<Id>
where
    Id: Copy + Eq + Hash + Debug + 'static,
{
    /// A controller that will start on `initial`. Nothing is entered until
    /// [`ScreenController::start`].
    pub fn new(initial: Id) -> Self {
        ScreenController {
            screens: HashMap::new(),
            initial,
            active: initial,
            token: EntryToken::default(),
            bindings: Bindings::default(),
            pending: Vec::new(),
            idle: None,
            deadline: None,
            overlay_codes: None,
            overlay: false,
            scene: Scene::default(),
            outbox: Vec::new(),
        }
    }

    /// Registers the screen for `id`, replacing any earlier one.
    pub fn with_screen(mut self, id: Id, screen: impl Screen<Id> + 'static) -> Self {
        self.screens.insert(id, Box::new(screen));
        self
    }

    /// Returns to `idle` after `timeout` without navigation input.
    pub fn with_idle(self, idle: Id, timeout: Duration) -> Self {
        ScreenController {
            idle: Some((idle, timeout)),
            ..self
        }
    }

    /// Robot status codes in `show` raise the overlay and `clear` lowers it.
    pub fn with_overlay_codes(self, show: &[RobotStatus], clear: RobotStatus) -> Self {
        ScreenController {
            overlay_codes: Some(OverlayCodes {
                show: show.to_vec(),
                clear,
            }),
            ..self
        }
    }

    /// Enters the initial screen and arms the inactivity timer.
    pub fn start(&mut self, now: Instant) {
        self.touch(now);
        self.enter(self.initial, now);
    }

    /// The active screen.
    pub fn active(&self) -> Id {
        self.active
    }

    /// Token of the current entry.
    pub fn token(&self) -> EntryToken {
        self.token
    }

    /// Current "next"/"previous" bindings.
    pub fn bindings(&self) -> Bindings<Id> {
        self.bindings
    }

    /// The active scene.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The active scene, for updates that come from outside any screen.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Whether the modal overlay is up.
    pub fn overlay_visible(&self) -> bool {
        self.overlay
    }

    /// Raises or lowers the modal overlay. The active screen is unaffected.
    pub fn set_overlay(&mut self, visible: bool) {
        if self.overlay != visible {
            info!("Overlay {}", if visible { "shown" } else { "hidden" });
        }
        self.overlay = visible;
    }

    /// Drains the messages screens asked to publish.
    pub fn take_outbox(&mut self) -> Vec<TargetMessage> {
        mem::take(&mut self.outbox)
    }

    /// When the earliest pending step is due, if any.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.iter().map(|d| d.due).min()
    }

    /// Makes `id` the active screen and runs its entry routine. Steps the
    /// previous screen deferred are dropped. Returns false, and stays put,
    /// if no screen is registered for `id`.
    pub fn enter(&mut self, id: Id, now: Instant) -> bool {
        let mut id = id;
        for _ in 0..MAX_CHAINED_ENTRIES {
            let Some(screen) = self.screens.get_mut(&id) else {
                warn!("No screen registered for {:?}", id);
                return false;
            };

            self.active = id;
            self.token = EntryToken(self.token.0 + 1);
            self.bindings = Bindings::default();
            self.pending.clear();
            self.scene = Scene::load(screen.scene());
            info!("Entering {:?} ({:?})", id, self.token);

            let mut cx = EntryContext {
                now,
                token: self.token,
                bindings: &mut self.bindings,
                pending: &mut self.pending,
                scene: &mut self.scene,
                outbox: &mut self.outbox,
                overlay: &mut self.overlay,
                request: None,
            };
            screen.enter(&mut cx);

            match cx.request {
                Some(next) => id = next,
                None => return true,
            }
        }
        warn!("Too many chained transitions, staying on {:?}", self.active);
        true
    }

    /// Follows the "next" binding. Returns whether a transition happened.
    pub fn advance(&mut self, now: Instant) -> bool {
        self.touch(now);
        match self.bindings.next {
            Some(id) => self.enter(id, now),
            None => {
                debug!("Nothing bound to next on {:?}", self.active);
                false
            }
        }
    }

    /// Follows the "previous" binding. Returns whether a transition happened.
    pub fn back(&mut self, now: Instant) -> bool {
        self.touch(now);
        match self.bindings.previous {
            Some(id) => self.enter(id, now),
            None => {
                debug!("Nothing bound to previous on {:?}", self.active);
                false
            }
        }
    }

    /// Forwards numbered input `n` to the active screen.
    pub fn action(&mut self, n: u8, now: Instant) {
        self.touch(now);
        self.dispatch(now, |screen, cx| screen.on_action(n, cx));
    }

    /// Handles a bus message. Overlay codes are applied first, then the
    /// message goes to the active screen.
    pub fn on_remote(&mut self, message: &RemoteMessage, now: Instant) {
        let toggle = match (message, &self.overlay_codes) {
            (RemoteMessage::RobotStatus(code), Some(codes)) if codes.show.contains(code) => {
                Some(true)
            }
            (RemoteMessage::RobotStatus(code), Some(codes)) if *code == codes.clear => Some(false),
            _ => None,
        };
        if let Some(visible) = toggle {
            self.set_overlay(visible);
        }

        self.dispatch(now, |screen, cx| screen.on_remote(message, cx));
    }

    /// Forwards a framed device line to the active screen.
    pub fn on_line(&mut self, line: &str, now: Instant) {
        self.dispatch(now, |screen, cx| screen.on_line(line, cx));
    }

    /// Runs every deferred step that is due and enforces the inactivity
    /// timeout.
    pub fn tick(&mut self, now: Instant) {
        let token = self.token;
        self.pending.retain(|d| d.token == token);

        let (mut due, later): (Vec<Deferred>, Vec<Deferred>) =
            self.pending.drain(..).partition(|d| d.due <= now);
        self.pending = later;
        due.sort_by_key(|d| d.due);

        for deferred in due {
            // An earlier step in this batch may have moved us on.
            if deferred.token != self.token {
                debug!("Dropping stale step {} from {:?}", deferred.step, deferred.token);
                continue;
            }
            self.dispatch(now, |screen, cx| screen.resume(deferred.step, cx));
        }

        if let (Some((idle, timeout)), Some(deadline)) = (self.idle, self.deadline) {
            if now >= deadline {
                self.deadline = Some(now + timeout);
                if self.active != idle {
                    info!("No input for {:?}, returning to {:?}", timeout, idle);
                    self.enter(idle, now);
                }
            }
        }
    }

    fn touch(&mut self, now: Instant) {
        if let Some((_, timeout)) = self.idle {
            self.deadline = Some(now + timeout);
        }
    }

    fn dispatch<F>(&mut self, now: Instant, f: F)
    where
        F: FnOnce(&mut (dyn Screen<Id> + 'static), &mut EntryContext<'_, Id>),
    {
        let Some(screen) = self.screens.get_mut(&self.active) else {
            warn!("No screen registered for {:?}", self.active);
            return;
        };

        let mut cx = EntryContext {
            now,
            token: self.token,
            bindings: &mut self.bindings,
            pending: &mut self.pending,
            scene: &mut self.scene,
            outbox: &mut self.outbox,
            overlay: &mut self.overlay,
            request: None,
        };
        f(screen.as_mut(), &mut cx);

        if let Some(id) = cx.request {
            self.enter(id, now);
        }
    }
}

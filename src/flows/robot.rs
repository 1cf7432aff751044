//! The robot assistant walkthrough.
//!
//! A looping video invites people in. From there the robot introduces itself
//! (its text typed out one character at a time), explains how to organize
//! the groceries and where the marker goes, and then waits on the validate
//! screen until the robot reports it is done. The finished screen holds for
//! a moment and goes back to the video, as does five minutes of nobody
//! touching anything.
//!
//! Independently of all that, the robot can ask for help. Its help codes put
//! an overlay over whatever is showing and the clear code takes it away.

use crate::{
    config::RobotConfig,
    remote::{RemoteMessage, RobotStatus},
    screen::{EntryContext, Screen, ScreenController},
};
use log::info;
use std::time::Duration;

/// Main text of a screen.
pub const TEXT: &str = "#Text";
/// Call to action on the video screen.
pub const PROMPT: &str = "#Prompt";
/// The video element.
pub const VIDEO: &str = "#Video";
/// What the validate screen is waiting for.
pub const STATUS: &str = "#Status";

/// Screens of the robot flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RobotScreenId {
    /// Idle loop.
    Video,
    /// Typewriter introduction.
    Intro,
    /// How to organize the groceries.
    Organize,
    /// Where to put the marker.
    Marker,
    /// Waiting for the robot.
    Validate,
    /// Thank you, back to the video shortly.
    Finished,
}

struct Video;

impl Screen<RobotScreenId> for Video {
    fn scene(&self) -> &str {
        "Video"
    }

    fn enter(&mut self, cx: &mut EntryContext<'_, RobotScreenId>) {
        cx.bind_next(RobotScreenId::Intro);
        let scene = cx.scene_mut();
        scene.set_text(VIDEO, "robot.mp4");
        scene.set_text(PROMPT, "Touch to start");
    }
}

/// Reveals `text` one character per step.
struct Intro {
    text: String,
    delay: Duration,
}

impl Intro {
    fn reveal(&self, chars: usize, cx: &mut EntryContext<'_, RobotScreenId>) {
        let shown: String = self.text.chars().take(chars).collect();
        cx.scene_mut().set_text(TEXT, shown);
        if chars < self.text.chars().count() {
            cx.defer(self.delay, chars as u32 + 1);
        }
    }
}

impl Screen<RobotScreenId> for Intro {
    fn scene(&self) -> &str {
        "Intro"
    }

    fn enter(&mut self, cx: &mut EntryContext<'_, RobotScreenId>) {
        cx.bind_next(RobotScreenId::Organize);
        cx.bind_previous(RobotScreenId::Video);
        self.reveal(0, cx);
    }

    fn resume(&mut self, step: u32, cx: &mut EntryContext<'_, RobotScreenId>) {
        self.reveal(step as usize, cx);
    }
}

/// A screen that only shows text and links two neighbours.
struct Info {
    scene: &'static str,
    text: &'static str,
    next: RobotScreenId,
    previous: RobotScreenId,
}

impl Screen<RobotScreenId> for Info {
    fn scene(&self) -> &str {
        self.scene
    }

    fn enter(&mut self, cx: &mut EntryContext<'_, RobotScreenId>) {
        cx.bind_next(self.next);
        cx.bind_previous(self.previous);
        cx.scene_mut().set_text(TEXT, self.text);
    }
}

struct Validate {
    done_code: RobotStatus,
}

impl Screen<RobotScreenId> for Validate {
    fn scene(&self) -> &str {
        "Validate"
    }

    fn enter(&mut self, cx: &mut EntryContext<'_, RobotScreenId>) {
        cx.bind_previous(RobotScreenId::Marker);
        cx.scene_mut()
            .set_text(STATUS, "Waiting for the robot to check your work...");
    }

    fn on_remote(&mut self, message: &RemoteMessage, cx: &mut EntryContext<'_, RobotScreenId>) {
        if *message == RemoteMessage::RobotStatus(self.done_code) {
            info!("Robot reports done");
            cx.request(RobotScreenId::Finished);
        }
    }
}

struct Finished {
    hold: Duration,
}

impl Screen<RobotScreenId> for Finished {
    fn scene(&self) -> &str {
        "Finished"
    }

    fn enter(&mut self, cx: &mut EntryContext<'_, RobotScreenId>) {
        cx.bind_next(RobotScreenId::Video);
        cx.scene_mut().set_text(TEXT, "All done, thank you!");
        cx.defer(self.hold, 0);
    }

    fn resume(&mut self, _step: u32, cx: &mut EntryContext<'_, RobotScreenId>) {
        cx.request(RobotScreenId::Video);
    }
}

/// The robot flow, not yet started.
pub fn build(config: &RobotConfig) -> ScreenController<RobotScreenId> {
    use RobotScreenId as R;

    ScreenController::new(R::Video)
        .with_idle(R::Video, config.inactivity_timeout())
        .with_overlay_codes(&config.help_codes, config.clear_code)
        .with_screen(R::Video, Video)
        .with_screen(
            R::Intro,
            Intro {
                text: config.intro_text.clone(),
                delay: config.typewriter_delay(),
            },
        )
        .with_screen(
            R::Organize,
            Info {
                scene: "Organize",
                text: "Put every item on the shelf with its matching colour.",
                next: R::Marker,
                previous: R::Intro,
            },
        )
        .with_screen(
            R::Marker,
            Info {
                scene: "Marker",
                text: "Place the marker on the last item you put away.",
                next: R::Validate,
                previous: R::Organize,
            },
        )
        .with_screen(
            R::Validate,
            Validate {
                done_code: config.done_code,
            },
        )
        .with_screen(
            R::Finished,
            Finished {
                hold: config.finished_hold(),
            },
        )
}

//! The weighing display: one screen showing what to pour, how much is on the
//! scale, and a bar filling up towards the target.

use crate::{
    config::ScaleConfig,
    remote::RemoteMessage,
    scene::{Scene, BACKGROUND, BAR_TRACK, MOVING_BAR},
    screen::{EntryContext, Screen, ScreenController},
    weight_session::{SessionEvent, WeightSession},
};
use log::info;

/// Name of the ingredient being weighed.
pub const INGREDIENT_NAME: &str = "#IngredientName";
/// Poured weight, as `<grams>gr`.
pub const CURRENT_VALUE: &str = "#CurrentValue";
/// Target weight.
pub const TOTAL_VALUE: &str = "#TotalValue";
/// Shown once the message feed is attached.
pub const WIFI: &str = "#wifi";

const BLACK: &str = "#000000";
const RED: &str = "#FF0000";

/// The only screen of the scale flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleScreenId {
    /// The weighing display.
    Scale,
}

/// Keeps the [WeightSession] and mirrors it onto the scene.
#[derive(Debug, Clone)]
pub struct ScaleScreen {
    session: WeightSession,
    bar_width: f64,
}

impl ScaleScreen {
    /// A screen starting from the configured tare and target.
    pub fn new(config: &ScaleConfig) -> Self {
        ScaleScreen {
            session: WeightSession::new(
                config.initial_offset,
                config.initial_max_weight,
                config.initial_reading,
            )
            .with_watchers(&config.watchers),
            bar_width: config.bar_width,
        }
    }

    /// The session behind the display.
    pub fn session(&self) -> &WeightSession {
        &self.session
    }
}

fn show(events: &[SessionEvent], bar_width: f64, scene: &mut Scene) {
    for event in events {
        match event {
            SessionEvent::Tared { ingredient, target } => {
                scene.set_text(INGREDIENT_NAME, ingredient.as_str());
                scene.set_text(TOTAL_VALUE, target.to_string());
                scene.set_text(CURRENT_VALUE, "0gr");
                scene.set_width(MOVING_BAR, 0.0);
                scene.set_fill(BACKGROUND, BLACK);
            }
            SessionEvent::Progress { visible, ratio } => {
                scene.set_text(CURRENT_VALUE, format!("{}gr", visible));
                scene.set_width(MOVING_BAR, ratio * bar_width);
            }
            SessionEvent::ThresholdCrossed { ratio } => {
                info!("Passed {}% of the target", ratio * 100.0);
            }
            SessionEvent::TargetReached { visible } => {
                info!("Target reached at {} g", visible);
                scene.set_fill(BACKGROUND, RED);
            }
        }
    }
}

impl Screen<ScaleScreenId> for ScaleScreen {
    fn scene(&self) -> &str {
        "Scale"
    }

    fn enter(&mut self, cx: &mut EntryContext<'_, ScaleScreenId>) {
        let scene = cx.scene_mut();
        scene.set_text(INGREDIENT_NAME, self.session.ingredient().unwrap_or("-"));
        scene.set_text(
            CURRENT_VALUE,
            format!("{}gr", self.session.visible_value()),
        );
        scene.set_text(TOTAL_VALUE, self.session.max_weight().to_string());
        scene.set_width(BAR_TRACK, self.bar_width);
        scene.set_width(MOVING_BAR, self.session.progress_ratio() * self.bar_width);
        scene.set_fill(BACKGROUND, BLACK);
        scene.set_visible(WIFI, false);
    }

    fn on_remote(&mut self, message: &RemoteMessage, cx: &mut EntryContext<'_, ScaleScreenId>) {
        if let RemoteMessage::Target(target) = message {
            let events = self
                .session
                .on_target_set(&target.ingredient, target.total_value);
            show(&events, self.bar_width, cx.scene_mut());
        }
    }

    fn on_line(&mut self, line: &str, cx: &mut EntryContext<'_, ScaleScreenId>) {
        let events = self.session.on_line(line);
        show(&events, self.bar_width, cx.scene_mut());
    }
}

/// The scale flow, not yet started.
pub fn build(config: &ScaleConfig) -> ScreenController<ScaleScreenId> {
    ScreenController::new(ScaleScreenId::Scale)
        .with_screen(ScaleScreenId::Scale, ScaleScreen::new(config))
}

/// Marks the message feed as attached.
pub fn show_feed_attached(scene: &mut Scene) {
    scene.set_visible(WIFI, true);
}

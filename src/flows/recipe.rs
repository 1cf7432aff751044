//! The recipe tablet. It walks from an overview to the recipe and then to its
//! steps, where each numbered button sends one ingredient to the scale.

use crate::{
    config::{Ingredient, RecipeConfig},
    remote::TargetMessage,
    screen::{EntryContext, Screen, ScreenController},
};
use log::{debug, info};

/// Heading of every recipe screen.
pub const TITLE: &str = "#Title";
/// The forward button.
pub const BUTTON: &str = "#Button";
/// The back button.
pub const BACK: &str = "#Back";
/// Ingredient summary on the recipe screen.
pub const INGREDIENTS: &str = "#Ingredients";
/// Confirmation after an ingredient was sent.
pub const SENT: &str = "#Sent";

/// Screens of the recipe flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeScreenId {
    /// List of recipes.
    Overview,
    /// The recipe itself.
    Bread,
    /// One button per ingredient.
    BreadSteps,
}

/// Element id of the button for `ingredient`.
pub fn ingredient_button(ingredient: &Ingredient) -> String {
    format!("#{}", ingredient.name)
}

struct Overview {
    dish: String,
}

impl Screen<RecipeScreenId> for Overview {
    fn scene(&self) -> &str {
        "Overview"
    }

    fn enter(&mut self, cx: &mut EntryContext<'_, RecipeScreenId>) {
        cx.bind_next(RecipeScreenId::Bread);
        let scene = cx.scene_mut();
        scene.set_text(TITLE, "Recipes");
        scene.set_text(BUTTON, self.dish.as_str());
    }
}

struct Dish {
    recipe: RecipeConfig,
}

impl Screen<RecipeScreenId> for Dish {
    fn scene(&self) -> &str {
        &self.recipe.name
    }

    fn enter(&mut self, cx: &mut EntryContext<'_, RecipeScreenId>) {
        cx.bind_next(RecipeScreenId::BreadSteps);
        cx.bind_previous(RecipeScreenId::Overview);

        let summary: Vec<String> = self
            .recipe
            .ingredients
            .iter()
            .map(|i| format!("{} {}gr", i.name, i.grams))
            .collect();
        let scene = cx.scene_mut();
        scene.set_text(TITLE, self.recipe.name.as_str());
        scene.set_text(INGREDIENTS, summary.join(", "));
        scene.set_text(BUTTON, "Start");
        scene.set_text(BACK, "Back");
    }
}

struct Steps {
    scene: String,
    ingredients: Vec<Ingredient>,
}

impl Screen<RecipeScreenId> for Steps {
    fn scene(&self) -> &str {
        &self.scene
    }

    fn enter(&mut self, cx: &mut EntryContext<'_, RecipeScreenId>) {
        cx.bind_previous(RecipeScreenId::Bread);
        let scene = cx.scene_mut();
        scene.set_text(BACK, "Back");
        for (n, ingredient) in self.ingredients.iter().enumerate() {
            scene.set_text(
                &ingredient_button(ingredient),
                format!("{}  {} {}gr", n + 1, ingredient.name, ingredient.grams),
            );
        }
        scene.set_visible(SENT, false);
    }

    fn on_action(&mut self, n: u8, cx: &mut EntryContext<'_, RecipeScreenId>) {
        let Some(ingredient) = usize::from(n)
            .checked_sub(1)
            .and_then(|i| self.ingredients.get(i))
        else {
            debug!("No ingredient behind button {}", n);
            return;
        };

        info!("Sending {} {} g to the scale", ingredient.name, ingredient.grams);
        cx.publish(TargetMessage::new(ingredient.name.as_str(), ingredient.grams));
        let scene = cx.scene_mut();
        scene.set_text(SENT, format!("Sent {} to the scale", ingredient.name));
        scene.set_visible(SENT, true);
    }
}

/// The recipe flow for `recipe`, not yet started.
pub fn build(recipe: &RecipeConfig) -> ScreenController<RecipeScreenId> {
    ScreenController::new(RecipeScreenId::Overview)
        .with_screen(
            RecipeScreenId::Overview,
            Overview {
                dish: recipe.name.clone(),
            },
        )
        .with_screen(
            RecipeScreenId::Bread,
            Dish {
                recipe: recipe.clone(),
            },
        )
        .with_screen(
            RecipeScreenId::BreadSteps,
            Steps {
                scene: format!("{}Steps", recipe.name),
                ingredients: recipe.ingredients.clone(),
            },
        )
}

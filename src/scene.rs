//! The retained description of what is on the kiosk display.
//!
//! A scene is a named set of elements addressed by id (`#CurrentValue`,
//! `#MovingBar`, ...). Screens only ever set attributes on elements; the
//! terminal front end decides how to draw them. Elements spring into
//! existence the first time any attribute is set on them.

use std::collections::BTreeMap;

/// Element drawn as a progress bar.
pub const MOVING_BAR: &str = "#MovingBar";
/// Full length the progress bar is measured against.
pub const BAR_TRACK: &str = "#BarTrack";
/// Element whose fill colours the whole display.
pub const BACKGROUND: &str = "#Background";

/// One addressable piece of a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Text content, if the element shows any.
    pub text: Option<String>,
    /// Whether it is drawn at all.
    pub visible: bool,
    /// Fill colour as `#RRGGBB`.
    pub fill: Option<String>,
    /// Width in display units, used for bars.
    pub width: Option<f64>,
}

impl Default for Element {
    fn default() -> Self {
        Element {
            text: None,
            visible: true,
            fill: None,
            width: None,
        }
    }
}

/// A named, ordered collection of [`Element`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    name: String,
    elements: BTreeMap<String, Element>,
}

impl Scene {
    /// An empty scene called `name`. Screens load one of these on entry and
    /// fill it in.
    pub fn load(name: impl Into<String>) -> Self {
        Scene {
            name: name.into(),
            elements: BTreeMap::new(),
        }
    }

    /// The scene's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn element_mut(&mut self, id: &str) -> &mut Element {
        self.elements.entry(id.to_owned()).or_default()
    }

    /// Sets the text of `id`.
    pub fn set_text(&mut self, id: &str, text: impl Into<String>) {
        self.element_mut(id).text = Some(text.into());
    }

    /// Shows or hides `id`.
    pub fn set_visible(&mut self, id: &str, visible: bool) {
        self.element_mut(id).visible = visible;
    }

    /// Sets the fill colour of `id`.
    pub fn set_fill(&mut self, id: &str, fill: impl Into<String>) {
        self.element_mut(id).fill = Some(fill.into());
    }

    /// Negative and non-finite widths are stored as 0.
    pub fn set_width(&mut self, id: &str, width: f64) {
        let width = if width.is_finite() { width.max(0.0) } else { 0.0 };
        self.element_mut(id).width = Some(width);
    }

    /// Looks up an element.
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Text of `id`, if it has any.
    pub fn text(&self, id: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.text.as_deref())
    }

    /// Unknown elements are not visible.
    pub fn is_visible(&self, id: &str) -> bool {
        self.element(id).map_or(false, |e| e.visible)
    }

    /// Fill colour of `id`, if set.
    pub fn fill(&self, id: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.fill.as_deref())
    }

    /// Width of `id`, if set.
    pub fn width(&self, id: &str) -> Option<f64> {
        self.element(id).and_then(|e| e.width)
    }

    /// All elements in id order.
    pub fn elements(&self) -> impl Iterator<Item = (&str, &Element)> {
        self.elements.iter().map(|(id, e)| (id.as_str(), e))
    }
}

use crate::scene::{Scene, BACKGROUND, BAR_TRACK, MOVING_BAR};
use ratatui::{
    prelude::*,
    widgets::{block::Title, *},
};

const OVERLAY_TEXT: &str = "The robot needs a hand. Someone is on the way!";

fn fill_color(scene: &Scene) -> Color {
    scene
        .fill(BACKGROUND)
        .and_then(|fill| fill.parse::<Color>().ok())
        .unwrap_or(Color::Reset)
}

fn gauge_ratio(scene: &Scene) -> Option<f64> {
    if !scene.is_visible(MOVING_BAR) {
        return None;
    }
    let width = scene.width(MOVING_BAR)?;
    let track = scene.width(BAR_TRACK).filter(|t| *t > 0.0)?;
    Some((width / track).clamp(0.0, 1.0))
}

fn centered(area: Rect, width_percent: u16, height: u16) -> Rect {
    // u32 so wide terminals do not overflow
    let width = (u32::from(area.width) * u32::from(width_percent.min(100)) / 100) as u16;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Draws `scene` into `area`: its name as the title, every visible text
/// element on its own line, `#MovingBar` as a gauge along the bottom, and
/// `#Background` as the frame colour. With `overlay` set, a help popup is
/// drawn on top.
pub fn render_scene(frame: &mut Frame, area: Rect, scene: &Scene, overlay: bool) {
    let title = Title::from(Span::styled(
        format!(" {} ", scene.name()),
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    ));
    let block = Block::default()
        .title(title.alignment(Alignment::Center))
        .borders(Borders::ALL)
        .style(Style::default().bg(fill_color(scene)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = scene
        .elements()
        .filter(|(_, e)| e.visible)
        .filter_map(|(id, e)| {
            let text = e.text.as_deref()?;
            Some(Line::from(vec![
                Span::styled(format!("{:<18}", id), Style::default().fg(Color::DarkGray)),
                Span::styled(
                    text.to_owned(),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
            ]))
        })
        .collect();

    let ratio = gauge_ratio(scene);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(if ratio.is_some() { 3 } else { 0 }),
        ])
        .split(inner);

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), chunks[0]);
    if let Some(ratio) = ratio {
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL))
            .gauge_style(Style::default().fg(Color::Magenta))
            .ratio(ratio);
        frame.render_widget(gauge, chunks[1]);
    }

    if overlay {
        let popup = centered(area, 60, 5);
        let block = Block::default()
            .title(Title::from(" Help ".yellow().bold()).alignment(Alignment::Center))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(OVERLAY_TEXT)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block),
            popup,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn draw(scene: &Scene, overlay: bool) -> Terminal<TestBackend> {
        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        terminal
            .draw(|frame| {
                let area = frame.size();
                render_scene(frame, area, scene, overlay)
            })
            .unwrap();
        terminal
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn scale_scene() -> Scene {
        let mut scene = Scene::load("Scale");
        scene.set_text("#IngredientName", "Flour");
        scene.set_text("#CurrentValue", "270gr");
        scene.set_text("#Hidden", "secret");
        scene.set_visible("#Hidden", false);
        scene.set_width(BAR_TRACK, 300.0);
        scene.set_width(MOVING_BAR, 150.0);
        scene.set_fill(BACKGROUND, "#FF0000");
        scene
    }

    #[test]
    fn draws_title_and_visible_text() {
        let text = screen_text(&draw(&scale_scene(), false));
        assert!(text.contains(" Scale "));
        assert!(text.contains("Flour"));
        assert!(text.contains("270gr"));
        assert!(!text.contains("secret"));
        assert!(text.contains("50%"));
        assert!(!text.contains("Help"));
    }

    #[test]
    fn background_colours_the_frame() {
        let terminal = draw(&scale_scene(), false);
        assert_eq!(terminal.backend().buffer().get(1, 1).bg, Color::Rgb(255, 0, 0));
    }

    #[test]
    fn overlay_is_drawn_on_top() {
        let text = screen_text(&draw(&scale_scene(), true));
        assert!(text.contains(" Help "));
    }

    #[test]
    fn popup_fits_very_wide_terminals() {
        let wide = Rect {
            x: 0,
            y: 0,
            width: 2000,
            height: 50,
        };
        let popup = centered(wide, 60, 5);
        assert_eq!(popup, Rect::new(400, 22, 1200, 5));

        let popup = centered(Rect::new(3, 1, 40, 3), 60, 5);
        assert_eq!(popup, Rect::new(11, 1, 24, 3));
    }

    #[test]
    fn no_gauge_without_a_track() {
        let mut scene = Scene::load("Intro");
        scene.set_text("#Text", "Hello");
        scene.set_width(MOVING_BAR, 10.0);
        assert_eq!(gauge_ratio(&scene), None);
        let text = screen_text(&draw(&scene, false));
        assert!(text.contains("Hello"));
        assert!(!text.contains('%'));
    }
}

use std::{io::stdout, time::Duration};

use crate::{gui::error::KioskGuiError, transport::DeviceInfo};

use crossterm::event::{self, KeyCode, KeyEventKind};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
    Terminal,
};

/// Lets the user pick one of `devices` from a list.
///
/// Expects the terminal to already be in raw mode on the alternate screen
/// (see [Tui](crate::gui::Tui)); whatever was drawn before needs a full
/// redraw afterwards. Returns `None` if the user quits or there is nothing to
/// pick from.
pub fn device_selector(mut devices: Vec<DeviceInfo>) -> Result<Option<DeviceInfo>, KioskGuiError> {
    let n_devices = devices.len();
    if n_devices == 0 {
        return Ok(None);
    }

    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut cursor = 0;
    let mut list_state = ListState::default().with_selected(Some(cursor));
    let mut selected = None;
    loop {
        let title = Title::from(" Device Selector ".magenta().bold());
        let instructions = Title::from(Line::from(vec![
            " Navigate ".into(),
            "<Up>/<Down>".magenta().bold(),
            " Select ".into(),
            "<Enter>".magenta().bold(),
            " Quit ".into(),
            "<Q> ".magenta().bold(),
        ]));
        let block = Block::default()
            .title(title.alignment(Alignment::Center))
            .title(
                instructions
                    .alignment(Alignment::Center)
                    .position(Position::Bottom),
            )
            .borders(Borders::ALL);
        let names = devices
            .iter()
            .map(|d| format!("{}  ({})", d.name, d.path.display()));
        let list = List::new(names)
            .style(Style::default().fg(Color::White))
            .highlight_symbol(">>")
            .highlight_style(Style::default().fg(Color::Magenta))
            .block(block);
        list_state.select(Some(cursor));
        terminal.draw(|frame| {
            let area = frame.size();
            frame.render_stateful_widget(list, area, &mut list_state);
        })?;
        if event::poll(Duration::from_millis(16))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Down => {
                            cursor = (cursor + 1) % n_devices;
                        }
                        KeyCode::Up => {
                            cursor = (cursor + n_devices - 1) % n_devices;
                        }
                        KeyCode::Enter => {
                            selected = Some(cursor);
                            break;
                        }
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        _ => {}
                    }
                }
            }
        }
    }

    terminal.clear()?;
    Ok(selected.map(|i| devices.swap_remove(i)))
}

use std::{io::stdout, path::PathBuf};

use crate::gui::error::GuideGuiError;

use crossterm::{
    event::{self, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
    Terminal,
};

/// Ask the user which serial port the sensor bridge is plugged into.
/// Returns `None` if they quit without choosing.
pub fn device_selector(
    mut available_ports: Vec<PathBuf>,
) -> Result<Option<PathBuf>, GuideGuiError> {
    if available_ports.is_empty() {
        return Err(GuideGuiError::NoDevices);
    }

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let selected = pick(&mut terminal, &available_ports);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(selected?.map(|i| available_ports.swap_remove(i)))
}

fn pick<B: Backend>(
    terminal: &mut Terminal<B>,
    available_ports: &[PathBuf],
) -> Result<Option<usize>, GuideGuiError> {
    let n_ports = available_ports.len();
    let mut cursor = 0;
    let mut list_state = ListState::default().with_selected(Some(cursor));
    loop {
        let list = port_list(available_ports);
        list_state.select(Some(cursor));
        terminal.draw(|frame| {
            let area = frame.size();
            frame.render_stateful_widget(list, area, &mut list_state);
        })?;
        if event::poll(std::time::Duration::from_millis(16))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Down => cursor = (cursor + 1) % n_ports,
                        KeyCode::Up => cursor = (cursor + n_ports - 1) % n_ports,
                        KeyCode::Enter => return Ok(Some(cursor)),
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(None),
                        _ => {}
                    }
                }
            }
        }
    }
}

fn port_list(available_ports: &[PathBuf]) -> List<'_> {
    let title = Title::from(" Sensor Bridge ".cyan().bold());
    let instructions = Title::from(Line::from(vec![
        " Navigate ".into(),
        "<Up>/<Down>".cyan().bold(),
        " Select ".into(),
        "<Enter>".cyan().bold(),
        " Quit ".into(),
        "<Q> ".cyan().bold(),
    ]));
    let block = Block::default()
        .title(title.alignment(Alignment::Center))
        .title(
            instructions
                .alignment(Alignment::Center)
                .position(Position::Bottom),
        )
        .borders(Borders::ALL);
    let port_names = available_ports.iter().map(|p| p.to_string_lossy());
    List::new(port_names)
        .style(Style::default().fg(Color::White))
        .highlight_symbol(">>")
        .highlight_style(Style::default().fg(Color::Cyan))
        .block(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    #[test]
    fn lists_every_port() {
        let ports = vec![PathBuf::from("/dev/ttyACM0"), PathBuf::from("/dev/ttyUSB1")];
        let mut terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        let mut state = ListState::default().with_selected(Some(1));
        terminal
            .draw(|frame| {
                let area = frame.size();
                frame.render_stateful_widget(port_list(&ports), area, &mut state);
            })
            .unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("/dev/ttyACM0"));
        assert!(screen.contains(">>/dev/ttyUSB1"));
        assert!(screen.contains("Sensor Bridge"));
    }

    #[test]
    fn empty_port_list_is_an_error() {
        assert!(matches!(
            device_selector(Vec::new()),
            Err(GuideGuiError::NoDevices)
        ));
    }
}

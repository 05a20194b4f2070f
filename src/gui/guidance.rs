//! Terminal rendition of the guidance overlay: a strip of target dots
//! across the viewfinder, the lock ring as a gauge, turn arrows, the footer
//! instruction, and the last still as a ghost down the left edge.

use super::preview::half_block_lines;
use crate::camera_source::{Rgb, StillImage};
use crate::capture_sequencer::{CaptureNode, GuidanceStatus, Phase};
use crate::guidance_overlay::{Instruction, OverlayFrame, TargetMarker, TurnDirection};

use ratatui::{
    prelude::*,
    widgets::{block::Title, *},
};

const CAPTURED_DOT: char = '●';
const ACTIVE_DOT: char = '◎';
const PENDING_DOT: char = '○';
const CROSSHAIR: char = '┼';
const TURN_LEFT: &str = "◀◀ turn left";
const TURN_RIGHT: &str = "turn right ▶▶";
const GHOST_MAX_COLUMNS: u16 = 12;

/// One text row, `width` cells wide, with a dot for every visible target and
/// a crosshair in the middle. Dots win over the crosshair.
pub fn compass_strip(markers: &[TargetMarker], width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let mut cells = vec!['─'; width];
    cells[width / 2] = CROSSHAIR;
    for marker in markers {
        let column = (marker.screen_percent / 100.0 * width as f64).floor();
        if column < 0.0 || column >= width as f64 {
            continue;
        }
        cells[column as usize] = if marker.captured {
            CAPTURED_DOT
        } else if marker.active {
            ACTIVE_DOT
        } else {
            PENDING_DOT
        };
    }
    cells.into_iter().collect()
}

/// Pixels for the ghost strip: the right edge of `image` as it would look
/// stretched across a viewfinder `view_width` wide, cut to the leftmost
/// `width` columns and dimmed.
pub fn ghost_pixels(image: &StillImage, view_width: usize, width: usize, height: usize) -> Vec<Rgb> {
    if view_width == 0 || height == 0 {
        return Vec::new();
    }
    let start = view_width.saturating_sub(width);
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        let src_y = y * image.height / height;
        for x in 0..width {
            let src_x = (start + x) * image.width / view_width;
            let [r, g, b] = image.pixel(src_x, src_y);
            pixels.push([r / 2, g / 2, b / 2]);
        }
    }
    pixels
}

fn turn_line(hint: Option<TurnDirection>) -> Paragraph<'static> {
    match hint {
        Some(TurnDirection::Left) => Paragraph::new(TURN_LEFT.bold()).alignment(Alignment::Left),
        Some(TurnDirection::Right) => Paragraph::new(TURN_RIGHT.bold()).alignment(Alignment::Right),
        None => Paragraph::new(""),
    }
}

fn phase_hint(status: &GuidanceStatus) -> Line<'static> {
    match status.phase {
        Phase::Tutorial => Line::from(vec![
            " Hold the phone upright, then press ".into(),
            "<S>".cyan().bold(),
            " to start ".into(),
        ]),
        Phase::Scanning => Line::from(vec![
            format!(" Node {}/6 ", status.active_index + 1).into(),
            format!(" heading {:>6.1}° ", status.relative_heading_deg).into(),
            format!(" tilt {:>5.1}° ", status.tilt_deg).into(),
            format!(" error {:>6.1}° ", status.angular_error_deg).into(),
        ]),
        Phase::Review => Line::from(vec![
            " Tour complete. Press ".into(),
            "<P>".cyan().bold(),
            " for the 360° preview ".into(),
        ]),
    }
}

/// Draw the whole guidance screen into `area`. `nodes` supplies the ghost
/// still named by the overlay.
pub fn draw_guidance(
    frame: &mut Frame,
    area: Rect,
    status: &GuidanceStatus,
    overlay: &OverlayFrame,
    nodes: &[CaptureNode],
) {
    let title = Title::from(" PanoGuide ".cyan().bold());
    let instructions = Title::from(Line::from(vec![
        " Turn ".into(),
        "<Left>/<Right>".cyan().bold(),
        " Tilt ".into(),
        "<Up>/<Down>".cyan().bold(),
        " Autopilot ".into(),
        "<A>".cyan().bold(),
        " Quit ".into(),
        "<Q> ".cyan().bold(),
    ]));
    let block = Block::default()
        .title(title.alignment(Alignment::Center))
        .title(
            instructions
                .alignment(Alignment::Center)
                .position(block::Position::Bottom),
        )
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let ghost = overlay
        .ghost
        .and_then(|index| nodes.get(index))
        .and_then(|node| node.captured_image.as_ref());
    let ghost_columns = match ghost {
        Some(_) => (inner.width / 6).min(GHOST_MAX_COLUMNS),
        None => 0,
    };
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(ghost_columns), Constraint::Min(0)])
        .split(inner);

    if let Some(image) = ghost {
        let strip = columns[0];
        let width = strip.width as usize;
        let height = strip.height as usize * 2;
        let pixels = ghost_pixels(image, inner.width as usize, width, height);
        frame.render_widget(Paragraph::new(half_block_lines(&pixels, width, height)), strip);
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(columns[1]);

    // Tilt shifts the strip by whole rows, which is as fine as a terminal gets.
    let strip = compass_strip(&overlay.markers, rows[1].width as usize);
    let strip_style = if overlay.horizon_offset_px.abs() > 20.0 {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };
    frame.render_widget(Paragraph::new(strip).style(strip_style), rows[1]);

    if status.phase == Phase::Scanning {
        frame.render_widget(turn_line(overlay.turn_hint), rows[0]);

        let colour = if overlay.steady { Color::Cyan } else { Color::White };
        let progress = overlay.lock_progress.clamp(0.0, 100.0);
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(colour))
            .percent(progress as u16)
            .label(format!("{:.0}%", progress));
        frame.render_widget(gauge, rows[2]);

        let text = match overlay.instruction {
            Instruction::HoldSteady => overlay.instruction.text().cyan().bold(),
            Instruction::Align => overlay.instruction.text().bold(),
        };
        frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), rows[3]);
    }

    frame.render_widget(Paragraph::new(phase_hint(status)), rows[4]);
}

//! The panoramic preview in a terminal. Every cell is an upper half block
//! whose foreground is one pixel and background the pixel below it, which
//! doubles the vertical resolution.

use crate::camera_source::Rgb;
use crate::panoramic_preview::PanoramicPreview;

use ratatui::{
    prelude::*,
    widgets::{block::Title, *},
};

const HALF_BLOCK: &str = "▀";

fn colour(pixel: Rgb) -> Color {
    let [r, g, b] = pixel;
    Color::Rgb(r, g, b)
}

/// Turn a `width * height` pixel grid into text lines, two pixel rows per
/// line. An odd last row is paired with black.
pub fn half_block_lines(pixels: &[Rgb], width: usize, height: usize) -> Vec<Line<'static>> {
    (0..height)
        .step_by(2)
        .map(|y| {
            let spans: Vec<Span<'static>> = (0..width)
                .map(|x| {
                    let top = pixels[y * width + x];
                    let bottom = if y + 1 < height {
                        pixels[(y + 1) * width + x]
                    } else {
                        [0, 0, 0]
                    };
                    Span::styled(HALF_BLOCK, Style::default().fg(colour(top)).bg(colour(bottom)))
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

/// Render the preview's current view to fill `area`.
pub fn draw_preview(frame: &mut Frame, area: Rect, preview: &PanoramicPreview) {
    let view = preview.orientation();
    let title = Title::from(" 360° Preview ".cyan().bold());
    let instructions = Title::from(Line::from(vec![
        " Orbit ".into(),
        "<Arrows>".cyan().bold(),
        " Zoom ".into(),
        "<+>/<->".cyan().bold(),
        format!(" lon {:.0}° lat {:.0}° fov {:.0}° ", view.longitude, view.latitude, view.field_of_view).into(),
        " Back ".into(),
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

    let width = inner.width as usize;
    let height = inner.height as usize * 2;
    let lines = half_block_lines(&preview.render(width, height), width, height);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreviewConfig;
    use ratatui::backend::TestBackend;

    #[test]
    fn pairs_rows_into_cells() {
        let pixels = vec![[255, 0, 0], [0, 255, 0], [0, 0, 255], [9, 9, 9], [1, 2, 3], [4, 5, 6]];
        let lines = half_block_lines(&pixels, 2, 3);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans.len(), 2);
        assert_eq!(lines[0].spans[0].style.fg, Some(Color::Rgb(255, 0, 0)));
        assert_eq!(lines[0].spans[0].style.bg, Some(Color::Rgb(0, 0, 255)));
        assert_eq!(lines[0].spans[1].style.bg, Some(Color::Rgb(9, 9, 9)));
        assert_eq!(lines[1].spans[1].style.fg, Some(Color::Rgb(4, 5, 6)));
        assert_eq!(lines[1].spans[1].style.bg, Some(Color::Rgb(0, 0, 0)));
    }

    #[test]
    fn fills_the_frame() {
        let preview = PanoramicPreview::new(None, &PreviewConfig::default());
        let mut terminal = Terminal::new(TestBackend::new(30, 10)).unwrap();
        terminal
            .draw(|frame| {
                let area = frame.size();
                draw_preview(frame, area, &preview);
            })
            .unwrap();
        let buffer = terminal.backend().buffer();
        // Inside the border every cell is a half block.
        assert_eq!(buffer.get(5, 5).symbol(), HALF_BLOCK);
        assert_eq!(buffer.get(28, 8).symbol(), HALF_BLOCK);
    }
}

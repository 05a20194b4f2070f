//! The 360° review: a captured still wrapped around the inside of an open
//! cylinder, viewed from its axis. Dragging orbits the view, zoom changes
//! the field of view, and a small software ray-caster turns the current
//! view into RGB pixels for whatever surface displays it.

use crate::angle_math::Degree;
use crate::camera_source::{Rgb, StillImage};
use crate::capture_sequencer::TourCapture;
use crate::config::PreviewConfig;
use glam::DVec3;
use log::info;
use std::f64::consts::TAU;

/// Colour of everything the cylinder does not cover.
pub const BACKGROUND: Rgb = [0x11, 0x11, 0x11];

const PLACEHOLDER_WIDTH: usize = 360;
const PLACEHOLDER_HEIGHT: usize = 180;

/// Where the viewer is looking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerOrientation {
    /// Rotation about the vertical axis
    pub longitude: Degree,
    /// Elevation above the horizon, clamped
    pub latitude: Degree,
    /// Vertical field of view
    pub field_of_view: Degree,
}

#[derive(Debug, Clone, Copy)]
struct DragAnchor {
    x: f64,
    y: f64,
    longitude: Degree,
    latitude: Degree,
}

/// Interactive viewer over a finished [`TourCapture`].
pub struct PanoramicPreview {
    config: PreviewConfig,
    orientation: ViewerOrientation,
    drag: Option<DragAnchor>,
    texture: StillImage,
    placeholder: bool,
}

/// A procedural stand-in panorama: a sky gradient over a floor, with a
/// marker post every 30° so orbiting is visible.
pub fn placeholder_texture() -> StillImage {
    StillImage::from_fn(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, |x, y| {
        if x % 30 == 0 {
            return [0xee, 0xee, 0xee];
        }
        if y < PLACEHOLDER_HEIGHT / 2 {
            let shade = (y * 120 / PLACEHOLDER_HEIGHT) as u8;
            [0x30 + shade, 0x60 + shade, 0xc0]
        } else {
            let shade = ((y - PLACEHOLDER_HEIGHT / 2) * 80 / PLACEHOLDER_HEIGHT) as u8;
            [0x50 - shade / 2, 0x44 - shade / 2, 0x3a - shade / 2]
        }
    })
}

impl PanoramicPreview {
    /// Open a preview over `tour`. Only the first still is wrapped around
    /// the cylinder; an empty or missing tour shows the placeholder.
    pub fn new(tour: Option<&TourCapture>, config: &PreviewConfig) -> Self {
        let first = tour.and_then(|tour| tour.images().next().cloned());
        let placeholder = first.is_none();
        if placeholder {
            info!("PanoramicPreview : no captures, showing placeholder.");
        }
        Self {
            config: config.clone(),
            orientation: ViewerOrientation {
                longitude: 0.0,
                latitude: 0.0,
                field_of_view: config.field_of_view_deg,
            },
            drag: None,
            texture: first.unwrap_or_else(placeholder_texture),
            placeholder,
        }
    }

    /// Current view.
    pub fn orientation(&self) -> ViewerOrientation {
        self.orientation
    }

    /// Whether the placeholder is being shown instead of a capture.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// The image wrapped around the cylinder.
    pub fn texture(&self) -> &StillImage {
        &self.texture
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Start a drag at screen position `(x, y)`.
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.drag = Some(DragAnchor {
            x,
            y,
            longitude: self.orientation.longitude,
            latitude: self.orientation.latitude,
        });
    }

    /// Follow the pointer. Moving right turns the view left, as if the
    /// panorama were being grabbed. Ignored when no drag is in progress.
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        let Some(anchor) = self.drag else {
            return;
        };
        let limit = self.config.latitude_limit_deg;
        self.orientation.longitude =
            (anchor.x - x) * self.config.drag_sensitivity + anchor.longitude;
        self.orientation.latitude =
            ((y - anchor.y) * self.config.drag_sensitivity + anchor.latitude).clamp(-limit, limit);
    }

    /// End the drag.
    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    /// Widen (positive) or narrow (negative) the field of view, within the
    /// configured limits.
    pub fn zoom(&mut self, delta: Degree) {
        self.set_field_of_view(self.orientation.field_of_view + delta);
    }

    /// Set the field of view, clamped to the configured limits.
    pub fn set_field_of_view(&mut self, field_of_view: Degree) {
        self.orientation.field_of_view = field_of_view.clamp(
            self.config.min_field_of_view_deg,
            self.config.max_field_of_view_deg,
        );
    }

    /// The point on the viewing sphere the camera looks at.
    pub fn look_target(&self) -> DVec3 {
        let phi = (90.0 - self.orientation.latitude).to_radians();
        let theta = self.orientation.longitude.to_radians();
        self.config.cylinder_radius
            * DVec3::new(
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            )
    }

    /// Render the current view as `width * height` pixels, row-major from
    /// the top left.
    pub fn render(&self, width: usize, height: usize) -> Vec<Rgb> {
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let forward = self.look_target().normalize();
        let right = forward.cross(DVec3::Y).normalize();
        let up = right.cross(forward);
        let half_height = (self.orientation.field_of_view.to_radians() / 2.0).tan();
        let half_width = half_height * width as f64 / height as f64;

        let mut pixels = Vec::with_capacity(width * height);
        for py in 0..height {
            let sy = 1.0 - 2.0 * (py as f64 + 0.5) / height as f64;
            for px in 0..width {
                let sx = 2.0 * (px as f64 + 0.5) / width as f64 - 1.0;
                let ray = forward + right * (sx * half_width) + up * (sy * half_height);
                pixels.push(self.sample_cylinder(ray));
            }
        }
        pixels
    }

    fn sample_cylinder(&self, ray: DVec3) -> Rgb {
        let radial = ray.x.hypot(ray.z);
        if radial <= f64::EPSILON {
            return BACKGROUND;
        }
        let hit = ray * (self.config.cylinder_radius / radial);
        let half_height = self.config.cylinder_height / 2.0;
        if hit.y.abs() > half_height {
            return BACKGROUND;
        }

        let u = (hit.z.atan2(hit.x) / TAU).rem_euclid(1.0);
        let v = 0.5 - hit.y / self.config.cylinder_height;
        let tx = (u * self.texture.width as f64) as usize;
        let ty = (v * self.texture.height as f64) as usize;
        self.texture.pixel(tx, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tour() -> TourCapture {
        let image = StillImage::from_fn(64, 32, |x, y| [x as u8, y as u8, 7]);
        TourCapture {
            frames: vec![(0.0, image)],
        }
    }

    fn close(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn dragging_right_turns_left() {
        let mut preview = PanoramicPreview::new(Some(&tour()), &PreviewConfig::default());
        preview.pointer_down(100.0, 100.0);
        preview.pointer_move(150.0, 100.0);
        assert!((preview.orientation().longitude + 5.0).abs() < 1e-12);
        preview.pointer_move(80.0, 130.0);
        assert!((preview.orientation().longitude - 2.0).abs() < 1e-12);
        assert!((preview.orientation().latitude - 3.0).abs() < 1e-12);
        preview.pointer_up();

        // A second drag starts from where the first one left off.
        preview.pointer_down(0.0, 0.0);
        preview.pointer_move(-10.0, 0.0);
        assert!((preview.orientation().longitude - 3.0).abs() < 1e-12);
    }

    #[test]
    fn latitude_is_clamped() {
        let mut preview = PanoramicPreview::new(Some(&tour()), &PreviewConfig::default());
        preview.pointer_down(0.0, 0.0);
        preview.pointer_move(0.0, 5000.0);
        assert_eq!(preview.orientation().latitude, 85.0);
        preview.pointer_move(0.0, -5000.0);
        assert_eq!(preview.orientation().latitude, -85.0);
    }

    #[test]
    fn moves_without_a_drag_are_ignored() {
        let mut preview = PanoramicPreview::new(None, &PreviewConfig::default());
        preview.pointer_move(300.0, 300.0);
        assert_eq!(preview.orientation().longitude, 0.0);
        assert!(!preview.is_dragging());
    }

    #[test]
    fn zoom_limits() {
        let mut preview = PanoramicPreview::new(None, &PreviewConfig::default());
        assert_eq!(preview.orientation().field_of_view, 75.0);
        preview.zoom(-10.0);
        assert_eq!(preview.orientation().field_of_view, 65.0);
        preview.zoom(-100.0);
        assert_eq!(preview.orientation().field_of_view, 30.0);
        preview.zoom(500.0);
        assert_eq!(preview.orientation().field_of_view, 110.0);
    }

    #[test]
    fn look_target_follows_longitude() {
        let mut preview = PanoramicPreview::new(None, &PreviewConfig::default());
        assert!(close(preview.look_target(), DVec3::new(500.0, 0.0, 0.0)));
        preview.pointer_down(0.0, 0.0);
        preview.pointer_move(-900.0, 0.0);
        assert!(close(preview.look_target(), DVec3::new(0.0, 0.0, 500.0)));
    }

    #[test]
    fn empty_tour_uses_placeholder() {
        let empty = TourCapture { frames: Vec::new() };
        let preview = PanoramicPreview::new(Some(&empty), &PreviewConfig::default());
        assert!(preview.is_placeholder());
        assert_eq!(preview.texture().width, PLACEHOLDER_WIDTH);
        assert!(!PanoramicPreview::new(Some(&tour()), &PreviewConfig::default()).is_placeholder());
    }

    #[test]
    fn render_centre_hits_the_seam() {
        let preview = PanoramicPreview::new(Some(&tour()), &PreviewConfig::default());
        let pixels = preview.render(41, 41);
        assert_eq!(pixels.len(), 41 * 41);
        let centre = pixels[20 * 41 + 20];
        // First column of the still, on the horizon row.
        assert_eq!(centre[0], 0);
        assert!((15..=16).contains(&centre[1]));
        assert_eq!(centre[2], 7);
        assert!(preview.render(0, 10).is_empty());
    }

    #[test]
    fn looking_up_sees_the_open_top() {
        let mut preview = PanoramicPreview::new(Some(&tour()), &PreviewConfig::default());
        preview.set_field_of_view(30.0);
        preview.pointer_down(0.0, 0.0);
        preview.pointer_move(0.0, 850.0);
        let pixels = preview.render(9, 9);
        assert_eq!(pixels[4 * 9 + 4], BACKGROUND);
    }
}

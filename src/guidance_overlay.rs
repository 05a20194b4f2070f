//! Screen-space layout of the guidance overlay: where each target dot sits
//! across the viewfinder, how far the horizon line is pushed by tilt, which
//! way to turn when the target is far off, and what to tell the user.
//! Nothing here draws; renderers (the monitor TUI, a mobile shell) place
//! their widgets from these numbers.

use crate::angle_math::{angular_diff, Degree};
use crate::capture_sequencer::{CaptureNode, GuidanceStatus, Phase};
use crate::config::OverlayConfig;

/// One target dot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetMarker {
    /// Which node this marks
    pub index: usize,
    /// Horizontal position, 0 is the left edge and 100 the right
    pub screen_percent: f64,
    /// Already photographed
    pub captured: bool,
    /// The node currently being aimed at
    pub active: bool,
}

/// Arrow shown beside the reticle when the active target is far off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    /// Target is clockwise of the aim point
    Right,
    /// Target is counter-clockwise of the aim point
    Left,
}

/// Footer line under the reticle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Nothing has accrued yet
    Align,
    /// The lock ring is filling
    HoldSteady,
}

impl Instruction {
    /// Text as shown to the user.
    pub fn text(&self) -> &'static str {
        match self {
            Instruction::Align => "ALIGN CIRCLE WITH DOT",
            Instruction::HoldSteady => "HOLD STEADY...",
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFrame {
    /// Visible target dots, in node order
    pub markers: Vec<TargetMarker>,
    /// Vertical shift of the horizon line and dots
    pub horizon_offset_px: f64,
    /// Fill of the lock ring, 0 to 100
    pub lock_progress: f64,
    /// Ring colour hint
    pub steady: bool,
    /// Turn arrow, only while scanning and off by more than the hint threshold
    pub turn_hint: Option<TurnDirection>,
    /// Node whose still is shown as the alignment ghost: the latest capture
    pub ghost: Option<usize>,
    /// Footer text, chosen by whether the lock has started filling
    pub instruction: Instruction,
}

/// Dots for every target within the visible window of the current heading.
/// Targets outside the window are only hidden; tracking carries on.
pub fn markers(
    status: &GuidanceStatus,
    nodes: &[CaptureNode],
    config: &OverlayConfig,
) -> Vec<TargetMarker> {
    nodes
        .iter()
        .filter_map(|node| {
            let err: Degree = angular_diff(node.target_bearing_deg, status.relative_heading_deg);
            if err.abs() > config.visible_window_deg {
                return None;
            }
            Some(TargetMarker {
                index: node.index,
                screen_percent: 50.0 + err * config.percent_per_deg,
                captured: node.captured_image.is_some(),
                active: status.phase == Phase::Scanning && node.index == status.active_index,
            })
        })
        .collect()
}

/// Vertical displacement of the horizon line for a given tilt.
pub fn horizon_offset(tilt_deg: Degree, config: &OverlayConfig) -> f64 {
    tilt_deg * config.pixels_per_tilt_deg
}

/// Which way to turn towards the active target. `None` when close enough,
/// or when there is no active target.
pub fn turn_hint(
    status: &GuidanceStatus,
    nodes: &[CaptureNode],
    config: &OverlayConfig,
) -> Option<TurnDirection> {
    if status.phase != Phase::Scanning {
        return None;
    }
    let target = nodes.get(status.active_index)?;
    let err = angular_diff(target.target_bearing_deg, status.relative_heading_deg);
    if err.abs() <= config.turn_hint_deg {
        None
    } else if err > 0.0 {
        Some(TurnDirection::Right)
    } else {
        Some(TurnDirection::Left)
    }
}

/// The most recently captured node, if any. Captures land in node order, so
/// this is the highest index holding an image.
pub fn ghost(status: &GuidanceStatus, nodes: &[CaptureNode]) -> Option<usize> {
    if status.phase != Phase::Scanning {
        return None;
    }
    nodes
        .iter()
        .rev()
        .find(|node| node.captured_image.is_some())
        .map(|node| node.index)
}

/// Footer instruction for a given lock progress.
pub fn instruction(lock_progress: f64) -> Instruction {
    if lock_progress > 0.0 {
        Instruction::HoldSteady
    } else {
        Instruction::Align
    }
}

/// Lay out a whole overlay frame.
pub fn compose(
    status: &GuidanceStatus,
    nodes: &[CaptureNode],
    config: &OverlayConfig,
) -> OverlayFrame {
    OverlayFrame {
        markers: markers(status, nodes, config),
        horizon_offset_px: horizon_offset(status.tilt_deg, config),
        lock_progress: status.lock_progress,
        steady: status.steady,
        turn_hint: turn_hint(status, nodes, config),
        ghost: ghost(status, nodes),
        instruction: instruction(status.lock_progress),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_source::StillImage;
    use crate::capture_sequencer::TARGET_BEARINGS;

    fn nodes(captured: usize) -> Vec<CaptureNode> {
        TARGET_BEARINGS
            .iter()
            .enumerate()
            .map(|(index, &target_bearing_deg)| CaptureNode {
                index,
                target_bearing_deg,
                captured_image: (index < captured).then(|| StillImage::from_fn(1, 1, |_, _| [0; 3])),
            })
            .collect()
    }

    fn status(heading: Degree, tilt: Degree, active_index: usize) -> GuidanceStatus {
        GuidanceStatus {
            phase: Phase::Scanning,
            active_index,
            lock_progress: 42.5,
            steady: true,
            relative_heading_deg: heading,
            tilt_deg: tilt,
            angular_error_deg: 0.0,
        }
    }

    #[test]
    fn dot_positions_around_heading() {
        let config = OverlayConfig::default();
        let found = markers(&status(30.0, 0.0, 1), &nodes(1), &config);
        // 0° is 30° left, 60° is 30° right, the rest are out of view.
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].index, 0);
        assert_eq!(found[0].screen_percent, 5.0);
        assert!(found[0].captured);
        assert!(!found[0].active);
        assert_eq!(found[1].index, 1);
        assert_eq!(found[1].screen_percent, 95.0);
        assert!(found[1].active);
        assert!(!found[1].captured);
    }

    #[test]
    fn window_wraps_across_the_seam() {
        let config = OverlayConfig::default();
        let found = markers(&status(-20.0, 0.0, 5), &nodes(5), &config);
        let indices: Vec<usize> = found.iter().map(|m| m.index).collect();
        // -20° sees 300° (-60 is 40° left) and 0° (20° right).
        assert_eq!(indices, vec![0, 5]);
        assert_eq!(found[1].screen_percent, 50.0 - 40.0 * 1.5);
    }

    #[test]
    fn window_edge_is_inclusive() {
        let config = OverlayConfig::default();
        let found = markers(&status(5.0, 0.0, 0), &nodes(0), &config);
        assert!(found.iter().any(|m| m.index == 1));
        let found = markers(&status(4.5, 0.0, 0), &nodes(0), &config);
        assert!(!found.iter().any(|m| m.index == 1));
    }

    #[test]
    fn horizon_follows_tilt() {
        let config = OverlayConfig::default();
        assert_eq!(horizon_offset(-10.0, &config), -40.0);
        let frame = compose(&status(0.0, 2.5, 0), &nodes(0), &config);
        assert_eq!(frame.horizon_offset_px, 10.0);
        assert_eq!(frame.lock_progress, 42.5);
        assert!(frame.steady);
    }

    #[test]
    fn turn_hint_threshold() {
        let config = OverlayConfig::default();
        // Target 1 sits at 60°.
        assert_eq!(turn_hint(&status(45.0, 0.0, 1), &nodes(1), &config), None);
        assert_eq!(turn_hint(&status(75.0, 0.0, 1), &nodes(1), &config), None);
        assert_eq!(
            turn_hint(&status(44.0, 0.0, 1), &nodes(1), &config),
            Some(TurnDirection::Right)
        );
        assert_eq!(
            turn_hint(&status(76.0, 0.0, 1), &nodes(1), &config),
            Some(TurnDirection::Left)
        );
    }

    #[test]
    fn turn_hint_takes_the_short_way_across_the_seam() {
        let config = OverlayConfig::default();
        // Aiming at 300° (-60°) from 170°: 130° further clockwise.
        assert_eq!(
            turn_hint(&status(170.0, 0.0, 5), &nodes(5), &config),
            Some(TurnDirection::Right)
        );
        // From -170° the same target is 110° clockwise.
        assert_eq!(
            turn_hint(&status(-170.0, 0.0, 5), &nodes(5), &config),
            Some(TurnDirection::Right)
        );
        // Target 0° from 170° is 170° clockwise; from 190° (-170°) it is
        // 170° the other way round.
        assert_eq!(
            turn_hint(&status(-170.0, 0.0, 0), &nodes(0), &config),
            Some(TurnDirection::Right)
        );
        assert_eq!(
            turn_hint(&status(170.0, 0.0, 0), &nodes(0), &config),
            Some(TurnDirection::Left)
        );
    }

    #[test]
    fn turn_hint_only_while_scanning() {
        let config = OverlayConfig::default();
        let mut tutorial = status(120.0, 0.0, 0);
        tutorial.phase = Phase::Tutorial;
        assert_eq!(turn_hint(&tutorial, &nodes(0), &config), None);
        let mut review = status(120.0, 0.0, 0);
        review.phase = Phase::Review;
        assert_eq!(turn_hint(&review, &nodes(6), &config), None);
    }

    #[test]
    fn ghost_is_the_latest_capture() {
        assert_eq!(ghost(&status(0.0, 0.0, 0), &nodes(0)), None);
        assert_eq!(ghost(&status(60.0, 0.0, 1), &nodes(1)), Some(0));
        assert_eq!(ghost(&status(240.0, 0.0, 4), &nodes(4)), Some(3));
        let frame = compose(&status(240.0, 0.0, 4), &nodes(4), &OverlayConfig::default());
        assert_eq!(frame.ghost, Some(3));
    }

    #[test]
    fn instruction_follows_lock_progress() {
        assert_eq!(instruction(0.0), Instruction::Align);
        assert_eq!(instruction(2.5), Instruction::HoldSteady);
        let mut still = status(0.0, 0.0, 0);
        still.lock_progress = 0.0;
        still.steady = true;
        let frame = compose(&still, &nodes(0), &OverlayConfig::default());
        assert_eq!(frame.instruction, Instruction::Align);
        assert_eq!(frame.instruction.text(), "ALIGN CIRCLE WITH DOT");
    }

    #[test]
    fn nothing_is_active_outside_scanning() {
        let config = OverlayConfig::default();
        let mut review = status(0.0, 0.0, 0);
        review.phase = Phase::Review;
        assert!(markers(&review, &nodes(6), &config)
            .iter()
            .all(|m| !m.active && m.captured));
    }
}

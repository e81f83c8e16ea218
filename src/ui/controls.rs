use egui::{Color32, ComboBox, RichText, Ui, Vec2};

use crate::backend::MediaBackend;
use crate::player::PlayerState;
use crate::viewer::ViewerControl;

pub const RATE_CHOICES: [f32; 6] = [0.25, 0.5, 1.0, 1.25, 1.5, 2.0];

/// Requests raised from a pane header
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaneAction {
    Open,
    Rate(f32),
}

/// The single toggle bar above the panes.
pub struct PauseAllBar;

impl PauseAllBar {
    /// Returns true when the toggle was clicked.
    pub fn show(ui: &mut Ui, paused: bool) -> bool {
        let mut clicked = false;
        ui.horizontal(|ui| {
            let text = if paused { "▶ Play all" } else { "⏸ Pause all" };
            if ui.button(text).clicked() {
                clicked = true;
            }
        });
        clicked
    }
}

pub struct PaneHeader;

impl PaneHeader {
    pub fn show<B: MediaBackend>(ui: &mut Ui, viewer: &ViewerControl<B>) -> Option<PaneAction> {
        let mut action = None;
        ui.horizontal(|ui| {
            ui.label(RichText::new(state_icon(viewer.state())).monospace());

            let name = viewer
                .file_path()
                .map(|l| l.display_name())
                .unwrap_or_else(|| "No media".to_string());
            ui.label(name)
                .on_hover_text(viewer.file_path().map(|l| l.to_string()).unwrap_or_default());

            if let Some((position, duration)) = viewer.backend().progress() {
                ui.label(format!("{} / {}", format_time(position), format_time(duration)));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Open...").clicked() {
                    action = Some(PaneAction::Open);
                }

                let current = viewer.playback_rate();
                let mut selected = current;
                ComboBox::from_id_salt(("rate", viewer.id().0))
                    .selected_text(format_rate(current))
                    .width(64.0)
                    .show_ui(ui, |ui| {
                        for rate in RATE_CHOICES {
                            ui.selectable_value(&mut selected, rate, format_rate(rate));
                        }
                    });
                if selected != current {
                    action = Some(PaneAction::Rate(selected));
                }
            });
        });
        action
    }
}

/// Shown in a pane with nothing to draw.
pub fn empty_state(ui: &mut Ui, error: Option<&str>) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() / 3.0);
            if let Some(err) = error {
                ui.colored_label(Color32::RED, err);
                ui.add_space(10.0);
            }
            ui.label("Open a file or drop one here");
        });
    });
}

/// Largest size with the video's aspect ratio that fits in `available`.
pub fn fit_size(video: [u32; 2], available: Vec2) -> Vec2 {
    if video[0] == 0 || video[1] == 0 || available.x <= 0.0 || available.y <= 0.0 {
        return Vec2::ZERO;
    }
    let aspect = video[0] as f32 / video[1] as f32;
    if aspect > available.x / available.y {
        Vec2::new(available.x, available.x / aspect)
    } else {
        Vec2::new(available.y * aspect, available.y)
    }
}

fn state_icon(state: PlayerState) -> &'static str {
    match state {
        PlayerState::Playing => "▶",
        PlayerState::Paused => "⏸",
        PlayerState::Stopped => "⏹",
        PlayerState::Ended => "⏏",
    }
}

fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

fn format_rate(rate: f32) -> String {
    format!("{rate}x")
}

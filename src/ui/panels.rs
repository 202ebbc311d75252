use egui::{Context, RichText};

use crate::renderer::FrameStats;
use crate::ui::state::RotationFlags;
use crate::ui::theme::*;

pub const CONTROL_STRIP_HEIGHT: f32 = 56.0;

#[derive(Default)]
pub struct UiActions {
    pub toggle_x: bool,
    pub toggle_y: bool,
    pub toggle_z: bool,
}

/// Draws the three rotation buttons below the scene and returns what was
/// clicked. The scene gets whatever area is left over.
pub fn draw_control_strip(ctx: &Context, flags: RotationFlags, stats: &FrameStats) -> UiActions {
    let mut actions = UiActions::default();

    egui::TopBottomPanel::bottom("rotation_controls")
        .exact_height(CONTROL_STRIP_HEIGHT)
        .frame(egui::Frame::default().fill(BG_PANEL).inner_margin(10.0))
        .show(ctx, |ui| {
            ui.horizontal_centered(|ui| {
                actions.toggle_x = toggle_button(ui, "Toggle X rotation", flags.x, ACCENT_RED);
                actions.toggle_y = toggle_button(ui, "Toggle Y rotation", flags.y, ACCENT_GREEN);
                actions.toggle_z = toggle_button(ui, "Toggle Z rotation", flags.z, ACCENT_BLUE);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(
                        RichText::new(format!(
                            "{:.0} fps  {} skipped",
                            *stats.fps.lock(),
                            stats.skipped()
                        ))
                        .color(TEXT_MUTED)
                        .size(11.0),
                    );
                });
            });
        });

    actions
}

fn toggle_button(ui: &mut egui::Ui, label: &str, active: bool, accent: egui::Color32) -> bool {
    let (fill, text) = if active {
        (accent, TEXT_ON_ACCENT)
    } else {
        (BG_WIDGET, TEXT_PRIMARY)
    };
    ui.add(
        egui::Button::new(RichText::new(label).color(text))
            .fill(fill)
            .min_size(egui::vec2(150.0, 32.0)),
    )
    .clicked()
}

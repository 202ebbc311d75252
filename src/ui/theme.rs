use egui::{Color32, FontFamily, FontId, Rounding, Stroke, Style, TextStyle, Visuals};

pub const BG_PANEL: Color32 = Color32::from_rgb(236, 236, 240);
pub const BG_WIDGET: Color32 = Color32::from_rgb(250, 250, 252);
pub const BG_WIDGET_HOVER: Color32 = Color32::from_rgb(226, 228, 240);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(40, 40, 46);
pub const TEXT_MUTED: Color32 = Color32::from_rgb(110, 110, 118);
pub const TEXT_ON_ACCENT: Color32 = Color32::from_rgb(255, 255, 255);

pub const ACCENT_RED: Color32 = Color32::from_rgb(196, 58, 58);
pub const ACCENT_GREEN: Color32 = Color32::from_rgb(46, 150, 60);
pub const ACCENT_BLUE: Color32 = Color32::from_rgb(64, 92, 206);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(200, 200, 210);

/// Light theme to sit next to the white scene background.
pub fn apply_theme(ctx: &egui::Context) {
    let mut style = Style::default();

    let mut visuals = Visuals::light();
    visuals.override_text_color = Some(TEXT_PRIMARY);
    visuals.panel_fill = BG_PANEL;
    visuals.window_fill = BG_PANEL;

    visuals.widgets.inactive.bg_fill = BG_WIDGET;
    visuals.widgets.inactive.weak_bg_fill = BG_WIDGET;
    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.widgets.inactive.rounding = Rounding::same(4.0);

    visuals.widgets.hovered.bg_fill = BG_WIDGET_HOVER;
    visuals.widgets.hovered.weak_bg_fill = BG_WIDGET_HOVER;
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, ACCENT_BLUE);
    visuals.widgets.hovered.rounding = Rounding::same(4.0);

    visuals.widgets.active.bg_stroke = Stroke::new(2.0, ACCENT_BLUE);
    visuals.widgets.active.rounding = Rounding::same(4.0);

    style.visuals = visuals;

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(8.0, 4.0);

    style.text_styles = [
        (TextStyle::Small, FontId::new(11.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Button, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Heading, FontId::new(18.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(13.0, FontFamily::Monospace)),
    ]
    .into();

    ctx.set_style(style);
}

use crate::state::{FileStatus, LogLevel};
use egui::{Color32, Rounding, Stroke, Style, Vec2};

/// Application theme colors
pub struct Theme;

impl Theme {
    pub const PRIMARY: Color32 = Color32::from_rgb(234, 88, 12); // Orange
    pub const SUCCESS: Color32 = Color32::from_rgb(34, 197, 94); // Green
    pub const ERROR: Color32 = Color32::from_rgb(239, 68, 68); // Red
    pub const WARNING: Color32 = Color32::from_rgb(251, 191, 36); // Yellow
    pub const INFO: Color32 = Color32::from_rgb(59, 130, 246); // Blue

    pub const BG_DARK: Color32 = Color32::from_rgb(24, 24, 27); // Zinc-900
    pub const BG_PANEL: Color32 = Color32::from_rgb(39, 39, 42); // Zinc-800
    pub const BG_HOVER: Color32 = Color32::from_rgb(63, 63, 70); // Zinc-700

    pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(244, 244, 245);
    pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(161, 161, 170);

    pub fn configure(ctx: &egui::Context) {
        let mut style = Style::default();

        style.spacing.item_spacing = Vec2::new(8.0, 6.0);
        style.spacing.button_padding = Vec2::new(12.0, 6.0);
        style.spacing.window_margin = egui::Margin::same(12.0);
        style.spacing.slider_width = 160.0;

        let rounding = Rounding::same(4.0);
        let widgets = &mut style.visuals.widgets;
        for visuals in [
            &mut widgets.noninteractive,
            &mut widgets.inactive,
            &mut widgets.hovered,
            &mut widgets.active,
        ] {
            visuals.rounding = rounding;
        }

        widgets.noninteractive.bg_fill = Self::BG_PANEL;
        widgets.noninteractive.bg_stroke = Stroke::new(1.0, Self::BG_HOVER);
        widgets.inactive.bg_fill = Self::BG_PANEL;
        widgets.inactive.weak_bg_fill = Self::BG_HOVER;
        widgets.hovered.weak_bg_fill = Self::BG_HOVER;
        widgets.hovered.bg_stroke = Stroke::new(1.5, Self::PRIMARY);
        widgets.active.bg_fill = Self::PRIMARY;
        widgets.active.weak_bg_fill = Self::PRIMARY;

        style.visuals.dark_mode = true;
        style.visuals.override_text_color = Some(Self::TEXT_PRIMARY);
        style.visuals.panel_fill = Self::BG_PANEL;
        style.visuals.extreme_bg_color = Self::BG_DARK;
        style.visuals.window_fill = Self::BG_PANEL;
        style.visuals.window_rounding = Rounding::same(6.0);
        style.visuals.selection.bg_fill = Self::PRIMARY.linear_multiply(0.35);
        style.visuals.selection.stroke = Stroke::new(1.0, Self::PRIMARY);

        ctx.set_style(style);
    }

    pub fn status_color(status: FileStatus) -> Color32 {
        match status {
            FileStatus::Pending => Self::TEXT_SECONDARY,
            FileStatus::Processing => Self::INFO,
            FileStatus::Converted => Self::SUCCESS,
            FileStatus::Skipped => Self::WARNING,
            FileStatus::Failed => Self::ERROR,
            FileStatus::Cancelled => Self::TEXT_SECONDARY,
        }
    }

    pub fn status_icon(status: FileStatus) -> &'static str {
        match status {
            FileStatus::Pending => "⏸",
            FileStatus::Processing => "⏳",
            FileStatus::Converted => "✓",
            FileStatus::Skipped => "–",
            FileStatus::Failed => "✗",
            FileStatus::Cancelled => "⏹",
        }
    }

    pub fn log_color(level: LogLevel) -> Color32 {
        match level {
            LogLevel::Info => Self::TEXT_SECONDARY,
            LogLevel::Success => Self::SUCCESS,
            LogLevel::Warning => Self::WARNING,
            LogLevel::Error => Self::ERROR,
        }
    }
}

use crate::state::LogBuffer;
use crate::theme::Theme;
use egui::{Response, RichText, ScrollArea, Sense, Stroke, Ui, Vec2};
use tojpeg_common::{Suffix, SUPPORTED_EXTENSIONS};
use tojpeg_core::{BatchProgress, Quality, QualitySettings};

/// File drop zone; click to open the file picker
pub fn drop_zone(ui: &mut Ui, hovering_files: bool) -> Response {
    let desired_size = Vec2::new(ui.available_width(), 110.0);
    let (rect, response) = ui.allocate_exact_size(desired_size, Sense::click());

    if ui.is_rect_visible(rect) {
        let active = hovering_files || response.hovered();
        let (fill, stroke) = if active {
            (Theme::PRIMARY.linear_multiply(0.15), Stroke::new(2.0, Theme::PRIMARY))
        } else {
            (Theme::BG_PANEL, Stroke::new(1.5, Theme::BG_HOVER))
        };

        let painter = ui.painter();
        painter.rect_filled(rect, 8.0, fill);
        painter.rect_stroke(rect.shrink(1.0), 8.0, stroke);

        let text = if hovering_files {
            "Release to add files"
        } else {
            "Drop images or folders here, or click to browse"
        };
        painter.text(
            rect.center() - Vec2::new(0.0, 10.0),
            egui::Align2::CENTER_CENTER,
            text,
            egui::FontId::proportional(15.0),
            if active { Theme::PRIMARY } else { Theme::TEXT_SECONDARY },
        );

        painter.text(
            rect.center() + Vec2::new(0.0, 14.0),
            egui::Align2::CENTER_CENTER,
            supported_hint(),
            egui::FontId::proportional(11.0),
            Theme::TEXT_SECONDARY.linear_multiply(0.7),
        );
    }

    response
}

fn supported_hint() -> String {
    let list: Vec<String> = SUPPORTED_EXTENSIONS.iter().map(|e| e.to_uppercase()).collect();
    format!("Supported: {}", list.join(", "))
}

/// Quality presets plus a slider for anything in between
pub fn quality_selector(ui: &mut Ui, quality: &mut QualitySettings) -> bool {
    let mut changed = false;

    ui.label("JPEG Quality");
    ui.add_space(4.0);

    ui.horizontal_wrapped(|ui| {
        ui.spacing_mut().item_spacing.x = 6.0;
        for preset in QualitySettings::PRESETS {
            let text = format!("{} ({})", preset.label(), preset.jpeg_quality());
            if ui.selectable_label(*quality == preset, text).clicked() {
                *quality = preset;
                changed = true;
            }
        }
    });

    ui.add_space(4.0);

    let mut value = quality.jpeg_quality().value();
    if ui
        .add(egui::Slider::new(&mut value, Quality::MIN..=Quality::MAX).text("quality"))
        .changed()
    {
        *quality = QualitySettings::from_quality(Quality::from(value));
        changed = true;
    }

    changed
}

/// Single-line suffix editor that flags invalid input in red
pub fn suffix_field(ui: &mut Ui, text: &mut String, width: f32) -> Response {
    let problem = Suffix::validate(text.trim()).err();

    let mut edit = egui::TextEdit::singleline(text)
        .hint_text("suffix")
        .desired_width(width);
    if problem.is_some() {
        edit = edit.text_color(Theme::ERROR);
    }

    let response = ui.add(edit);
    match problem {
        Some(problem) => response.on_hover_text(format!("Suffix {problem}; it will be cleaned up on Convert")),
        None => response,
    }
}

pub fn progress_bar(ui: &mut Ui, progress: &BatchProgress) {
    if progress.total == 0 {
        return;
    }

    ui.horizontal(|ui| {
        ui.label(
            RichText::new(format!("Converting {} of {}", progress.completed, progress.total))
                .size(13.0),
        );

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(
                RichText::new(format!("{:.0}%", progress.percentage()))
                    .size(13.0)
                    .color(Theme::PRIMARY),
            );
        });
    });

    ui.add(
        egui::ProgressBar::new(progress.fraction())
            .animate(true)
            .desired_width(ui.available_width())
            .desired_height(8.0),
    );

    if let Some(current) = progress.current_file.as_ref().and_then(|p| p.file_name()) {
        ui.label(
            RichText::new(current.to_string_lossy())
                .size(11.0)
                .color(Theme::TEXT_SECONDARY),
        );
    }
}

/// Scrolling log view, pinned to the newest line
pub fn log_view(ui: &mut Ui, log: &LogBuffer, height: f32) {
    ScrollArea::vertical()
        .id_salt("log_view")
        .max_height(height)
        .auto_shrink([false, true])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for line in log.lines() {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(line.time.format("%H:%M:%S").to_string())
                            .monospace()
                            .size(11.0)
                            .color(Theme::TEXT_SECONDARY),
                    );
                    ui.label(
                        RichText::new(&line.text)
                            .size(12.0)
                            .color(Theme::log_color(line.level)),
                    );
                });
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_hint_lists_formats() {
        let hint = supported_hint();
        for ext in ["PNG", "JPG", "WEBP", "GIF"] {
            assert!(hint.contains(ext), "{hint}");
        }
    }
}

use crate::cli::Args;
use crate::config::AppConfig;
use crate::preview::{self, ThumbnailCache, ThumbnailState, THUMB_HEIGHT, THUMB_WIDTH};
use crate::state::{AppState, FileRow, LogLevel, ProcessingState};
use crate::theme::Theme;
use crate::widgets;
use egui::{CentralPanel, RichText, ScrollArea, SidePanel, TopBottomPanel, Vec2};
use rfd::{MessageButtons, MessageDialog, MessageLevel};
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::Duration;
use tojpeg_common::{default_output_dir, Error, SUPPORTED_EXTENSIONS};
use tojpeg_core::batch::MAX_WORKERS;
use tojpeg_core::{BatchProcessor, BatchReport, CancelToken, ProgressEvent, QualitySettings};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

/// Failures listed by name in the completion dialog
const MAX_LISTED_PROBLEMS: usize = 10;

/// The batch currently running on its own thread
struct Worker {
    events: UnboundedReceiver<ProgressEvent>,
    cancel: CancelToken,
    handle: Option<JoinHandle<BatchReport>>,
}

enum RowAction {
    None,
    Remove,
}

pub struct ToJpegApp {
    state: AppState,
    config: AppConfig,
    thumbnails: ThumbnailCache,
    worker: Option<Worker>,
}

impl ToJpegApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        args: Args,
        log_dir: Option<PathBuf>,
    ) -> Self {
        Theme::configure(&cc.egui_ctx);

        let mut state = AppState::from_config(&config);
        if let Some(dir) = &args.output_dir {
            state.output_dir = dir.display().to_string();
        }
        if let Some(quality) = args.quality {
            state.quality = QualitySettings::from_quality(quality.into());
        }
        if let Some(dir) = log_dir {
            state.log.push(LogLevel::Info, format!("Log folder: {}", dir.display()));
        }
        if !args.files.is_empty() {
            state.add_paths(args.files);
        }

        Self {
            state,
            config,
            thumbnails: ThumbnailCache::default(),
            worker: None,
        }
    }

    fn render_top_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading(RichText::new("tojpeg").size(20.0));
            ui.label(
                RichText::new(format!("v{}", env!("CARGO_PKG_VERSION")))
                    .size(12.0)
                    .color(Theme::TEXT_SECONDARY),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let count = self.state.files.len();
                ui.label(
                    RichText::new(format!("{} file(s) queued", count))
                        .size(13.0)
                        .color(Theme::TEXT_SECONDARY),
                );
            });
        });
    }

    fn render_output_settings(&mut self, ui: &mut egui::Ui) {
        ui.label(RichText::new("Output Folder").size(14.0));
        ui.add_space(4.0);

        ui.add(
            egui::TextEdit::singleline(&mut self.state.output_dir)
                .hint_text("Folder for the JPEG files")
                .desired_width(f32::INFINITY),
        );

        ui.horizontal(|ui| {
            if ui.button("Browse").clicked() {
                let mut dialog = rfd::FileDialog::new();
                let current = PathBuf::from(self.state.output_dir.trim());
                if current.is_dir() {
                    dialog = dialog.set_directory(&current);
                }
                if let Some(dir) = dialog.pick_folder() {
                    self.state.output_dir = dir.display().to_string();
                }
            }

            if ui.button("Reset to Default").clicked() {
                self.state.output_dir = default_output_dir().display().to_string();
            }
        });
    }

    fn render_conversion_settings(&mut self, ui: &mut egui::Ui) {
        egui::Frame::group(ui.style())
            .inner_margin(egui::Margin::same(10.0))
            .show(ui, |ui| {
                widgets::quality_selector(ui, &mut self.state.quality);

                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    ui.label("Background");
                    ui.color_edit_button_srgb(&mut self.state.background.0)
                        .on_hover_text("Fill color for transparent pixels");
                    ui.label(
                        RichText::new(self.state.background.to_hex())
                            .monospace()
                            .color(Theme::TEXT_SECONDARY),
                    );
                });

                ui.add_space(6.0);
                ui.checkbox(&mut self.state.overwrite_all, "Overwrite existing files")
                    .on_hover_text("Off: existing files are kept and new ones get _1, _2, ...");

                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    ui.label("Default suffix");
                    widgets::suffix_field(ui, &mut self.state.default_suffix, 110.0);
                });

                ui.add_space(6.0);
                ui.add(
                    egui::Slider::new(&mut self.state.workers, 0..=MAX_WORKERS)
                        .text("workers (0 = auto)"),
                );
            });
    }

    fn render_drop_zone(&mut self, ui: &mut egui::Ui) {
        let hovering = ui.ctx().input(|i| !i.raw.hovered_files.is_empty());
        let response = widgets::drop_zone(ui, hovering && !self.state.is_running());

        if response.clicked() && !self.state.is_running() {
            if let Some(paths) = rfd::FileDialog::new()
                .add_filter("Images", SUPPORTED_EXTENSIONS)
                .pick_files()
            {
                self.state.add_paths(paths);
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });

        if dropped.is_empty() {
            return;
        }

        if self.state.is_running() {
            self.state
                .log
                .push(LogLevel::Warning, "Ignoring dropped files while converting");
        } else {
            self.state.add_paths(dropped);
        }
    }

    fn render_file_list(&mut self, ui: &mut egui::Ui) {
        let running = self.state.is_running();

        ui.horizontal(|ui| {
            let has_selection = self.state.has_selection();
            if ui
                .add_enabled(!running && has_selection, egui::Button::new("Remove Selected"))
                .clicked()
            {
                let removed = self.state.remove_selected();
                tracing::debug!("Removed {} selected file(s)", removed);
            }

            if ui
                .add_enabled(!running && !self.state.files.is_empty(), egui::Button::new("Clear All"))
                .clicked()
            {
                self.state.clear_files();
                self.thumbnails.clear();
            }
        });

        ui.add_space(6.0);

        if self.state.files.is_empty() {
            ui.add_space(30.0);
            ui.vertical_centered(|ui| {
                ui.label(
                    RichText::new("No files queued")
                        .size(14.0)
                        .color(Theme::TEXT_SECONDARY),
                );
            });
            return;
        }

        let mut remove = None;
        ScrollArea::vertical()
            .id_salt("file_list")
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                let count = self.state.files.len();
                for (idx, row) in self.state.files.iter_mut().enumerate() {
                    if let RowAction::Remove = file_row(ui, row, &mut self.thumbnails, running) {
                        remove = Some(idx);
                    }
                    if idx + 1 < count {
                        ui.separator();
                    }
                }
            });

        if let Some(idx) = remove {
            self.state.remove_file(idx);
        }
    }

    fn render_progress(&mut self, ui: &mut egui::Ui) {
        match &self.state.processing {
            ProcessingState::Idle => {}
            ProcessingState::Running { progress } => widgets::progress_bar(ui, progress),
            ProcessingState::Done { summary } => {
                ui.label(RichText::new(summary).size(13.0).color(Theme::SUCCESS));
            }
        }
    }

    fn render_action_buttons(&mut self, ui: &mut egui::Ui) {
        let running = self.worker.is_some();

        ui.horizontal(|ui| {
            let convert = egui::Button::new(RichText::new("Convert").size(14.0))
                .fill(if running { Theme::BG_HOVER } else { Theme::PRIMARY })
                .min_size(Vec2::new(120.0, 30.0));
            if ui.add_enabled(!running, convert).clicked() {
                self.start_conversion();
            }

            let cancel = egui::Button::new(RichText::new("Cancel").size(14.0)).min_size(Vec2::new(100.0, 30.0));
            if ui.add_enabled(running, cancel).clicked() {
                self.cancel_conversion();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(!self.state.log.is_empty(), egui::Button::new("Clear Log"))
                    .clicked()
                {
                    self.state.log.clear();
                }
            });
        });
    }

    fn start_conversion(&mut self) {
        if self.worker.is_some() {
            return;
        }

        let job = self.state.build_job();
        if let Err(e) = job.validate() {
            match e {
                Error::EmptyJob => {
                    self.state
                        .log
                        .push(LogLevel::Warning, "Nothing to convert: add some images first");
                    show_dialog(MessageLevel::Warning, "Nothing to convert", "Add some images first.");
                }
                e => {
                    tracing::error!("Output folder rejected: {}", e);
                    self.state.log.push(LogLevel::Error, e.to_string());
                    show_dialog(MessageLevel::Error, "Cannot use output folder", &e.to_string());
                }
            }
            return;
        }

        self.save_config();

        let total = job.len();
        self.state.log.push(
            LogLevel::Info,
            format!(
                "Converting {} file(s) to {} at quality {}",
                total,
                job.output_dir.display(),
                job.options.quality
            ),
        );
        self.state.begin_run(total);

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let processor = BatchProcessor::new(self.state.workers);

        let spawned = std::thread::Builder::new()
            .name("tojpeg-batch".into())
            .spawn(move || processor.run(job, &tx, &worker_cancel));

        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker {
                    events: rx,
                    cancel,
                    handle: Some(handle),
                });
            }
            Err(e) => {
                tracing::error!("Failed to start conversion thread: {}", e);
                self.state.finish_run(format!("could not start: {e}"));
                show_dialog(MessageLevel::Error, "Conversion failed", &e.to_string());
            }
        }
    }

    fn cancel_conversion(&mut self) {
        if let Some(worker) = &self.worker {
            worker.cancel.cancel();
            self.state
                .log
                .push(LogLevel::Warning, "Cancelling: files already started will finish");
        }
    }

    /// Drain progress events. Called once per frame.
    fn poll_worker(&mut self) {
        let Some(worker) = self.worker.as_mut() else {
            return;
        };

        let mut events = Vec::new();
        let mut disconnected = false;
        loop {
            match worker.events.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        let mut report = None;
        for event in events {
            match event {
                ProgressEvent::Started { job_id, total } => {
                    tracing::debug!("Batch {} started with {} file(s)", job_id, total);
                }
                ProgressEvent::FileStarted { index, .. } => self.state.mark_started(index),
                ProgressEvent::FileFinished { result, progress } => self.state.apply_result(&result, progress),
                ProgressEvent::Finished { report: finished } => report = Some(finished),
            }
        }

        if report.is_some() || disconnected {
            self.finish_worker(report);
        }
    }

    fn finish_worker(&mut self, report: Option<BatchReport>) {
        let Some(mut worker) = self.worker.take() else {
            return;
        };

        let joined = worker.handle.take().map(|handle| handle.join());
        let report = match (report, joined) {
            (Some(report), _) => Some(report),
            (None, Some(Ok(report))) => Some(report),
            _ => None,
        };

        match report {
            Some(report) => {
                self.state.finish_run(report.summary());
                show_dialog(summary_level(&report), "Conversion finished", &summary_text(&report));
            }
            None => {
                tracing::error!("Conversion thread stopped without a report");
                self.state.finish_run("stopped unexpectedly".into());
                show_dialog(
                    MessageLevel::Error,
                    "Conversion failed",
                    "The conversion stopped unexpectedly. See the log for details.",
                );
            }
        }
    }

    fn save_config(&mut self) {
        self.state.store_into(&mut self.config);
        if let Err(e) = self.config.save() {
            tracing::warn!("Failed to save settings: {:#}", e);
        }
    }

    fn on_close(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.cancel.cancel();
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
        self.save_config();
    }
}

impl eframe::App for ToJpegApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_worker();
        self.thumbnails.poll(ctx);
        self.handle_dropped_files(ctx);

        TopBottomPanel::top("top_panel")
            .frame(
                egui::Frame::none()
                    .fill(Theme::BG_PANEL)
                    .inner_margin(egui::Margin::symmetric(12.0, 8.0)),
            )
            .show(ctx, |ui| {
                self.render_top_bar(ui);
            });

        SidePanel::left("settings_panel")
            .default_width(290.0)
            .resizable(false)
            .frame(
                egui::Frame::none()
                    .fill(Theme::BG_PANEL)
                    .inner_margin(egui::Margin::same(14.0)),
            )
            .show(ctx, |ui| {
                ui.add_enabled_ui(!self.state.is_running(), |ui| {
                    self.render_output_settings(ui);
                    ui.add_space(14.0);
                    self.render_conversion_settings(ui);
                });
            });

        TopBottomPanel::bottom("bottom_panel")
            .resizable(true)
            .default_height(230.0)
            .frame(
                egui::Frame::none()
                    .fill(Theme::BG_DARK)
                    .inner_margin(egui::Margin::same(14.0)),
            )
            .show(ctx, |ui| {
                self.render_progress(ui);
                ui.add_space(6.0);
                widgets::log_view(ui, &self.state.log, 150.0);
                ui.add_space(8.0);
                self.render_action_buttons(ui);
            });

        CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(Theme::BG_DARK)
                    .inner_margin(egui::Margin::same(16.0)),
            )
            .show(ctx, |ui| {
                self.render_drop_zone(ui);
                ui.add_space(10.0);
                self.render_file_list(ui);
            });

        if ctx.input(|i| i.viewport().close_requested()) {
            self.on_close();
        }

        if self.worker.is_some() || self.thumbnails.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}

fn file_row(ui: &mut egui::Ui, row: &mut FileRow, thumbnails: &mut ThumbnailCache, running: bool) -> RowAction {
    let mut action = RowAction::None;
    let thumb_size = Vec2::new(THUMB_WIDTH as f32, THUMB_HEIGHT as f32);

    ui.horizontal(|ui| {
        ui.add_enabled(!running, egui::Checkbox::without_text(&mut row.selected));

        match thumbnails.get(&row.path) {
            ThumbnailState::Ready(thumb) => {
                ui.add_sized(thumb_size, egui::Image::new(&thumb.texture).fit_to_exact_size(thumb_size))
                    .on_hover_text(preview::describe(&thumb.metadata));
            }
            ThumbnailState::Loading => {
                ui.add_sized(thumb_size, egui::Spinner::new());
            }
            ThumbnailState::Failed(reason) => {
                ui.add_sized(
                    thumb_size,
                    egui::Label::new(RichText::new("no preview").size(11.0).color(Theme::TEXT_SECONDARY)),
                )
                .on_hover_text(reason);
            }
        }

        ui.vertical(|ui| {
            ui.label(RichText::new(row.file_name()).size(13.0).strong());
            ui.label(RichText::new(row.parent_dir()).size(11.0).color(Theme::TEXT_SECONDARY));
            if let Some(output) = &row.output {
                ui.label(
                    RichText::new(format!("→ {}", output.display()))
                        .size(11.0)
                        .color(Theme::SUCCESS),
                );
            }
        });

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.add_enabled(!running, egui::Button::new("Remove").small()).clicked() {
                action = RowAction::Remove;
            }

            let status = ui.colored_label(
                Theme::status_color(row.status),
                format!("{} {}", Theme::status_icon(row.status), row.status.label()),
            );
            if let Some(message) = &row.message {
                status.on_hover_text(message);
            }

            ui.add_enabled(!running, egui::Checkbox::new(&mut row.overwrite, "overwrite"));
            ui.add_enabled_ui(!running, |ui| {
                widgets::suffix_field(ui, &mut row.suffix, 90.0);
            });
        });
    });

    action
}

fn summary_level(report: &BatchReport) -> MessageLevel {
    if report.failed() > 0 {
        MessageLevel::Warning
    } else {
        MessageLevel::Info
    }
}

/// Dialog text: the counts plus up to `MAX_LISTED_PROBLEMS` named failures
fn summary_text(report: &BatchReport) -> String {
    let mut text = report.summary();
    let problems: Vec<_> = report.problems().collect();

    if !problems.is_empty() {
        text.push_str("\n\n");
        for result in problems.iter().take(MAX_LISTED_PROBLEMS) {
            let reason = result.outcome.reason().unwrap_or_default();
            text.push_str(&format!("{} ({}): {}\n", result.file_name(), result.outcome.label(), reason));
        }
        if problems.len() > MAX_LISTED_PROBLEMS {
            text.push_str(&format!(
                "...and {} more, see the log",
                problems.len() - MAX_LISTED_PROBLEMS
            ));
        }
    }
    text
}

fn show_dialog(level: MessageLevel, title: &str, description: &str) {
    MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(description)
        .set_buttons(MessageButtons::Ok)
        .show();
}

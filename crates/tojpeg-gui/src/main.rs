#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // Hide console on Windows

use clap::Parser;
use std::path::Path;
use tojpeg_gui::{logging, AppConfig, Args, ToJpegApp};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let log_guard = logging::init(args.verbose);
    let log_dir = log_guard.dir().map(Path::to_path_buf);

    tracing::info!("tojpeg {} starting", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Using default settings: {:#}", e);
        AppConfig::default()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("tojpeg")
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([820.0, 560.0])
            .with_drag_and_drop(true)
            .with_icon(load_icon()),
        ..Default::default()
    };

    eframe::run_native(
        "tojpeg",
        options,
        Box::new(move |cc| Ok(Box::new(ToJpegApp::new(cc, config, args, log_dir)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start the window: {e}"))
}

/// 32x32 orange tile with a light frame
fn load_icon() -> egui::IconData {
    const SIZE: u32 = 32;
    let rgba = (0..SIZE * SIZE)
        .flat_map(|i| {
            let (x, y) = (i % SIZE, i / SIZE);
            let edge = x < 2 || y < 2 || x >= SIZE - 2 || y >= SIZE - 2;
            if edge {
                [255, 237, 213, 255]
            } else {
                [234, 88, 12, 255]
            }
        })
        .collect();

    egui::IconData {
        rgba,
        width: SIZE,
        height: SIZE,
    }
}

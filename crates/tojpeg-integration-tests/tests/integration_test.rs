use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tojpeg_common::{Background, SourceFormat, Suffix};
use tojpeg_core::{
    BatchProcessor, BatchReport, CancelToken, ConversionJob, ConversionOptions, Outcome,
    ProgressEvent, SourceItem,
};
use tojpeg_formats::ImageDecoder;
use tokio::sync::mpsc;

fn run(job: ConversionJob) -> BatchReport {
    job.validate().unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    BatchProcessor::new(4).run(job, &tx, &CancelToken::new())
}

fn save_sample(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 3) as u8, (y * 5) as u8, 128]));
    DynamicImage::ImageRgb8(img).save(&path).unwrap();
    path
}

fn assert_jpeg(path: &Path, width: u32, height: u32) {
    let bytes = std::fs::read(path).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg, "{:?}", path);
    assert_eq!(ImageDecoder::probe(path).unwrap(), (SourceFormat::Jpeg, width, height));
}

#[test]
fn test_every_supported_format_becomes_jpeg() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");

    let names = ["a.png", "b.jpg", "c.webp", "d.gif", "e.tiff", "f.bmp"];
    let inputs: Vec<PathBuf> = names
        .iter()
        .map(|n| save_sample(temp_dir.path(), n, 48, 32))
        .collect();

    let report = run(ConversionJob::from_paths(inputs, &out, ConversionOptions::default()));

    assert_eq!(report.total(), names.len());
    assert!(report.all_succeeded(), "{:?}", report.results);
    for (result, name) in report.results.iter().zip(names) {
        let dest = result.destination.as_ref().unwrap();
        assert_eq!(dest.parent().unwrap(), out);
        assert_eq!(
            dest.file_stem().unwrap(),
            Path::new(name).file_stem().unwrap()
        );
        assert_jpeg(dest, 48, 32);
    }
}

#[test]
fn test_overwrite_rerun_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");
    let inputs = vec![
        save_sample(temp_dir.path(), "one.png", 20, 20),
        save_sample(temp_dir.path(), "two.webp", 30, 10),
    ];
    let options = ConversionOptions::default().with_overwrite(true).with_quality(70);

    let first = run(ConversionJob::from_paths(inputs.clone(), &out, options.clone()));
    let first_bytes: Vec<Vec<u8>> = first
        .results
        .iter()
        .map(|r| std::fs::read(r.destination.as_ref().unwrap()).unwrap())
        .collect();

    let second = run(ConversionJob::from_paths(inputs, &out, options));

    for (a, b) in first.results.iter().zip(&second.results) {
        assert_eq!(a.destination, b.destination);
    }
    for (result, bytes) in second.results.iter().zip(first_bytes) {
        assert_eq!(std::fs::read(result.destination.as_ref().unwrap()).unwrap(), bytes);
    }
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 2);
}

#[test]
fn test_rerun_without_overwrite_keeps_old_files() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");
    let input = save_sample(temp_dir.path(), "pic.png", 10, 10);

    run(ConversionJob::from_paths([&input], &out, ConversionOptions::default()));
    let report = run(ConversionJob::from_paths([&input], &out, ConversionOptions::default()));

    assert_eq!(report.results[0].destination, Some(out.join("pic_1.jpg")));
    assert!(out.join("pic.jpg").exists());
}

#[test]
fn test_same_stem_inputs_do_not_collide() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");
    let inputs = vec![
        save_sample(temp_dir.path(), "holiday.png", 8, 8),
        save_sample(temp_dir.path(), "holiday.gif", 8, 8),
        save_sample(temp_dir.path(), "HOLIDAY.bmp", 8, 8),
    ];

    for overwrite in [false, true] {
        let options = ConversionOptions::default().with_overwrite(overwrite);
        let report = run(ConversionJob::from_paths(inputs.clone(), &out, options));
        assert!(report.all_succeeded());

        let mut names: Vec<String> = report
            .results
            .iter()
            .map(|r| r.destination.as_ref().unwrap().to_string_lossy().to_lowercase())
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 3, "overwrite={overwrite}");
    }
}

#[test]
fn test_input_in_output_dir_survives_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().join("in");
    let out = temp_dir.path().join("out");
    std::fs::create_dir_all(&input_dir).unwrap();
    std::fs::create_dir_all(&out).unwrap();

    let png = input_dir.join("x.png");
    RgbImage::from_pixel(16, 16, Rgb([255, 0, 0])).save(&png).unwrap();
    let jpg = out.join("x.jpg");
    RgbImage::from_pixel(16, 16, Rgb([0, 0, 255])).save(&jpg).unwrap();
    let original = std::fs::read(&jpg).unwrap();

    let options = ConversionOptions::default().with_overwrite(true);
    let report = run(ConversionJob::from_paths(vec![png, jpg.clone()], &out, options));

    assert!(report.all_succeeded(), "{:?}", report.results);
    assert_eq!(std::fs::read(&jpg).unwrap(), original);
    for result in &report.results {
        assert_ne!(result.destination.as_ref(), Some(&jpg));
    }

    let from_jpg = report.results[1].destination.as_ref().unwrap();
    let pixel = image::open(from_jpg).unwrap().to_rgb8().get_pixel(8, 8).0;
    assert!(pixel[2] > 200 && pixel[0] < 50, "got {pixel:?}");
}

#[test]
fn test_unsupported_files_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");

    let notes = temp_dir.path().join("notes.txt");
    std::fs::write(&notes, "just text").unwrap();
    let fake = temp_dir.path().join("fake.png");
    std::fs::write(&fake, "not an image either").unwrap();
    let good = save_sample(temp_dir.path(), "good.png", 12, 12);

    let report = run(ConversionJob::from_paths(
        [notes, fake, good],
        &out,
        ConversionOptions::default(),
    ));

    assert_eq!(report.total(), 3);
    assert!(matches!(report.results[0].outcome, Outcome::Skipped { .. }));
    assert!(!report.results[1].outcome.is_success());
    assert!(report.results[2].outcome.is_success());
    assert!(!out.join("notes.jpg").exists());
}

#[test]
fn test_transparency_uses_background() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");
    let input = temp_dir.path().join("clear.png");
    RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0])).save(&input).unwrap();

    let options = ConversionOptions::default()
        .with_background(Background([255, 0, 0]))
        .with_quality(100);
    let report = run(ConversionJob::from_paths([&input], &out, options));

    let jpeg = image::open(report.results[0].destination.as_ref().unwrap())
        .unwrap()
        .to_rgb8();
    let px = jpeg.get_pixel(8, 8).0;
    assert!(px[0] > 240 && px[1] < 15 && px[2] < 15, "{:?}", px);
}

#[test]
fn test_per_item_suffix() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");
    let a = save_sample(temp_dir.path(), "a.png", 4, 4);
    let b = save_sample(temp_dir.path(), "b.png", 4, 4);

    let mut job = ConversionJob::new(
        &out,
        ConversionOptions::default().with_suffix(Suffix::parse("_web").unwrap()),
    );
    job.push(SourceItem::new(&a));
    job.push(SourceItem::new(&b).with_suffix(Suffix::parse("-print").unwrap()));

    let report = run(job);
    assert_eq!(report.results[0].destination, Some(out.join("a_web.jpg")));
    assert_eq!(report.results[1].destination, Some(out.join("b-print.jpg")));
}

#[test]
fn test_cancelled_batch_reports_every_file() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");
    let inputs: Vec<PathBuf> = (0..10)
        .map(|i| save_sample(temp_dir.path(), &format!("img_{i}.png"), 1024, 768))
        .collect();

    let job = ConversionJob::from_paths(inputs, &out, ConversionOptions::default());
    job.validate().unwrap();

    let cancel = CancelToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let watcher = cancel.clone();
    let handle = std::thread::spawn(move || BatchProcessor::new(1).run(job, &tx, &watcher));

    // Cancel as soon as the first file finishes
    while let Some(event) = rx.blocking_recv() {
        if matches!(event, ProgressEvent::FileFinished { .. }) {
            cancel.cancel();
        }
    }

    let report = handle.join().unwrap();
    assert_eq!(report.total(), 10);
    assert!(report.succeeded() >= 1);
    assert_eq!(report.succeeded() + report.cancelled(), 10);
    for result in report.results.iter().filter(|r| r.outcome == Outcome::Cancelled) {
        assert!(result.destination.is_none());
    }
}

#[tokio::test]
async fn test_large_batch_processing() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");

    let mut job = ConversionJob::new(&out, ConversionOptions::default());
    for i in 0..100 {
        let input_path = temp_dir.path().join(format!("img_{:03}.png", i));
        DynamicImage::new_rgb8(640, 480).save(&input_path).unwrap();
        job.push(SourceItem::new(input_path));
    }
    job.validate().unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let processor = BatchProcessor::new(8);
    let report = processor.run_async(job, tx, CancelToken::new()).await.unwrap();

    assert_eq!(report.succeeded(), 100);
    for (i, result) in report.results.iter().enumerate() {
        assert_eq!(result.index, i);
    }
}

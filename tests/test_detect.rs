mod common;

use common::*;
use paru::{
  FromUrl,
  input::InputWrapper,
  output::{SaveImageFileOutput, report::NO_DETECTIONS},
  parse_location,
};

#[test]
fn detection_lines_match_result() -> anyhow::Result<()> {
  let file = xray_png();
  let input = InputWrapper::from_url(&parse_location(file.path().to_str().unwrap(), "image")?)?;
  let report = TextReport::new(Vec::new(), false);
  let model = FixedModel::new(&[0.9, 0.7, 0.55, 0.3]);

  let result = OneShotTask::new(confidence(0.5)).run_task(input, model, vec![report])?;
  assert_eq!(result.len(), 3);
  assert_eq!((result.width, result.height), (96, 80));
  Ok(())
}

#[test]
fn report_has_one_line_per_box() -> anyhow::Result<()> {
  let model = FixedModel::new(&[0.95, 0.8, 0.6, 0.45, 0.2]);
  let frame = xray_image(64, 64);

  for step in 0..=20 {
    let threshold = confidence((step as f32 * 0.05).min(1.0));
    let result = model.infer(&frame, threshold)?;
    let report = TextReport::new(Vec::new(), false);
    report.render_result(&frame, &result)?;
    let text = String::from_utf8(report.into_inner())?;

    if result.is_empty() {
      assert_eq!(text.trim_end(), NO_DETECTIONS);
    } else {
      assert_eq!(text.lines().count(), result.len());
    }
  }
  Ok(())
}

#[test]
fn raising_threshold_never_adds_detections() -> anyhow::Result<()> {
  let model = FixedModel::new(&[0.12, 0.33, 0.5, 0.51, 0.74, 0.99]);
  let frame = xray_image(32, 32);
  let mut last = usize::MAX;
  for step in 0..=20 {
    let count = model
      .infer(&frame, confidence((step as f32 * 0.05).min(1.0)))?
      .len();
    assert!(count <= last);
    last = count;
  }
  Ok(())
}

#[test]
fn annotated_download_round_trips() -> anyhow::Result<()> {
  let dir = tempfile::tempdir()?;
  let target = dir.path().join("download.png");
  let url = parse_location(target.to_str().unwrap(), "image")?;
  let output = SaveImageFileOutput::from_url(&url)?;

  let frame = xray_image(120, 90);
  let model = FixedModel::new(&[0.8]);
  OneShotTask::new(confidence(0.25)).run_task(std::iter::once(frame.clone()), model, output)?;

  let saved = image::open(&target)?;
  assert_eq!((saved.width(), saved.height()), frame.dimensions());
  assert_ne!(saved.to_rgb8(), frame);
  Ok(())
}

#[test]
fn missing_input_fails_task() {
  let report = TextReport::new(Vec::new(), false);
  let result = OneShotTask::new(confidence(0.5)).run_task(
    std::iter::empty::<image::RgbImage>(),
    FixedModel::empty(),
    report,
  );
  assert!(result.is_err());
}

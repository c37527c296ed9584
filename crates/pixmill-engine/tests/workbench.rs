//! Integration tests: drive filters through a `Workbench` with a scripted
//! clock and an in-memory surface.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use pixmill_engine::surface::{EncodeFormat, Surface, SurfaceError};
use pixmill_engine::types::{Rgba, RgbaImage};
use pixmill_engine::{Clock, Command, FilterEvent, FilterOutput, FilterRequest, Workbench};
use serde_json::json;

/// Each `elapsed` query reports one more `step` than the last, so a slice
/// with interval `n * step` processes exactly `n` rows.
#[derive(Clone)]
struct ScriptedClock {
    step: Duration,
    ticks: Rc<Cell<u32>>,
}

impl ScriptedClock {
    fn new(step_ms: u64) -> Self {
        Self {
            step: Duration::from_millis(step_ms),
            ticks: Rc::new(Cell::new(0)),
        }
    }
}

impl Clock for ScriptedClock {
    type Instant = u32;

    fn now(&self) -> u32 {
        self.ticks.get()
    }

    fn elapsed(&self, since: &u32) -> Duration {
        self.ticks.set(self.ticks.get() + 1);
        self.step * (self.ticks.get() - since)
    }
}

/// Raw RGBA surface whose "encoding" is a hex dump of its pixels.
struct HexCanvas {
    image: RgbaImage,
}

impl Surface for HexCanvas {
    fn read_pixels(&self) -> Result<RgbaImage, SurfaceError> {
        Ok(self.image.clone())
    }

    fn write_pixels(&mut self, pixels: &RgbaImage) -> Result<(), SurfaceError> {
        self.image = pixels.clone();
        Ok(())
    }

    fn encode(&self, _format: EncodeFormat) -> Result<String, SurfaceError> {
        let hex: String = self.image.as_raw().iter().map(|b| format!("{b:02x}")).collect();
        Ok(format!("{}x{}:{hex}", self.image.width(), self.image.height()))
    }

    fn load_encoded(&mut self, encoded: &str) -> Result<(), SurfaceError> {
        let bad = || SurfaceError::Decode(encoded.to_owned());
        let (size, hex) = encoded.split_once(':').ok_or_else(bad)?;
        let (w, h) = size.split_once('x').ok_or_else(bad)?;
        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad()))
            .collect::<Result<Vec<u8>, _>>()?;
        self.image = RgbaImage::from_raw(
            w.parse().map_err(|_| bad())?,
            h.parse().map_err(|_| bad())?,
            bytes,
        )
        .ok_or_else(bad)?;
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn photo(width: u32, height: u32) -> HexCanvas {
    HexCanvas {
        image: RgbaImage::from_fn(width, height, |x, y| {
            Rgba([
                (x * 23 + y * 7) as u8,
                (x * 3 + y * 31) as u8,
                ((x ^ y) * 13) as u8,
                255 - (x + y) as u8,
            ])
        }),
    }
}

fn pixels_of<C: Clock>(bench: &Workbench<C>, id: pixmill_engine::TargetId) -> RgbaImage {
    bench.surface(id).unwrap().read_pixels().unwrap()
}

fn run_with_interval(request: &serde_json::Value, interval_rows: Option<u64>) -> (RgbaImage, usize) {
    let mut bench = Workbench::with_clock(ScriptedClock::new(1));
    let id = bench.attach(photo(12, 9));
    let mut options = request.clone();
    match interval_rows {
        Some(rows) => options["interval"] = json!(rows),
        None => options["sync"] = json!(true),
    }
    bench
        .submit(id, FilterRequest::from_value(&options).unwrap())
        .unwrap();
    bench.run_until_idle();
    let progress = bench
        .take_events()
        .iter()
        .filter(|e| matches!(e, FilterEvent::Progress { .. }))
        .count();
    (pixels_of(&bench, id), progress)
}

#[test]
fn sliced_and_sync_runs_agree() {
    let requests = [
        json!({"command": "blur", "radius": 3}),
        json!({"command": "sharpen"}),
        json!({"command": "emboss", "more": true, "bias": 128}),
        json!({"command": "noise", "level": 90, "seed": 17}),
        json!({"command": "contrast", "level": 40, "channels": "rg"}),
        json!({"command": "sepia", "region": {"left": 3, "top": 2, "width": 5}}),
    ];
    for request in &requests {
        let (sync, none) = run_with_interval(request, None);
        assert_eq!(none, 0, "sync run yielded: {request}");
        for rows in [1, 2, 4] {
            let (sliced, yields) = run_with_interval(request, Some(rows));
            assert!(yields > 0, "{request} never yielded at {rows} rows/slice");
            assert_eq!(sliced, sync, "{request} differs at {rows} rows/slice");
        }
    }
}

#[test]
fn one_row_slices_report_every_row() {
    let (_, yields) = run_with_interval(&json!({"command": "negate"}), Some(1));
    assert_eq!(yields, 8, "9 rows yield after every row but the last");
}

#[test]
fn save_filter_restore_is_identity() {
    let mut bench = Workbench::new();
    let id = bench.attach(photo(7, 5));
    let before = pixels_of(&bench, id);
    bench.submit(id, Command::Save).unwrap();
    bench.submit(id, Command::Edges).unwrap();
    bench.submit(id, Command::Resize).unwrap();
    bench
        .submit(id, FilterRequest::parse("resize", Some(&json!({"width": 3}))).unwrap())
        .unwrap();
    bench.run_until_idle();
    assert_ne!(pixels_of(&bench, id), before);
    assert_eq!(pixels_of(&bench, id).width(), 3);

    bench.submit(id, Command::Restore).unwrap();
    bench.run_until_idle();
    assert_eq!(pixels_of(&bench, id), before);

    // Restoring twice changes nothing further.
    bench.submit(id, Command::Restore).unwrap();
    bench.run_until_idle();
    assert_eq!(pixels_of(&bench, id), before);
}

#[test]
fn sample_hands_sorted_histogram_to_reducer() {
    let mut bench = Workbench::new();
    let mut canvas = HexCanvas {
        image: RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])),
    };
    for x in 0..4 {
        canvas.image.put_pixel(x, 0, Rgba([0, 0, 255, 255]));
    }
    canvas.image.put_pixel(0, 1, Rgba([0, 0, 0, 255]));
    let id = bench.attach(canvas);

    let seen = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    let request = FilterRequest::new(Command::Sample).with_reducer(move |_, output| {
        *sink.borrow_mut() = Some(output.clone());
    });
    bench.submit(id, request).unwrap();
    bench.run_until_idle();

    let Some(FilterOutput::Histogram { colors }) = seen.borrow_mut().take() else {
        panic!("reducer did not receive a histogram");
    };
    assert_eq!(
        colors,
        vec![
            ("#f00000".to_owned(), 11),
            ("#0000f0".to_owned(), 4),
            ("#000000".to_owned(), 1),
        ]
    );
}

#[test]
fn grayscale_scenario_through_json_ingress() {
    let mut bench = Workbench::new();
    let mut canvas = HexCanvas {
        image: RgbaImage::new(2, 1),
    };
    canvas.image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
    canvas.image.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
    let id = bench.attach(canvas);
    bench
        .submit(id, FilterRequest::from_value(&json!({"command": "grayscale"})).unwrap())
        .unwrap();
    bench.run_until_idle();
    let out = pixels_of(&bench, id);
    assert_eq!(out.get_pixel(0, 0).0, [76, 76, 76, 255]);
    assert_eq!(out.get_pixel(1, 0).0, [150, 150, 150, 255]);
}

#[test]
fn unknown_option_is_rejected_before_queueing() {
    let err = FilterRequest::parse("blur", Some(&json!({"radious": 4}))).unwrap_err();
    assert!(err.to_string().contains("radious"), "{err}");
}

#[test]
fn complete_reports_scripted_time() {
    let mut bench = Workbench::with_clock(ScriptedClock::new(5));
    let id = bench.attach(photo(2, 2));
    bench.submit(id, Command::Negate).unwrap();
    bench.run_until_idle();
    let events = bench.take_events();
    let Some(FilterEvent::Complete { time, .. }) = events.last() else {
        panic!("expected completion, got {events:?}");
    };
    assert!(*time >= Duration::from_millis(5));
}

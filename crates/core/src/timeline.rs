//! Timeline chart renderer.
//!
//! Draws a small PNG strip of the processed video: annotation timecodes as
//! ticks in the upper band, detections in the lower band (annotated ones in
//! one color, unannotated in another). The HTTP layer Base64-encodes the
//! bytes into the upload response.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

use crate::detection::Detection;
use crate::error::{CoreError, CoreResult};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 120;
const TICK_HALF_WIDTH: i64 = 1;

const BACKGROUND: Rgb<u8> = Rgb([250, 250, 250]);
const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
const ANNOTATION: Rgb<u8> = Rgb([66, 133, 244]);
const ANNOTATED_DETECTION: Rgb<u8> = Rgb([52, 168, 83]);
const UNANNOTATED_DETECTION: Rgb<u8> = Rgb([234, 67, 53]);

/// Map a timestamp to a horizontal pixel position.
fn x_for(time: f64, duration: f64) -> Option<i64> {
    if !time.is_finite() || time < 0.0 || time > duration {
        return None;
    }
    Some(((time / duration) * f64::from(WIDTH - 1)).round() as i64)
}

/// Draw a vertical tick spanning `y0..y1` centered on `x`.
fn draw_tick(img: &mut RgbImage, x: i64, y0: u32, y1: u32, color: Rgb<u8>) {
    for dx in -TICK_HALF_WIDTH..=TICK_HALF_WIDTH {
        let px = x + dx;
        if px < 0 || px >= i64::from(WIDTH) {
            continue;
        }
        for y in y0..y1 {
            img.put_pixel(px as u32, y, color);
        }
    }
}

/// Render the detection/annotation timeline as PNG bytes.
///
/// A non-positive `duration` (e.g. a failed probe) yields an empty chart
/// rather than an error; the chart is decoration, not data.
pub fn render_timeline(
    detections: &[Detection],
    annotation_times: &[f64],
    duration: f64,
) -> CoreResult<Vec<u8>> {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    // Center axis.
    let mid = HEIGHT / 2;
    for x in 0..WIDTH {
        img.put_pixel(x, mid, AXIS);
    }

    if duration > 0.0 {
        for &a in annotation_times {
            if let Some(x) = x_for(a, duration) {
                draw_tick(&mut img, x, 10, mid, ANNOTATION);
            }
        }
        for d in detections {
            if let Some(x) = x_for(d.time, duration) {
                let color = if d.is_annotated {
                    ANNOTATED_DETECTION
                } else {
                    UNANNOTATED_DETECTION
                };
                draw_tick(&mut img, x, mid + 1, HEIGHT - 10, color);
            }
        }
    }

    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png)
        .map_err(|e| CoreError::Io(std::io::Error::other(e.to_string())))?;
    Ok(bytes.into_inner())
}

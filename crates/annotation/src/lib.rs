//! Detection overlay rendering
//!
//! Draws bounding boxes and class labels onto decoded RGB frames before they
//! are handed to the encoder. Boxes are drawn with a configurable line
//! thickness and a per-class color; labels render the class name and
//! confidence on a filled background above the box.
//!
//! Label text needs a TrueType font. The font is loaded at construction from
//! the configured path or from a short list of common system locations; when
//! none is found, boxes are still drawn and labels are skipped with a
//! warning.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;
use video_detect_common::{Detection, Frame, PipelineError};

/// Annotation errors
#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Invalid frame data: {0}")]
    InvalidFrame(String),
}

impl From<AnnotateError> for PipelineError {
    fn from(err: AnnotateError) -> Self {
        PipelineError::Annotation(err.to_string())
    }
}

/// Rendering options for detection overlays
#[derive(Debug, Clone)]
pub struct AnnotationStyle {
    /// Box outline thickness in pixels
    pub line_thickness: u32,
    /// Font scale for labels
    pub font_scale: f32,
    /// Whether to render the confidence percentage in the label
    pub show_confidence: bool,
    /// Explicit font file; when None, common system fonts are probed
    pub font_path: Option<PathBuf>,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            line_thickness: 2,
            font_scale: 14.0,
            show_confidence: true,
            font_path: None,
        }
    }
}

/// Fonts probed when no explicit path is configured
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

/// Distinct colors cycled by class ID
const CLASS_COLORS: &[[u8; 3]] = &[
    [230, 57, 70],   // red
    [46, 196, 182],  // teal
    [255, 159, 28],  // orange
    [106, 76, 219],  // purple
    [87, 204, 153],  // green
    [255, 89, 143],  // pink
    [58, 134, 255],  // blue
    [181, 163, 24],  // olive
    [142, 202, 230], // light blue
    [188, 108, 37],  // brown
];

/// Color assigned to a class ID
#[must_use]
pub fn class_color(class_id: u32) -> Rgb<u8> {
    let rgb = CLASS_COLORS[class_id as usize % CLASS_COLORS.len()];
    Rgb(rgb)
}

/// Draws detection overlays onto frames
pub struct Annotator {
    style: AnnotationStyle,
    font: Option<FontVec>,
}

impl Annotator {
    /// Create an annotator, loading the label font if one can be found
    #[must_use]
    pub fn new(style: AnnotationStyle) -> Self {
        let font = load_font(style.font_path.as_deref());
        if font.is_none() {
            warn!("No label font found, boxes will be drawn without labels");
        }
        Self { style, font }
    }

    /// Draw all detections for one frame onto the frame's pixel data
    ///
    /// # Errors
    ///
    /// Returns an error if the frame's data length does not match its
    /// dimensions.
    pub fn annotate(
        &self,
        frame: &mut Frame,
        detections: &[Detection],
    ) -> Result<(), AnnotateError> {
        if frame.data.len() != frame.expected_data_len() {
            return Err(AnnotateError::InvalidFrame(format!(
                "expected {} bytes for {}x{}, got {}",
                frame.expected_data_len(),
                frame.width,
                frame.height,
                frame.data.len()
            )));
        }

        if detections.is_empty() {
            return Ok(());
        }

        let width = frame.width;
        let height = frame.height;
        let data = std::mem::take(&mut frame.data);
        let mut img: RgbImage = RgbImage::from_raw(width, height, data).ok_or_else(|| {
            AnnotateError::InvalidFrame("failed to build image from frame data".to_string())
        })?;

        let font_scale = PxScale::from(self.style.font_scale);

        for detection in detections {
            let color = class_color(detection.class_id);

            // Clamp to image bounds; detector coordinates are not guaranteed
            // to lie inside the frame
            let x = (detection.bbox.x1.min(detection.bbox.x2).max(0.0)) as u32;
            let y = (detection.bbox.y1.min(detection.bbox.y2).max(0.0)) as u32;
            let w = (detection.bbox.width() as u32).min(width.saturating_sub(x));
            let h = (detection.bbox.height() as u32).min(height.saturating_sub(y));

            if w == 0 || h == 0 {
                continue;
            }

            // Draw bounding box with line thickness
            for t in 0..self.style.line_thickness {
                let inner_w = w.saturating_sub(2 * t);
                let inner_h = h.saturating_sub(2 * t);
                if inner_w > 0 && inner_h > 0 {
                    let rect = Rect::at((x + t) as i32, (y + t) as i32).of_size(inner_w, inner_h);
                    draw_hollow_rect_mut(&mut img, rect, color);
                }
            }

            let Some(font) = self.font.as_ref() else {
                continue;
            };

            let label_text = if self.style.show_confidence {
                format!(
                    "{} {:.0}%",
                    detection.class_name,
                    detection.confidence * 100.0
                )
            } else {
                detection.class_name.clone()
            };

            // Label above the box, or below its top edge when there is no room
            let text_y = if y < 20 { y + 2 } else { y.saturating_sub(18) };
            let bg_w = (label_text.len() * 8) as u32;
            let bg_h = 16u32;

            // Fill background rectangle
            for py in text_y..(text_y + bg_h).min(height) {
                for px in x..(x + bg_w).min(width) {
                    img.put_pixel(px, py, color);
                }
            }

            draw_text_mut(
                &mut img,
                Rgb([255, 255, 255]),
                x as i32 + 2,
                text_y as i32 + 1,
                font_scale,
                font,
                &label_text,
            );
        }

        frame.data = img.into_raw();
        Ok(())
    }
}

fn load_font(explicit: Option<&std::path::Path>) -> Option<FontVec> {
    let candidates: Vec<PathBuf> = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
    };

    for candidate in candidates {
        if let Ok(bytes) = std::fs::read(&candidate) {
            match FontVec::try_from_vec(bytes) {
                Ok(font) => return Some(font),
                Err(e) => warn!("Failed to parse font {}: {}", candidate.display(), e),
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use video_detect_common::BoundingBox;

    fn black_frame(width: u32, height: u32) -> Frame {
        Frame {
            frame_number: 0,
            width,
            height,
            data: vec![0; (width * height * 3) as usize],
        }
    }

    fn detection(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            class_id: 0,
            class_name: "person".to_string(),
            confidence: 0.9,
            bbox: BoundingBox::new(x1, y1, x2, y2),
        }
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y * frame.width + x) * 3) as usize;
        [frame.data[idx], frame.data[idx + 1], frame.data[idx + 2]]
    }

    #[test]
    fn test_style_defaults() {
        let style = AnnotationStyle::default();
        assert_eq!(style.line_thickness, 2);
        assert!(style.show_confidence);
        assert!(style.font_path.is_none());
    }

    #[test]
    fn test_class_color_is_stable_and_cycles() {
        assert_eq!(class_color(0), class_color(0));
        assert_eq!(class_color(3), class_color(3 + CLASS_COLORS.len() as u32));
        assert_ne!(class_color(0), class_color(1));
    }

    #[test]
    fn test_annotate_draws_box_outline() {
        let annotator = Annotator::new(AnnotationStyle {
            line_thickness: 1,
            show_confidence: false,
            ..AnnotationStyle::default()
        });
        let mut frame = black_frame(64, 64);

        annotator
            .annotate(&mut frame, &[detection(30.0, 30.0, 50.0, 50.0)])
            .unwrap();

        // Border pixel colored, interior pixel untouched
        assert_ne!(pixel(&frame, 30, 30), [0, 0, 0]);
        assert_eq!(pixel(&frame, 40, 40), [0, 0, 0]);
    }

    #[test]
    fn test_annotate_no_detections_leaves_frame_unchanged() {
        let annotator = Annotator::new(AnnotationStyle::default());
        let mut frame = black_frame(16, 16);
        let before = frame.data.clone();

        annotator.annotate(&mut frame, &[]).unwrap();
        assert_eq!(frame.data, before);
    }

    #[test]
    fn test_annotate_clamps_out_of_bounds_boxes() {
        let annotator = Annotator::new(AnnotationStyle {
            line_thickness: 2,
            ..AnnotationStyle::default()
        });
        let mut frame = black_frame(32, 32);

        // Box partially outside the frame must not panic
        annotator
            .annotate(&mut frame, &[detection(-10.0, -10.0, 200.0, 200.0)])
            .unwrap();
        assert_eq!(frame.data.len(), frame.expected_data_len());
    }

    #[test]
    fn test_annotate_skips_degenerate_boxes() {
        let annotator = Annotator::new(AnnotationStyle::default());
        let mut frame = black_frame(32, 32);
        let before = frame.data.clone();

        // Inverted corners collapse to zero area and draw nothing
        let det = Detection {
            class_id: 1,
            class_name: "bicycle".to_string(),
            confidence: 0.5,
            bbox: BoundingBox::new(20.0, 20.0, 5.0, 5.0),
        };
        annotator.annotate(&mut frame, &[det]).unwrap();
        assert_eq!(frame.data, before);
    }

    #[test]
    fn test_annotate_rejects_malformed_frame() {
        let annotator = Annotator::new(AnnotationStyle::default());
        let mut frame = Frame {
            frame_number: 0,
            width: 8,
            height: 8,
            data: vec![0; 10],
        };

        let result = annotator.annotate(&mut frame, &[detection(0.0, 0.0, 4.0, 4.0)]);
        assert!(matches!(result, Err(AnnotateError::InvalidFrame(_))));
    }
}

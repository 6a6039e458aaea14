//! Detection result documents.
//!
//! The per-video output is a JSON array with one element per frame, in
//! frame order. Each element is itself an array of detection records;
//! a frame with no detections serializes as `[]`, never `null`. The
//! document is built in memory by [`ResultAccumulator`] and written in
//! one piece at commit time.

use serde::{Deserialize, Serialize};
use video_detect_common::{Detection, PipelineError, Result};

/// One detection in wire form.
///
/// `bbox` is `[x1, y1, x2, y2]` in pixel coordinates of the source
/// video, top-left origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub frame: u64,
    pub bbox: [f32; 4],
    pub class_id: u32,
    pub confidence: f32,
}

impl DetectionRecord {
    #[must_use]
    pub fn from_detection(frame: u64, detection: &Detection) -> Self {
        Self {
            frame,
            bbox: [
                detection.bbox.x1,
                detection.bbox.y1,
                detection.bbox.x2,
                detection.bbox.y2,
            ],
            class_id: detection.class_id,
            confidence: detection.confidence,
        }
    }
}

/// All detections for a single frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameResult {
    pub detections: Vec<DetectionRecord>,
}

/// The complete result document for one video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoResultDocument {
    pub frames: Vec<FrameResult>,
}

impl VideoResultDocument {
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Collects per-frame results in strict frame order.
#[derive(Debug, Default)]
pub struct ResultAccumulator {
    frames: Vec<FrameResult>,
}

impl ResultAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the detections for `frame_number`. Frames must arrive as
    /// an unbroken sequence starting at 0; anything else is a bug in
    /// the caller and is rejected.
    pub fn push_frame(&mut self, frame_number: u64, detections: &[Detection]) -> Result<()> {
        let expected = self.frames.len() as u64;
        if frame_number != expected {
            return Err(PipelineError::OutOfOrder {
                expected,
                got: frame_number,
            });
        }

        self.frames.push(FrameResult {
            detections: detections
                .iter()
                .map(|d| DetectionRecord::from_detection(frame_number, d))
                .collect(),
        });
        Ok(())
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn into_document(self) -> VideoResultDocument {
        VideoResultDocument {
            frames: self.frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use video_detect_common::BoundingBox;

    fn detection(class_id: u32, confidence: f32) -> Detection {
        Detection {
            class_id,
            class_name: "person".to_string(),
            confidence,
            bbox: BoundingBox::new(10.0, 20.0, 110.0, 220.0),
        }
    }

    #[test]
    fn document_wire_shape() {
        let mut acc = ResultAccumulator::new();
        acc.push_frame(0, &[detection(0, 0.5)]).unwrap();
        acc.push_frame(1, &[]).unwrap();

        let value = serde_json::to_value(acc.into_document()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                [{ "frame": 0, "bbox": [10.0, 20.0, 110.0, 220.0], "class_id": 0, "confidence": 0.5 }],
                []
            ])
        );
    }

    #[test]
    fn empty_frames_serialize_as_empty_arrays() {
        let mut acc = ResultAccumulator::new();
        acc.push_frame(0, &[]).unwrap();
        acc.push_frame(1, &[]).unwrap();

        let json = String::from_utf8(acc.into_document().to_json_bytes().unwrap()).unwrap();
        assert_eq!(json, "[[],[]]");
        assert!(!json.contains("null"));
    }

    #[test]
    fn empty_document_is_an_empty_array() {
        let doc = ResultAccumulator::new().into_document();
        assert_eq!(doc.frame_count(), 0);
        assert_eq!(doc.to_json_bytes().unwrap(), b"[]");
    }

    #[test]
    fn document_round_trips() {
        let mut acc = ResultAccumulator::new();
        acc.push_frame(0, &[detection(2, 0.5), detection(7, 0.25)])
            .unwrap();
        acc.push_frame(1, &[]).unwrap();
        acc.push_frame(2, &[detection(0, 0.99)]).unwrap();
        let doc = acc.into_document();

        let bytes = doc.to_json_bytes().unwrap();
        let parsed: VideoResultDocument = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(parsed.frames[2].detections[0].frame, 2);
    }

    #[test]
    fn out_of_order_frames_are_rejected() {
        let mut acc = ResultAccumulator::new();
        acc.push_frame(0, &[]).unwrap();

        let err = acc.push_frame(2, &[]).unwrap_err();
        match err {
            PipelineError::OutOfOrder { expected, got } => {
                assert_eq!(expected, 1);
                assert_eq!(got, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_frames_are_rejected() {
        let mut acc = ResultAccumulator::new();
        acc.push_frame(0, &[]).unwrap();
        assert!(acc.push_frame(0, &[]).is_err());
    }
}

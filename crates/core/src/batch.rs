//! Frame batching.
//!
//! [`FrameBatcher`] pulls decoded frames from an upstream iterator and
//! groups them into fixed-size batches for the detector. It never holds
//! more than one batch of frames in memory and it owns frame numbering:
//! frames are renumbered with a monotonically increasing index as they
//! are read, so batch `i` with batch size `B` always covers indices
//! `[i * B, i * B + len)`.

use video_detect_common::{Frame, PipelineError, Result};

/// A contiguous run of decoded frames.
#[derive(Debug, Clone)]
pub struct FrameBatch {
    /// Index of the first frame in the batch.
    pub start_index: u64,
    pub frames: Vec<Frame>,
}

impl FrameBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Groups a fallible frame iterator into batches of at most `batch_size`.
///
/// The final batch may be shorter; a zero-length batch is never yielded.
/// A decode error ends the stream: it is attributed to the index the
/// failing frame would have had (one past the last good frame) and no
/// further batches are produced.
pub struct FrameBatcher<I> {
    frames: I,
    batch_size: usize,
    next_index: u64,
    done: bool,
}

impl<I> FrameBatcher<I>
where
    I: Iterator<Item = Result<Frame>>,
{
    pub fn new(frames: I, batch_size: usize) -> Self {
        Self {
            frames,
            batch_size: batch_size.max(1),
            next_index: 0,
            done: false,
        }
    }

    /// Number of frames read so far.
    #[must_use]
    pub fn frames_read(&self) -> u64 {
        self.next_index
    }

    fn attribute(&self, error: PipelineError) -> PipelineError {
        match error {
            PipelineError::Decode { reason, .. } | PipelineError::Ffmpeg(reason) => {
                PipelineError::Decode {
                    frame: self.next_index,
                    reason,
                }
            }
            other => other,
        }
    }
}

impl<I> Iterator for FrameBatcher<I>
where
    I: Iterator<Item = Result<Frame>>,
{
    type Item = Result<FrameBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let start_index = self.next_index;
        let mut frames = Vec::with_capacity(self.batch_size);

        while frames.len() < self.batch_size {
            match self.frames.next() {
                Some(Ok(mut frame)) => {
                    frame.frame_number = self.next_index;
                    self.next_index += 1;
                    frames.push(frame);
                }
                Some(Err(error)) => {
                    self.done = true;
                    return Some(Err(self.attribute(error)));
                }
                None => break,
            }
        }

        if frames.is_empty() {
            self.done = true;
            None
        } else {
            Some(Ok(FrameBatch {
                start_index,
                frames,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: u64) -> Frame {
        Frame {
            frame_number: n,
            width: 2,
            height: 2,
            data: vec![0; 12],
        }
    }

    fn ok_frames(count: u64) -> impl Iterator<Item = Result<Frame>> {
        (0..count).map(|n| Ok(frame(n)))
    }

    #[test]
    fn batches_cover_all_frames() {
        let batches: Vec<_> = FrameBatcher::new(ok_frames(5), 2)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 2);
        assert_eq!(batches[2].len(), 1);
    }

    #[test]
    fn exact_multiple_has_no_partial_batch() {
        let batches: Vec<_> = FrameBatcher::new(ok_frames(4), 2)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 2));
    }

    #[test]
    fn batch_indices_are_contiguous() {
        let batches: Vec<_> = FrameBatcher::new(ok_frames(5), 2)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(batches[0].start_index, 0);
        assert_eq!(batches[1].start_index, 2);
        assert_eq!(batches[2].start_index, 4);

        let indices: Vec<u64> = batches
            .iter()
            .flat_map(|b| b.frames.iter().map(|f| f.frame_number))
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn source_numbering_is_overridden() {
        // Upstream frame numbers are untrusted; the batcher renumbers.
        let frames = vec![Ok(frame(99)), Ok(frame(99))];
        let batches: Vec<_> = FrameBatcher::new(frames.into_iter(), 8)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(batches[0].frames[0].frame_number, 0);
        assert_eq!(batches[0].frames[1].frame_number, 1);
    }

    #[test]
    fn empty_stream_yields_no_batches() {
        let mut batcher = FrameBatcher::new(ok_frames(0), 4);
        assert!(batcher.next().is_none());
        assert!(batcher.next().is_none());
    }

    #[test]
    fn error_is_attributed_to_failing_index() {
        let frames = vec![
            Ok(frame(0)),
            Ok(frame(1)),
            Ok(frame(2)),
            Err(PipelineError::Ffmpeg("corrupt packet".into())),
        ];
        let mut batcher = FrameBatcher::new(frames.into_iter(), 2);

        let first = batcher.next().unwrap().unwrap();
        assert_eq!(first.start_index, 0);

        let second = batcher.next().unwrap();
        match second {
            Err(PipelineError::Decode { frame, .. }) => assert_eq!(frame, 3),
            other => panic!("expected decode error, got {other:?}"),
        }
        assert!(batcher.next().is_none());
    }

    #[test]
    fn error_ends_iteration_mid_batch() {
        let frames = vec![Ok(frame(0)), Err(PipelineError::Ffmpeg("truncated".into()))];
        let mut batcher = FrameBatcher::new(frames.into_iter(), 4);

        // The partial batch before the error is not delivered; the error
        // surfaces first so the item fails before any detector call.
        assert!(batcher.next().unwrap().is_err());
        assert!(batcher.next().is_none());
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let batches: Vec<_> = FrameBatcher::new(ok_frames(2), 0)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(batches.len(), 2);
    }
}

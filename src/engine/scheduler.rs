use crate::FRAME_SIZE;

/*
Frame Scheduling
================

Synthesis runs in fixed frames of FRAME_SIZE samples; hosts ask for any
number of samples. The cursor keeps the current frame and how much of it
has been handed out, so a request that ends mid-frame resumes from the same
spot on the next call:

    host calls:  |--- 100 ---|----- 200 -----|-- 60 --|
    frames:      |---- 128 ----|---- 128 ----|---- 128 ----|
                 render        render        render

A new frame is rendered only when the previous one is used up.
*/

/// Produces one stereo control frame at a time.
pub trait FrameRenderer {
    fn render_frame(&mut self, left: &mut [f32; FRAME_SIZE], right: &mut [f32; FRAME_SIZE]);
}

/// Output destination for [`FrameCursor::render`].
pub enum Output<'a> {
    /// `L R L R ...`.
    Interleaved(&'a mut [f32]),
    Planar {
        left: &'a mut [f32],
        right: &'a mut [f32],
    },
}

impl Output<'_> {
    /// Stereo sample capacity.
    fn capacity(&self) -> usize {
        match self {
            Output::Interleaved(out) => out.len() / 2,
            Output::Planar { left, right } => left.len().min(right.len()),
        }
    }

    #[inline]
    fn write(&mut self, index: usize, left: f32, right: f32, accumulate: bool) {
        let (l, r) = match self {
            Output::Interleaved(out) => {
                let (l, rest) = out[2 * index..].split_at_mut(1);
                (&mut l[0], &mut rest[0])
            }
            Output::Planar { left: out_l, right: out_r } => (&mut out_l[index], &mut out_r[index]),
        };
        if accumulate {
            *l += left;
            *r += right;
        } else {
            *l = left;
            *r = right;
        }
    }
}

/// Hands out frames in host-sized pieces.
pub struct FrameCursor {
    left: [f32; FRAME_SIZE],
    right: [f32; FRAME_SIZE],
    position: usize,
}

impl Default for FrameCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCursor {
    pub fn new() -> Self {
        Self {
            left: [0.0; FRAME_SIZE],
            right: [0.0; FRAME_SIZE],
            position: FRAME_SIZE,
        }
    }

    /// Samples of the current frame not handed out yet.
    pub fn pending(&self) -> usize {
        FRAME_SIZE - self.position
    }

    /// Write up to `frames` stereo samples. Returns how many were written,
    /// which is less than `frames` only when `out` is too small.
    pub fn render<R: FrameRenderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        mut out: Output<'_>,
        frames: usize,
        accumulate: bool,
    ) -> usize {
        let frames = frames.min(out.capacity());
        let mut written = 0;
        while written < frames {
            if self.position == FRAME_SIZE {
                renderer.render_frame(&mut self.left, &mut self.right);
                self.position = 0;
            }
            let count = (frames - written).min(FRAME_SIZE - self.position);
            for i in 0..count {
                let src = self.position + i;
                out.write(written + i, self.left[src], self.right[src], accumulate);
            }
            self.position += count;
            written += count;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes a running sample counter into both channels.
    struct Counter {
        next: f32,
        frames: usize,
    }

    impl FrameRenderer for Counter {
        fn render_frame(&mut self, left: &mut [f32; FRAME_SIZE], right: &mut [f32; FRAME_SIZE]) {
            for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                *l = self.next;
                *r = -self.next;
                self.next += 1.0;
            }
            self.frames += 1;
        }
    }

    fn counter() -> Counter {
        Counter { next: 0.0, frames: 0 }
    }

    #[test]
    fn odd_block_sizes_stay_continuous() {
        let mut cursor = FrameCursor::new();
        let mut source = counter();
        let mut expected = 0.0;
        for block in [1, 100, 200, 127, 3, 300] {
            let mut out = vec![0.0; 2 * block];
            let written = cursor.render(&mut source, Output::Interleaved(&mut out), block, false);
            assert_eq!(written, block);
            for pair in out.chunks_exact(2) {
                assert_eq!(pair[0], expected);
                assert_eq!(pair[1], -expected);
                expected += 1.0;
            }
        }
        assert_eq!(source.frames, (731 + FRAME_SIZE - 1) / FRAME_SIZE);
    }

    #[test]
    fn planar_output_and_accumulate() {
        let mut cursor = FrameCursor::new();
        let mut source = counter();
        let mut left = vec![10.0; 4];
        let mut right = vec![10.0; 4];
        let written = cursor.render(
            &mut source,
            Output::Planar {
                left: &mut left,
                right: &mut right,
            },
            4,
            true,
        );
        assert_eq!(written, 4);
        assert_eq!(left, vec![10.0, 11.0, 12.0, 13.0]);
        assert_eq!(right, vec![10.0, 9.0, 8.0, 7.0]);
    }

    #[test]
    fn short_buffers_clamp_the_count() {
        let mut cursor = FrameCursor::new();
        let mut source = counter();
        let mut out = vec![0.0; 7];
        assert_eq!(
            cursor.render(&mut source, Output::Interleaved(&mut out), 10, false),
            3
        );
        let mut left = vec![0.0; 5];
        let mut right = vec![0.0; 2];
        let written = cursor.render(
            &mut source,
            Output::Planar {
                left: &mut left,
                right: &mut right,
            },
            5,
            false,
        );
        assert_eq!(written, 2);
        assert_eq!(left[0], 3.0);
        assert_eq!(cursor.pending(), FRAME_SIZE - 5);
    }

    #[test]
    fn zero_frames_renders_nothing() {
        let mut cursor = FrameCursor::new();
        let mut source = counter();
        let mut out: Vec<f32> = Vec::new();
        assert_eq!(
            cursor.render(&mut source, Output::Interleaved(&mut out), 0, false),
            0
        );
        assert_eq!(source.frames, 0);
    }
}

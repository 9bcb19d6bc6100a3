use crate::atlas::AnimationFrame;

/// Playback state of one animated tile definition.
///
/// The shown frame is a pure function of total elapsed time (wrapped by the
/// cycle length), so the result never depends on how the time was split
/// across calls.
#[derive(Debug, Clone)]
pub struct AnimationClock {
    frames: Vec<AnimationFrame>,
    cycle_ms: f64,
    elapsed_ms: f64,
    current: usize,
}

impl AnimationClock {
    pub fn new(frames: Vec<AnimationFrame>) -> Self {
        let cycle_ms = frames.iter().map(|f| f64::from(f.duration_ms)).sum();
        Self {
            frames,
            cycle_ms,
            elapsed_ms: 0.0,
            current: 0,
        }
    }

    /// Advances by `dt_ms`; returns true when the shown frame changed.
    pub fn advance(&mut self, dt_ms: f64) -> bool {
        if self.cycle_ms <= 0.0 || !(dt_ms > 0.0) {
            return false;
        }
        self.elapsed_ms = (self.elapsed_ms + dt_ms) % self.cycle_ms;
        let next = self.frame_at(self.elapsed_ms);
        let changed = next != self.current;
        self.current = next;
        changed
    }

    fn frame_at(&self, t: f64) -> usize {
        let mut end = 0.0;
        for (i, frame) in self.frames.iter().enumerate() {
            end += f64::from(frame.duration_ms);
            if t < end {
                return i;
            }
        }
        self.frames.len().saturating_sub(1)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_gid(&self) -> u32 {
        self.frames[self.current].gid
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> AnimationClock {
        AnimationClock::new(vec![
            AnimationFrame {
                gid: 1,
                duration_ms: 100,
            },
            AnimationFrame {
                gid: 2,
                duration_ms: 50,
            },
            AnimationFrame {
                gid: 3,
                duration_ms: 25,
            },
        ])
    }

    #[test]
    fn split_deltas_match_a_single_delta() {
        let mut split = clock();
        let mut whole = clock();
        for _ in 0..13 {
            split.advance(10.0);
            split.advance(10.0);
            whole.advance(20.0);
            assert_eq!(split.current_index(), whole.current_index());
            assert_eq!(split.elapsed_ms(), whole.elapsed_ms());
        }
    }

    #[test]
    fn wraps_around_the_cycle() {
        let mut c = clock();
        assert!(c.advance(100.0));
        assert_eq!(c.current_gid(), 2);
        assert!(c.advance(60.0));
        assert_eq!(c.current_gid(), 3);
        assert!(c.advance(20.0));
        assert_eq!(c.current_gid(), 1);
        assert_eq!(c.elapsed_ms(), 5.0);
    }

    #[test]
    fn ignores_non_positive_deltas_and_empty_cycles() {
        let mut c = clock();
        assert!(!c.advance(-5.0));
        assert!(!c.advance(f64::NAN));
        assert_eq!(c.elapsed_ms(), 0.0);

        let mut still = AnimationClock::new(vec![AnimationFrame {
            gid: 9,
            duration_ms: 0,
        }]);
        assert!(!still.advance(1000.0));
        assert_eq!(still.current_gid(), 9);
    }
}

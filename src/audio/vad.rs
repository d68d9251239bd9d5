//! Energy-based voice activity detection.

/// RMS-energy voice activity detector.
///
/// Deliberately simple: the decision only drives barge-in, so a frame-level
/// energy gate is enough. The detector runs on every captured frame, including
/// while transmission is gated or muted.
#[derive(Debug, Clone, Copy)]
pub struct EnergyVad {
    /// RMS threshold above which a frame counts as speech.
    pub threshold: f32,
}

/// Default RMS threshold, roughly -34 dBFS.
pub const DEFAULT_VAD_THRESHOLD: f32 = 0.02;

impl Default for EnergyVad {
    fn default() -> Self {
        EnergyVad {
            threshold: DEFAULT_VAD_THRESHOLD,
        }
    }
}

impl EnergyVad {
    /// Create a detector with a custom threshold.
    pub fn new(threshold: f32) -> Self {
        EnergyVad { threshold }
    }

    /// Root-mean-square energy of a frame.
    pub fn rms(frame: &[f32]) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }
        let sum_squares: f32 = frame.iter().map(|s| s * s).sum();
        (sum_squares / frame.len() as f32).sqrt()
    }

    /// Whether the frame contains speech energy.
    pub fn is_speech(&self, frame: &[f32]) -> bool {
        Self::rms(frame) > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_not_speech() {
        let vad = EnergyVad::default();
        assert!(!vad.is_speech(&[0.0; 4096]));
        assert!(!vad.is_speech(&[]));
    }

    #[test]
    fn test_low_noise_is_not_speech() {
        let vad = EnergyVad::default();
        let noise: Vec<f32> = (0..4096)
            .map(|i| if i % 2 == 0 { 0.005 } else { -0.005 })
            .collect();
        assert!(!vad.is_speech(&noise));
    }

    #[test]
    fn test_loud_tone_is_speech() {
        let vad = EnergyVad::default();
        let tone: Vec<f32> = (0..4096)
            .map(|i| 0.3 * (2.0 * std::f32::consts::PI * 200.0 * i as f32 / 16_000.0).sin())
            .collect();
        assert!(vad.is_speech(&tone));
    }

    #[test]
    fn test_rms_of_constant_signal() {
        assert!((EnergyVad::rms(&[0.5; 100]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_custom_threshold() {
        let strict = EnergyVad::new(0.5);
        let tone = [0.1f32; 1024];
        assert!(!strict.is_speech(&tone));
        assert!(EnergyVad::new(0.05).is_speech(&tone));
    }
}

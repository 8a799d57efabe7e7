/// Mel filterbank on the Slaney scale with Slaney area normalization.
///
/// Linear below 1 kHz, logarithmic above; each triangle is scaled by
/// `2 / (f_right - f_left)` so filters have equal area.
///
/// # Example
/// ```
/// use eb_audio::mel::MelFilterbank;
/// let fb = MelFilterbank::new(44100, 2048, 128, 0.0, None);
/// assert_eq!(fb.n_mels(), 128);
/// let mel = fb.apply(&vec![0.0; 1025]);
/// assert_eq!(mel.len(), 128);
/// ```
pub struct MelFilterbank {
    /// `n_mels` rows of `n_fft/2 + 1` weights.
    filters: Vec<Vec<f32>>,
}

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn logstep() -> f64 {
    6.4f64.ln() / 27.0
}

/// Hz → mel (Slaney).
#[must_use]
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / logstep()
    } else {
        hz / F_SP
    }
}

/// Mel → Hz (Slaney).
#[must_use]
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (logstep() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

impl MelFilterbank {
    /// `fmax = None` means Nyquist.
    #[must_use]
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f64, fmax: Option<f64>) -> Self {
        let sr = f64::from(sample_rate);
        let fmax = fmax.unwrap_or(sr / 2.0);
        let n_freqs = n_fft / 2 + 1;

        let fft_freqs: Vec<f64> = (0..n_freqs).map(|i| i as f64 * sr / n_fft as f64).collect();

        let mel_min = hz_to_mel(fmin);
        let mel_max = hz_to_mel(fmax);
        let mel_f: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
            .collect();

        let filters = (0..n_mels)
            .map(|m| {
                let (left, center, right) = (mel_f[m], mel_f[m + 1], mel_f[m + 2]);
                let enorm = 2.0 / (right - left);
                fft_freqs
                    .iter()
                    .map(|&f| {
                        let lower = (f - left) / (center - left);
                        let upper = (right - f) / (right - center);
                        (lower.min(upper).max(0.0) * enorm) as f32
                    })
                    .collect()
            })
            .collect();

        Self { filters }
    }

    #[must_use]
    pub fn n_mels(&self) -> usize {
        self.filters.len()
    }

    /// Project one power spectrum frame onto the mel bands.
    #[must_use]
    pub fn apply(&self, power: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|filter| filter.iter().zip(power).map(|(w, p)| w * p).sum())
            .collect()
    }
}

/// `10*log10(max(amin, S) / ref)` with a `top_db` floor below the maximum.
///
/// Operates on the whole spectrogram in place.
pub fn power_to_db(spec: &mut [Vec<f32>], reference: f32, amin: f32, top_db: Option<f32>) {
    let ref_db = 10.0 * reference.abs().max(amin).log10();
    let mut max_db = f32::NEG_INFINITY;
    for v in spec.iter_mut().flatten() {
        *v = 10.0 * v.max(amin).log10() - ref_db;
        max_db = max_db.max(*v);
    }
    if let Some(top) = top_db {
        let floor = max_db - top;
        for v in spec.iter_mut().flatten() {
            *v = v.max(floor);
        }
    }
}

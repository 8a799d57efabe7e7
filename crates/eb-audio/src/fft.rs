use std::sync::Arc;

use realfft::RealFftPlanner;

/// Centered short-time power spectrum using realfft.
///
/// Frames are centered on `t * hop` with `n_fft / 2` zero samples padded on
/// both sides, so `frames = 1 + len / hop`. The window is a periodic Hann.
/// The plan is shared; scratch buffers are allocated per call, which keeps
/// `power` callable from several threads at once.
///
/// # Example
/// ```
/// use eb_audio::fft::Stft;
/// let stft = Stft::new(2048, 512);
/// assert_eq!(stft.num_frames(110_250), 216);
/// assert_eq!(stft.num_bins(), 1025);
/// ```
pub struct Stft {
    n_fft: usize,
    hop: usize,
    plan: Arc<dyn realfft::RealToComplex<f32>>,
    /// Hann window coefficients.
    window: Vec<f32>,
}

impl Stft {
    /// Create a new STFT with the given window and hop size.
    ///
    /// # Panics
    /// Panics if `n_fft` or `hop` is 0.
    #[must_use]
    pub fn new(n_fft: usize, hop: usize) -> Self {
        assert!(n_fft > 0, "FFT size must be > 0");
        assert!(hop > 0, "hop must be > 0");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(n_fft);

        // Periodic Hann (denominateur N, pas N-1)
        let window: Vec<f32> = (0..n_fft)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_fft as f32).cos()))
            .collect();

        Self {
            n_fft,
            hop,
            plan,
            window,
        }
    }

    /// Number of frames produced for `len` samples.
    #[must_use]
    pub fn num_frames(&self, len: usize) -> usize {
        1 + len / self.hop
    }

    /// Frequency bins per frame (N/2+1).
    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Power spectrogram `|X|²`, one `Vec` of `num_bins()` per frame.
    #[must_use]
    pub fn power(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let pad = self.n_fft / 2;
        let frames = self.num_frames(samples.len());

        let mut input_buf = self.plan.make_input_vec();
        let mut spectrum_buf = self.plan.make_output_vec();
        let mut scratch = self.plan.make_scratch_vec();
        let mut out = Vec::with_capacity(frames);

        for t in 0..frames {
            // Frame t covers padded[t*hop .. t*hop + n_fft], padded = [0; pad] ++ samples ++ [0; pad]
            let origin = (t * self.hop) as isize - pad as isize;
            for (i, slot) in input_buf.iter_mut().enumerate() {
                let idx = origin + i as isize;
                let sample = if idx >= 0 {
                    samples.get(idx as usize).copied().unwrap_or(0.0)
                } else {
                    0.0
                };
                *slot = sample * self.window[i];
            }

            // Forward FFT
            if self
                .plan
                .process_with_scratch(&mut input_buf, &mut spectrum_buf, &mut scratch)
                .is_err()
            {
                out.push(vec![0.0; spectrum_buf.len()]);
                continue;
            }

            out.push(
                spectrum_buf
                    .iter()
                    .map(|c| c.re * c.re + c.im * c.im)
                    .collect(),
            );
        }

        out
    }
}

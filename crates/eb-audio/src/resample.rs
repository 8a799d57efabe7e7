use anyhow::Result;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Input frames fed to the sinc resampler per call.
const CHUNK: usize = 4096;

/// Convert mono samples from `from` Hz to `to` Hz.
///
/// Band-limited sinc interpolation. The filter delay is trimmed so the
/// output is aligned with the input and holds `round(len * to / from)`
/// samples.
///
/// # Errors
/// Returns an error if the resampler rejects the rate pair.
///
/// # Example
/// ```
/// use eb_audio::resample::resample;
/// let out = resample(&[0.0; 48_000], 48_000, 44_100).unwrap();
/// assert_eq!(out.len(), 44_100);
/// ```
pub fn resample(samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>> {
    if from == to || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    let ratio = f64::from(to) / f64::from(from);
    let expected = (samples.len() as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK, 1)?;
    let delay = resampler.output_delay();

    let mut out = Vec::with_capacity(expected + delay + CHUNK);
    for chunk in samples.chunks(CHUNK) {
        let input = [chunk];
        let block = if chunk.len() == CHUNK {
            resampler.process(&input[..], None)?
        } else {
            resampler.process_partial(Some(&input[..]), None)?
        };
        out.extend(block.into_iter().flatten());
    }
    // Vide le filtre : la fin du signal sort avec `delay` trames de retard.
    while out.len() < expected + delay {
        let tail = resampler.process_partial::<&[f32]>(None, None)?;
        if tail.iter().all(Vec::is_empty) {
            break;
        }
        out.extend(tail.into_iter().flatten());
    }

    let mut out: Vec<f32> = out.into_iter().skip(delay).take(expected).collect();
    out.resize(expected, 0.0);
    log::debug!(
        "Rééchantillonnage {from} Hz → {to} Hz : {} → {} trames",
        samples.len(),
        out.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn same_rate_is_identity() {
        let x = tone(440.0, 44_100, 1000);
        assert_eq!(resample(&x, 44_100, 44_100).unwrap(), x);
    }

    #[test]
    fn length_follows_ratio() {
        let out = resample(&tone(440.0, 48_000, 120_000), 48_000, 44_100).unwrap();
        assert_eq!(out.len(), 110_250);
        let out = resample(&tone(440.0, 22_050, 22_050), 22_050, 44_100).unwrap();
        assert_eq!(out.len(), 44_100);
    }

    #[test]
    fn tone_keeps_its_level() {
        let out = resample(&tone(440.0, 48_000, 48_000), 48_000, 44_100).unwrap();
        // Ignore les bords, où le filtre voit des zéros.
        let mid = &out[2000..out.len() - 2000];
        let rms = (mid.iter().map(|v| v * v).sum::<f32>() / mid.len() as f32).sqrt();
        assert!((rms - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.02, "rms {rms}");
    }
}

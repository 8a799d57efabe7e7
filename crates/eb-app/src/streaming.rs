use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use eb_audio::stream::{BlockLayout, BlockStream};
use eb_core::CoreError;
use eb_core::output::{Artifact, EmotionTimeline};
use eb_core::prediction::{PredictionResult, StreamingOutput};
use eb_core::traits::EmotionModel;
use rayon::prelude::*;

use crate::pipeline::Pipeline;

/// Block/hop parameters and execution policy of a streaming run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamSettings {
    pub block: usize,
    pub hop: usize,
    /// 0 = rayon default pool, 1 = sequential loop, n = dedicated pool of n.
    pub workers: usize,
    pub deadline: Option<Duration>,
}

/// Run every block of `samples` through the pipeline.
///
/// Blocks are independent, so any worker count gives the same output.
///
/// # Errors
/// First block failure, or `DeadlineExceeded` once the budget is spent.
pub fn run_blocks<M: EmotionModel>(
    pipeline: &Pipeline<M>,
    samples: &[f32],
    sample_rate: u32,
    settings: StreamSettings,
) -> Result<StreamingOutput> {
    let started = Instant::now();
    let expired = || settings.deadline.is_some_and(|d| started.elapsed() >= d);

    let output = if settings.workers == 1 {
        sequential(pipeline, samples, sample_rate, settings, &expired)?
    } else {
        let layout = BlockLayout::new(samples.len(), settings.block, settings.hop);
        let total = layout.count();
        let job = || -> Result<Vec<Option<(usize, PredictionResult)>>> {
            (0..total)
                .into_par_iter()
                .map(|index| {
                    // Deadline : aucun nouveau bloc ne démarre.
                    if expired() {
                        return Ok(None);
                    }
                    let segment = layout.segment(samples, index, sample_rate);
                    let result = pipeline
                        .infer(&segment)
                        .with_context(|| format!("bloc {index}"))?;
                    Ok(Some((index, result)))
                })
                .collect()
        };
        let results = if settings.workers == 0 {
            job()?
        } else {
            rayon::ThreadPoolBuilder::new()
                .num_threads(settings.workers)
                .build()
                .context("Création du pool de threads impossible")?
                .install(job)?
        };
        let completed: Vec<_> = results.into_iter().flatten().collect();
        if completed.len() < total {
            return Err(CoreError::DeadlineExceeded {
                completed: completed.len(),
                total,
            }
            .into());
        }
        StreamingOutput::from_unordered(completed)?
    };

    log::info!(
        "{} blocs traités en {:.2?}",
        output.len(),
        started.elapsed()
    );
    Ok(output)
}

/// Reference loop: one block at a time, appended in arrival order.
fn sequential<M: EmotionModel>(
    pipeline: &Pipeline<M>,
    samples: &[f32],
    sample_rate: u32,
    settings: StreamSettings,
    expired: &dyn Fn() -> bool,
) -> Result<StreamingOutput> {
    let stream = BlockStream::new(samples, sample_rate, settings.block, settings.hop);
    let total = stream.len();
    let mut output = StreamingOutput::new();
    for (index, segment) in stream {
        if expired() {
            return Err(CoreError::DeadlineExceeded {
                completed: output.len(),
                total,
            }
            .into());
        }
        let result = pipeline
            .infer(&segment)
            .with_context(|| format!("bloc {index}"))?;
        output.push(index, result)?;
        log::debug!("bloc {}/{} terminé", index + 1, total);
    }
    Ok(output)
}

/// Streaming run: blocks → `{block_index: [16 floats]}`.
///
/// # Errors
/// See [`run_blocks`]; intensity errors under strict validation.
pub fn run_streaming<M: EmotionModel>(
    pipeline: &Pipeline<M>,
    samples: &[f32],
    sample_rate: u32,
    settings: StreamSettings,
) -> Result<Artifact> {
    let output = run_blocks(pipeline, samples, sample_rate, settings)?;
    Ok(Artifact::Streaming(EmotionTimeline::encode(
        &output,
        pipeline.strict(),
    )?))
}

#[cfg(test)]
mod tests {
    use eb_audio::features::FeatureExtractor;
    use eb_core::NormalizationPolicy;

    use super::*;
    use crate::pipeline::Layout;
    use crate::pipeline::tests::Uniform;

    const BLOCK: usize = 110_250;
    const HOP: usize = 22_050;

    fn pipeline() -> Pipeline<Uniform> {
        Pipeline::new(
            FeatureExtractor::mfcc(44100),
            Some(NormalizationPolicy::Standardize),
            Layout::Flat,
            Uniform { len: 20 * 216 },
            false,
        )
    }

    fn settings(workers: usize) -> StreamSettings {
        StreamSettings {
            block: BLOCK,
            hop: HOP,
            workers,
            deadline: None,
        }
    }

    fn tone(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.3 * (2.0 * std::f32::consts::PI * 330.0 * i as f32 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn five_and_a_quarter_seconds_gives_seven_blocks() {
        let samples = tone((5.25 * 44100.0) as usize);
        let output = run_blocks(&pipeline(), &samples, 44100, settings(1))
            .unwrap();
        assert_eq!(output.len(), 7);
        let keys: Vec<usize> = output.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn parallel_matches_sequential() {
        let samples = tone(BLOCK + 3 * HOP);
        let seq = run_blocks(&pipeline(), &samples, 44100, settings(1))
            .unwrap();
        for workers in [0, 3] {
            let par = run_blocks(&pipeline(), &samples, 44100, settings(workers))
                .unwrap();
            assert_eq!(par, seq);
        }
        assert_eq!(seq.len(), 4);
    }

    #[test]
    fn timeline_rows_have_sixteen_clipped_values() {
        let samples = tone(BLOCK + HOP / 2);
        let artifact = run_streaming(&pipeline(), &samples, 44100, settings(2))
            .unwrap();
        let Artifact::Streaming(timeline) = artifact else {
            panic!("streaming artifact expected");
        };
        assert_eq!(timeline.len(), 2);
        for i in 0..2 {
            let row = timeline.get(i).unwrap();
            assert_eq!(row.len(), 16);
            assert!(row.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn spent_deadline_stops_the_run() {
        let samples = tone(BLOCK);
        for workers in [1, 0] {
            let s = StreamSettings {
                deadline: Some(Duration::ZERO),
                ..settings(workers)
            };
            let err = run_blocks(&pipeline(), &samples, 44100, s)
                .err()
                .unwrap();
            assert!(matches!(
                err.downcast_ref::<CoreError>(),
                Some(CoreError::DeadlineExceeded {
                    completed: 0,
                    total: 1
                })
            ));
        }
    }

    #[test]
    fn empty_source_yields_empty_output() {
        let output = run_blocks(&pipeline(), &[], 44100, settings(1))
            .unwrap();
        assert!(output.is_empty());
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use eb_audio::decode::decode_to_rate;
use eb_audio::segment::AudioSegment;
use eb_core::config::{PipelineConfig, RunMode, SAMPLE_RATE};

pub mod cli;
pub mod pipeline;
pub mod streaming;

use pipeline::Pipeline;
use streaming::StreamSettings;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config (fichier + overrides CLI), une seule fois
    let config = cli.resolve_config().context("Configuration invalide")?;

    // 4. Exécuter
    run(&config)
}

/// Load the backend, analyse the input and write the artifact.
///
/// # Errors
/// Any configuration, shape, decode, resampling or write failure; numeric degeneracies
/// only under `strict`.
fn run(config: &PipelineConfig) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let input = config.input_audio_file.as_path();

    let artifact = match config.mode {
        RunMode::Single => {
            let segment = AudioSegment::load(input, config.offset_samples(), config.segment_samples())
                .with_context(|| format!("input_audio_file = {}", input.display()))?;
            pipeline.run_single(&segment)?
        }
        RunMode::Streaming => {
            let samples = decode_to_rate(input, SAMPLE_RATE)
                .with_context(|| format!("input_audio_file = {}", input.display()))?;
            let settings = StreamSettings {
                block: config.block_length,
                hop: config.hop_length,
                workers: config.workers,
                deadline: config.deadline,
            };
            streaming::run_streaming(&pipeline, &samples, SAMPLE_RATE, settings)?
        }
    };

    artifact.write_json(&config.output_json_file)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use eb_core::config::ConfigFile;

    use super::*;

    /// 16-bit PCM mono WAV.
    fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) {
        let data_len = (samples.len() * 2) as u32;
        let mut bytes = Vec::with_capacity(44 + samples.len() * 2);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&((s.clamp(-1.0, 1.0) * 32767.0) as i16).to_le_bytes());
        }
        std::fs::write(path, bytes).unwrap();
    }

    fn tree_json(num_classes: usize) -> String {
        format!(
            r#"{{"num_features": 4320, "num_classes": {num_classes},
                "trees": [{{"class_id": 3, "nodes": [{{"leaf": 1.0}}]}}]}}"#
        )
    }

    fn config(dir: &Path, mode: &str, num_classes: usize, seconds: f32) -> PipelineConfig {
        let model = dir.join("xgb.json");
        std::fs::write(&model, tree_json(num_classes)).unwrap();
        let audio = dir.join("clip.wav");
        let n = (seconds * 44100.0) as usize;
        let samples: Vec<f32> = (0..n)
            .map(|i| 0.2 * (2.0 * std::f32::consts::PI * 200.0 * i as f32 / 44100.0).sin())
            .collect();
        write_wav(&audio, &samples, 44100);
        ConfigFile {
            model_name: Some("xgb".into()),
            model_file: Some(model),
            input_audio_file: Some(audio),
            output_json_file: Some(dir.join("out").join("emotion.json")),
            mode: Some(mode.into()),
            ..ConfigFile::default()
        }
        .resolve()
        .unwrap()
    }

    #[test]
    fn single_shot_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("out")).unwrap();
        let cfg = config(dir.path(), "single", 8, 3.0);
        run(&cfg).unwrap();

        let text = std::fs::read_to_string(&cfg.output_json_file).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json.as_object().map(serde_json::Map::len), Some(8));
        assert_eq!(json["sad"], 1.0);
        assert_eq!(json["neutral"], 0.0);
    }

    #[test]
    fn streaming_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("out")).unwrap();
        let cfg = config(dir.path(), "streaming", 16, 5.25);
        run(&cfg).unwrap();

        let text = std::fs::read_to_string(&cfg.output_json_file).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let map = json.as_object().cloned().unwrap();
        assert_eq!(map.len(), 7);
        for i in 0..7 {
            let row = map[&i.to_string()].as_array().cloned().unwrap();
            assert_eq!(row.len(), 16);
            assert_eq!(row[3], 1.0);
        }
    }

    #[test]
    fn streaming_rejects_basic_model() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), "streaming", 8, 3.0);
        let err = run(&cfg).err().map(|e| format!("{e:#}")).unwrap();
        assert!(err.contains("16"), "{err}");
    }

    #[test]
    fn other_sample_rates_are_resampled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("out")).unwrap();
        let cfg = config(dir.path(), "streaming", 16, 3.0);
        // 3 s à 48 kHz → 2 blocs à 44,1 kHz.
        let samples: Vec<f32> = (0..144_000)
            .map(|i| 0.2 * (2.0 * std::f32::consts::PI * 200.0 * i as f32 / 48_000.0).sin())
            .collect();
        write_wav(&cfg.input_audio_file, &samples, 48_000);
        run(&cfg).unwrap();

        let text = std::fs::read_to_string(&cfg.output_json_file).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json.as_object().map(serde_json::Map::len), Some(2));
    }
}

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use eb_core::CoreError;
use eb_core::config::{ConfigFile, PipelineConfig, load_config_file};

/// Default configuration file.
pub const DEFAULT_CONFIG: &str = "config.toml";
/// Legacy layout, used when the TOML file is absent.
pub const LEGACY_CONFIG: &str = "config.json";

/// emoblend — speech emotion → blendshape intensities.
#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration (TOML, ou JSON si extension .json).
    /// Défaut : config.toml, sinon config.json.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Backend : tree (xgb), lstm, cnn.
    #[arg(long)]
    pub model_name: Option<String>,

    /// Poids du modèle (JSON pour tree, safetensors sinon).
    #[arg(long)]
    pub model_file: Option<PathBuf>,

    /// Fichier audio à analyser.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Destination de l'artefact JSON.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Découper en blocs chevauchants au lieu d'un seul segment.
    #[arg(long, default_value_t = false)]
    pub stream: bool,

    /// Threads de streaming : 0 = défaut rayon, 1 = séquentiel.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Budget en secondes d'un run streaming.
    #[arg(long)]
    pub deadline: Option<f64>,

    /// Signaler les dégénérescences numériques au lieu de les corriger.
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Overlay command-line values on a parsed file.
    pub fn apply_overrides(&self, file: &mut ConfigFile) {
        if let Some(ref v) = self.model_name {
            file.model_name = Some(v.clone());
        }
        if let Some(ref v) = self.model_file {
            file.model_file = Some(v.clone());
        }
        if let Some(ref v) = self.input {
            file.input_audio_file = Some(v.clone());
        }
        if let Some(ref v) = self.output {
            file.output_json_file = Some(v.clone());
        }
        if self.stream {
            file.mode = Some("streaming".into());
        }
        if let Some(v) = self.workers {
            file.workers = Some(v);
        }
        if let Some(v) = self.deadline {
            file.deadline_secs = Some(v);
        }
        if self.strict {
            file.strict = Some(true);
        }
    }

    /// Read the config file (explicit or default), apply overrides, validate.
    ///
    /// # Errors
    /// Explicit config file missing, parse failure, or invalid field.
    pub fn resolve_config(&self) -> Result<PipelineConfig> {
        let mut file = match self.config_path() {
            Some(path) => {
                require_exists(&path)?;
                load_config_file(&path)?
            }
            None => {
                log::warn!(
                    "Ni {DEFAULT_CONFIG} ni {LEGACY_CONFIG} : configuration depuis la ligne de commande."
                );
                ConfigFile::default()
            }
        };
        self.apply_overrides(&mut file);
        Ok(file.resolve()?)
    }

    /// Explicit `--config` (which must exist), else the first default found.
    fn config_path(&self) -> Option<PathBuf> {
        match self.config {
            Some(ref p) => Some(p.clone()),
            None => [DEFAULT_CONFIG, LEGACY_CONFIG]
                .iter()
                .map(Path::new)
                .find(|p| p.exists())
                .map(Path::to_path_buf),
        }
    }
}

fn require_exists(path: &Path) -> Result<(), CoreError> {
    if path.exists() {
        Ok(())
    } else {
        Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use eb_core::config::{ModelFamily, RunMode};

    use super::*;

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from([
            "emoblend",
            "--model-name",
            "cnn",
            "--stream",
            "--workers",
            "4",
            "--deadline",
            "2.5",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert_eq!(cli.model_name.as_deref(), Some("cnn"));
        assert!(cli.stream);
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"model_name": "xgb", "model_file": "m.json",
                "input_audio_file": "a.wav", "output_json_file": "o.json",
                "output_blend_file": "scene.blend"}"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(path),
            model_name: Some("lstm".into()),
            stream: true,
            strict: true,
            ..Cli::default()
        };
        let cfg = cli.resolve_config().unwrap();
        assert_eq!(cfg.model_family, ModelFamily::Recurrent);
        assert_eq!(cfg.mode, RunMode::Streaming);
        assert!(cfg.strict);
        assert_eq!(cfg.input_audio_file, PathBuf::from("a.wav"));
    }

    #[test]
    fn missing_explicit_config_is_reported() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/emoblend.toml")),
            ..Cli::default()
        };
        let err = cli.resolve_config().err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::FileNotFound { .. })
        ));
    }
}

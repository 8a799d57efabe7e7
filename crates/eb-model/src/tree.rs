//! Gradient-boosted tree ensemble, loaded from a JSON dump.
//!
//! ```json
//! {
//!   "num_features": 4320,
//!   "num_classes": 8,
//!   "base_score": 0.5,
//!   "trees": [
//!     { "class_id": 0, "nodes": [
//!         { "feature": 12, "threshold": 0.1, "left": 1, "right": 2, "missing_left": true },
//!         { "leaf": 0.3 },
//!         { "leaf": -0.2 }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Each class sums the leaves of its own trees; the prediction is the argmax.

use std::path::Path;

use anyhow::{Context, Result};
use eb_core::CoreError;
use eb_core::features::{InputShape, ModelInput};
use eb_core::labels::Vocabulary;
use eb_core::prediction::{PredictionResult, argmax};
use eb_core::traits::EmotionModel;
use serde::Deserialize;

/// One tree node: a split or a leaf.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        /// Branch taken by NaN features.
        #[serde(default = "default_missing_left")]
        missing_left: bool,
    },
    Leaf {
        leaf: f32,
    },
}

fn default_missing_left() -> bool {
    true
}

/// One boosted tree contributing to `class_id`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Tree {
    pub class_id: usize,
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Walk from the root to a leaf.
    ///
    /// Children always have a larger index than their parent (checked at
    /// load time), so the walk terminates.
    fn score(&self, features: &[f32]) -> f32 {
        let mut i = 0;
        loop {
            match self.nodes.get(i) {
                Some(Node::Leaf { leaf }) => return *leaf,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    missing_left,
                }) => {
                    let x = features.get(*feature).copied().unwrap_or(f32::NAN);
                    let go_left = if x.is_nan() { *missing_left } else { x < *threshold };
                    i = if go_left { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }
}

#[derive(Deserialize)]
struct TreeFile {
    num_features: usize,
    num_classes: usize,
    #[serde(default)]
    base_score: f32,
    trees: Vec<Tree>,
}

/// Hard-label classifier over a flat feature vector.
///
/// No probabilities are available: `predict` returns a `Label`, which the
/// output encoder expands to a one-hot vector.
#[derive(Clone, Debug)]
pub struct TreeEnsemble {
    num_features: usize,
    vocabulary: Vocabulary,
    base_score: f32,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Load and validate a JSON ensemble.
    ///
    /// # Errors
    /// Missing file, malformed JSON, or an inconsistent ensemble.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire {}", path.display()))?;
        let model = Self::from_json(&content).with_context(|| format!("Dans {}", path.display()))?;
        log::info!(
            "Ensemble d'arbres chargé : {} arbres, {} features, {} classes",
            model.trees.len(),
            model.num_features,
            model.vocabulary.len()
        );
        Ok(model)
    }

    /// Parse and validate JSON text.
    ///
    /// # Errors
    /// Malformed JSON or an inconsistent ensemble.
    ///
    /// # Example
    /// ```
    /// use eb_model::tree::TreeEnsemble;
    /// use eb_core::traits::EmotionModel;
    /// let json = r#"{"num_features": 2, "num_classes": 8, "trees": [
    ///   {"class_id": 3, "nodes": [
    ///     {"feature": 0, "threshold": 0.0, "left": 1, "right": 2},
    ///     {"leaf": -1.0}, {"leaf": 1.0}]}]}"#;
    /// let model = TreeEnsemble::from_json(json).unwrap();
    /// assert_eq!(model.vocabulary().len(), 8);
    /// ```
    pub fn from_json(content: &str) -> Result<Self> {
        let file: TreeFile = serde_json::from_str(content).context("Ensemble JSON invalide")?;
        Ok(Self::new(
            file.num_features,
            file.num_classes,
            file.base_score,
            file.trees,
        )?)
    }

    /// Build from parts, checking every index.
    ///
    /// # Errors
    /// `Config` naming the offending tree and node.
    pub fn new(
        num_features: usize,
        num_classes: usize,
        base_score: f32,
        trees: Vec<Tree>,
    ) -> Result<Self, CoreError> {
        let vocabulary = Vocabulary::from_len(num_classes).ok_or_else(|| {
            CoreError::Config(format!("num_classes = {num_classes}, attendu 8 ou 16"))
        })?;
        if num_features == 0 {
            return Err(CoreError::Config("num_features doit être > 0".into()));
        }
        for (t, tree) in trees.iter().enumerate() {
            validate_tree(t, tree, num_features, num_classes)?;
        }
        Ok(Self {
            num_features,
            vocabulary,
            base_score,
            trees,
        })
    }

    /// Raw per-class margins.
    #[must_use]
    pub fn margins(&self, features: &[f32]) -> Vec<f32> {
        let mut scores = vec![self.base_score; self.vocabulary.len()];
        for tree in &self.trees {
            scores[tree.class_id] += tree.score(features);
        }
        scores
    }

    #[must_use]
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

fn validate_tree(
    t: usize,
    tree: &Tree,
    num_features: usize,
    num_classes: usize,
) -> Result<(), CoreError> {
    if tree.class_id >= num_classes {
        return Err(CoreError::Config(format!(
            "arbre {t} : class_id {} >= {num_classes}",
            tree.class_id
        )));
    }
    if tree.nodes.is_empty() {
        return Err(CoreError::Config(format!("arbre {t} : aucun nœud")));
    }
    let n = tree.nodes.len();
    for (i, node) in tree.nodes.iter().enumerate() {
        if let Node::Split {
            feature,
            threshold,
            left,
            right,
            ..
        } = node
        {
            if *feature >= num_features {
                return Err(CoreError::Config(format!(
                    "arbre {t}, nœud {i} : feature {feature} >= {num_features}"
                )));
            }
            if !threshold.is_finite() {
                return Err(CoreError::Config(format!(
                    "arbre {t}, nœud {i} : seuil non fini"
                )));
            }
            for child in [*left, *right] {
                if child <= i || child >= n {
                    return Err(CoreError::Config(format!(
                        "arbre {t}, nœud {i} : enfant {child} invalide"
                    )));
                }
            }
        }
    }
    Ok(())
}

impl EmotionModel for TreeEnsemble {
    fn predict(&self, input: &ModelInput) -> Result<PredictionResult> {
        self.check_shape(input)?;
        let index = argmax(&self.margins(input.data()));
        Ok(PredictionResult::Label {
            index,
            vocabulary: self.vocabulary,
        })
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Flat {
            len: self.num_features,
        }
    }

    fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }

    fn name(&self) -> &'static str {
        "tree"
    }
}

//! Model promotion
//!
//! After training every tuned model sits in the trained slot. Promotion
//! copies the best one into production and the rest into staging; the
//! trained originals stay where they are.

mod artifact;
mod slots;

pub use artifact::ModelArtifact;
pub use slots::{ArtifactStore, ProductionSlot};

use crate::error::{PipelineError, Result};
use serde::Serialize;
use tracing::info;

/// Outcome of one promotion
#[derive(Debug, Clone, Serialize)]
pub struct PromotionReport {
    pub production: String,
    pub production_score: f64,
    pub staged: Vec<String>,
}

/// Index of the highest score. Ties go to the earliest entry; NaN never wins
/// over a real score.
pub fn select_best<S: AsRef<str>>(scored: &[(f64, S)]) -> Result<usize> {
    let mut best: Option<usize> = None;
    for (i, (score, _)) in scored.iter().enumerate() {
        let better = match best {
            None => true,
            Some(b) => {
                let current = scored[b].0;
                (current.is_nan() && !score.is_nan()) || *score > current
            }
        };
        if better {
            best = Some(i);
        }
    }
    best.ok_or_else(|| PipelineError::TrainingError("no trained models to promote".to_string()))
}

/// Moves trained artifacts into production and staging
pub struct PromotionManager<'a> {
    store: &'a ArtifactStore,
}

impl<'a> PromotionManager<'a> {
    pub fn new(store: &'a ArtifactStore) -> Self {
        Self { store }
    }

    /// Promote the best-scoring model to production and stage the others
    pub fn promote<S: AsRef<str>>(&self, scored: &[(f64, S)]) -> Result<PromotionReport> {
        let best = select_best(scored)?;
        let (best_score, best_name) = (scored[best].0, scored[best].1.as_ref());
        info!(model = best_name, score = best_score, "Selected best model");

        self.store
            .production()
            .install(&self.store.trained_path(best_name))?;
        // Staging only holds models that are not in production
        self.store.unstage(best_name)?;

        let mut staged = Vec::with_capacity(scored.len().saturating_sub(1));
        for (i, (_, name)) in scored.iter().enumerate() {
            if i == best {
                continue;
            }
            self.store.stage(name.as_ref())?;
            staged.push(name.as_ref().to_string());
        }

        info!(production = best_name, staged = staged.len(), "Promotion complete");
        Ok(PromotionReport {
            production: best_name.to_string(),
            production_score: best_score,
            staged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_best_first_maximum() {
        assert_eq!(select_best(&[(0.7, "A"), (0.9, "B"), (0.9, "C")]).unwrap(), 1);
        assert_eq!(select_best(&[(f64::NAN, "A"), (0.1, "B")]).unwrap(), 1);
        assert_eq!(select_best(&[(f64::NAN, "A")]).unwrap(), 0);
        assert!(select_best::<&str>(&[]).is_err());
    }
}

//! Closed registry of model kinds and the fitted-model enum

use super::decision_tree::{Criterion, DecisionTree};
use super::knn::{DistanceMetric, KNNClassifier, KNNConfig, WeightScheme};
use super::linear_models::LogisticRegression;
use super::metrics::argmax_rows;
use super::naive_bayes::GaussianNaiveBayes;
use super::params::{ParamGrid, ParamSet, ParamType};
use super::random_forest::{MaxFeatures, RandomForest};
use super::xgboost::{XGBoostClassifier, XGBoostConfig};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Model kinds the pipeline knows how to tune. Names match the artifact
/// file stems and the `kind` field of the `[[models]]` config entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    LogisticRegression,
    DecisionTreeClassifier,
    RandomForestClassifier,
    KNeighborsClassifier,
    GaussianNB,
    XGBClassifier,
}

const CRITERIA: &[&str] = &["gini", "entropy"];
const MAX_FEATURES: &[&str] = &["sqrt", "auto", "log2", "all"];
const WEIGHTS: &[&str] = &["uniform", "distance"];
const METRICS: &[&str] = &["euclidean", "manhattan"];

impl ModelKind {
    pub const ALL: [ModelKind; 6] = [
        ModelKind::LogisticRegression,
        ModelKind::DecisionTreeClassifier,
        ModelKind::RandomForestClassifier,
        ModelKind::KNeighborsClassifier,
        ModelKind::GaussianNB,
        ModelKind::XGBClassifier,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "LogisticRegression",
            ModelKind::DecisionTreeClassifier => "DecisionTreeClassifier",
            ModelKind::RandomForestClassifier => "RandomForestClassifier",
            ModelKind::KNeighborsClassifier => "KNeighborsClassifier",
            ModelKind::GaussianNB => "GaussianNB",
            ModelKind::XGBClassifier => "XGBClassifier",
        }
    }

    /// Hyperparameters this kind accepts in a grid, with their expected types
    pub fn accepted_params(&self) -> &'static [(&'static str, ParamType)] {
        match self {
            ModelKind::LogisticRegression => &[
                ("alpha", ParamType::Real),
                ("max_iter", ParamType::Count),
                ("learning_rate", ParamType::Real),
                ("tol", ParamType::Real),
            ],
            ModelKind::DecisionTreeClassifier => &[
                ("criterion", ParamType::Choice(CRITERIA)),
                ("max_depth", ParamType::OptionalCount),
                ("min_samples_split", ParamType::Count),
                ("min_samples_leaf", ParamType::Count),
            ],
            ModelKind::RandomForestClassifier => &[
                ("n_estimators", ParamType::Count),
                ("max_depth", ParamType::OptionalCount),
                ("min_samples_split", ParamType::Count),
                ("min_samples_leaf", ParamType::Count),
                ("max_features", ParamType::Choice(MAX_FEATURES)),
                ("bootstrap", ParamType::Flag),
            ],
            ModelKind::KNeighborsClassifier => &[
                ("n_neighbors", ParamType::Count),
                ("weights", ParamType::Choice(WEIGHTS)),
                ("metric", ParamType::Choice(METRICS)),
            ],
            ModelKind::GaussianNB => &[("var_smoothing", ParamType::Real)],
            ModelKind::XGBClassifier => &[
                ("n_estimators", ParamType::Count),
                ("learning_rate", ParamType::Real),
                ("max_depth", ParamType::Count),
                ("min_child_weight", ParamType::Real),
                ("subsample", ParamType::Real),
                ("colsample_bytree", ParamType::Real),
                ("reg_lambda", ParamType::Real),
                ("reg_alpha", ParamType::Real),
                ("gamma", ParamType::Real),
            ],
        }
    }

    /// Check every grid axis names an accepted parameter and every value
    /// has the right type
    pub fn validate_grid(&self, grid: &ParamGrid) -> Result<()> {
        let accepted = self.accepted_params();
        for (name, values) in grid.iter() {
            let param_type = accepted
                .iter()
                .find(|(accepted_name, _)| accepted_name == name)
                .map(|(_, t)| *t)
                .ok_or_else(|| {
                    PipelineError::ConfigError(format!("{} does not accept parameter '{}'", self.name(), name))
                })?;
            if let Some(bad) = values.iter().find(|v| !param_type.accepts(v)) {
                return Err(PipelineError::ConfigError(format!(
                    "{}: value '{}' is not valid for '{}'",
                    self.name(),
                    bad,
                    name
                )));
            }
        }
        Ok(())
    }

    /// Construct an unfitted model for one parameter assignment
    pub fn build(&self, params: &ParamSet, n_classes: usize, random_state: u64) -> Result<TrainedModel> {
        for (name, _) in params.iter() {
            if !self.accepted_params().iter().any(|(accepted, _)| accepted == name) {
                return Err(PipelineError::invalid_param(name, self.name(), "not accepted by this model"));
            }
        }

        let model = match self {
            ModelKind::LogisticRegression => {
                let mut model = LogisticRegression::new(n_classes);
                if let Some(alpha) = params.real("alpha")? {
                    model = model.with_alpha(alpha);
                }
                if let Some(max_iter) = params.count("max_iter")? {
                    model = model.with_max_iter(max_iter);
                }
                if let Some(lr) = params.real("learning_rate")? {
                    model = model.with_learning_rate(lr);
                }
                if let Some(tol) = params.real("tol")? {
                    model = model.with_tol(tol);
                }
                TrainedModel::LogisticRegression(model)
            }
            ModelKind::DecisionTreeClassifier => {
                let mut model = DecisionTree::new(n_classes);
                if let Some(criterion) = params.choice("criterion")? {
                    model = model.with_criterion(Criterion::parse(&criterion)?);
                }
                if let Some(depth) = params.optional_count("max_depth")? {
                    model = model.with_max_depth(depth);
                }
                if let Some(n) = params.count("min_samples_split")? {
                    model = model.with_min_samples_split(n);
                }
                if let Some(n) = params.count("min_samples_leaf")? {
                    model = model.with_min_samples_leaf(n);
                }
                TrainedModel::DecisionTreeClassifier(model)
            }
            ModelKind::RandomForestClassifier => {
                let n_estimators = params.count("n_estimators")?.unwrap_or(100);
                let mut model = RandomForest::new(n_estimators, n_classes).with_random_state(random_state);
                if let Some(depth) = params.optional_count("max_depth")? {
                    model = model.with_max_depth(depth);
                }
                if let Some(n) = params.count("min_samples_split")? {
                    model = model.with_min_samples_split(n);
                }
                if let Some(n) = params.count("min_samples_leaf")? {
                    model = model.with_min_samples_leaf(n);
                }
                if let Some(mf) = params.choice("max_features")? {
                    model = model.with_max_features(MaxFeatures::parse(&mf)?);
                }
                if let Some(bootstrap) = params.flag("bootstrap")? {
                    model = model.with_bootstrap(bootstrap);
                }
                TrainedModel::RandomForestClassifier(model)
            }
            ModelKind::KNeighborsClassifier => {
                let mut config = KNNConfig::default();
                if let Some(k) = params.count("n_neighbors")? {
                    config.n_neighbors = k;
                }
                if let Some(w) = params.choice("weights")? {
                    config.weights = WeightScheme::parse(&w)?;
                }
                if let Some(m) = params.choice("metric")? {
                    config.metric = DistanceMetric::parse(&m)?;
                }
                TrainedModel::KNeighborsClassifier(KNNClassifier::new(config, n_classes))
            }
            ModelKind::GaussianNB => {
                let mut model = GaussianNaiveBayes::new(n_classes);
                if let Some(s) = params.real("var_smoothing")? {
                    model = model.with_var_smoothing(s);
                }
                TrainedModel::GaussianNB(model)
            }
            ModelKind::XGBClassifier => {
                let defaults = XGBoostConfig::default();
                let config = XGBoostConfig {
                    n_estimators: params.count("n_estimators")?.unwrap_or(defaults.n_estimators),
                    learning_rate: params.real("learning_rate")?.unwrap_or(defaults.learning_rate),
                    max_depth: params.count("max_depth")?.unwrap_or(defaults.max_depth),
                    min_child_weight: params.real("min_child_weight")?.unwrap_or(defaults.min_child_weight),
                    subsample: params.real("subsample")?.unwrap_or(defaults.subsample),
                    colsample_bytree: params.real("colsample_bytree")?.unwrap_or(defaults.colsample_bytree),
                    reg_lambda: params.real("reg_lambda")?.unwrap_or(defaults.reg_lambda),
                    reg_alpha: params.real("reg_alpha")?.unwrap_or(defaults.reg_alpha),
                    gamma: params.real("gamma")?.unwrap_or(defaults.gamma),
                    random_state,
                };
                TrainedModel::XGBClassifier(XGBoostClassifier::new(config, n_classes))
            }
        };
        Ok(model)
    }
}

impl FromStr for ModelKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        ModelKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PipelineError::ModelNotFound(s.to_string()))
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A model of any supported kind, fitted or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    LogisticRegression(LogisticRegression),
    DecisionTreeClassifier(DecisionTree),
    RandomForestClassifier(RandomForest),
    KNeighborsClassifier(KNNClassifier),
    GaussianNB(GaussianNaiveBayes),
    XGBClassifier(XGBoostClassifier),
}

impl TrainedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedModel::LogisticRegression(_) => ModelKind::LogisticRegression,
            TrainedModel::DecisionTreeClassifier(_) => ModelKind::DecisionTreeClassifier,
            TrainedModel::RandomForestClassifier(_) => ModelKind::RandomForestClassifier,
            TrainedModel::KNeighborsClassifier(_) => ModelKind::KNeighborsClassifier,
            TrainedModel::GaussianNB(_) => ModelKind::GaussianNB,
            TrainedModel::XGBClassifier(_) => ModelKind::XGBClassifier,
        }
    }

    /// Fit on features and encoded labels `0..n_classes`
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            TrainedModel::LogisticRegression(m) => m.fit(x, y),
            TrainedModel::DecisionTreeClassifier(m) => m.fit(x, y),
            TrainedModel::RandomForestClassifier(m) => m.fit(x, y),
            TrainedModel::KNeighborsClassifier(m) => m.fit(x, y),
            TrainedModel::GaussianNB(m) => m.fit(x, y),
            TrainedModel::XGBClassifier(m) => m.fit(x, y),
        }
    }

    /// Class probabilities, shape `(n_samples, n_classes)`
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        match self {
            TrainedModel::LogisticRegression(m) => m.predict_proba(x),
            TrainedModel::DecisionTreeClassifier(m) => m.predict_proba(x),
            TrainedModel::RandomForestClassifier(m) => m.predict_proba(x),
            TrainedModel::KNeighborsClassifier(m) => m.predict_proba(x),
            TrainedModel::GaussianNB(m) => m.predict_proba(x),
            TrainedModel::XGBClassifier(m) => m.predict_proba(x),
        }
    }

    /// Encoded class predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(argmax_rows(&self.predict_proba(x)?))
    }
}

//! Model training module
//!
//! Provides the classifiers the model finder can tune:
//! - Logistic regression (one-vs-rest for multiclass)
//! - Decision trees and random forests
//! - K-Nearest Neighbors
//! - Gaussian Naive Bayes
//! - XGBoost-style gradient boosting
//!
//! plus the selection machinery around them: parameter grids, stratified
//! splitting, cross-validation, scoring and grid search.

pub mod cross_validation;
pub mod decision_tree;
pub mod grid_search;
pub mod knn;
pub mod linear_models;
pub mod metrics;
pub mod models;
pub mod naive_bayes;
pub mod params;
pub mod random_forest;
pub mod split;
pub mod xgboost;

pub use cross_validation::{CVResults, CVSplit, CVStrategy, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use grid_search::{GridSearch, SearchResult, TrialResult};
pub use knn::{DistanceMetric, KNNClassifier, KNNConfig, WeightScheme};
pub use linear_models::LogisticRegression;
pub use metrics::{accuracy, argmax_rows, roc_auc, Scoring};
pub use models::{ModelKind, TrainedModel};
pub use naive_bayes::GaussianNaiveBayes;
pub use params::{ParamGrid, ParamSet, ParamType, ParamValue};
pub use random_forest::{MaxFeatures, RandomForest};
pub use split::{train_test_split, SplitData};
pub use xgboost::{XGBoostClassifier, XGBoostConfig};

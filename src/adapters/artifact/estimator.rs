//! Estimators exported from the training pipeline.
//!
//! JSON mirrors of the scikit-learn estimators the screening model is
//! trained with. Structure is validated once at load time so that
//! prediction itself cannot fail.

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureVector, FEATURE_COUNT};

/// sklearn's `TREE_LEAF` marker for absent children.
const TREE_LEAF: i64 = -1;

fn default_classes() -> [i64; 2] {
    [0, 1]
}

/// Per-feature standardization applied before a linear model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Binary logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Output for a non-positive / positive decision function.
    #[serde(default = "default_classes")]
    pub classes: [i64; 2],
}

impl LogisticRegression {
    fn validate(&self) -> Result<(), String> {
        if self.coefficients.len() != FEATURE_COUNT {
            return Err(format!(
                "Expected {FEATURE_COUNT} coefficients, got {}",
                self.coefficients.len()
            ));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err("Non-finite coefficient or intercept".into());
        }
        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != FEATURE_COUNT || scaler.scale.len() != FEATURE_COUNT {
                return Err("Scaler lengths do not match feature count".into());
            }
            if scaler.mean.iter().any(|m| !m.is_finite())
                || scaler.scale.iter().any(|s| !s.is_finite() || *s == 0.0)
            {
                return Err("Scaler has non-finite mean or zero scale".into());
            }
        }
        Ok(())
    }

    /// Linear decision function (log-odds of the positive class).
    #[must_use]
    pub fn decision_function(&self, x: &[f64]) -> f64 {
        let mut z = self.intercept;
        for (i, (xi, wi)) in x.iter().zip(&self.coefficients).enumerate() {
            let xi = match &self.scaler {
                Some(s) => (xi - s.mean[i]) / s.scale[i],
                None => *xi,
            };
            z += wi * xi;
        }
        z
    }

    fn predict(&self, x: &[f64]) -> i64 {
        if self.decision_function(x) > 0.0 {
            self.classes[1]
        } else {
            self.classes[0]
        }
    }
}

/// A fitted decision tree in sklearn's flat-array layout.
///
/// Node `i` is a leaf when `children_left[i] == -1`. Internal nodes send a
/// row left when `x[feature[i]] <= threshold[i]`. `value[i]` holds the
/// class weights observed at the node, aligned with `classes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
    pub classes: Vec<i64>,
}

impl DecisionTree {
    fn node_count(&self) -> usize {
        self.children_left.len()
    }

    fn validate(&self) -> Result<(), String> {
        let n = self.node_count();
        if n == 0 {
            return Err("Decision tree has no nodes".into());
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err("Decision tree arrays differ in length".into());
        }
        if self.classes.is_empty() {
            return Err("Decision tree has no classes".into());
        }

        for i in 0..n {
            let (left, right) = (self.children_left[i], self.children_right[i]);
            if self.value[i].len() != self.classes.len() {
                return Err(format!("Node {i}: value width does not match classes"));
            }
            if left == TREE_LEAF || right == TREE_LEAF {
                if left != right {
                    return Err(format!("Node {i}: only one child is a leaf marker"));
                }
                continue;
            }
            // Children are stored after their parent, which rules out cycles.
            let in_bounds = |c: i64| usize::try_from(c).map_or(false, |c| c > i && c < n);
            if !in_bounds(left) || !in_bounds(right) {
                return Err(format!("Node {i}: child index out of range"));
            }
            if !usize::try_from(self.feature[i]).map_or(false, |f| f < FEATURE_COUNT) {
                return Err(format!("Node {i}: feature index {} out of range", self.feature[i]));
            }
            if !self.threshold[i].is_finite() {
                return Err(format!("Node {i}: non-finite threshold"));
            }
        }
        Ok(())
    }

    /// Class weights at the leaf reached by `x`.
    fn leaf_value(&self, x: &[f64]) -> &[f64] {
        let mut node = 0usize;
        loop {
            let left = self.children_left[node];
            if left == TREE_LEAF {
                return &self.value[node];
            }
            // Indices were range-checked in `validate`.
            let feature = self.feature[node] as usize;
            node = if x[feature] <= self.threshold[node] {
                left as usize
            } else {
                self.children_right[node] as usize
            };
        }
    }

    /// Leaf class weights normalized to proportions.
    fn leaf_proportions(&self, x: &[f64]) -> Vec<f64> {
        let value = self.leaf_value(x);
        let total: f64 = value.iter().sum();
        if total > 0.0 {
            value.iter().map(|v| v / total).collect()
        } else {
            vec![0.0; value.len()]
        }
    }

    fn predict(&self, x: &[f64]) -> i64 {
        self.classes[argmax(self.leaf_value(x))]
    }
}

/// Averaged decision trees (sklearn `RandomForestClassifier`).
///
/// Like sklearn, the forest averages leaf class proportions across trees
/// rather than counting hard votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
    pub classes: Vec<i64>,
}

impl RandomForest {
    fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("Random forest has no trees".into());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|e| format!("Tree {t}: {e}"))?;
            if tree.classes != self.classes {
                return Err(format!("Tree {t}: classes differ from forest classes"));
            }
        }
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> i64 {
        // Summed proportions; dividing by the tree count would not change the argmax.
        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in totals.iter_mut().zip(tree.leaf_proportions(x)) {
                *acc += p;
            }
        }
        self.classes[argmax(&totals)]
    }
}

/// First index of the maximum; ties resolve to the lower index.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Supported estimator kinds, tagged by `kind` in the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

impl Estimator {
    /// Check structural consistency.
    ///
    /// # Errors
    /// Returns a description of the first structural problem found.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::LogisticRegression(m) => m.validate(),
            Self::DecisionTree(m) => m.validate(),
            Self::RandomForest(m) => m.validate(),
        }
    }

    /// Predict the raw class of one row. Requires a validated estimator.
    #[must_use]
    pub fn predict(&self, features: &FeatureVector) -> i64 {
        let x = features.as_slice();
        match self {
            Self::LogisticRegression(m) => m.predict(x),
            Self::DecisionTree(m) => m.predict(x),
            Self::RandomForest(m) => m.predict(x),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LogisticRegression(_) => "logistic_regression",
            Self::DecisionTree(_) => "decision_tree",
            Self::RandomForest(_) => "random_forest",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{build, ClinicalObservation, Feature};

    /// Splits on resting BP at 140, then on cholesterol at 240.
    fn bp_cholesterol_tree() -> DecisionTree {
        DecisionTree {
            children_left: vec![1, -1, 3, -1, -1],
            children_right: vec![2, -1, 4, -1, -1],
            feature: vec![
                Feature::RestingBp.index() as i64,
                -2,
                Feature::Cholesterol.index() as i64,
                -2,
                -2,
            ],
            threshold: vec![140.0, -2.0, 240.0, -2.0, -2.0],
            value: vec![
                vec![50.0, 50.0],
                vec![40.0, 5.0],
                vec![10.0, 45.0],
                vec![8.0, 2.0],
                vec![2.0, 43.0],
            ],
            classes: vec![0, 1],
        }
    }

    fn features(bp: u32, cholesterol: u32) -> FeatureVector {
        build(&ClinicalObservation {
            resting_bp: bp,
            cholesterol,
            ..ClinicalObservation::default()
        })
        .expect("Should build")
    }

    #[test]
    fn test_logistic_regression_identity_scaler() {
        let mut coefficients = vec![0.0; FEATURE_COUNT];
        coefficients[Feature::Age.index()] = 1.0;
        let model = Estimator::LogisticRegression(LogisticRegression {
            scaler: Some(StandardScaler {
                mean: vec![50.0; FEATURE_COUNT],
                scale: vec![1.0; FEATURE_COUNT],
            }),
            coefficients,
            intercept: 0.0,
            classes: [0, 1],
        });
        model.validate().expect("valid");

        let old = build(&ClinicalObservation {
            age: 70,
            ..ClinicalObservation::default()
        })
        .expect("build");
        let young = build(&ClinicalObservation {
            age: 30,
            ..ClinicalObservation::default()
        })
        .expect("build");
        assert_eq!(model.predict(&old), 1);
        assert_eq!(model.predict(&young), 0);
        // Decision function exactly zero maps to the negative class.
        let at_mean = build(&ClinicalObservation::default()).expect("build");
        assert_eq!(model.predict(&at_mean), 0);
    }

    #[test]
    fn test_logistic_regression_rejects_bad_shapes() {
        let model = LogisticRegression {
            scaler: None,
            coefficients: vec![0.1; 9],
            intercept: 0.0,
            classes: [0, 1],
        };
        assert!(model.validate().is_err());

        let model = LogisticRegression {
            scaler: Some(StandardScaler {
                mean: vec![0.0; FEATURE_COUNT],
                scale: vec![0.0; FEATURE_COUNT],
            }),
            coefficients: vec![0.1; FEATURE_COUNT],
            intercept: 0.0,
            classes: [0, 1],
        };
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_decision_tree_traversal() {
        let tree = Estimator::DecisionTree(bp_cholesterol_tree());
        tree.validate().expect("valid");
        assert_eq!(tree.predict(&features(140, 300)), 0);
        assert_eq!(tree.predict(&features(150, 200)), 0);
        assert_eq!(tree.predict(&features(150, 250)), 1);
    }

    #[test]
    fn test_decision_tree_rejects_cycles_and_bad_indices() {
        let mut tree = bp_cholesterol_tree();
        tree.children_left[2] = 0;
        assert!(tree.validate().is_err());

        let mut tree = bp_cholesterol_tree();
        tree.children_right[0] = 9;
        assert!(tree.validate().is_err());

        let mut tree = bp_cholesterol_tree();
        tree.feature[0] = 13;
        assert!(tree.validate().is_err());

        let mut tree = bp_cholesterol_tree();
        tree.children_right[1] = 3;
        assert!(tree.validate().is_err());

        let mut tree = bp_cholesterol_tree();
        tree.value[4] = vec![1.0];
        assert!(tree.validate().is_err());
    }

    #[test]
    fn test_random_forest_averages_proportions() {
        // A single-leaf tree that is confident about class 0 outweighs a
        // tree that barely prefers class 1.
        let stump = |value: Vec<f64>| DecisionTree {
            children_left: vec![-1],
            children_right: vec![-1],
            feature: vec![-2],
            threshold: vec![-2.0],
            value: vec![value],
            classes: vec![0, 1],
        };
        let forest = Estimator::RandomForest(RandomForest {
            trees: vec![stump(vec![9.0, 1.0]), stump(vec![4.0, 6.0]), stump(vec![4.0, 6.0])],
            classes: vec![0, 1],
        });
        forest.validate().expect("valid");
        // mean p(0) = (0.9 + 0.4 + 0.4) / 3 > mean p(1)
        assert_eq!(forest.predict(&features(120, 200)), 0);
    }

    #[test]
    fn test_random_forest_tie_goes_to_lower_class() {
        let forest = RandomForest {
            trees: vec![bp_cholesterol_tree(), {
                let mut t = bp_cholesterol_tree();
                t.value[4] = vec![43.0, 2.0];
                t
            }],
            classes: vec![0, 1],
        };
        forest.validate().expect("valid");
        let model = Estimator::RandomForest(forest);
        assert_eq!(model.predict(&features(150, 250)), 0);
    }

    #[test]
    fn test_artifact_json_shape() {
        let json = r#"{
            "kind": "logistic_regression",
            "coefficients": [0,0,0,0,0,0,0,0,0,0,0,0,0],
            "intercept": 1.5
        }"#;
        let est: Estimator = serde_json::from_str(json).expect("parse");
        assert_eq!(est.kind(), "logistic_regression");
        match &est {
            Estimator::LogisticRegression(m) => {
                assert_eq!(m.classes, [0, 1]);
                assert!(m.scaler.is_none());
            }
            other => panic!("unexpected estimator: {other:?}"),
        }
        est.validate().expect("valid");
        assert_eq!(est.predict(&features(120, 200)), 1);
    }
}

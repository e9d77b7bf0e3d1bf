use cardiotree_io::Table;
use cardiotree_tree::{DecisionTree, Node, NodeIndex, SplitRule};
use serde::Serialize;

use crate::encode::FeatureEncoder;
use crate::error::ModelError;

/// A tree fitted on an encoded table, with the encoding it was fitted under.
#[derive(Debug, Clone, Serialize)]
pub struct FittedModel {
    encoder: FeatureEncoder,
    tree: DecisionTree,
}

/// Share of the total impurity decrease credited to one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableImportance {
    /// Feature column name.
    pub name: String,
    /// Normalized importance; all entries of a model sum to 1.
    pub importance: f64,
}

impl FittedModel {
    pub(crate) fn new(encoder: FeatureEncoder, tree: DecisionTree) -> Self {
        Self { encoder, tree }
    }

    /// Return the feature encoding.
    #[must_use]
    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Return the fitted tree.
    #[must_use]
    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    /// Return the complexity penalty the tree was pruned with.
    #[must_use]
    pub fn penalty(&self) -> f64 {
        self.tree.complexity()
    }

    /// Predict the class index of every row of `table`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | Encoding errors | See [`FeatureEncoder::encode_features`] |
    /// | [`ModelError::Tree`] | An encoded row is rejected by the tree |
    pub fn predict(&self, table: &Table) -> Result<Vec<usize>, ModelError> {
        let rows = self.encoder.encode_features(table)?;
        Ok(self.tree.predict_batch(&rows)?)
    }

    /// Features with a non-zero importance, most important first.
    #[must_use]
    pub fn importance(&self) -> Vec<VariableImportance> {
        let mut out: Vec<VariableImportance> = self
            .tree
            .feature_importances()
            .into_iter()
            .zip(self.encoder.features())
            .filter(|(importance, _)| *importance > 0.0)
            .map(|(importance, feature)| VariableImportance {
                name: feature.name.clone(),
                importance,
            })
            .collect();
        out.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        out
    }

    /// Render the tree as an indented node listing.
    ///
    /// ```text
    /// n= 212
    ///
    /// node), split, n, loss, yval, (yprob)
    ///       * denotes terminal node
    ///
    /// 1) root 212 97 0 (0.5425 0.4575)
    ///   2) thal=normal 117 25 0 (0.7863 0.2137) *
    ///   3) thal=fixed,reversable 95 23 not 0 (0.2421 0.7579) *
    /// ```
    ///
    /// Nodes are numbered from 1 at the root, with children `2n` and `2n + 1`.
    /// `loss` is the number of training rows not in the fitted class.
    #[must_use]
    pub fn render(&self) -> String {
        let root = self.tree.node(NodeIndex::ROOT);
        let mut out = format!(
            "n= {}\n\nnode), split, n, loss, yval, (yprob)\n      * denotes terminal node\n\n",
            root.n_samples()
        );
        self.render_node(&mut out, NodeIndex::ROOT, 1, 0, "root");
        out
    }

    fn render_node(
        &self,
        out: &mut String,
        index: NodeIndex,
        number: u64,
        depth: usize,
        split: &str,
    ) {
        let node = self.tree.node(index);
        let yval = self
            .encoder
            .classes()
            .get(node.prediction())
            .map_or("?", String::as_str);
        let yprob: Vec<String> = node.distribution().iter().map(|p| format!("{p:.4}")).collect();
        out.push_str(&format!(
            "{:indent$}{number}) {split} {} {} {yval} ({})",
            "",
            node.n_samples(),
            node.misclassified(),
            yprob.join(" "),
            indent = depth * 2
        ));

        match node {
            Node::Leaf { .. } => out.push_str(" *\n"),
            Node::Split {
                feature, rule, left, right, ..
            } => {
                out.push('\n');
                let (left_split, right_split) = self.describe(feature.index(), rule);
                self.render_node(out, *left, number * 2, depth + 1, &left_split);
                self.render_node(out, *right, number * 2 + 1, depth + 1, &right_split);
            }
        }
    }

    /// Split labels for the left and right child.
    fn describe(&self, feature: usize, rule: &SplitRule) -> (String, String) {
        let column = &self.encoder.features()[feature];
        match rule {
            SplitRule::Threshold(t) => (
                format!("{}<={t}", column.name),
                format!("{}>{t}", column.name),
            ),
            SplitRule::Categories { left, .. } => {
                let levels = column.levels.as_deref().unwrap_or_default();
                let side = |goes_left: bool| -> String {
                    let names: Vec<&str> = levels
                        .iter()
                        .zip(left)
                        .filter(|&(_, &l)| l == goes_left)
                        .map(|(name, _)| name.as_str())
                        .collect();
                    format!("{}={}", column.name, names.join(","))
                };
                (side(true), side(false))
            }
        }
    }
}

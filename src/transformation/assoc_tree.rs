use crate::{error::TransformError, expression::Expression, pattern::GeneralizedStmt};

pub(crate) type NodeIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Leaf(usize),
    /// The children at the first and at the second variable position
    Branch([NodeIndex; 2]),
}

#[derive(Debug, Clone)]
struct TreeNode {
    expr: Expression,
    shape: Shape,
    leaves: Vec<usize>,
    stale: bool,
}

/// Arena of the binary trees one associative operator builds over its operands.
///
/// Operands are leaves identified by a label. Every node knows the sorted multiset of the
/// labels below it. Nodes are never modified; regrouping allocates new nodes and retires
/// the replaced ones.
#[derive(Debug, Clone)]
pub(crate) struct AssocTree {
    gen: GeneralizedStmt,
    nodes: Vec<TreeNode>,
}

impl AssocTree {
    pub fn new(gen: GeneralizedStmt) -> Self {
        AssocTree {
            gen,
            nodes: Vec::new(),
        }
    }

    pub fn gen(&self) -> &GeneralizedStmt {
        &self.gen
    }

    fn push(&mut self, expr: Expression, shape: Shape, leaves: Vec<usize>) -> NodeIndex {
        self.nodes.push(TreeNode {
            expr,
            shape,
            leaves,
            stale: false,
        });
        self.nodes.len() - 1
    }

    pub fn leaf(&mut self, expr: Expression, label: usize) -> NodeIndex {
        self.push(expr, Shape::Leaf(label), vec![label])
    }

    /// Adds the tree of `node`, taking the operand labels from `labels` in order.
    pub fn build<I>(
        &mut self,
        node: &Expression,
        labels: &mut I,
    ) -> Result<NodeIndex, TransformError>
    where
        I: Iterator<Item = usize>,
    {
        if !self.gen.matches(node) {
            let label = labels
                .next()
                .ok_or_else(|| TransformError::Invariant("operand without label".to_owned()))?;
            return Ok(self.leaf(node.clone(), label));
        }
        let [i, j] = self.gen.var_indexes;
        let first = self.build(&node.children()[i], labels)?;
        let second = self.build(&node.children()[j], labels)?;
        let leaves = merge(&self.nodes[first].leaves, &self.nodes[second].leaves);
        Ok(self.push(node.clone(), Shape::Branch([first, second]), leaves))
    }

    /// Creates the node with `first` at the variable position `side` and `second` at the
    /// other one.
    pub fn join(&mut self, side: usize, first: NodeIndex, second: NodeIndex) -> NodeIndex {
        let expr = self.gen.create_assoc_binary(
            side,
            self.nodes[first].expr.clone(),
            self.nodes[second].expr.clone(),
        );
        let children = if side == 0 {
            [first, second]
        } else {
            [second, first]
        };
        let leaves = merge(&self.nodes[first].leaves, &self.nodes[second].leaves);
        self.push(expr, Shape::Branch(children), leaves)
    }

    pub fn retire(&mut self, node: NodeIndex) {
        self.nodes[node].stale = true;
    }

    pub fn expr(&self, node: NodeIndex) -> &Expression {
        &self.nodes[node].expr
    }

    pub fn leaves(&self, node: NodeIndex) -> &[usize] {
        &self.nodes[node].leaves
    }

    pub fn size(&self, node: NodeIndex) -> usize {
        self.nodes[node].leaves.len()
    }

    pub fn is_leaf(&self, node: NodeIndex) -> bool {
        matches!(self.nodes[node].shape, Shape::Leaf(_))
    }

    pub fn label(&self, node: NodeIndex) -> Option<usize> {
        match self.nodes[node].shape {
            Shape::Leaf(label) => Some(label),
            Shape::Branch(_) => None,
        }
    }

    pub fn children(&self, node: NodeIndex) -> Result<[NodeIndex; 2], TransformError> {
        let n = &self.nodes[node];
        match n.shape {
            _ if n.stale => Err(TransformError::Invariant(format!(
                "node {} was already replaced",
                node
            ))),
            Shape::Branch(children) => Ok(children),
            Shape::Leaf(_) => Err(TransformError::Invariant(format!(
                "node {} is an operand",
                node
            ))),
        }
    }

    pub fn child(&self, node: NodeIndex, side: usize) -> Result<NodeIndex, TransformError> {
        Ok(self.children(node)?[side])
    }
}

/// Merges two sorted multisets.
pub(crate) fn merge(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] <= b[j] {
            result.push(a[i]);
            i += 1;
        } else {
            result.push(b[j]);
            j += 1;
        }
    }
    result.extend_from_slice(&a[i..]);
    result.extend_from_slice(&b[j..]);
    result
}

/// The multiset intersection of two sorted multisets.
pub(crate) fn intersection(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut result = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    result
}

/// `a` without the elements of `b`, both sorted multisets.
pub(crate) fn difference(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut result = Vec::new();
    let mut j = 0;
    for x in a {
        while j < b.len() && b[j] < *x {
            j += 1;
        }
        if j < b.len() && b[j] == *x {
            j += 1;
        } else {
            result.push(*x);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pattern::{ConstSubst, PropertyTemplate},
        test_util::*,
    };

    #[test]
    fn multisets() {
        assert_eq!(merge(&[0, 2, 2], &[1, 2]), vec![0, 1, 2, 2, 2]);
        assert_eq!(intersection(&[0, 1, 1, 3], &[1, 1, 2, 3]), vec![1, 1, 3]);
        assert_eq!(difference(&[0, 1, 1, 3], &[1, 3]), vec![0, 1]);
        assert_eq!(difference(&[1, 2], &[]), vec![1, 2]);
    }

    #[test]
    fn build_and_join() {
        let f = Fixture::arith();
        let node = f.parse("((A + B) + C)");
        let gen = GeneralizedStmt::new(
            f.op("+"),
            ConstSubst::from_node(&node),
            PropertyTemplate::Empty,
            [0, 1],
        );
        let mut tree = AssocTree::new(gen);
        let root = tree.build(&node, &mut vec![2, 0, 1].into_iter()).unwrap();
        assert_eq!(tree.leaves(root), &[0, 1, 2]);
        assert_eq!(tree.expr(root), &node);

        let [ab, c] = tree.children(root).unwrap();
        assert_eq!(tree.label(c), Some(1));
        assert!(tree.is_leaf(c));
        let joined = tree.join(1, ab, c);
        assert_eq!(tree.expr(joined), &f.parse("(C + (A + B))"));
        assert_eq!(tree.child(joined, 1).unwrap(), ab);

        tree.retire(root);
        assert!(tree.children(root).is_err());
        assert!(tree.children(c).is_err());
        assert!(tree.build(&node, &mut std::iter::empty::<usize>()).is_err());
    }
}

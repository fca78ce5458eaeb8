use crate::{expression::Expression, library::Library, pattern::GeneralizedStmt};
use std::cmp::Ordering;

/// The total order canonical forms are sorted by. Applications of the same head compare
/// their children lexicographically, different heads compare by declaration order.
///
/// ```
/// use mmtransform::library::Library;
/// use mmtransform::transformation::compare_nodes;
/// use mmtransform::Expression;
/// use std::cmp::Ordering;
///
/// let mut library = Library::new();
/// let class = library.add_type("class".to_owned()).unwrap();
/// let a = Expression::leaf(library.add_variable("A".to_owned(), class).unwrap());
/// let b = Expression::leaf(library.add_variable("B".to_owned(), class).unwrap());
/// let plus = library.add_operator("+".to_owned(), class, 2).unwrap();
///
/// let ab = Expression::new(plus, vec![a.clone(), b.clone()]);
/// let ba = Expression::new(plus, vec![b.clone(), a.clone()]);
/// assert_eq!(compare_nodes(&library, &a, &b), Ordering::Less);
/// assert_eq!(compare_nodes(&library, &ba, &ab), Ordering::Greater);
/// assert_eq!(compare_nodes(&library, &ab, &a), Ordering::Greater);
/// ```
pub fn compare_nodes(library: &Library, a: &Expression, b: &Expression) -> Ordering {
    if a.head() != b.head() {
        return library
            .seq(a.head())
            .cmp(&library.seq(b.head()))
            .then(a.head().cmp(&b.head()));
    }
    for (x, y) in a.children().iter().zip(b.children()) {
        match compare_nodes(library, x, y) {
            Ordering::Equal => {}
            ordering => return ordering,
        }
    }
    a.arity().cmp(&b.arity())
}

/// The operands of a chain of applications of one associative operator, e.g. `a`, `b`, `c`
/// and `d` for `(a + (b + c)) + d`, in their order of appearance.
pub fn collect_operands(gen: &GeneralizedStmt, node: &Expression) -> Vec<Expression> {
    let mut operands = Vec::new();
    push_operands(gen, node, &mut operands);
    operands
}

fn push_operands(gen: &GeneralizedStmt, node: &Expression, operands: &mut Vec<Expression>) {
    if gen.matches(node) {
        for i in gen.var_indexes {
            push_operands(gen, &node.children()[i], operands);
        }
    } else {
        operands.push(node.clone());
    }
}

/// Builds `((o1 . o2) . o3) . ...` from the operands.
pub fn left_comb(gen: &GeneralizedStmt, operands: Vec<Expression>) -> Option<Expression> {
    operands
        .into_iter()
        .reduce(|acc, operand| gen.create_binary(acc, operand))
}

/// Numbers the distinct canonical operands of two trees in canonical order, so that
/// operands can be compared by index.
#[derive(Debug, Clone)]
pub(crate) struct CanonicalOperandHelper<'l> {
    library: &'l Library,
    operands: Vec<Expression>,
}

impl<'l> CanonicalOperandHelper<'l> {
    pub fn new<I: IntoIterator<Item = Expression>>(library: &'l Library, operands: I) -> Self {
        let mut operands: Vec<Expression> = operands.into_iter().collect();
        operands.sort_by(|a, b| compare_nodes(library, a, b));
        operands.dedup();
        CanonicalOperandHelper { library, operands }
    }

    pub fn index(&self, canonical: &Expression) -> Option<usize> {
        self.operands
            .binary_search_by(|o| compare_nodes(self.library, o, canonical))
            .ok()
    }

    pub fn indexes(&self, canonical: &[Expression]) -> Option<Vec<usize>> {
        canonical.iter().map(|c| self.index(c)).collect()
    }
}

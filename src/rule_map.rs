use crate::{
    expression::Expression,
    pattern::{ConstSubst, PropertyTemplate},
    types::*,
};
use std::collections::{hash_map::Entry, HashMap};

/// The composite key rules are indexed by
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RuleKey {
    pub op: Identifier,
    pub const_subst: ConstSubst,
    pub template: PropertyTemplate,
}

impl RuleKey {
    pub fn new(op: Identifier, const_subst: ConstSubst, template: PropertyTemplate) -> Self {
        RuleKey {
            op,
            const_subst,
            template,
        }
    }
}

/// Rule data indexed by [`RuleKey`]. Keys of the same operator are additionally kept in
/// insertion order, which makes [`visit`](Self::visit) deterministic.
#[derive(Debug, Clone)]
pub struct ComplexRuleMap<D> {
    entries: HashMap<RuleKey, D>,
    by_operator: HashMap<Identifier, Vec<RuleKey>>,
}

impl<D> Default for ComplexRuleMap<D> {
    fn default() -> Self {
        ComplexRuleMap {
            entries: HashMap::new(),
            by_operator: HashMap::new(),
        }
    }
}

impl<D> ComplexRuleMap<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RuleKey) -> Option<&D> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &RuleKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts `data` unless the key is already taken. On a collision the existing data is
    /// kept and returned.
    pub fn add(&mut self, key: RuleKey, data: D) -> Option<&D> {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => Some(entry.into_mut()),
            Entry::Vacant(entry) => {
                self.by_operator
                    .entry(entry.key().op)
                    .or_default()
                    .push(entry.key().clone());
                entry.insert(data);
                None
            }
        }
    }

    pub fn get_or_insert_with<F: FnOnce() -> D>(&mut self, key: RuleKey, f: F) -> &mut D {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.by_operator
                    .entry(entry.key().op)
                    .or_default()
                    .push(entry.key().clone());
                entry.insert(f())
            }
        }
    }

    /// Calls `visitor` for every key of `node`'s operator whose constant slots match `node`,
    /// in insertion order, together with the variable positions. Stops at the first
    /// `Some`.
    pub fn visit<R, F>(&self, node: &Expression, mut visitor: F) -> Option<R>
    where
        F: FnMut(&RuleKey, &[usize], &D) -> Option<R>,
    {
        let keys = self.by_operator.get(&node.head())?;
        for key in keys {
            let places = match key.const_subst.check_and_get_var_positions(node) {
                Some(places) => places,
                None => continue,
            };
            if let Some(data) = self.entries.get(key) {
                if let Some(result) = visitor(key, &places, data) {
                    return Some(result);
                }
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RuleKey, &D)> {
        self.entries.iter()
    }
}

/// Limits and switches for one [`TransformationManager`](crate::manager::TransformationManager).
///
/// ```
/// use mmtransform::config::TransformConfig;
///
/// let config = TransformConfig::default().with_max_depth(64).with_closure_transformation(false);
/// assert_eq!(config.max_depth, 64);
/// assert_eq!(config.max_new_steps, TransformConfig::default().max_new_steps);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformConfig {
    /// Maximum nesting of canonicalization and rewrite calls before the search is aborted
    pub max_depth: usize,
    /// Maximum number of steps one search may add to a worksheet
    pub max_new_steps: usize,
    /// Whether derivation steps of the form _P(node)_ are proven by closure rules
    pub closure_transformation: bool,
    /// Whether a derivation step _ph -> core_ lets steps be derived under the prefix _ph_
    pub implication_prefix: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        TransformConfig {
            max_depth: 512,
            max_new_steps: 10_000,
            closure_transformation: true,
            implication_prefix: true,
        }
    }
}

impl TransformConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_new_steps(mut self, max_new_steps: usize) -> Self {
        self.max_new_steps = max_new_steps;
        self
    }

    pub fn with_closure_transformation(mut self, enabled: bool) -> Self {
        self.closure_transformation = enabled;
        self
    }

    pub fn with_implication_prefix(mut self, enabled: bool) -> Self {
        self.implication_prefix = enabled;
        self
    }
}

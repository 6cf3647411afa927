/// Limits applied while walking an atom tree.
///
/// ```
/// use moovtree::ParseOptions;
///
/// let opts = ParseOptions::new().max_depth(8).max_atoms_per_level(64);
/// assert_eq!(opts.max_depth, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Siblings read at one level before the walker gives up on that level.
    pub max_atoms_per_level: usize,
    /// Deepest branch nesting followed before the parse fails.
    pub max_depth: usize,
    /// Byte budget for the root level.
    pub root_budget: u64,
}

impl ParseOptions {
    pub const DEFAULT_MAX_ATOMS_PER_LEVEL: usize = 128;
    pub const DEFAULT_MAX_DEPTH: usize = 32;
    pub const DEFAULT_ROOT_BUDGET: u64 = 0xFFFF_FFFF;

    pub const fn new() -> Self {
        Self {
            max_atoms_per_level: Self::DEFAULT_MAX_ATOMS_PER_LEVEL,
            max_depth: Self::DEFAULT_MAX_DEPTH,
            root_budget: Self::DEFAULT_ROOT_BUDGET,
        }
    }

    pub const fn max_atoms_per_level(mut self, n: usize) -> Self {
        self.max_atoms_per_level = n;
        self
    }

    pub const fn max_depth(mut self, n: usize) -> Self {
        self.max_depth = n;
        self
    }

    pub const fn root_budget(mut self, n: u64) -> Self {
        self.root_budget = n;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::new()
    }
}

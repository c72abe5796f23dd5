/// Default limit for nested conditions, endpoints and `$ref` expansions.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default limit for the number of items produced by `$ref` expansion in one parse.
pub const DEFAULT_MAX_EXPANDED_ITEMS: usize = 100_000;

/// Knobs for a single parse call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Nesting beyond this many levels fails with `TooDeeplyNested`.
    pub max_depth: usize,
    /// Every `$ref` splices copies of its definition in place; once the copies made in
    /// one parse exceed this count the parse fails with `TooManyExpansions`.
    pub max_expanded_items: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_expanded_items: DEFAULT_MAX_EXPANDED_ITEMS,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_max_expanded_items(mut self, max_expanded_items: usize) -> Self {
        self.max_expanded_items = max_expanded_items;
        self
    }
}

pub mod sort;
pub mod validate;

pub use sort::{SortedTask, tier_batches, tiered_order};
pub use validate::{GraphIssue, GraphReport, check_acyclic, check_references, validate};

/// DFS marking shared by the validator and the sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Visited,
}

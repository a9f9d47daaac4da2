/// Node ids inside a workflow graph. LiteGraph and the API format both use
/// integers (the API format stores them as string keys).
pub type NodeId = i64;

/// Link ids inside a workflow graph.
pub type LinkId = i64;

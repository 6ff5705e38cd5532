mod store;
mod types;

pub use store::SimpleGraph;
pub use types::{
    AttributeBag, Direction, Edge, EdgeSpec, ID_KEY, NewNode, Node, RowKind, TraversalRow,
};
pub(crate) use types::{encode_bag, merge_bags, parse_bag, resolve_identity};

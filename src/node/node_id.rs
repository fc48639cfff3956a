use serde::{Deserialize, Serialize};

/// Position of a node in the ring, 1..N
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, PartialOrd, Ord, Eq, Hash,
)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(NodeId)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validates that a node id can take part in a ring
pub fn validate_node_id(node_id: NodeId) -> bool {
    node_id.0 > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_parse_and_display() {
        let id: NodeId = "3".parse().unwrap();
        assert_eq!(id, NodeId::new(3));
        assert_eq!(id.to_string(), "3");
        assert!("three".parse::<NodeId>().is_err());
        assert!("-1".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_validate_node_id() {
        assert!(validate_node_id(NodeId::new(1)));
        assert!(!validate_node_id(NodeId::new(0)));
    }
}

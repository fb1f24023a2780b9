use std::collections::{HashMap, VecDeque};

use crate::network::TopologyStore;
use crate::types::Node;

/// Hop-count shortest path from `source` to `target`, both ends included.
///
/// Breadth-first search over outgoing edges. Neighbours are expanded in `Node`
/// order, so among equal-length paths the one through the smallest nodes at
/// the earliest hops is returned, and always the same one for a given graph.
pub fn shortest_path(topology: &TopologyStore, source: Node, target: Node) -> Option<Vec<Node>> {
    if !topology.contains(&source) || !topology.contains(&target) {
        return None;
    }

    let mut previous: HashMap<Node, Node> = HashMap::new();
    let mut queue = VecDeque::from([source]);

    while let Some(current) = queue.pop_front() {
        if current == target {
            return Some(reconstruct_path(&previous, source, target));
        }

        for neighbor in topology.neighbors(&current) {
            if neighbor == source || previous.contains_key(&neighbor) {
                continue;
            }
            previous.insert(neighbor, current);
            queue.push_back(neighbor);
        }
    }

    None
}

fn reconstruct_path(previous: &HashMap<Node, Node>, source: Node, target: Node) -> Vec<Node> {
    let mut path = vec![target];
    let mut current = target;

    while current != source {
        match previous.get(&current) {
            Some(&prev) => {
                path.push(prev);
                current = prev;
            }
            None => break,
        }
    }

    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LinkDescriptor, TopologySnapshot};
    use pnet::util::MacAddr;

    fn ring() -> TopologyStore {
        // 1 - 2 - 3 - 4 - 1
        let mut links = Vec::new();
        links.extend(LinkDescriptor::bidirectional(1, 1, 2, 1));
        links.extend(LinkDescriptor::bidirectional(2, 2, 3, 1));
        links.extend(LinkDescriptor::bidirectional(3, 2, 4, 1));
        links.extend(LinkDescriptor::bidirectional(4, 2, 1, 2));
        let mut topology = TopologyStore::new();
        topology.apply_snapshot(&TopologySnapshot {
            switches: vec![1, 2, 3, 4],
            links,
        });
        topology
    }

    #[test]
    fn finds_fewest_hops() {
        let topology = ring();
        let path = shortest_path(&topology, Node::Switch(1), Node::Switch(4)).unwrap();
        assert_eq!(path, vec![Node::Switch(1), Node::Switch(4)]);
    }

    #[test]
    fn equal_length_ties_are_deterministic() {
        let topology = ring();
        let first = shortest_path(&topology, Node::Switch(1), Node::Switch(3)).unwrap();
        assert_eq!(first, vec![Node::Switch(1), Node::Switch(2), Node::Switch(3)]);

        for _ in 0..10 {
            assert_eq!(shortest_path(&topology, Node::Switch(1), Node::Switch(3)).unwrap(), first);
        }
    }

    #[test]
    fn follows_edge_direction() {
        let mut topology = TopologyStore::new();
        topology.apply_snapshot(&TopologySnapshot {
            switches: vec![1, 2],
            links: vec![LinkDescriptor::new(1, 2, 1)],
        });
        assert!(shortest_path(&topology, Node::Switch(1), Node::Switch(2)).is_some());
        assert!(shortest_path(&topology, Node::Switch(2), Node::Switch(1)).is_none());
    }

    #[test]
    fn unknown_or_disconnected_nodes_have_no_path() {
        let mut topology = ring();
        topology.apply_snapshot(&TopologySnapshot {
            switches: vec![9],
            links: vec![],
        });
        let stranger = Node::Host(MacAddr::new(0, 0, 0, 0, 0, 0xff));

        assert!(shortest_path(&topology, Node::Switch(1), stranger).is_none());
        assert!(shortest_path(&topology, Node::Switch(1), Node::Switch(9)).is_none());
    }

    #[test]
    fn path_to_self_is_a_single_node() {
        let topology = ring();
        assert_eq!(
            shortest_path(&topology, Node::Switch(2), Node::Switch(2)),
            Some(vec![Node::Switch(2)])
        );
    }
}

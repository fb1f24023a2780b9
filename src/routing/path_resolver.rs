use std::collections::HashMap;

use log::debug;
use pnet::util::MacAddr;

use crate::algorithms::bfs;
use crate::error::{ControllerError, Result};
use crate::network::TopologyStore;
use crate::types::Node;

#[derive(Debug, Clone)]
struct CachedPath {
    path: Vec<Node>,
    version: u64,
}

/// Memoized host-to-host shortest paths.
///
/// A path runs from the source host through its attachment switch and on to
/// the destination host. With invalidation enabled every entry computed
/// against an older topology version is dropped the first time the resolver
/// sees a newer one; with it disabled entries live for the lifetime of the
/// resolver.
#[derive(Debug, Clone)]
pub struct PathResolver {
    cache: HashMap<(MacAddr, MacAddr), CachedPath>,
    invalidate_on_topology_change: bool,
    seen_version: u64,
    computations: u64,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PathResolver {
    pub fn new(invalidate_on_topology_change: bool) -> Self {
        Self {
            cache: HashMap::new(),
            invalidate_on_topology_change,
            seen_version: 0,
            computations: 0,
        }
    }

    pub fn resolve(
        &mut self,
        topology: &TopologyStore,
        src: MacAddr,
        dst: MacAddr,
    ) -> Result<Vec<Node>> {
        if self.invalidate_on_topology_change && topology.version() != self.seen_version {
            self.evict_stale(topology.version());
        }

        let key = (src, dst);
        if let Some(cached) = self.cache.get(&key) {
            check_endpoints(&cached.path, src, dst)?;
            return Ok(cached.path.clone());
        }

        let source = Node::Host(src);
        let destination = Node::Host(dst);
        if !topology.contains(&destination) || !topology.contains(&source) {
            return Err(ControllerError::NoPath { src, dst });
        }

        self.computations += 1;
        let path = bfs::shortest_path(topology, source, destination)
            .ok_or(ControllerError::NoPath { src, dst })?;
        check_endpoints(&path, src, dst)?;

        debug!("Resolved path {} -> {}: {:?}", src, dst, path);
        self.cache.insert(
            key,
            CachedPath {
                path: path.clone(),
                version: topology.version(),
            },
        );
        Ok(path)
    }

    fn evict_stale(&mut self, version: u64) {
        let before = self.cache.len();
        self.cache.retain(|_, cached| cached.version == version);
        if self.cache.len() < before {
            debug!(
                "Topology moved to version {}, dropped {} cached paths",
                version,
                before - self.cache.len()
            );
        }
        self.seen_version = version;
    }

    #[cfg(test)]
    pub(crate) fn insert_cached(
        &mut self,
        src: MacAddr,
        dst: MacAddr,
        path: Vec<Node>,
        version: u64,
    ) {
        self.cache.insert((src, dst), CachedPath { path, version });
    }

    /// Number of path searches performed so far.
    pub fn computations(&self) -> u64 {
        self.computations
    }

    pub fn cached_paths(&self) -> usize {
        self.cache.len()
    }
}

/// A usable path starts at the source host and ends at the destination host.
fn check_endpoints(path: &[Node], src: MacAddr, dst: MacAddr) -> Result<()> {
    if path.first() != Some(&Node::Host(src)) || path.last() != Some(&Node::Host(dst)) {
        return Err(ControllerError::TopologyCorrupted(format!(
            "path from {} to {} is {:?}",
            src, dst, path
        )));
    }
    Ok(())
}

/*
 * This module defines the node/edge data model shared by the topology
 * engine and the probe machinery: device categories, network locations,
 * connection kinds, reachability state and derived connection edges.
 */

pub mod edge;
pub mod node;

//! Automaton compilation.
//!
//! Compilation runs on mutable builder nodes whose edges live in hash maps,
//! then freezes the result into the immutable arena form the matcher walks:
//!
//! 1. goto construction: one trie path per alternative, outputs accumulated
//!    on terminal nodes with value-equality dedup;
//! 2. failure links by breadth-first traversal, merging each node's fail
//!    chain into its output list;
//! 3. freeze: pack each edge map into the configured transition table.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::{Automaton, Links, Node, NodeId, Output};
use crate::precon::PreconPool;
use crate::{Error, Sequence};

struct BuilderNode {
    edges: FxHashMap<u8, NodeId>,
    fail: NodeId,
    outputs: SmallVec<[Output; 2]>,
    out_max: i64,
    out_max_len: u32,
}

impl BuilderNode {
    fn new() -> Self {
        BuilderNode {
            edges: FxHashMap::default(),
            fail: NodeId::ROOT,
            outputs: SmallVec::new(),
            out_max: 0,
            out_max_len: 0,
        }
    }
}

pub(crate) fn compile(sequences: &[Sequence]) -> Result<Automaton, Error> {
    validate(sequences)?;
    let mut builder = Builder {
        nodes: vec![BuilderNode::new()],
    };
    let max_anchor = builder.add_gotos(sequences);
    builder.add_fails();
    Ok(builder.freeze(sequences, max_anchor))
}

fn validate(sequences: &[Sequence]) -> Result<(), Error> {
    for (si, seq) in sequences.iter().enumerate() {
        if seq.choices().is_empty() {
            return Err(Error::EmptySequence { sequence: si });
        }
        if seq.max_offsets().len() != seq.choices().len() {
            return Err(Error::OffsetCountMismatch { sequence: si });
        }
        for (ci, choice) in seq.choices().iter().enumerate() {
            if choice.is_empty() {
                return Err(Error::EmptyChoice {
                    sequence: si,
                    choice: ci,
                });
            }
            if choice.iter().any(|alt| alt.is_empty()) {
                return Err(Error::EmptyPattern {
                    sequence: si,
                    choice: ci,
                });
            }
        }
    }
    Ok(())
}

struct Builder {
    nodes: Vec<BuilderNode>,
}

impl Builder {
    /// Install one trie path per alternative and accumulate outputs on the
    /// terminal nodes. Returns the largest bounded anchor offset, or -1 once
    /// any sequence's anchor is unbounded.
    fn add_gotos(&mut self, sequences: &[Sequence]) -> i64 {
        let mut max_anchor = 0i64;
        for (id, seq) in sequences.iter().enumerate() {
            for (i, choice) in seq.choices().iter().enumerate() {
                for alt in choice {
                    let mut curr = NodeId::ROOT;
                    for &byte in alt {
                        curr = self.child_or_insert(curr, byte);
                    }
                    self.note_output(
                        curr,
                        Output {
                            max: seq.max_offsets()[i],
                            seq: id as u32,
                            sub: i as u32,
                            len: alt.len() as u32,
                        },
                    );
                }
            }
            let anchor = seq.max_offsets()[0];
            if anchor < 0 {
                max_anchor = -1;
            } else if max_anchor >= 0 && anchor > max_anchor {
                max_anchor = anchor;
            }
        }
        max_anchor
    }

    fn child_or_insert(&mut self, parent: NodeId, byte: u8) -> NodeId {
        if let Some(&child) = self.nodes[parent.index()].edges.get(&byte) {
            return child;
        }
        let child = NodeId::from_index(self.nodes.len());
        self.nodes.push(BuilderNode::new());
        self.nodes[parent.index()].edges.insert(byte, child);
        child
    }

    /// Append an output unless a value-equal record is already present,
    /// keeping the node's cached extrema current. The -1 (unbounded) offset
    /// is sticky in `out_max`.
    fn note_output(&mut self, id: NodeId, out: Output) {
        let node = &mut self.nodes[id.index()];
        if node.outputs.contains(&out) {
            return;
        }
        if node.outputs.is_empty() {
            node.out_max = out.max;
        } else if node.out_max != -1 && (out.max == -1 || out.max > node.out_max) {
            node.out_max = out.max;
        }
        node.out_max_len = node.out_max_len.max(out.len);
        node.outputs.push(out);
    }

    /// Breadth-first failure-link installation and output merging.
    ///
    /// For each edge `p --byte--> n`: walk p's fail chain to the first node
    /// with a `byte` transition; that target (unless it is n itself) becomes
    /// `fail(n)`. Then every node on n's fail chain contributes its outputs
    /// to n, value-unique, in chain order.
    fn add_fails(&mut self) {
        let mut queue = VecDeque::new();
        queue.push_back(NodeId::ROOT);
        while let Some(pop) = queue.pop_front() {
            let edges: Vec<(u8, NodeId)> = self.nodes[pop.index()]
                .edges
                .iter()
                .map(|(&b, &n)| (b, n))
                .collect();
            for (byte, node) in edges {
                queue.push_back(node);

                let mut fail = self.nodes[pop.index()].fail;
                while fail != NodeId::ROOT
                    && !self.nodes[fail.index()].edges.contains_key(&byte)
                {
                    fail = self.nodes[fail.index()].fail;
                }
                let target = self.nodes[fail.index()]
                    .edges
                    .get(&byte)
                    .copied()
                    .unwrap_or(NodeId::NONE);
                self.nodes[node.index()].fail = if !target.is_none() && target != node {
                    target
                } else {
                    NodeId::ROOT
                };

                let mut chain = self.nodes[node.index()].fail;
                while chain != NodeId::ROOT {
                    let merged = self.nodes[chain.index()].outputs.clone();
                    for out in merged {
                        self.note_output(node, out);
                    }
                    chain = self.nodes[chain.index()].fail;
                }
            }
        }
    }

    /// Pack the builder nodes into the immutable arena, pairing it with the
    /// precondition pool shaped to the sequence list.
    fn freeze(self, sequences: &[Sequence], max_anchor: i64) -> Automaton {
        let nodes = self
            .nodes
            .into_iter()
            .map(|bn| {
                let mut pairs: Vec<(u8, NodeId)> = bn.edges.into_iter().collect();
                pairs.sort_unstable_by_key(|&(b, _)| b);
                Node {
                    links: Links::from_sorted(&pairs),
                    fail: bn.fail,
                    outputs: bn.outputs,
                    out_max: bn.out_max,
                    out_max_len: bn.out_max_len,
                }
            })
            .collect();
        let shape: Vec<u32> = sequences
            .iter()
            .map(|s| s.choices().len() as u32)
            .collect();
        Automaton::new(nodes, max_anchor, PreconPool::new(shape))
    }
}

//! Construction invariants for the automaton.

use super::{Automaton, NodeId};
use crate::{Matcher, Sequence};

fn single(max: i64, pattern: &str) -> Sequence {
    Sequence::simple(max, pattern.as_bytes())
}

fn compile(seqs: &[Sequence]) -> Automaton {
    Automaton::compile(seqs).unwrap()
}

/// Walk goto links along `path`, asserting every hop exists.
fn node_at(automaton: &Automaton, path: &[u8]) -> NodeId {
    let mut curr = NodeId::ROOT;
    for &byte in path {
        curr = automaton.node(curr).links.get(byte);
        assert!(!curr.is_none(), "no node for path {:?}", path);
    }
    curr
}

fn fail_of(automaton: &Automaton, path: &[u8]) -> NodeId {
    automaton.node(node_at(automaton, path)).fail
}

#[test]
fn shared_prefixes_collapse() {
    let automaton = compile(&[single(64, "abc"), single(64, "abd")]);
    // root, a, ab, abc, abd
    assert_eq!(automaton.node_count(), 5);
}

#[test]
fn fail_links_point_to_deepest_proper_suffix() {
    let seqs: Vec<Sequence> = ["a", "ab", "bc", "bca", "c", "caa"]
        .iter()
        .map(|p| single(64, p))
        .collect();
    let automaton = compile(&seqs);

    assert_eq!(fail_of(&automaton, b"a"), NodeId::ROOT);
    assert_eq!(fail_of(&automaton, b"b"), NodeId::ROOT);
    assert_eq!(fail_of(&automaton, b"c"), NodeId::ROOT);
    assert_eq!(fail_of(&automaton, b"ab"), node_at(&automaton, b"b"));
    assert_eq!(fail_of(&automaton, b"bc"), node_at(&automaton, b"c"));
    assert_eq!(fail_of(&automaton, b"ca"), node_at(&automaton, b"a"));
    assert_eq!(fail_of(&automaton, b"bca"), node_at(&automaton, b"ca"));
    // "caa" has no suffix node longer than "a".
    assert_eq!(fail_of(&automaton, b"caa"), node_at(&automaton, b"a"));
}

#[test]
fn outputs_merged_from_fail_chain() {
    let seqs: Vec<Sequence> = ["a", "ab", "bc", "bca", "c", "caa"]
        .iter()
        .map(|p| single(64, p))
        .collect();
    let automaton = compile(&seqs);

    // Direct output first, then the chain contribution.
    let bc = automaton.node(node_at(&automaton, b"bc"));
    let labels: Vec<(u32, u32)> = bc.outputs.iter().map(|o| (o.seq, o.sub)).collect();
    assert_eq!(labels, vec![(2, 0), (4, 0)]);

    let bca = automaton.node(node_at(&automaton, b"bca"));
    let labels: Vec<(u32, u32)> = bca.outputs.iter().map(|o| (o.seq, o.sub)).collect();
    assert_eq!(labels, vec![(3, 0), (0, 0)]);
}

#[test]
fn outputs_are_value_unique() {
    // A duplicate alternative inside one choice lands on the same terminal
    // node and must not duplicate the record.
    let seq = Sequence::new(vec![64], vec![vec![b"abc".to_vec(), b"abc".to_vec()]]);
    let automaton = compile(&[seq]);
    assert_eq!(automaton.node(node_at(&automaton, b"abc")).outputs.len(), 1);

    // Merging "a" into "aa" twice (direct BFS merge plus the chain through
    // the depth-1 node) must also keep records unique.
    let automaton = compile(&[single(64, "a"), single(64, "aa")]);
    let aa = automaton.node(node_at(&automaton, b"aa"));
    let labels: Vec<(u32, u32)> = aa.outputs.iter().map(|o| (o.seq, o.sub)).collect();
    assert_eq!(labels, vec![(1, 0), (0, 0)]);
}

#[test]
fn out_max_tracks_arithmetic_maximum() {
    let automaton = compile(&[single(5, "x"), single(9, "x"), single(2, "yx")]);
    let x = automaton.node(node_at(&automaton, b"x"));
    assert_eq!(x.out_max, 9);
    assert_eq!(x.out_max_len, 1);

    // "yx" fails to "x" and inherits its records; the caches cover both the
    // direct and the merged outputs.
    let yx = automaton.node(node_at(&automaton, b"yx"));
    assert_eq!(yx.outputs.len(), 3);
    assert_eq!(yx.out_max, 9);
    assert_eq!(yx.out_max_len, 2);
}

#[test]
fn out_max_unbounded_is_sticky() {
    let automaton = compile(&[single(5, "x"), single(-1, "x"), single(3, "x")]);
    let x = automaton.node(node_at(&automaton, b"x"));
    assert_eq!(x.out_max, -1);
    assert_eq!(x.outputs.len(), 3);
    // Stored order is insertion order; the bounded record stays first.
    assert_eq!(x.outputs[0].max, 5);
}

#[test]
fn max_anchor_covers_anchor_choices_only() {
    let tail_heavy = Sequence::new(
        vec![0, 99],
        vec![vec![b"a".to_vec()], vec![b"b".to_vec()]],
    );
    let automaton = compile(&[tail_heavy.clone(), single(8, "c")]);
    assert_eq!(automaton.max_anchor(), 8);

    let automaton = compile(&[tail_heavy, single(8, "c"), single(-1, "d")]);
    assert_eq!(automaton.max_anchor(), -1);
}

#[test]
fn empty_sequence_list_compiles_to_bare_root() {
    let automaton = compile(&[]);
    assert_eq!(automaton.node_count(), 1);
    assert_eq!(automaton.max_anchor(), 0);
}

#[test]
fn recompilation_is_pure() {
    let seqs = vec![
        Sequence::new(
            vec![0, 18, -1],
            vec![
                vec![b"The".to_vec()],
                vec![b"pot".to_vec()],
                vec![b"l".to_vec()],
            ],
        ),
        single(-1, "The"),
        Sequence::new(
            vec![8, -1],
            vec![vec![b"had".to_vec()], vec![b"ndle".to_vec()]],
        ),
    ];
    let input = b"The pot had a handle";

    let first = Matcher::new(&seqs).unwrap();
    let second = Matcher::new(&seqs).unwrap();
    let a: Vec<_> = first.scan(&input[..]).collect();
    let b: Vec<_> = second.scan(&input[..]).collect();
    assert_eq!(a, b);
}

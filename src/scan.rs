//! Streaming scan sessions.
//!
//! A [`Scan`] walks bytes from a caller-supplied reader through a compiled
//! automaton and yields matches lazily, in detection order. Sessions run in
//! up to two phases:
//!
//! 1. **Primary.** Every byte advances the cursor via goto/fail links and the
//!    surviving outputs of the reached node are emitted. When every anchor
//!    bound has been passed while the cursor sits at root, no signature can
//!    start matching any more: the session emits the `(-1, -1)` resume
//!    sentinel and suspends.
//! 2. **Wild (optional).** The caller answers the sentinel with
//!    [`Scan::submit_wild`]. The wild list is compiled into a fresh
//!    automaton and scanning continues on the same reader; offsets keep
//!    counting from the start of the stream.
//!
//! Iterating past the sentinel without submitting, submitting an empty list,
//! or dropping the session all release its resources and end the stream.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use crate::automaton::{Automaton, NodeId};
use crate::precon::Precons;
use crate::{Error, Match, Matcher, Sequence};

const SOURCE_BUF_LEN: usize = 8 * 1024;

/// Progress sentinels fire at power-of-two offsets from here up.
const PROGRESS_FLOOR: i64 = 1024;

/// Buffered byte-at-a-time adapter over a reader.
///
/// Interrupted reads are retried; any other error is treated the same as end
/// of stream and ends the scan.
struct ByteSource<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    len: usize,
    done: bool,
}

impl<R: Read> ByteSource<R> {
    fn new(inner: R) -> Self {
        ByteSource {
            inner,
            buf: vec![0; SOURCE_BUF_LEN],
            pos: 0,
            len: 0,
            done: false,
        }
    }

    #[inline]
    fn next_byte(&mut self) -> Option<u8> {
        if self.pos == self.len {
            if self.done {
                return None;
            }
            self.fill();
            if self.pos == self.len {
                return None;
            }
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Some(byte)
    }

    fn fill(&mut self) {
        self.pos = 0;
        self.len = 0;
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return;
                }
                Ok(n) => {
                    self.len = n;
                    return;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => {
                    self.done = true;
                    return;
                }
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    Primary,
    AwaitWild,
    Wild,
    Done,
}

enum Pump {
    Emitted,
    Exhausted,
    AnchorEnd,
}

/// A lazy match stream over one byte source.
///
/// Created by [`Matcher::scan`]. See the module docs for the two-phase
/// protocol.
pub struct Scan<'m, R: Read> {
    matcher: &'m Matcher,
    source: ByteSource<R>,
    /// Running absolute offset: after the n-th byte is processed this is n.
    offset: i64,
    node: NodeId,
    precons: Option<Precons>,
    wild: Option<Box<Automaton>>,
    pending: VecDeque<Match>,
    state: State,
}

impl<'m, R: Read> Scan<'m, R> {
    pub(crate) fn new(matcher: &'m Matcher, source: R) -> Self {
        Scan {
            matcher,
            source: ByteSource::new(source),
            offset: 0,
            node: NodeId::ROOT,
            precons: Some(matcher.automaton().pool().acquire()),
            wild: None,
            pending: VecDeque::new(),
            state: State::Primary,
        }
    }

    /// True between delivery of the resume sentinel and the wild submission.
    ///
    /// Distinguishes the resume request from periodic progress sentinels,
    /// which carry the same `(-1, -1)` index.
    pub fn awaiting_wild(&self) -> bool {
        self.state == State::AwaitWild
    }

    /// Answer the resume sentinel with the wild-sequence list.
    ///
    /// An empty list closes the stream. Otherwise the list is compiled into
    /// a fresh automaton (same validation as [`Matcher::new`]) and the scan
    /// resumes on the same byte source at the current offset. At most one
    /// submission is accepted per session; calling without a pending resume
    /// returns [`Error::NoResumePending`].
    pub fn submit_wild(&mut self, sequences: &[Sequence]) -> Result<(), Error> {
        if self.state != State::AwaitWild {
            return Err(Error::NoResumePending);
        }
        if sequences.is_empty() {
            self.state = State::Done;
            return Ok(());
        }
        let automaton = Automaton::compile(sequences)?;
        self.precons = Some(automaton.pool().acquire());
        self.node = NodeId::ROOT;
        self.wild = Some(Box::new(automaton));
        self.state = State::Wild;
        Ok(())
    }

    fn release_primary(&mut self) {
        if let Some(precons) = self.precons.take() {
            self.matcher.automaton().pool().release(precons);
        }
    }
}

impl<R: Read> Iterator for Scan<'_, R> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        loop {
            if let Some(m) = self.pending.pop_front() {
                return Some(m);
            }
            match self.state {
                State::Primary => {
                    let matcher = self.matcher;
                    let Some(precons) = self.precons.as_mut() else {
                        self.state = State::Done;
                        continue;
                    };
                    match pump(
                        matcher.automaton(),
                        &mut self.source,
                        &mut self.node,
                        &mut self.offset,
                        precons,
                        &mut self.pending,
                        true,
                    ) {
                        Pump::Emitted => {}
                        Pump::Exhausted => {
                            self.release_primary();
                            self.state = State::Done;
                        }
                        Pump::AnchorEnd => {
                            self.release_primary();
                            self.pending.push_back(Match::sentinel(self.offset));
                            self.state = State::AwaitWild;
                        }
                    }
                }
                State::AwaitWild => {
                    // Pulled again without a submission: the handshake is
                    // abandoned and the session ends.
                    self.state = State::Done;
                }
                State::Wild => {
                    let Some(automaton) = self.wild.as_deref() else {
                        self.state = State::Done;
                        continue;
                    };
                    let Some(precons) = self.precons.as_mut() else {
                        self.state = State::Done;
                        continue;
                    };
                    match pump(
                        automaton,
                        &mut self.source,
                        &mut self.node,
                        &mut self.offset,
                        precons,
                        &mut self.pending,
                        false,
                    ) {
                        Pump::Emitted => {}
                        Pump::Exhausted | Pump::AnchorEnd => {
                            if let Some(precons) = self.precons.take() {
                                automaton.pool().release(precons);
                            }
                            self.state = State::Done;
                        }
                    }
                }
                State::Done => return None,
            }
        }
    }
}

impl<R: Read> Drop for Scan<'_, R> {
    fn drop(&mut self) {
        if let Some(precons) = self.precons.take() {
            match (self.state, self.wild.as_deref()) {
                (State::Wild, Some(automaton)) => automaton.pool().release(precons),
                _ => self.matcher.automaton().pool().release(precons),
            }
        }
    }
}

/// Advance the automaton over the source until something is pending, the
/// source is exhausted, or (primary pass only) the anchor region ends.
///
/// Per byte: take the goto transition or walk fail links back toward root;
/// then emit the reached node's outputs that survive the node-level bound
/// prune, the per-output offset filter, and the precondition filter,
/// recording first-match end offsets as preconditions for later choices.
fn pump<R: Read>(
    automaton: &Automaton,
    source: &mut ByteSource<R>,
    node: &mut NodeId,
    offset: &mut i64,
    precons: &mut Precons,
    pending: &mut VecDeque<Match>,
    primary: bool,
) -> Pump {
    let max_anchor = automaton.max_anchor();
    loop {
        let Some(byte) = source.next_byte() else {
            return Pump::Exhausted;
        };
        *offset += 1;
        let end = *offset;

        let mut curr = *node;
        let next = automaton.node(curr).links.get(byte);
        if !next.is_none() {
            curr = next;
        } else {
            while curr != NodeId::ROOT {
                curr = automaton.node(curr).fail;
                let next = automaton.node(curr).links.get(byte);
                if !next.is_none() {
                    curr = next;
                    break;
                }
            }
        }
        *node = curr;

        let reached = automaton.node(curr);
        if !reached.outputs.is_empty()
            && (reached.out_max == -1 || reached.out_max >= end - i64::from(reached.out_max_len))
        {
            for out in &reached.outputs {
                let start = end - i64::from(out.len);
                if out.max != -1 && out.max < start {
                    continue;
                }
                if out.sub > 0 {
                    let prev = precons.get(out.seq, out.sub - 1);
                    if prev == 0 || start < prev {
                        continue;
                    }
                }
                if precons.get(out.seq, out.sub) == 0 {
                    precons.set(out.seq, out.sub, end);
                }
                pending.push_back(Match {
                    index: (out.seq as i32, out.sub as i32),
                    offset: start,
                    length: out.len as usize,
                });
            }
        }

        if primary && max_anchor >= 0 && end > max_anchor && curr == NodeId::ROOT {
            return Pump::AnchorEnd;
        }

        if end >= PROGRESS_FLOOR && (end & end.wrapping_neg()) == end {
            pending.push_back(Match::sentinel(end));
        }

        if !pending.is_empty() {
            return Pump::Emitted;
        }
    }
}

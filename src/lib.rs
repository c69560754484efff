//! sigmatch: multi-pattern byte-stream matching for file-format signatures

mod automaton;
mod precon;
mod scan;

pub use scan::Scan;

use std::fmt;
use std::io::Read;

use automaton::Automaton;

/// Errors from signature compilation and scan sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A sequence has no choices.
    EmptySequence { sequence: usize },
    /// A choice has no alternative byte strings.
    EmptyChoice { sequence: usize, choice: usize },
    /// An alternative is the zero-length byte string.
    EmptyPattern { sequence: usize, choice: usize },
    /// A sequence's offset list and choice list differ in length.
    OffsetCountMismatch { sequence: usize },
    /// `submit_wild` was called while no resume handshake was open.
    NoResumePending,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptySequence { sequence } => {
                write!(f, "sequence {} has no choices", sequence)
            }
            Error::EmptyChoice { sequence, choice } => {
                write!(f, "sequence {} choice {} has no alternatives", sequence, choice)
            }
            Error::EmptyPattern { sequence, choice } => {
                write!(
                    f,
                    "sequence {} choice {} contains an empty byte string",
                    sequence, choice
                )
            }
            Error::OffsetCountMismatch { sequence } => {
                write!(
                    f,
                    "sequence {} has mismatched offset and choice counts",
                    sequence
                )
            }
            Error::NoResumePending => write!(f, "no resume handshake is pending"),
        }
    }
}

impl std::error::Error for Error {}

/// Alternative byte strings that may match at one position of a [`Sequence`].
///
/// Alternatives are unordered; every alternative of a choice reports the same
/// `(sequence, choice)` index when it matches.
pub type Choice = Vec<Vec<u8>>;

/// Maximum-offset sentinel meaning "no bound".
pub const UNBOUNDED: i64 = -1;

/// One signature: an ordered list of choices with a parallel list of
/// per-choice maximum offsets.
///
/// Between adjacent choices any number of bytes may occur. An offset `m >= 0`
/// rejects matches for that choice starting past byte `m`; [`UNBOUNDED`]
/// accepts the choice anywhere. Choice 0 anchors the sequence; later choices
/// are gap-separated continuations that only fire once the previous choice
/// has matched earlier in the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequence {
    max_offsets: Vec<i64>,
    choices: Vec<Choice>,
}

impl Sequence {
    /// Create a sequence from parallel offset and choice lists.
    ///
    /// Validation happens at compile time ([`Matcher::new`]), not here.
    pub fn new(max_offsets: Vec<i64>, choices: Vec<Choice>) -> Self {
        Sequence {
            max_offsets,
            choices,
        }
    }

    /// Convenience constructor for a single-choice, single-alternative
    /// sequence.
    pub fn simple(max_offset: i64, pattern: &[u8]) -> Self {
        Sequence {
            max_offsets: vec![max_offset],
            choices: vec![vec![pattern.to_vec()]],
        }
    }

    /// The per-choice maximum offsets.
    pub fn max_offsets(&self) -> &[i64] {
        &self.max_offsets
    }

    /// The ordered choice list.
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// True when the anchor choice is unbounded.
    ///
    /// A wild-anchored sequence disables the anchor-region early exit for any
    /// automaton it is compiled into, so callers typically withhold such
    /// sequences and submit them on the resume handshake instead
    /// (see [`Scan::submit_wild`]).
    pub fn is_wild(&self) -> bool {
        self.max_offsets.first().is_some_and(|&m| m < 0)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{offsets:")?;
        for (n, v) in self.max_offsets.iter().enumerate() {
            if n > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}", v)?;
        }
        write!(f, "; choices:")?;
        for (n, choice) in self.choices.iter().enumerate() {
            if n > 0 {
                write!(f, ",")?;
            }
            write!(f, " [")?;
            for (i, alt) in choice.iter().enumerate() {
                if i > 0 {
                    write!(f, " | ")?;
                }
                write!(f, "{}", alt.escape_ascii())?;
            }
            write!(f, "]")?;
        }
        write!(f, "}}")
    }
}

/// Split a signature set into (primary, wild) halves by [`Sequence::is_wild`].
///
/// The primary half compiles into the automaton that runs the first pass;
/// the wild half is what a caller submits on the resume handshake.
pub fn partition_wild(sequences: Vec<Sequence>) -> (Vec<Sequence>, Vec<Sequence>) {
    sequences.into_iter().partition(|s| !s.is_wild())
}

/// A single per-choice hit, or a sentinel record.
///
/// `index` identifies the choice as `(sequence, choice)` within the list the
/// automaton was compiled from. `(-1, -1)` marks a sentinel: either the
/// resume request closing the primary pass (see [`Scan::awaiting_wild`]) or a
/// periodic progress record; `offset` on a sentinel is the running scan
/// offset at emission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    /// Sequence and choice index, or `(-1, -1)` on sentinels.
    pub index: (i32, i32),
    /// Absolute start offset of the match within the scanned stream.
    pub offset: i64,
    /// Match length in bytes; zero on sentinels.
    pub length: usize,
}

impl Match {
    pub(crate) fn sentinel(offset: i64) -> Match {
        Match {
            index: (-1, -1),
            offset,
            length: 0,
        }
    }

    /// True for `(-1, -1)` records.
    pub fn is_sentinel(&self) -> bool {
        self.index == (-1, -1)
    }
}

/// A compiled signature set.
///
/// Compilation builds an offset-aware Aho–Corasick automaton over every
/// alternative of every choice. The automaton is immutable afterwards and can
/// be shared across threads; each [`Matcher::scan`] gets its own session
/// state from an internal pool.
///
/// ```
/// use sigmatch::{Matcher, Sequence};
///
/// let signatures = vec![
///     Sequence::simple(64, b"GIF87a"),
///     Sequence::simple(64, b"GIF89a"),
/// ];
/// let matcher = Matcher::new(&signatures)?;
///
/// let hits: Vec<_> = matcher
///     .scan(&b"GIF89a and trailing data"[..])
///     .filter(|m| !m.is_sentinel())
///     .collect();
/// assert_eq!(hits[0].index, (1, 0));
/// assert_eq!(hits[0].offset, 0);
/// # Ok::<(), sigmatch::Error>(())
/// ```
pub struct Matcher {
    automaton: Automaton,
}

impl Matcher {
    /// Compile a signature set.
    pub fn new(sequences: &[Sequence]) -> Result<Self, Error> {
        Ok(Matcher {
            automaton: Automaton::compile(sequences)?,
        })
    }

    /// Largest bounded anchor offset, or `None` when some anchor is
    /// unbounded. Once a scan passes this offset at the root state no anchor
    /// can match any more and the primary pass ends with a resume request.
    pub fn max_anchor_offset(&self) -> Option<i64> {
        let max = self.automaton.max_anchor();
        (max >= 0).then_some(max)
    }

    /// Start a scan session over a byte source.
    ///
    /// The returned iterator yields matches in detection order. Read errors
    /// are treated as end of stream.
    pub fn scan<R: Read>(&self, source: R) -> Scan<'_, R> {
        Scan::new(self, source)
    }

    pub(crate) fn automaton(&self) -> &Automaton {
        &self.automaton
    }
}

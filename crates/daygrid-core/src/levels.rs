use std::fmt;

use crate::segment::Segment;

/// Maximum number of levels a packing may open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelLimit {
    #[default]
    Unbounded,
    AtMost(usize),
}

impl LevelLimit {
    /// `0` is read as "no limit", matching the `row_limit` setting.
    pub fn from_setting(value: usize) -> Self {
        if value == 0 {
            Self::Unbounded
        } else {
            Self::AtMost(value)
        }
    }

    pub fn allows(self, level_count: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::AtMost(limit) => level_count < limit,
        }
    }
}

impl fmt::Display for LevelLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::AtMost(limit) => write!(f, "{limit}"),
        }
    }
}

/// Result of [`pack`]: rows of mutually non-overlapping segments plus the
/// segments that did not fit under the limit.
pub struct Levels<'a, E> {
    pub levels: Vec<Vec<Segment<'a, E>>>,
    pub extra: Vec<Segment<'a, E>>,
}

impl<E> Default for Levels<'_, E> {
    fn default() -> Self {
        Self {
            levels: Vec::new(),
            extra: Vec::new(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for Levels<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Levels")
            .field("levels", &self.levels)
            .field("extra", &self.extra)
            .finish()
    }
}

impl<'a, E> Levels<'a, E> {
    fn place(mut self, seg: Segment<'a, E>, limit: LevelLimit) -> Self {
        let free = self
            .levels
            .iter()
            .position(|level| !segs_overlap(&seg, level));

        match free {
            Some(idx) => self.levels[idx].push(seg),
            None if limit.allows(self.levels.len()) => self.levels.push(vec![seg]),
            None => self.extra.push(seg),
        }
        self
    }

    fn sorted(mut self) -> Self {
        for level in &mut self.levels {
            level.sort_by_key(|seg| seg.left);
        }
        self
    }

    pub fn placed(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }
}

/// Greedy level assignment in caller order. Each segment lands in the first
/// level it does not overlap; when every level is taken and the limit is
/// reached it goes to `extra` instead of opening a new level.
pub fn pack<'a, E, I>(segments: I, limit: LevelLimit) -> Levels<'a, E>
where
    I: IntoIterator<Item = Segment<'a, E>>,
{
    segments
        .into_iter()
        .fold(Levels::default(), |levels, seg| levels.place(seg, limit))
        .sorted()
}

/// True when `seg` overlaps any segment of `others`. Touching at a shared
/// slot counts as overlap.
pub fn segs_overlap<E>(seg: &Segment<'_, E>, others: &[Segment<'_, E>]) -> bool {
    others
        .iter()
        .any(|other| other.left <= seg.right && other.right >= seg.left)
}

pub fn is_segment_in_slot<E>(seg: &Segment<'_, E>, slot: usize) -> bool {
    seg.covers(slot)
}

/// How many segments cover `slot`; drives "+N more" labels.
pub fn events_in_slot<E>(segments: &[Segment<'_, E>], slot: usize) -> usize {
    segments
        .iter()
        .filter(|seg| is_segment_in_slot(seg, slot))
        .count()
}

/// The events behind a slot, in segment order.
pub fn segments_in_slot<'a, E>(segments: &[Segment<'a, E>], slot: usize) -> Vec<&'a E> {
    segments
        .iter()
        .filter(|seg| is_segment_in_slot(seg, slot))
        .map(|seg| seg.event)
        .collect()
}

//! Chapter lookup by playback time

use shelf_core::Chapter;

/// Chapters around a playback position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChapterPosition<'a> {
    pub current: Option<&'a Chapter>,
    pub next: Option<&'a Chapter>,
    pub previous: Option<&'a Chapter>,
}

/// Sorted chapter list with binary-search lookup
///
/// Chapters are expected sorted ascending by `start`. The current chapter
/// for a time `t` is the one with the greatest `start <= t`; times past the
/// last chapter's end still resolve to the last chapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterIndex {
    chapters: Vec<Chapter>,
}

impl ChapterIndex {
    pub fn new(chapters: Vec<Chapter>) -> Self {
        Self { chapters }
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// List position of the current chapter at `time`
    pub fn position_at(&self, time: f64) -> Option<usize> {
        if time.is_nan() {
            return None;
        }
        self.chapters
            .partition_point(|chapter| chapter.start <= time)
            .checked_sub(1)
    }

    pub fn current(&self, time: f64) -> Option<&Chapter> {
        self.position_at(time).map(|i| &self.chapters[i])
    }

    pub fn next(&self, time: f64) -> Option<&Chapter> {
        self.position_at(time)
            .and_then(|i| self.chapters.get(i + 1))
    }

    pub fn previous(&self, time: f64) -> Option<&Chapter> {
        self.position_at(time)
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.chapters.get(i))
    }

    /// Current, next and previous chapters in one lookup
    pub fn lookup(&self, time: f64) -> ChapterPosition<'_> {
        match self.position_at(time) {
            Some(i) => ChapterPosition {
                current: self.chapters.get(i),
                next: self.chapters.get(i + 1),
                previous: i.checked_sub(1).and_then(|p| self.chapters.get(p)),
            },
            None => ChapterPosition {
                current: None,
                next: None,
                previous: None,
            },
        }
    }
}

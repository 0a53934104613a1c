//! Character-level diff of a single mismatching output line.
//!
//! Uses a longest-common-subsequence table over `char`s. Lines compared here
//! are single program output lines, so the quadratic table stays small.

use colored::Colorize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Present on both sides.
    Equal(String),
    /// Only in the expected line.
    Delete(String),
    /// Only in the captured line.
    Insert(String),
}

pub fn diff_chars(expected: &str, actual: &str) -> Vec<Segment> {
    let old: Vec<char> = expected.chars().collect();
    let new: Vec<char> = actual.chars().collect();
    let width = new.len() + 1;

    // lcs[i * width + j] = LCS length of old[i..] and new[j..]
    let mut lcs = vec![0usize; (old.len() + 1) * width];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            lcs[i * width + j] = if old[i] == new[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut segments = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            push(&mut segments, Segment::Equal(old[i].to_string()));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            push(&mut segments, Segment::Delete(old[i].to_string()));
            i += 1;
        } else {
            push(&mut segments, Segment::Insert(new[j].to_string()));
            j += 1;
        }
    }
    for &c in &old[i..] {
        push(&mut segments, Segment::Delete(c.to_string()));
    }
    for &c in &new[j..] {
        push(&mut segments, Segment::Insert(c.to_string()));
    }
    segments
}

fn push(segments: &mut Vec<Segment>, segment: Segment) {
    if let Some(last) = segments.last_mut() {
        match (last, &segment) {
            (Segment::Equal(run), Segment::Equal(c))
            | (Segment::Delete(run), Segment::Delete(c))
            | (Segment::Insert(run), Segment::Insert(c)) => {
                run.push_str(c);
                return;
            }
            _ => {}
        }
    }
    segments.push(segment);
}

/// Colours a diff for the terminal: deletions red, insertions green.
pub fn render(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Equal(text) => text.normal().to_string(),
            Segment::Delete(text) => text.red().strikethrough().to_string(),
            Segment::Insert(text) => text.green().underline().to_string(),
        })
        .collect()
}

/// Renders the diff between two optional lines; a missing side shows the
/// other one as wholly deleted or inserted.
pub fn render_line(expected: Option<&str>, actual: Option<&str>) -> String {
    let segments = match (expected, actual) {
        (Some(expected), Some(actual)) => diff_chars(expected, actual),
        (Some(expected), None) => vec![Segment::Delete(expected.to_string())],
        (None, Some(actual)) => vec![Segment::Insert(actual.to_string())],
        (None, None) => Vec::new(),
    };
    render(&segments)
}

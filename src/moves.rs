use std::collections::HashMap;

/// Split of one file's added and deleted lines into moved and remaining lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveSplit<'a> {
    pub moved: usize,
    pub remaining_added: Vec<&'a str>,
    pub remaining_deleted: Vec<&'a str>,
}

/// Pair added lines with deleted lines of identical trimmed content.
///
/// Each pair counts as one moved line and is consumed from both sides, so a
/// line duplicated on one side only moves as many times as it appears on the
/// other. A coincidental delete-then-reinsert of identical text is
/// indistinguishable from a move. Remaining lines keep their input order.
pub fn detect_moves<'a, A, D>(added: A, deleted: D) -> MoveSplit<'a>
where
    A: IntoIterator<Item = &'a str>,
    D: IntoIterator<Item = &'a str>,
{
    let deleted: Vec<&'a str> = deleted.into_iter().collect();

    let mut available: HashMap<&'a str, usize> = HashMap::new();
    for line in deleted.iter().copied() {
        *available.entry(line.trim()).or_insert(0) += 1;
    }

    let mut moved_by_content: HashMap<&'a str, usize> = HashMap::new();
    let mut remaining_added = Vec::new();
    for line in added {
        let key = line.trim();
        match available.get_mut(key) {
            Some(count) if *count > 0 => {
                *count -= 1;
                *moved_by_content.entry(key).or_insert(0) += 1;
            }
            _ => remaining_added.push(line),
        }
    }

    let moved = moved_by_content.values().sum();
    let mut remaining_deleted = Vec::with_capacity(deleted.len().saturating_sub(moved));
    for line in deleted {
        match moved_by_content.get_mut(line.trim()) {
            Some(count) if *count > 0 => *count -= 1,
            _ => remaining_deleted.push(line),
        }
    }

    MoveSplit {
        moved,
        remaining_added,
        remaining_deleted,
    }
}

/// Move selection one item forward, wrapping past the end.
///
/// `item_count` of zero returns `selected` unchanged.
pub fn wrap_next(selected: usize, item_count: usize) -> usize {
    if item_count == 0 {
        return selected;
    }
    (selected + 1) % item_count
}

/// Move selection one item back, wrapping before the start.
pub fn wrap_prev(selected: usize, item_count: usize) -> usize {
    if item_count == 0 {
        return selected;
    }
    (selected % item_count + item_count - 1) % item_count
}

//! Read/write set canonicalization.
//!
//! The scheduler takes plain lists and treats membership as "this task
//! touches that array". Duplicates are wasted work and a handle in both lists
//! can confuse its conflict detection, so both lists are reduced to sorted,
//! unique sets and writes are removed from reads (a write implies a read).

/// Canonicalizes `read` and `write` in place.
///
/// Afterwards both are sorted by identity, free of duplicates and disjoint,
/// and together still name every distinct handle from the input.
pub fn deduplicate<T: Ord>(read: &mut Vec<T>, write: &mut Vec<T>) {
    write.sort_unstable();
    write.dedup();
    read.sort_unstable();
    read.dedup();

    // linear merge, both sides sorted
    let mut w = 0;
    read.retain(|r| {
        while w < write.len() && write[w] < *r {
            w += 1;
        }
        w == write.len() || write[w] != *r
    });
}

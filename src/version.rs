//! Ordering over component version strings.
//!
//! The comparison scheme: versions are split into dot-separated segments.
//! Segments that are both numeric compare numerically; otherwise they
//! compare lexicographically, with a numeric segment sorting as newer than
//! a non-numeric one. When one version is a prefix of the other, the longer
//! one is newer. The literal `master` sorts newest of all. The resulting
//! order is total, transitive, and antisymmetric.

use std::cmp::Ordering;

/// Compares two version strings, descending: returns `Ordering::Less` when
/// `a` should sort before `b`, i.e. when `a` is the newer version.
pub fn version_compare(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    match (a == "master", b == "master") {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) => match segment_compare(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
            // Longer version wins a shared prefix: 1.0.1 is newer than 1.0
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

fn segment_compare(x: &str, y: &str) -> Ordering {
    match (x.parse::<u64>(), y.parse::<u64>()) {
        // Numeric segments compare numerically, higher is newer
        (Ok(m), Ok(n)) => n.cmp(&m),
        // A numeric segment is newer than a non-numeric one
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        // Lexicographic fallback, later string is newer
        (Err(_), Err(_)) => y.cmp(x),
    }
}

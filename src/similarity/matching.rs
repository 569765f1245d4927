//! One-to-one pairing of photos between two fingerprint sets.
//!
//! Rows are photos of the smaller set, columns photos of the larger set, and
//! cells their hash similarity.

/// Greedy pairing in row order: each row claims its best unclaimed column if
/// that column clears the threshold. Earlier rows are never revisited.
pub(crate) fn greedy_matches(matrix: &[Vec<f64>], threshold: f64) -> usize {
    let columns = matrix.first().map_or(0, Vec::len);
    let mut claimed = vec![false; columns];
    let mut matched = 0;

    for row in matrix {
        let best = row
            .iter()
            .enumerate()
            .filter(|(col, _)| !claimed[*col])
            .fold(None, |best: Option<(usize, f64)>, (col, &sim)| match best {
                Some((_, best_sim)) if best_sim >= sim => best,
                _ => Some((col, sim)),
            });

        if let Some((col, sim)) = best {
            if sim >= threshold {
                claimed[col] = true;
                matched += 1;
            }
        }
    }

    matched
}

/// Largest possible number of row/column pairs at or above the threshold,
/// found with augmenting paths.
pub(crate) fn maximum_matches(matrix: &[Vec<f64>], threshold: f64) -> usize {
    let columns = matrix.first().map_or(0, Vec::len);
    let mut owner: Vec<Option<usize>> = vec![None; columns];
    let mut matched = 0;

    for row in 0..matrix.len() {
        let mut visited = vec![false; columns];
        if augment(matrix, threshold, row, &mut visited, &mut owner) {
            matched += 1;
        }
    }

    matched
}

fn augment(
    matrix: &[Vec<f64>],
    threshold: f64,
    row: usize,
    visited: &mut [bool],
    owner: &mut [Option<usize>],
) -> bool {
    for (col, &sim) in matrix[row].iter().enumerate() {
        if sim < threshold || visited[col] {
            continue;
        }
        visited[col] = true;

        let free = match owner[col] {
            None => true,
            Some(other) => augment(matrix, threshold, other, visited, owner),
        };
        if free {
            owner[col] = Some(row);
            return true;
        }
    }

    false
}

/// A pair of photos must both match; larger sets need at least half of the
/// smaller set's photos matched.
pub(crate) fn enough_matches(smaller_len: usize, matched: usize) -> bool {
    if smaller_len == 2 {
        matched == 2
    } else {
        matched >= smaller_len.div_ceil(2)
    }
}

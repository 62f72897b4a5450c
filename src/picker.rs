//! Random student picking over a class roster. Purely local; nothing here
//! touches the remote store.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::model::Student;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinSettings {
    pub min_spins: u32,
    pub max_spins: u32,
}

impl Default for SpinSettings {
    fn default() -> Self {
        Self {
            min_spins: 5,
            max_spins: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spin<'a> {
    /// Absolute wheel rotation in whole degrees; always moves forward.
    pub rotation: u64,
    pub winner_index: usize,
    pub winner: &'a Student,
}

/// Index of the segment under the top pointer after a clockwise rotation.
pub fn segment_at_pointer(rotation: u64, segments: usize) -> usize {
    if segments == 0 {
        return 0;
    }
    let segment_angle = 360.0 / segments as f64;
    let effective = (360 - rotation % 360) % 360;
    let idx = (effective as f64 / segment_angle).floor() as usize;
    idx.min(segments - 1)
}

/// Spins the wheel forward from `from_rotation`. Needs at least two students.
pub fn spin<'a, R: Rng + ?Sized>(
    roster: &[&'a Student],
    from_rotation: u64,
    settings: SpinSettings,
    rng: &mut R,
) -> Option<Spin<'a>> {
    if roster.len() < 2 {
        return None;
    }
    let min = f64::from(settings.min_spins.max(1));
    let max = f64::from(settings.max_spins).max(min + 1.0);
    let turns: f64 = rng.random_range(min..max);
    let advance = (turns * 360.0).floor() as u64;
    // Near the top of the range, restart from the same angle; the winner
    // depends only on the rotation mod 360.
    let rotation = from_rotation
        .checked_add(advance)
        .unwrap_or(from_rotation % 360 + advance);
    let winner_index = segment_at_pointer(rotation, roster.len());
    Some(Spin {
        rotation,
        winner_index,
        winner: roster[winner_index],
    })
}

/// Uniform random subset of `min(size, roster.len())` students.
pub fn sample<'a, R: Rng + ?Sized>(
    roster: &[&'a Student],
    size: usize,
    rng: &mut R,
) -> Vec<&'a Student> {
    if size == 0 || roster.is_empty() {
        return Vec::new();
    }
    let mut shuffled = roster.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(size.min(roster.len()));
    shuffled
}

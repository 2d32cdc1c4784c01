//! Spawn placement and obstacle layout
//!
//! Placement never blocks: when the retry caps run out the best candidate
//! seen so far is accepted.

use rand::Rng;

use super::entity::Obstacle;
use super::geometry::dist_sq;
use super::rules::Tuning;

/// Point to keep away from, with the required separation
#[derive(Debug, Clone, Copy)]
pub struct Avoid {
    pub x: f32,
    pub y: f32,
    pub min_distance: f32,
}

/// Produces starting positions inside the field
pub struct SpawnPlanner<'a> {
    tuning: &'a Tuning,
    obstacles: &'a [Obstacle],
}

impl<'a> SpawnPlanner<'a> {
    pub fn new(tuning: &'a Tuning, obstacles: &'a [Obstacle]) -> Self {
        Self { tuning, obstacles }
    }

    /// Pick a position for an entity of `radius`, optionally away from a point
    pub fn place<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        radius: f32,
        avoid: Option<Avoid>,
    ) -> (f32, f32) {
        let Some(avoid) = avoid.filter(|a| a.min_distance > 0.0) else {
            return self.clear_candidate(rng, radius);
        };

        let min_sq = avoid.min_distance * avoid.min_distance;
        let mut best = self.clear_candidate(rng, radius);
        let mut best_sq = dist_sq(best.0, best.1, avoid.x, avoid.y);

        for _ in 1..self.tuning.spawn_distance_attempts.max(1) {
            if best_sq >= min_sq {
                break;
            }
            let candidate = self.clear_candidate(rng, radius);
            let candidate_sq = dist_sq(candidate.0, candidate.1, avoid.x, avoid.y);
            if candidate_sq > best_sq {
                best = candidate;
                best_sq = candidate_sq;
            }
        }

        best
    }

    /// Draw candidates until one misses every obstacle or the cap is reached
    fn clear_candidate<R: Rng + ?Sized>(&self, rng: &mut R, radius: f32) -> (f32, f32) {
        let mut candidate = self.draw(rng);
        if self.obstacles.is_empty() {
            return candidate;
        }

        for _ in 1..self.tuning.spawn_obstacle_attempts.max(1) {
            if !self.blocked(candidate, radius) {
                break;
            }
            candidate = self.draw(rng);
        }
        candidate
    }

    fn blocked(&self, (x, y): (f32, f32), radius: f32) -> bool {
        self.obstacles
            .iter()
            .any(|o| o.overlaps_circle(x, y, radius))
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> (f32, f32) {
        let m = self.tuning.spawn_margin;
        let x = rng.gen_range(m..self.tuning.field_width - m);
        let y = rng.gen_range(m..self.tuning.field_height - m);
        (x, y)
    }
}

/// Generate a fresh obstacle layout for one match
pub fn generate_obstacles<R: Rng + ?Sized>(rng: &mut R, tuning: &Tuning) -> Vec<Obstacle> {
    // Keep a corridor wide enough for one entity between rectangles
    let gap = tuning.entity_radius * 2.0;
    let mut obstacles: Vec<Obstacle> = Vec::with_capacity(tuning.obstacle_count);

    for _ in 0..tuning.obstacle_count {
        let mut candidate = random_rect(rng, tuning);
        for _ in 1..tuning.spawn_obstacle_attempts {
            if !obstacles.iter().any(|o| o.expanded(gap).overlaps(&candidate)) {
                break;
            }
            candidate = random_rect(rng, tuning);
        }
        obstacles.push(candidate);
    }
    obstacles
}

fn random_rect<R: Rng + ?Sized>(rng: &mut R, tuning: &Tuning) -> Obstacle {
    let m = tuning.spawn_margin;
    let w = rng.gen_range(tuning.obstacle_min_size..tuning.obstacle_max_size);
    let h = rng.gen_range(tuning.obstacle_min_size..tuning.obstacle_max_size);
    let x = rng.gen_range(m..tuning.field_width - m - w);
    let y = rng.gen_range(m..tuning.field_height - m - h);
    Obstacle::new(x, y, w, h)
}

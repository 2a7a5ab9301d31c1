// Uniform-grid spatial index and wall-contact queries.
//
// Rebuilt exactly once per tick, after every position update and before any
// of that tick's collision queries.

use std::collections::HashMap;
use std::time::Instant;

use crate::domain::state::{Arena, EntityId, WallRect, World};

const CELL_SIZE: f32 = 64.0;

#[derive(Debug, Clone, Copy)]
struct AdversaryRef {
    id: EntityId,
    x: f32,
    y: f32,
    size: f32,
}

#[derive(Debug, Clone, Copy)]
struct PlayerRef {
    id: EntityId,
    x: f32,
    y: f32,
    alive: bool,
    protected: bool,
    invisible: bool,
}

/// Which player states a proximity query may target.
#[derive(Debug, Clone, Copy)]
pub struct TargetFilter {
    pub include_protected: bool,
    pub include_invisible: bool,
}

impl TargetFilter {
    /// Standard adversary targeting: stealthed and protected players are
    /// invisible to the query.
    pub fn hostile() -> Self {
        Self {
            include_protected: false,
            include_invisible: false,
        }
    }

    /// Targeting for kinds that track players through those states.
    pub fn all() -> Self {
        Self {
            include_protected: true,
            include_invisible: true,
        }
    }
}

/// Result of a circle-vs-walls test.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallContact {
    pub colliding: bool,
    pub penetration_depth: f32,
    pub push_x: f32,
    pub push_y: f32,
}

#[derive(Default)]
pub struct SpatialIndex {
    cells: HashMap<(i32, i32), Vec<AdversaryRef>>,
    players: Vec<PlayerRef>,
    arena: Arena,
}

fn cell_of(x: f32, y: f32) -> (i32, i32) {
    ((x / CELL_SIZE).floor() as i32, (y / CELL_SIZE).floor() as i32)
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
            players: Vec::new(),
            arena: Arena::default(),
        }
    }

    pub fn rebuild(&mut self, world: &World, now: Instant) {
        self.cells.clear();
        self.players.clear();
        self.arena = world.arena.clone();

        for a in world.adversaries.values() {
            let entry = AdversaryRef {
                id: a.id,
                x: a.x,
                y: a.y,
                size: a.size,
            };
            self.cells.entry(cell_of(a.x, a.y)).or_default().push(entry);
        }

        for p in world.players.values() {
            self.players.push(PlayerRef {
                id: p.id,
                x: p.x,
                y: p.y,
                alive: p.alive,
                protected: p.is_protected(now),
                invisible: p.is_invisible(now),
            });
        }
    }

    /// Nearest living player within `max_radius`, honoring the filter.
    /// Ties break toward the smaller distance; equal distances pick the
    /// first encountered.
    pub fn closest_player(
        &self,
        x: f32,
        y: f32,
        max_radius: f32,
        filter: TargetFilter,
    ) -> Option<(EntityId, f32)> {
        let max_sq = max_radius * max_radius;
        let mut best: Option<(EntityId, f32)> = None;
        for p in &self.players {
            if !p.alive
                || (p.protected && !filter.include_protected)
                || (p.invisible && !filter.include_invisible)
            {
                continue;
            }
            let dx = p.x - x;
            let dy = p.y - y;
            let d_sq = dx * dx + dy * dy;
            if d_sq <= max_sq && best.is_none_or(|(_, b)| d_sq < b) {
                best = Some((p.id, d_sq));
            }
        }
        best.map(|(id, d_sq)| (id, d_sq.sqrt()))
    }

    pub fn players_in_radius(&self, x: f32, y: f32, radius: f32) -> Vec<EntityId> {
        let r_sq = radius * radius;
        self.players
            .iter()
            .filter(|p| {
                let dx = p.x - x;
                let dy = p.y - y;
                p.alive && dx * dx + dy * dy <= r_sq
            })
            .map(|p| p.id)
            .collect()
    }

    /// Adversaries whose center lies within `radius`, optionally excluding
    /// one id (e.g. the querying adversary itself).
    pub fn adversaries_in_radius(
        &self,
        x: f32,
        y: f32,
        radius: f32,
        exclude: Option<EntityId>,
    ) -> Vec<EntityId> {
        let r_sq = radius * radius;
        let (min_cx, min_cy) = cell_of(x - radius, y - radius);
        let (max_cx, max_cy) = cell_of(x + radius, y + radius);
        let mut out = Vec::new();
        for cx in min_cx..=max_cx {
            for cy in min_cy..=max_cy {
                let Some(bucket) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                for a in bucket {
                    if exclude == Some(a.id) {
                        continue;
                    }
                    let dx = a.x - x;
                    let dy = a.y - y;
                    if dx * dx + dy * dy <= r_sq {
                        out.push(a.id);
                    }
                }
            }
        }
        out
    }

    pub fn check_wall_collision(&self, x: f32, y: f32, size: f32) -> bool {
        wall_contact(&self.arena, x, y, size).colliding
    }

    pub fn wall_collision_info(&self, x: f32, y: f32, size: f32) -> WallContact {
        wall_contact(&self.arena, x, y, size)
    }
}

/// Circle-vs-arena test usable before the per-tick rebuild (walls are
/// static). Returns the deepest contact with an inward push direction.
pub fn wall_contact(arena: &Arena, x: f32, y: f32, size: f32) -> WallContact {
    let mut contact = WallContact::default();

    // Outer bounds.
    let mut bound = |pen: f32, px: f32, py: f32, contact: &mut WallContact| {
        if pen > 0.0 && pen > contact.penetration_depth {
            *contact = WallContact {
                colliding: true,
                penetration_depth: pen,
                push_x: px,
                push_y: py,
            };
        }
    };
    bound(arena.min_x + size - x, 1.0, 0.0, &mut contact);
    bound(x + size - arena.max_x, -1.0, 0.0, &mut contact);
    bound(arena.min_y + size - y, 0.0, 1.0, &mut contact);
    bound(y + size - arena.max_y, 0.0, -1.0, &mut contact);

    // Interior obstacles.
    for wall in &arena.walls {
        let c = rect_contact(wall, x, y, size);
        if c.colliding && c.penetration_depth > contact.penetration_depth {
            contact = c;
        }
    }
    contact
}

fn rect_contact(wall: &WallRect, x: f32, y: f32, size: f32) -> WallContact {
    let nearest_x = x.clamp(wall.x, wall.x + wall.w);
    let nearest_y = y.clamp(wall.y, wall.y + wall.h);
    let dx = x - nearest_x;
    let dy = y - nearest_y;
    let dist_sq = dx * dx + dy * dy;
    if dist_sq >= size * size {
        return WallContact::default();
    }
    let dist = dist_sq.sqrt();
    let (push_x, push_y) = if dist > 1e-4 {
        (dx / dist, dy / dist)
    } else {
        // Center inside the rect; push toward the nearest edge.
        let cx = wall.x + wall.w * 0.5;
        let cy = wall.y + wall.h * 0.5;
        if (x - cx).abs() / wall.w > (y - cy).abs() / wall.h {
            ((x - cx).signum(), 0.0)
        } else {
            (0.0, (y - cy).signum())
        }
    };
    WallContact {
        colliding: true,
        penetration_depth: size - dist,
        push_x,
        push_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_with_wall() -> Arena {
        Arena {
            min_x: -100.0,
            max_x: 100.0,
            min_y: -100.0,
            max_y: 100.0,
            walls: vec![WallRect {
                x: 0.0,
                y: 0.0,
                w: 20.0,
                h: 20.0,
            }],
        }
    }

    #[test]
    fn bounds_push_inward() {
        let arena = arena_with_wall();
        let c = wall_contact(&arena, -98.0, 0.0, 10.0);
        assert!(c.colliding);
        assert!((c.penetration_depth - 8.0).abs() < 1e-3);
        assert_eq!((c.push_x, c.push_y), (1.0, 0.0));
    }

    #[test]
    fn clear_space_has_no_contact() {
        let arena = arena_with_wall();
        let c = wall_contact(&arena, -50.0, -50.0, 10.0);
        assert!(!c.colliding);
        assert_eq!(c.penetration_depth, 0.0);
    }

    #[test]
    fn rect_contact_pushes_away_from_wall() {
        let arena = arena_with_wall();
        let c = wall_contact(&arena, -5.0, 10.0, 8.0);
        assert!(c.colliding);
        assert!(c.push_x < 0.0);
        assert_eq!(c.push_y, 0.0);
    }

    #[test]
    fn closest_player_honors_the_target_filter() {
        use crate::domain::systems::players::tests_support::player_with_id;
        use std::time::Duration;

        let now = Instant::now();
        let mut world = World::new(Arena::default(), 1);

        // Nearest is invisible, next is protected, farthest is plain.
        let mut stealthed = player_with_id(1, now);
        stealthed.x = 10.0;
        stealthed.invisible_until = Some(now + Duration::from_secs(5));
        let mut shielded = player_with_id(2, now);
        shielded.x = 50.0;
        shielded.spawn_protection_until = Some(now + Duration::from_secs(5));
        let mut plain = player_with_id(3, now);
        plain.x = 200.0;
        for p in [stealthed, shielded, plain] {
            world.players.insert(p.id, p);
        }

        let mut index = SpatialIndex::new();
        index.rebuild(&world, now);

        let (id, dist) = index
            .closest_player(0.0, 0.0, 1000.0, TargetFilter::hostile())
            .expect("plain player should be visible");
        assert_eq!(id, 3);
        assert!((dist - 200.0).abs() < 1e-3);

        let (id, _) = index
            .closest_player(0.0, 0.0, 1000.0, TargetFilter::all())
            .expect("unfiltered query should see everyone");
        assert_eq!(id, 1);

        // Out of range entirely.
        assert!(
            index
                .closest_player(0.0, 0.0, 5.0, TargetFilter::all())
                .is_none()
        );
    }

    #[test]
    fn wall_collision_info_matches_the_static_query() {
        let now = Instant::now();
        let mut world = World::new(Arena::default(), 1);
        world.arena = arena_with_wall();
        let mut index = SpatialIndex::new();
        index.rebuild(&world, now);

        let direct = wall_contact(&world.arena, -98.0, 0.0, 10.0);
        let via_index = index.wall_collision_info(-98.0, 0.0, 10.0);
        assert_eq!(via_index.colliding, direct.colliding);
        assert_eq!(via_index.penetration_depth, direct.penetration_depth);
        assert!(index.check_wall_collision(-98.0, 0.0, 10.0));
        assert!(!index.check_wall_collision(-50.0, -50.0, 10.0));
    }
}

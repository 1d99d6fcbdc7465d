//! Compass directions, turn types and direction-keyed storage.

use crate::math::Vector2d;
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::{Index, IndexMut};

/// One of the four approaches to the intersection.
///
/// Directions are ordered cyclically N → E → S → W → N.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

/// The manoeuvre a vehicle performs inside the intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnType {
    Left,
    Right,
    Straight,
}

impl Direction {
    /// All directions in cyclic order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// The position of this direction in the cycle.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Gets the direction at `index` (mod 4) in the cycle.
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// Steps `steps` places clockwise around the cycle.
    pub const fn rotate(self, steps: usize) -> Self {
        Self::from_index(self.index() + steps)
    }

    /// The direction directly across the intersection.
    pub const fn opposite(self) -> Self {
        self.rotate(2)
    }

    /// The direction a vehicle arriving from `self` leaves towards after `turn`.
    pub const fn destination(self, turn: TurnType) -> Self {
        self.rotate(turn.steps())
    }

    /// Whether this is the north or south approach.
    pub const fn is_north_south(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }

    /// The heading of a vehicle arriving from this side, in screen space.
    pub const fn inbound_heading(self) -> f64 {
        match self {
            Direction::North => FRAC_PI_2,
            Direction::East => PI,
            Direction::South => -FRAC_PI_2,
            Direction::West => 0.0,
        }
    }

    /// The heading of a vehicle leaving towards this side, in screen space.
    pub const fn outbound_heading(self) -> f64 {
        self.opposite().inbound_heading()
    }

    /// A unit vector pointing along the travel direction of vehicles arriving from this side.
    pub fn forward(self) -> Vector2d {
        match self {
            Direction::North => Vector2d::new(0.0, 1.0),
            Direction::East => Vector2d::new(-1.0, 0.0),
            Direction::South => Vector2d::new(0.0, -1.0),
            Direction::West => Vector2d::new(1.0, 0.0),
        }
    }
}

impl TurnType {
    /// All turn types.
    pub const ALL: [TurnType; 3] = [TurnType::Left, TurnType::Right, TurnType::Straight];

    /// The number of clockwise steps from the origin to the destination.
    pub const fn steps(self) -> usize {
        match self {
            TurnType::Left => 3,
            TurnType::Right => 1,
            TurnType::Straight => 2,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl Distribution<Direction> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Direction {
        Direction::from_index(rng.gen_range(0..4))
    }
}

impl Distribution<TurnType> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> TurnType {
        TurnType::ALL[rng.gen_range(0..3)]
    }
}

/// A value stored for each of the four directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerDirection<T>([T; 4]);

impl<T> PerDirection<T> {
    /// Builds the map by evaluating `f` for every direction.
    pub fn from_fn(mut f: impl FnMut(Direction) -> T) -> Self {
        Self(Direction::ALL.map(&mut f))
    }

    /// Iterates over the directions and their values in cyclic order.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, &T)> {
        Direction::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T: Copy> PerDirection<T> {
    /// Creates a map with the same value for every direction.
    pub fn splat(value: T) -> Self {
        Self([value; 4])
    }
}

impl<T> Index<Direction> for PerDirection<T> {
    type Output = T;

    fn index(&self, direction: Direction) -> &T {
        &self.0[direction.index()]
    }
}

impl<T> IndexMut<Direction> for PerDirection<T> {
    fn index_mut(&mut self, direction: Direction) -> &mut T {
        &mut self.0[direction.index()]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::{heading_vector, vector_heading};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn destinations() {
        use Direction::*;
        assert_eq!(North.destination(TurnType::Left), West);
        assert_eq!(North.destination(TurnType::Right), East);
        assert_eq!(North.destination(TurnType::Straight), South);
        assert_eq!(West.destination(TurnType::Right), North);
        assert_eq!(East.destination(TurnType::Left), North);
    }

    #[test]
    fn forward_matches_inbound_heading() {
        for dir in Direction::ALL {
            assert_eq!(vector_heading(dir.forward()), dir.inbound_heading());
            let v = heading_vector(dir.inbound_heading());
            assert!((v - dir.forward()).x.abs() < 1e-12);
            assert!((v - dir.forward()).y.abs() < 1e-12);
        }
    }

    #[test]
    fn straight_through_keeps_heading() {
        for dir in Direction::ALL {
            let dst = dir.destination(TurnType::Straight);
            assert_eq!(dst.outbound_heading(), dir.inbound_heading());
        }
    }

    #[test]
    fn random_turns_are_roughly_uniform() {
        let mut rng = StdRng::from_seed(*b"Vegemite sandwhich is not fun...");
        let mut counts = [0usize; 3];
        for _ in 0..3000 {
            let turn: TurnType = rng.gen();
            counts[turn.index()] += 1;
        }
        assert!(counts.iter().all(|c| (800..1200).contains(c)));
    }
}

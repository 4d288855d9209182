//! Value sources feeding the generator.
//!
//! A [`Seeder`] yields the scalar behind each envelope and a [`Transform`] turns that scalar
//! and its capture time into the envelope payload.

mod seeder;
mod transform;

pub use seeder::{
    ConfiguredSeeder, CustomSeeder, HarmonicSeeder, LinearSeeder, NormalSeeder, RandomSeeder,
    Seeder, TimeSeeder,
};
pub use transform::Transform;

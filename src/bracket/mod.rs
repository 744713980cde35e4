//! Bracket generation: seeding, match skeletons and canvas layout.

pub mod engine;
pub mod layout;
pub mod seeding;

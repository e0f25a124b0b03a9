pub mod board;
pub mod game;
pub mod generator;
pub mod notation;
pub mod repetition;
pub mod rules;
pub mod save;

#[cfg(test)]
mod repetition_test;

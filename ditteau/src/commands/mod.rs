// ditteau/src/commands/mod.rs

pub mod audit;
pub mod check;
pub mod evaluate;
pub mod inspect;

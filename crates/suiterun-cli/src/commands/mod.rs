pub mod args;
pub mod discover;
pub mod run;

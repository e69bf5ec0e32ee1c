pub mod catalog;
pub mod config;
pub mod err;
pub mod prelude;
pub mod runner;
pub mod tester;
pub mod util;

#[cfg(test)]
mod test;

pub mod chunk;
pub mod error;
pub mod rebuild;
pub mod runtime;
pub mod settings;
pub mod store;

#[cfg(test)]
mod test_util;

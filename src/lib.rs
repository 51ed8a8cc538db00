pub mod arq;
pub mod error;
pub mod net;
pub mod sim;
pub mod trace;

#[cfg(test)]
mod test;

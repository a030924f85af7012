//! Cooperative cancellation for in-flight asks.
//!
//! One token is created per ask. It is propagated into the model call and
//! into every tool handler invoked during that ask.

mod token;

pub use token::CancellationToken;

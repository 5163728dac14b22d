//! Request handlers, one module per area.

pub mod content;
pub mod email;
pub mod marketplace;
pub mod support;
pub mod telegram;

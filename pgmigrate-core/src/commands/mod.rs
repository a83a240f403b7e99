//! Command implementations: init, plan, apply, dump, history.

pub mod apply;
pub mod dump;
pub mod history;
pub mod init;
pub mod plan;

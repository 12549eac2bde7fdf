pub mod archive;
pub mod cache;
pub mod commands;
pub mod descriptor;
pub mod export;
pub mod identity;
pub mod reference;
pub mod runtime;
pub mod vcs;

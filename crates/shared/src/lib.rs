pub mod domain;
pub mod nav;

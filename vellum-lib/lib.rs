use smartstring::{LazyCompact, SmartString};

pub mod document;
pub mod edit;
pub mod fs;
pub mod history;
pub mod position;
pub mod syntax;

pub type Tendril = SmartString<LazyCompact>;

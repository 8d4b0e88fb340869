pub mod apply;
pub mod backup;
pub mod bump;

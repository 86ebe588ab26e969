//! `SeaORM` entity definitions.

pub mod blogs;

pub mod array;
pub mod lines;
pub mod tree;

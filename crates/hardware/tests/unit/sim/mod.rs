pub mod loader;
pub mod machine;
pub mod scheduler;

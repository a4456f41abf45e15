pub mod archive;
pub mod scan;
pub mod system;

pub mod layout;
pub mod manager;
pub mod naming;

pub use layout::GalleryLayout;
pub use manager::Config;

pub mod analysis;
pub mod lead;
pub mod note;
pub mod partner;
pub mod product;
pub mod quote;
pub mod stage;
pub mod timeline;

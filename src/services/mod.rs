pub mod billing;
pub mod due;
pub mod events;
pub mod indexing;
pub mod inflation;
pub mod numbering;
pub mod pdf;
pub mod proration;
pub mod rent;
pub mod scheduler;

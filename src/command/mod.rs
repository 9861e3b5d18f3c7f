pub mod align;
pub mod threadcount;

pub use align::AlignCMD;
pub use threadcount::determine_thread_counts_1;

mod ordered_receiver;

pub use ordered_receiver::{BufferGauge, OrderedReceiver};

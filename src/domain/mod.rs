// Domain layer: timer text, poll settings and the ports the poller talks through.

pub mod model;
pub mod ports;

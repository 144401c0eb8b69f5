//! Domain layer - band math, alert gating and the capabilities the monitor depends on

pub mod alert;
pub mod bands;
pub mod notification;
pub mod price;

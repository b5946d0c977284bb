pub mod device;
pub mod notification;
pub mod service;

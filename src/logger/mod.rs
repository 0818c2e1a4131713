//! Alert logging: the durable, operator-facing record of integrity alerts.

pub mod alert_log;

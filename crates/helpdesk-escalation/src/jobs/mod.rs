//! Background jobs.

pub mod sla_scan_job;

//! # JSON Storage Module
//!
//! File-based implementation of the storage traits. Each of the five
//! collections is kept in its own JSON file under the data directory:
//!
//! - `logs.json`
//! - `children.json`
//! - `appointments.json`
//! - `caregivers.json`
//! - `join_requests.json`
//!
//! Writes are atomic (temp file + rename), and [`JsonConnection::replace_all`]
//! provides the staged five-collection transaction the sync engine relies on.

pub mod appointment_repository;
pub mod caregiver_repository;
pub mod child_repository;
pub mod connection;
pub mod join_request_repository;
pub mod log_repository;

#[cfg(test)]
pub mod test_utils;

pub use appointment_repository::AppointmentRepository;
pub use caregiver_repository::CaregiverRepository;
pub use child_repository::ChildRepository;
pub use connection::JsonConnection;
pub use join_request_repository::JoinRequestRepository;
pub use log_repository::LogRepository;

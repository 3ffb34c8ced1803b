pub mod access;
pub mod appointments;
pub mod doctors;
pub mod jwt;
pub mod patients;
pub mod users;

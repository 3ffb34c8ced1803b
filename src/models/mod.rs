pub mod appointments;
pub mod doctors;
pub mod patients;
pub mod permissions;
pub mod requests;
pub mod users;

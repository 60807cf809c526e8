pub mod aggregate;
pub mod approval;
pub mod lateness;
pub mod payroll;

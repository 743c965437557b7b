pub mod admissions;
pub mod audit;
pub mod calendar;
pub mod lessons;
pub mod rbac;
pub mod recurrence;
pub mod schools;
pub mod transfers;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;

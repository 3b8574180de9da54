pub mod admin_type;
pub mod annual_report;
pub mod city;
pub mod club;
pub mod common;
pub mod document;
pub mod event;
pub mod user;

#[cfg(feature = "integration-test")]
#[cfg(test)]
pub mod test_support;

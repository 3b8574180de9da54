pub mod access;
pub mod administration;
pub mod annual_report;
pub mod city;
pub mod city_participants;
pub mod club;
pub mod club_participants;
pub mod documents;
pub mod event;
pub mod notification;
pub mod transaction;
pub mod user;

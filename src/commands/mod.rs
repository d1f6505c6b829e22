pub mod auth;
pub mod billing;
pub mod customer;
pub mod dashboard;
pub mod employees;
pub mod inventory;
pub mod menu;
pub mod qrcode;
pub mod runtime;
pub mod settings;
pub mod tables;

// src/lib.rs
pub mod api;
pub mod banner;
pub mod config;
pub mod database;
pub mod errors;
pub mod exercise;
pub mod grader;
pub mod models;
pub mod quiz;
pub mod runner;
pub mod sandbox;
pub mod storage;
pub mod widget;

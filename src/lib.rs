//! Task Tracker API Library
//!
//! A personal task-tracking web service: authenticated users create, list,
//! edit and delete tasks with a priority, a status and a time window, and
//! view an aggregate summary of their work.
//!
//! Requests flow API layer → bearer authentication → [`service::TaskService`]
//! → [`infrastructure::TaskStore`].

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod service;

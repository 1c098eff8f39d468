//! MediaWatch - regional media monitoring back end.
//!
//! Harvests news articles and mentions from feeds, sitemaps, listing pages
//! and web search, enriches them through a local LLM service, preserves
//! evidence bundles in object storage, and scans for watched-organization
//! mentions with sentiment classification.

pub mod cli;
pub mod config;
pub mod evidence;
pub mod feeds;
pub mod llm;
pub mod models;
pub mod repository;
pub mod scrapers;
pub mod services;
pub mod utils;

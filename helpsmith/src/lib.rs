//! helpsmith - Legacy WebHelp project editor and build tool
//!
//! Works on help projects exported by a legacy authoring tool: a directory
//! of `.htm` topic pages plus `hmcontent.htm`, a nested-list HTML document
//! carrying the table of contents. The crate parses and edits that TOC,
//! maintains a full-text search index over the pages, detects orphaned
//! resources and generates the static artifacts the help viewer consumes.

#![deny(unsafe_code)]

pub mod fs_access;
pub mod generators;
pub mod orphan;
pub mod project;
pub mod search;
pub mod toc;

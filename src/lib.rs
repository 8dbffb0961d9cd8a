//! FileCon - batch file format converter
//!
//! Converts lists of images, audio, video and documents between formats.
//! Each media category has one converter behind the [`convert::Converter`]
//! trait; [`batch::batch_convert`] drives a converter over a batch of files
//! and [`worker::BatchWorker`] runs batches in the background.

pub mod batch;
pub mod category;
pub mod cli;
pub mod config;
pub mod convert;
pub mod error;
pub mod media;
pub mod options;
pub mod selection;
pub mod worker;

//! Analysis module for feature extraction and credit modeling

pub mod credit_model;
pub mod features;

// src/lib.rs
pub mod data {
    pub mod reference;
    pub mod sample;
}

pub mod catalog {
    pub mod snapshot;
}

pub mod taxa {
    pub mod resolver;
}

pub mod pipeline {
    pub mod config;
    pub mod report;
    pub mod run;
}

pub mod error;

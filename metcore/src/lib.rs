// chemistry module
pub mod chemistry {
    pub mod constants;
    pub mod adduct;
    pub mod catalog;
}

// data module
pub mod data {
    pub mod spectrum;
    pub mod feature;
    pub mod chemical;
    pub mod taxonomy;
}

// algorithm module
pub mod algorithm {
    pub mod similarity;
    pub mod network;
    pub mod component;
    pub mod propagation;
}

// annotation module
pub mod annotate {
    pub mod candidate;
    pub mod scoring;
}

pub mod error;

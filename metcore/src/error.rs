use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetcoreError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("unknown polarity '{0}', expected 'pos' or 'neg'")]
    UnknownPolarity(String),
    #[error("cannot parse adduct notation '{0}'")]
    AdductNotation(String),
    #[error("unknown adduct ingredient '{0}'")]
    UnknownIngredient(String),
    #[error("feature {feature_id} rejected: {reason}")]
    InvalidFeature { feature_id: u32, reason: String },
    #[error("label propagation failed: {0}")]
    Propagation(String),
}

mod epoch_trainer;
mod scratch;

pub use epoch_trainer::EpochTrainer;

pub mod consumer;
pub mod front_door;
pub mod retry;
pub mod state;

pub use consumer::IngestionConsumer;
pub use front_door::{channel, IngestionFrontDoor};

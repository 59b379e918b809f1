mod grounding_blocks;
mod part_processor;
mod state;
mod state_events;
mod state_finish;


pub use part_processor::PartProcessor;
pub use state::{BlockType, StreamingState};
